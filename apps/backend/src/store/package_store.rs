//! Read-only access to a game's immutable package
//! (`game:package:{id}`), populated once at game creation by the
//! authoring service and never mutated during play.

use std::collections::HashMap;

use redis::aio::ConnectionManager;

use crate::domain::package::GamePackage;
use crate::error::AppError;
use crate::store::keys;

const FIELD_DATA: &str = "data";

pub async fn load(
    conn: &mut ConnectionManager,
    game_id: &str,
) -> Result<Option<GamePackage>, AppError> {
    let hash: HashMap<String, String> = redis::cmd("HGETALL")
        .arg(keys::package(game_id))
        .query_async(conn)
        .await?;
    if hash.is_empty() {
        return Ok(None);
    }
    let raw = hash
        .get(FIELD_DATA)
        .ok_or_else(|| AppError::data_corruption("package hash is missing the data field"))?;
    Ok(Some(serde_json::from_str(raw)?))
}
