//! Per-game write lock.
//!
//! An ephemeral token under `game:action:lock:{id}` with a short TTL
//! identifies the current sole writer. Acquisition happens inside the
//! IN pipeline (conditional-set); release is a compare-and-delete
//! script so a holder can only ever release its own token, never a
//! successor's.

use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::keys;

/// Proof of exclusive ownership of a game's write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Release the lock held under `token`. Returns whether the token was
/// still ours; `false` means the TTL already reclaimed it.
pub async fn release(
    conn: &mut ConnectionManager,
    game_id: &str,
    token: &LockToken,
) -> Result<bool, AppError> {
    let released: i64 = redis::Script::new(RELEASE_SCRIPT)
        .key(keys::lock(game_id))
        .arg(token.as_str())
        .invoke_async(conn)
        .await?;
    Ok(released == 1)
}
