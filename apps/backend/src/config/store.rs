use std::env;

/// Connection URL of the game state store.
///
/// Environment variables must be set by the runtime environment
/// (docker-compose env_file, or sourced manually for local dev).
pub fn store_url() -> String {
    env::var("STORE_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string())
}
