use backend::engine::expiry;
use backend::infra::state::build_engine;

mod telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: Set via docker-compose env_file or docker run --env-file
    // - Local dev: Source env files manually (e.g., set -a; . ./.env; set +a)
    println!("🚀 Starting Quizhall game engine");

    let app_state = match build_engine().build().await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("❌ Failed to build the engine: {e}");
            std::process::exit(1);
        }
    };

    println!("✅ Store connected");

    // Fired deadlines re-enter the engine as queued actions; client
    // actions arrive through the transport layer's own deployment.
    expiry::spawn_listener(&app_state.store_url, app_state.executor.clone());

    tokio::signal::ctrl_c().await?;
    println!("Shutting down");
    Ok(())
}
