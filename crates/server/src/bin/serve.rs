use homestead_server::config::{feature_flags, load_feature_flags};
use homestead_server::db::{create_pool, run_migrations, AppState};
use homestead_server::gps_buffer::spawn_flush_task;
use homestead_server::telemetry::{init_telemetry, init_tracing, OtelTraceLayer};
use homestead_server::{health, openapi, s3};

#[tokio::main]
async fn main() {
    init_tracing();
    load_feature_flags();

    let flags = feature_flags();
    if flags.telemetry {
        init_telemetry();
    }
    if flags.s3 {
        s3::ensure_bucket().await;
    }

    let pool = create_pool();
    run_migrations(&pool).await;

    let state = AppState::new(pool.clone());
    spawn_flush_task(pool, state.gps_buffer.clone());
    health::record_start_time();

    let app = openapi::api_router(state).layer(OtelTraceLayer);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));

    tracing::info!("Homestead server listening on {addr}");
    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}
