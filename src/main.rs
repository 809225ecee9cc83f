use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use kanban::controllers::{self, AppState};
use kanban::db::{establish_connection, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app_url: SocketAddr = env::var("APP_URL")?.parse()?;

    let pool = establish_connection();
    let store = Arc::new(PgStore::new(pool));
    let state = Arc::new(AppState::new(store));
    let app = controllers::router(state);

    tracing::info!("kanban service listening on {app_url}");
    let listener = tokio::net::TcpListener::bind(app_url).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
