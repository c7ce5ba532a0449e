use std::env;

use mock_server::{MockConfig, MockState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let config = MockConfig {
        require_confirmation: env::var("MOCK_REQUIRE_CONFIRMATION").is_ok_and(|v| v == "1"),
        admin_emails: env::var("MOCK_ADMIN_EMAILS")
            .map(|v| v.split(',').map(|e| e.trim().to_string()).collect())
            .unwrap_or_default(),
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, require_confirmation = config.require_confirmation, "mock backend listening");
    mock_server::serve(listener, MockState::new(config)).await
}
