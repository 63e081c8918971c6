use mock_server::MockConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let config = MockConfig {
        ready: std::env::var("MOCK_NOT_READY").is_err(),
        legacy: std::env::var("MOCK_LEGACY").is_ok(),
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("mock aptly {} listening on {addr}", mock_server::VERSION);
    mock_server::run(listener, config).await
}
