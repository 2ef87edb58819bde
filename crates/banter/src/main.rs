use banter::{ChatServer, ServerConfig};
use tracing_subscriber::EnvFilter;

fn parse_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--chat-addr" => {
                if let Some(value) = args.next() {
                    config.chat_addr = value;
                }
            }
            "--data-addr" => {
                if let Some(value) = args.next() {
                    config.data_addr = value;
                }
            }
            "--help" | "-h" => {
                println!("usage: banter [--chat-addr HOST:PORT] [--data-addr HOST:PORT]");
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), banter::BanterError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting banter");
    let server = ChatServer::bind(parse_args()).await?;
    server.run().await
}
