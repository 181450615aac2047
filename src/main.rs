use clap::Parser;
use log::info;

use chess_session_server::config::ServerConfig;
use chess_session_server::server::GameServer;

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::parse();
    info!(
        "starting chess session server on {}:{}",
        config.host, config.port
    );

    let server = GameServer::bind(config).await?;
    server.run().await
}
