//! Quiz lobby server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin quiz-lobby-server -- --games-file games.json
//! ```

use clap::Parser;
use quiz_lobby_server::ServerConfig;
use quiz_lobby_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Run the server
    if let Err(e) = quiz_lobby_server::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
