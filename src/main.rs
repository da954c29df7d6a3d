//! Server binary: parse CLI args, build state, run the HTTP server

use clap::Parser;

use scopegen_lib::config::AppConfig;
use scopegen_lib::server::{run_server, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "scopegen",
    version,
    about = "LLM-driven professional services scoping server with ScopeStack integration"
)]
struct Args {
    /// Port to listen on
    #[arg(long, short, env = "SCOPEGEN_PORT", default_value_t = 3000)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "SCOPEGEN_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Allowed CORS origins (repeatable); all origins allowed when omitted
    #[arg(long = "cors-origin", env = "SCOPEGEN_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Request log file (JSON lines); console-only logging when omitted
    #[arg(long, env = "REQUEST_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if args.log_file.is_some() {
        config.request_log_path = args.log_file.clone();
    }
    if !config.has_llm_credentials() {
        log::warn!("LLM_API_KEY not set: generation will use fallback content only");
    }

    let state = AppState::new(config);
    let shutdown_state = state.shutdown_state.clone();

    // Trap Ctrl-C for graceful shutdown
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_state.request_shutdown();
        }
    });

    let cors_origins = if args.cors_origins.is_empty() {
        None
    } else {
        Some(args.cors_origins)
    };

    if let Err(e) = run_server(args.port, &args.bind, state, cors_origins).await {
        log::error!("Server exited with error: {}", e);
        std::process::exit(1);
    }
}
