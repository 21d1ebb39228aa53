mod access;
mod config;
mod error;
mod handlers;
mod middleware;
mod provider;
mod response;
mod router;
mod state;
mod utils;

use std::net::SocketAddr;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help") {
        println!("filegate-server");
        println!("A role-aware file management server over a physical folder tree.");
        println!();
        println!("USAGE:");
        println!("    filegate-server [OPTIONS]");
        println!();
        println!("OPTIONS:");
        println!("    --addr=<ADDRESS>            Sets the server listening address. [env: ADDR] [default: 0.0.0.0:9690]");
        println!("    --root-path=<PATH>          Sets the managed root folder. [env: ROOT_PATH] [default: ./files]");
        println!("    --max-file-size=<BYTES>     Sets the maximum upload size per file in bytes. [env: MAX_FILE_SIZE] [default: 10485760]");
        println!("    --access-rules=<PATH>       Sets the JSON access rule file. [env: ACCESS_RULES] [default: no rules, full access]");
        println!();
        println!("    --help                      Prints this help information.");
        println!();

        process::exit(0);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::load();

    let rules = match config.load_rules() {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!("Failed to load access rules: {}", e);
            process::exit(1);
        }
    };
    match &rules {
        Some(r) => tracing::info!("Loaded {} access rules", r.len()),
        None => tracing::info!("No access rule file configured, serving with full access"),
    }

    if let Err(e) = std::fs::create_dir_all(&config.root_path) {
        tracing::error!("Failed to create root folder {:?}: {}", config.root_path, e);
        process::exit(1);
    }
    tracing::info!("Root folder: {:?}", config.root_path);

    let provider = provider::FileProvider::new(
        config.root_path.clone(),
        access::AccessController::new(rules),
    );
    let state = state::AppState::new(config.clone(), provider);
    let app = router::create_router(state);

    let addr: SocketAddr = config.addr.parse().expect("Invalid address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("Server running on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = wait_for_ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, stopping server...");
}

async fn wait_for_ctrl_c() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
}
