use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use nim_server::{Server, ServerConfig};

/// Multi-room misere Nim game server.
#[derive(Parser, Debug)]
#[command(name = "nim-server")]
#[command(about = "A TCP server hosting multi-room two-player misere Nim")]
#[command(version)]
struct Cli {
    /// Address to bind the listening socket to.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// TCP port to listen on.
    #[arg(long, short = 'p', default_value_t = 10000)]
    port: u32,

    /// Maximum number of simultaneous connections.
    #[arg(long, default_value_t = 50)]
    max_clients: usize,

    /// Maximum number of rooms that can exist at once.
    #[arg(long, default_value_t = 10)]
    max_rooms: usize,

    /// Log to stdout instead of the rolling file appender.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stdout)
            .init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily("logs", "nim-server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Keep the guard alive for the process lifetime so buffered lines flush.
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ServerConfig::new(cli.bind, cli.port, cli.max_clients, cli.max_rooms, cli.verbose)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("received interrupt, shutting down");
        handler_flag.store(true, Ordering::Relaxed);
    })?;

    let mut server = Server::new(&config, shutdown)?;
    server.run()?;

    Ok(())
}
