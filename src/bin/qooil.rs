//! Qooil Binary
//!
//! One binary, two modes: `-s` serves the current directory, the default
//! client mode opens a REPL against a running server.

use clap::Parser;
use qooil::client::repl;
use qooil::config::DEFAULT_PORT;
use qooil::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// Qooil file transfer
#[derive(Parser, Debug)]
#[command(name = "qooil")]
#[command(about = "FTP-like file transfer over a custom binary protocol")]
#[command(version)]
struct Args {
    /// Run as server, serving the current directory
    #[arg(short = 's', long = "server", conflicts_with = "client")]
    server: bool,

    /// Run as client (default)
    #[arg(short = 'c', long = "client")]
    client: bool,

    /// Address to bind (server) or connect to (client)
    #[arg(short = 'a', long = "address", default_value = "127.0.0.1")]
    address: String,

    /// TCP port
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Server worker-pool size
    #[arg(short = 'j', long = "workers", default_value_t = 4)]
    workers: usize,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,qooil=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let code = if args.server {
        run_server(&args)
    } else {
        repl::run(&format!("{}:{}", args.address, args.port))
    };
    std::process::exit(code);
}

fn run_server(args: &Args) -> i32 {
    if args.workers == 0 {
        tracing::error!("worker pool size must be at least 1");
        return 1;
    }

    tracing::info!("Qooil Server v{}", qooil::VERSION);

    let config = Config::builder()
        .host(args.address.clone())
        .port(args.port)
        .workers(args.workers)
        .build();

    let mut server = Server::new(config);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {e}");
        return 1;
    }

    tracing::info!("Server stopped");
    0
}
