use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wsecho::websocket::{DEFAULT_PORT, resolve_bind_addr};
use wsecho::{EchoHandler, EchoServerTrait, WebSocketConfig, WebSocketEchoServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut address = format!("localhost:{DEFAULT_PORT}");
    let mut quiet = false;
    let mut keep_running = false;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-q" | "--quiet" => quiet = true,
            "--keep-running" => keep_running = true,
            "-h" | "--help" => {
                print_usage(&args[0]);
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                eprintln!("Unknown option: {flag}");
                print_usage(&args[0]);
                std::process::exit(1);
            }
            addr => address = addr.to_string(),
        }
    }

    // Initialize logging. Stdout is reserved for the readiness line.
    let default_filter = if quiet { "wsecho=info" } else { "wsecho=debug" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let bind_addr = resolve_bind_addr(&address)
        .await
        .wrap_err("Failed to resolve listen address")?;
    let config = WebSocketConfig::new(bind_addr).with_announce_ready(true);
    let handler = if keep_running {
        EchoHandler::persistent()
    } else {
        EchoHandler::new()
    };
    let stop_on_close = handler.stops_on_close();
    let server = WebSocketEchoServer::with_handler(config, handler);

    info!(
        %address,
        resolved = %server.config().bind_addr,
        handshake_timeout = ?server.config().handshake_timeout,
        stop_on_close,
        "Starting WebSocket echo server"
    );

    server.run().await.wrap_err("Failed to run WebSocket echo server")?;

    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} [ADDR] [--quiet] [--keep-running]");
    eprintln!("  ADDR:           host:port to listen on (default: localhost:{DEFAULT_PORT})");
    eprintln!("                  Names resolve to IPv4 when possible; use [::1]:PORT for IPv6");
    eprintln!("  -q, --quiet:    Log at info level instead of debug");
    eprintln!("  --keep-running: Keep serving after a client closes");
    eprintln!();
    eprintln!("Once listening, a single `ready ws://<addr>/` line is printed on stdout.");
    eprintln!("RUST_LOG overrides the log level, e.g. RUST_LOG=wsecho=trace.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program}                        # Exit after the first client closes");
    eprintln!("  {program} 127.0.0.1:9100 -q      # Different port, less logging");
    eprintln!("  {program} --keep-running         # Serve many clients until Ctrl-C");
}
