use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use scribe::Cli;

fn setup_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("scribe=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);

    if let Err(e) = scribe::run(cli).await {
        debug!(err = ?e, "exiting");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
