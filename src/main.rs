use std::path::PathBuf;

use clap::Parser;

use hail::app::App;
use hail::config::Config;
use hail::error::AppResult;

/// Terminal client for the Hail ride service.
#[derive(Debug, Parser)]
#[command(name = "hail", version)]
struct Cli {
    /// Initial path to open, e.g. /customer or /tracking/<id>. Defaults to
    /// startup routing based on the current session.
    path: Option<String>,

    /// Config file to use instead of the default lookup.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    init_logging();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let mut app = App::new(config)?;
    app.run(cli.path).await
}

/// Logs go to a file because the terminal is owned by the UI. Failure to set
/// the sink up is not fatal; the app just runs unlogged.
fn init_logging() {
    use std::sync::Arc;

    use tracing_subscriber::EnvFilter;

    let path = std::env::var_os("HAIL_LOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("hail.log"));
    let Ok(file) = std::fs::File::create(path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
}
