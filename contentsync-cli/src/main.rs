//! contentsync command line.
//!
//! Usage:
//!   contentsync credentials set --host https://my-search.upstash.io --api-key ...
//!   contentsync --content content.json enable api::article.article --field title
//!   contentsync report

use anyhow::Result;
use clap::Parser;
use contentsync_cli::{run, Cli};
use contentsync_engine::SyncError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = run(cli, &mut stdout).await {
        match e.downcast_ref::<SyncError>() {
            Some(sync_error) => {
                let report = sync_error.report();
                eprintln!("error: {}", report.message);
                if let Some(link) = report.link {
                    eprintln!("see: {link}");
                }
            }
            None => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
    Ok(())
}
