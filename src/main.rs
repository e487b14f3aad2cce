// src/main.rs

use profilerun::config::settings::AgentSettings;
use profilerun::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("profilerun error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let settings = AgentSettings::load(&args.settings)?;
    logging::init_logging(args.log_level, settings.agent.log_level.as_deref())?;
    run(args, settings).await
}
