mod startup;

use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting calendar digest");

    // Load configuration
    let config = startup::load_config()?;

    // Fetch, render and send
    startup::run(config).await
}
