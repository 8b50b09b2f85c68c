use clap::Parser;

use feedstore::app::App;
use feedstore::Config;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;

    let app = App::new(&config).await?;
    cli::run(cli.command, &app).await
}
