use anyhow::Result;
use clap::Parser;
use docchat_cli::{
    Cli, Command, Console, IndexSource, ServerConfig, build_index, open_session, run_server,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.log_json).ok();
    let settings = cli.settings;

    match cli.command {
        Command::Build => {
            let report = build_index(&settings).await?;
            println!(
                "Indexed {} chunks from {} documents into {} ({} files skipped)",
                report.chunk_count,
                report.document_count,
                settings.index_path.display(),
                report.skipped.len()
            );
        }
        Command::Chat { rebuild } => {
            let source = if rebuild { IndexSource::Rebuild } else { IndexSource::BuildIfMissing };
            let session = open_session(&settings, source).await?;
            Console::new(session).run().await?;
        }
        Command::Serve => {
            let session = open_session(&settings, IndexSource::Existing).await?;
            let config = ServerConfig { host: settings.host.clone(), port: settings.port };
            run_server(config, session).await?;
        }
    }

    Ok(())
}
