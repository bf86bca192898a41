use anyhow::Result;
use clap::Parser;
use meetbot::cli::{
    handle_config_command, handle_fetch_command, handle_recordings_command, handle_run_command,
    handle_status_command, handle_watch_command, load_config, Cli, CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_file = cli.config_file.as_deref();

    match cli.command {
        CliCommand::Version => {
            println!("meetbot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Config(args) => handle_config_command(args, config_file),
        CliCommand::Run(args) => handle_run_command(args, &load_config(config_file)?).await,
        CliCommand::Status(args) => handle_status_command(args, &load_config(config_file)?).await,
        CliCommand::Watch(args) => handle_watch_command(args, &load_config(config_file)?).await,
        CliCommand::Fetch(args) => handle_fetch_command(args, &load_config(config_file)?).await,
        CliCommand::Recordings(args) => {
            handle_recordings_command(args, &load_config(config_file)?).await
        }
    }
}
