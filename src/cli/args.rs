use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetbot")]
#[command(about = "Send a recording bot to a meeting and collect its recording", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Create a bot, wait for the meeting to end and download its recording
    Run(RunCliArgs),
    /// Print the current status of a bot
    Status(StatusCliArgs),
    /// Follow an existing bot until it completes, fails or is stopped
    Watch(WatchCliArgs),
    /// Download the recording and transcript of an existing bot
    Fetch(FetchCliArgs),
    /// List recordings known to the server
    Recordings(ApiCliArgs),
    /// Inspect the configuration
    Config(ConfigCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct ApiCliArgs {
    /// Base URL of the bot API (default from config)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(ClapArgs, Debug, Default)]
pub struct PollCliArgs {
    /// Seconds between status checks
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,
    /// Stop waiting after this many seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECONDS")]
    pub max_wait: Option<u64>,
}

#[derive(ClapArgs, Debug, Default)]
pub struct OutputCliArgs {
    /// Directory to save the recording and transcript in
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Add a timestamp to file names so earlier downloads are kept
    #[arg(long)]
    pub unique_filenames: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RunCliArgs {
    /// Meeting link the bot should join
    pub meeting_url: String,
    /// Name shown for the bot in the meeting
    #[arg(long)]
    pub bot_name: Option<String>,
    /// Enable or disable server-side transcription (true/false)
    #[arg(long, value_name = "BOOL")]
    pub transcription: Option<bool>,
    /// Disable server-side transcription
    #[arg(long, conflicts_with = "transcription")]
    pub no_transcription: bool,
    #[command(flatten)]
    pub api: ApiCliArgs,
    #[command(flatten)]
    pub polling: PollCliArgs,
    #[command(flatten)]
    pub output: OutputCliArgs,
}

#[derive(ClapArgs, Debug)]
pub struct StatusCliArgs {
    pub bot_id: String,
    #[command(flatten)]
    pub api: ApiCliArgs,
}

#[derive(ClapArgs, Debug)]
pub struct WatchCliArgs {
    pub bot_id: String,
    #[command(flatten)]
    pub api: ApiCliArgs,
    #[command(flatten)]
    pub polling: PollCliArgs,
}

#[derive(ClapArgs, Debug)]
pub struct FetchCliArgs {
    pub bot_id: String,
    #[command(flatten)]
    pub api: ApiCliArgs,
    #[command(flatten)]
    pub output: OutputCliArgs,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}
