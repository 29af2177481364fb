use clap::{Args, Parser, Subcommand};

/// The main CLI structure for the wave portal client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect the wallet, print the ledger and follow new waves until Ctrl+C.
    Watch(ConfigArgs),
    /// Connect the wallet and send a single wave.
    Wave(WaveCmd),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the configuration TOML file.
    /// If not provided, default values will be used.
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Debug)]
pub struct WaveCmd {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// The message to attach to the wave.
    #[arg(short, long)]
    pub message: String,
}
