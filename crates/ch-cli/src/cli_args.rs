use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "callin-host")]
#[command(about = "Drives scripted contexts through recorded simulation events")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Compile and load every context directory without dispatching events.
    Check(CheckArgs),
    /// Replay a JSON event list through the specialized contexts.
    Run(RunArgs),
    /// Print the call-in catalog.
    Callins,
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    #[arg(long = "data-dir")]
    pub(crate) data_dir: String,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "data-dir")]
    pub(crate) data_dir: String,
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
    #[arg(long = "events")]
    pub(crate) events: String,
    #[arg(long = "dev-mode")]
    pub(crate) dev_mode: bool,
    #[arg(long = "mod-ui-ctrl")]
    pub(crate) mod_ui_ctrl: bool,
}
