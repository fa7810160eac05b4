use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "telesales-insights",
    version,
    about = "Telesales analytics assistant",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
pub struct RuntimeArgs {
    /// Directory holding the four CSV datasets
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the generation model for this run
    #[arg(long = "model", global = true)]
    pub model: Option<String>,

    /// Presentation of the interactive view
    #[arg(long = "layout", value_enum, default_value_t = Layout::Compact, global = true)]
    pub layout: Layout,
}

/// The two presentation variants
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// Conversation only
    #[default]
    Compact,
    /// Headline dashboard next to the conversation
    Wide,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive conversation (default)
    Chat,

    /// Ask a single question and print the reply
    Ask {
        /// Question text
        #[arg(required = true)]
        prompt: Vec<String>,
    },

    /// Print the executive report
    Report,

    /// Print the call statistics derived from the datasets
    Stats,
}
