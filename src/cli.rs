use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "seaforge",
    version,
    about = "Chat with a coding model that creates and edits local files"
)]
pub struct Cli {
    #[command(flatten)]
    pub endpoint: EndpointArgs,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EndpointArgs {
    /// Chat completions URL (overrides the config file)
    #[arg(long, global = true, env = "SEAFORGE_BASE_URL")]
    pub base_url: Option<String>,
    /// Model name (overrides the config file)
    #[arg(long, global = true, env = "SEAFORGE_MODEL")]
    pub model: Option<String>,
    /// Upper bound on tokens in each reply
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,
}

impl From<EndpointArgs> for Overrides {
    fn from(args: EndpointArgs) -> Self {
        Self {
            base_url: args.base_url,
            model: args.model,
            max_tokens: args.max_tokens,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session (the default)
    Chat,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Check that the endpoint and credentials work
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the default config, replacing any existing file
    Init,
    /// Print the effective config
    Show,
    /// Print the config file location
    Path,
}
