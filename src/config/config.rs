use crate::docker_compose::compose_cli::DEFAULT_COMPOSE_COMMAND;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

const BANNER: &str = r"
██╗███╗   ██╗███████╗██████╗  █████╗  ██████╗██╗     ██╗
██║████╗  ██║██╔════╝██╔══██╗██╔══██╗██╔════╝██║     ██║
██║██╔██╗ ██║█████╗  ██████╔╝███████║██║     ██║     ██║
██║██║╚██╗██║██╔══╝  ██╔══██╗██╔══██║██║     ██║     ██║
██║██║ ╚████║██║     ██║  ██║██║  ██║╚██████╗███████╗██║
╚═╝╚═╝  ╚═══╝╚═╝     ╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝╚══════╝╚═╝";

const LONG_ABOUT: &str = "infracli simplifies the management of infrastructure services defined \
in Docker Compose files.

It runs and stops multiple services at once from a single place. Services are detected \
from the directory structure: every directory under the services path that holds a \
docker-compose.yml is a service.";

#[derive(Parser, Debug)]
#[command(
    name = "infracli",
    version,
    about = "CLI tool to manage infrastructure services",
    long_about = LONG_ABOUT,
    before_long_help = BANNER
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file to use instead of ~/.config/infracli/infracli.json
    #[arg(long, global = true, env = "INFRACLI_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compose executable and its leading arguments
    #[arg(
        long,
        global = true,
        env = "INFRACLI_COMPOSE_COMMAND",
        default_value = DEFAULT_COMPOSE_COMMAND,
        value_name = "COMMAND"
    )]
    pub compose_command: String,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List all available infrastructure services
    #[command()]
    List(ListCommandArgs),

    /// Display connection information (ports, credentials, URIs) for a service
    #[command(after_help = "Examples:\n  infracli info mysql\n  infracli info postgres\n  infracli info mongo")]
    Info(InfoCommandArgs),

    /// Start one or more infrastructure services, or 'all'
    #[command(after_help = "Examples:\n  infracli run mysql\n  infracli run mongo elasticsearch-kibana\n  infracli run all")]
    Run(RunCommandArgs),

    /// Stop one or more infrastructure services, or 'all'
    #[command(after_help = "Examples:\n  infracli down mysql\n  infracli down mongo elasticsearch-kibana\n  infracli down all --volumes")]
    Down(DownCommandArgs),

    /// Show or update the infracli configuration
    #[command()]
    Config(ConfigCommandArgs),

    /// Print a shell completion script
    #[command()]
    Completions(CompletionsCommandArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct ListCommandArgs {}

#[derive(Parser, Clone, Debug)]
pub struct InfoCommandArgs {
    pub service: String,
}

#[derive(Parser, Clone, Debug)]
pub struct RunCommandArgs {
    #[arg(value_name = "SERVICE")]
    pub services: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
pub struct DownCommandArgs {
    #[arg(value_name = "SERVICE")]
    pub services: Vec<String>,

    /// Remove volumes when stopping services
    #[arg(long, default_value_t = false)]
    pub volumes: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ConfigCommandArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigCommands {
    /// Update the directory infracli looks for services in
    #[command()]
    SetPath(SetPathCommandArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct SetPathCommandArgs {
    pub path: String,
}

#[derive(Parser, Clone, Debug)]
pub struct CompletionsCommandArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}
