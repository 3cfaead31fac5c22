use anyhow::Result;
use clap::{CommandFactory, Parser};
use infracli::app::InfraCli;
use infracli::config::config::{Cli, Commands, ConfigCommands};
use infracli::docker_compose::compose_cli::ComposeCli;
use infracli::logging;
use infracli::settings::SettingsStore;
use std::io::stdout;
use std::process;

fn print_missing_services(subcommand: &str) -> Result<()> {
    println!("Error: You must specify at least one service or 'all'");

    let mut cli = Cli::command();
    if let Some(cmd) = cli.find_subcommand_mut(subcommand) {
        cmd.print_help()?;
    }
    Ok(())
}

fn run(args: Cli) -> Result<()> {
    let command = match args.command {
        Some(command) => command,
        None => {
            Cli::command().print_long_help()?;
            return Ok(());
        }
    };

    if let Commands::Completions(completions) = &command {
        clap_complete::generate(completions.shell, &mut Cli::command(), "infracli", &mut stdout());
        return Ok(());
    }

    let store = match args.config {
        Some(path) => SettingsStore::at(path),
        None => SettingsStore::default_location()?,
    };
    let runner = ComposeCli::new(&args.compose_command)?;
    let infracli = InfraCli::new(store, runner, args.verbose);

    match command {
        Commands::List(args) => infracli.list_cmd(args),
        Commands::Info(args) => infracli.info_cmd(args),
        Commands::Run(args) => {
            if args.services.is_empty() {
                return print_missing_services("run");
            }
            infracli.run_cmd(args).map(|_| ())
        }
        Commands::Down(args) => {
            if args.services.is_empty() {
                return print_missing_services("down");
            }
            infracli.down_cmd(args).map(|_| ())
        }
        Commands::Config(args) => match args.command {
            Some(ConfigCommands::SetPath(args)) => infracli.set_path_cmd(args),
            None => infracli.config_cmd(),
        },
        Commands::Completions(_) => Ok(()),
    }
}

fn main() {
    let args = Cli::parse();
    logging::init(args.debug);

    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        process::exit(1)
    }
}
