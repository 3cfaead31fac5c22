use crate::config::config::{
    DownCommandArgs, InfoCommandArgs, ListCommandArgs, RunCommandArgs, SetPathCommandArgs,
};
use crate::docker_compose::compose_cli::{ComposeAction, ComposeRunner, OutputMode};
use crate::docker_compose::docker_compose::ComposeDocument;
use crate::error::InfraError;
use crate::presenters::render_info;
use crate::services::{discover_services, service_names, ServiceDir};
use crate::settings::{Settings, SettingsStore};
use anyhow::Result;
use tracing::debug;

pub const ALL_SERVICES: &str = "all";

/// Outcome of a `run` or `down` over several services.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub unknown: Vec<String>,
}

/// Splits the requested names into known services and unknown names.
/// A lone `all` selects every available service.
pub fn resolve_targets<'s>(
    requested: &[String],
    available: &'s [ServiceDir],
) -> (Vec<&'s ServiceDir>, Vec<String>) {
    if let [only] = requested {
        if only == ALL_SERVICES {
            return (available.iter().collect(), Vec::new());
        }
    }

    let mut targets = Vec::new();
    let mut unknown = Vec::new();
    for name in requested {
        match available.iter().find(|s| &s.name == name) {
            Some(service) => targets.push(service),
            None => unknown.push(name.clone()),
        }
    }

    (targets, unknown)
}

fn is_all(requested: &[String]) -> bool {
    matches!(requested, [only] if only == ALL_SERVICES)
}

fn print_not_found(prefix: &str, name: &str, available: &[ServiceDir]) {
    println!("{prefix}: Service '{name}' not found in available services");
    println!("Available services: {}", service_names(available).join(", "));
}

pub struct InfraCli<R: ComposeRunner> {
    store: SettingsStore,
    runner: R,
    verbose: bool,
}

impl<R: ComposeRunner> InfraCli<R> {
    pub fn new(store: SettingsStore, runner: R, verbose: bool) -> Self {
        InfraCli {
            store,
            runner,
            verbose,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn load_settings(&self) -> Result<Settings> {
        Ok(self.store.load()?)
    }

    fn available_services(&self) -> Result<(Settings, Vec<ServiceDir>)> {
        let settings = self.load_settings()?;
        let services = discover_services(&settings)?;
        debug!(count = services.len(), "discovered services");
        Ok((settings, services))
    }

    pub fn list_cmd(&self, _args: ListCommandArgs) -> Result<()> {
        let (_, services) = self.available_services()?;

        if services.is_empty() {
            println!("No services found. Check your configuration.");
            return Ok(());
        }

        println!("Available services:");
        println!("{}", "-".repeat(20));
        for service in &services {
            println!("- {}", service.name);
        }
        println!("{}", "-".repeat(20));
        println!("Total: {} services", services.len());
        println!("\nYou can run any of these services with: infracli run <service-name>");
        println!("You can stop any of these services with: infracli down <service-name>");
        println!("You can manage all services at once with: infracli run all or infracli down all");

        Ok(())
    }

    pub fn info_cmd(&self, args: InfoCommandArgs) -> Result<()> {
        let (_, services) = self.available_services()?;

        let Some(service) = services.iter().find(|s| s.name == args.service) else {
            print_not_found("Error", &args.service, &services);
            return Ok(());
        };

        if self.verbose {
            println!("Reading compose file: {}", service.compose_file.display());
        }

        let content = std::fs::read_to_string(&service.compose_file).map_err(|source| {
            InfraError::ComposeFileRead {
                path: service.compose_file.clone(),
                source,
            }
        })?;
        let document = ComposeDocument::parse(&content);

        println!("Service: {}", service.name);
        println!("{}", "=".repeat(50));
        print!("{}", render_info(&service.name, &document)?);

        Ok(())
    }

    pub fn run_cmd(&self, args: RunCommandArgs) -> Result<BatchReport> {
        self.batch(&args.services, ComposeAction::Up)
    }

    pub fn down_cmd(&self, args: DownCommandArgs) -> Result<BatchReport> {
        let action = ComposeAction::Down {
            remove_volumes: args.volumes,
        };
        self.batch(&args.services, action)
    }

    fn batch(&self, requested: &[String], action: ComposeAction) -> Result<BatchReport> {
        let (settings, services) = self.available_services()?;

        if self.verbose {
            println!("Services path: {}", settings.services_root()?.display());
            println!("Available services: {}", service_names(&services).join(", "));
            if action == (ComposeAction::Down { remove_volumes: true }) {
                println!("Volumes will be removed");
            }
        }

        let (targets, unknown) = resolve_targets(requested, &services);
        for name in &unknown {
            print_not_found("Warning", name, &services);
        }

        let all = is_all(requested);
        if all {
            println!("{} all available services...", action.progressive());
        }

        let mode = OutputMode::from_verbose(self.verbose);
        let mut report = BatchReport {
            unknown,
            ..Default::default()
        };

        for service in targets {
            println!("{} {}...", action.progressive(), service.name);

            match self.runner.apply(action, service, mode) {
                Ok(()) => {
                    println!("{} {} successfully", service.name, action.past());
                    report.succeeded.push(service.name.clone());
                }
                Err(err) => {
                    let verb = action.progressive().to_lowercase();
                    println!("Error {verb} {}: {err}", service.name);
                    if let Some(output) = err.output() {
                        println!("{output}");
                    }
                    report.failed.push(service.name.clone());
                }
            }
        }

        if all {
            println!("All services have been {}", action.past());
        }

        Ok(report)
    }

    pub fn config_cmd(&self) -> Result<()> {
        let settings = self.load_settings()?;
        let excluded: Vec<&str> = settings.excluded_dirs.iter().map(String::as_str).collect();

        println!("Current infracli configuration:");
        println!("-------------------------------");
        println!("Configuration file: {}\n", self.store.path().display());
        println!("Services path: {}", settings.services_path);
        println!("Excluded directories: [{}]", excluded.join(", "));

        println!("\nTo modify the configuration, edit the file directly or use:");
        println!("  infracli config set-path <new-services-path>");

        Ok(())
    }

    pub fn set_path_cmd(&self, args: SetPathCommandArgs) -> Result<()> {
        let mut settings = self.load_settings()?;
        let old_path = std::mem::replace(&mut settings.services_path, args.path);

        self.store.save(&settings)?;

        println!(
            "Services path updated from '{}' to '{}'",
            old_path, settings.services_path
        );
        Ok(())
    }
}
