use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use xvsa_jfe::cli::{Cli, Commands, GenerationArgs, ModuleArgs, SourcesCommand};
use xvsa_jfe::config::{GenerationConfig, resolve_config, resolve_output_dir};
use xvsa_jfe::manifest::read_list;
use xvsa_jfe::naming;
use xvsa_jfe::orchestrator::{ModuleInput, Orchestrator};
use xvsa_jfe::recorder::SourceFileRecorder;
use xvsa_jfe::runner::SystemRunner;
use xvsa_jfe::scan::scan_jars;
use xvsa_jfe::workspace::{WorkspacePlan, run_plan};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command.clone() {
        Commands::Run { module, generation } => {
            let input = module_input(&module)?;
            let project_dir = match input.project_dir.clone() {
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            let config = load_config(&cli, &generation, &project_dir)?;
            let orchestrator = Orchestrator::new(config, Arc::new(SystemRunner));
            let report = orchestrator.run_module(&input)?;
            print_json(&report)?;
        }
        Commands::Workspace {
            plan,
            parallel,
            generation,
        } => {
            let project_dir = std::env::current_dir()?;
            let config = load_config(&cli, &generation, &project_dir)?;
            let plan = WorkspacePlan::load(&plan)?;
            let orchestrator = Orchestrator::new(config, Arc::new(SystemRunner));
            let report = run_plan(&orchestrator, &plan, parallel);
            print_json(&report)?;
            if report.aborted || report.failed_modules() > 0 {
                anyhow::bail!(
                    "{} module(s) failed{}",
                    report.failed_modules(),
                    if report.aborted { ", run aborted" } else { "" }
                );
            }
        }
        Commands::Sources { action } => match action {
            SourcesCommand::Merge { inputs, into } => {
                let recorder = SourceFileRecorder::new();
                for input in inputs.iter() {
                    recorder.load_and_consume(input)?;
                }
                recorder.merge_and_persist(&into, &[])?;
                let merged: Vec<String> = serde_json::from_str(
                    &std::fs::read_to_string(&into)
                        .with_context(|| format!("Failed to read back {}", into.display()))?,
                )?;
                print_json(&serde_json::json!({
                    "output": into.display().to_string(),
                    "files": merged.len(),
                }))?;
            }
        },
        Commands::ArtifactName { jar } => {
            println!("{}", naming::artifact_name(&jar));
        }
        Commands::Status { name } => {
            let project_dir = std::env::current_dir()?;
            let output_dir = resolve_output_dir(&cli, &project_dir, &|k: &str| std::env::var(k).ok());
            let status = module_status(&output_dir, &name);
            print_json(&status)?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(cli: &Cli, generation: &GenerationArgs, project_dir: &Path) -> Result<GenerationConfig> {
    resolve_config(cli, generation, project_dir, |k: &str| std::env::var(k).ok())
}

fn module_input(args: &ModuleArgs) -> Result<ModuleInput> {
    let mut classpath = args.classpath.clone();
    for dir in args.lib_dir.iter() {
        let jars = scan_jars(dir)
            .with_context(|| format!("Failed to scan library directory: {}", dir.display()))?;
        classpath.extend(jars);
    }
    Ok(ModuleInput {
        name: args.name.clone(),
        project_dir: args.project_dir.clone(),
        class_dirs: args.classes.clone(),
        classpath,
        source_paths: args.sources.clone(),
    })
}

#[derive(Debug, Serialize)]
struct ModuleStatus {
    module: String,
    output: Option<String>,
    dependencies: Option<Vec<String>>,
    input_dirs: Option<Vec<String>>,
    libraries: Option<Vec<String>>,
}

fn module_status(output_dir: &Path, name: &str) -> ModuleStatus {
    let list = |file: String| -> Option<Vec<String>> { read_list(&output_dir.join(file)).ok() };
    let object: PathBuf = output_dir.join(naming::module_object(name));
    ModuleStatus {
        module: name.to_string(),
        output: object.exists().then(|| object.display().to_string()),
        dependencies: list(naming::dependency_list(name)),
        input_dirs: list(naming::input_dir_list(name)),
        libraries: list(naming::library_output_list(name)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
