use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "xvsa-jfe")]
#[command(about = "Generate xvsa objects for module classes and dependency jars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// xvsa installation root (falls back to XVSA_HOME)
    #[arg(long, value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,

    /// Output directory for objects and list files (falls back to XVSA_GRADLE_OUTPUT)
    #[arg(long, value_name = "DIR", global = true)]
    pub output: Option<PathBuf>,

    /// Source list JSON file (falls back to XVSA_SRC_LIST)
    #[arg(long, value_name = "FILE", global = true)]
    pub src_list: Option<PathBuf>,

    #[arg(long, value_name = "FILTER", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Process one module
    Run {
        #[command(flatten)]
        module: ModuleArgs,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Process every module of a JSON plan
    Workspace {
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Source list maintenance
    Sources {
        #[command(subcommand)]
        action: SourcesCommand,
    },
    /// Print the library object name for a jar
    ArtifactName {
        #[arg(value_name = "JAR")]
        jar: String,
    },
    /// Print the list files written for a module
    Status {
        #[arg(long, value_name = "NAME")]
        name: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SourcesCommand {
    /// Consume source lists and persist their union
    Merge {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long, value_name = "FILE")]
        into: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ModuleArgs {
    #[arg(long, value_name = "NAME")]
    pub name: String,

    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", num_args = 1..)]
    pub classes: Vec<PathBuf>,

    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub classpath: Vec<PathBuf>,

    /// Directory whose jars are appended to the classpath
    #[arg(long, value_name = "DIR", num_args = 1..)]
    pub lib_dir: Vec<PathBuf>,

    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GenerationArgs {
    /// Extra jfe options, comma separated (falls back to XVSA_JFE_OPT)
    #[arg(
        long = "jfe-opt",
        value_name = "OPT",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub jfe_opts: Vec<String>,

    #[arg(long)]
    pub lib_gen: bool,

    #[arg(long, value_name = "PREFIX", value_delimiter = ',')]
    pub lib_jar_filter: Vec<String>,

    #[arg(long, value_name = "PREFIX", value_delimiter = ',')]
    pub lib_class_filter: Vec<String>,

    /// Generate only the jars named by --lib-jar-filter
    #[arg(long)]
    pub exclude_all_libs: bool,

    #[arg(long)]
    pub ignore_error: bool,

    /// Write list files only, do not run jfe
    #[arg(long)]
    pub skip_jfe: bool,

    /// Have jfe write its source list and merge it around every run
    #[arg(long)]
    pub track_sources: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_hyphenated_jfe_options_and_repeated_paths() {
        let cli = Cli::parse_from([
            "xvsa-jfe",
            "--home",
            "/opt/xvsa",
            "run",
            "--name",
            "app",
            "--classes",
            "/m/classes",
            "/m/extra",
            "--classpath",
            "/r/a.jar",
            "--jfe-opt",
            "-Xa=1,-Xb=2",
            "--lib-gen",
        ]);
        assert_eq!(cli.home, Some(PathBuf::from("/opt/xvsa")));
        let Commands::Run { module, generation } = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(module.name, "app");
        assert_eq!(module.classes.len(), 2);
        assert_eq!(module.classpath, vec![PathBuf::from("/r/a.jar")]);
        assert_eq!(generation.jfe_opts, vec!["-Xa=1", "-Xb=2"]);
        assert!(generation.lib_gen);
        assert!(!generation.ignore_error);
    }

    #[test]
    fn global_options_are_accepted_after_subcommand() {
        let cli = Cli::parse_from([
            "xvsa-jfe",
            "status",
            "--name",
            "app",
            "--output",
            "/out",
        ]);
        assert_eq!(cli.output, Some(PathBuf::from("/out")));
        assert_eq!(cli.log_level, "info");
    }
}
