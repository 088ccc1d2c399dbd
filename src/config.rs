//! Generation settings.
//!
//! Each setting comes from the command line first, then from the `XVSA_*`
//! environment variables the Gradle plugin reads, then from a default under
//! the project directory.

use anyhow::{Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, GenerationArgs};
use crate::command::BaselineOptions;
use crate::filter::{ClassFilter, SelectionPolicy};

pub const ENV_HOME: &str = "XVSA_HOME";
pub const ENV_OUTPUT: &str = "XVSA_GRADLE_OUTPUT";
pub const ENV_SRC_LIST: &str = "XVSA_SRC_LIST";
pub const ENV_JFE_OPT: &str = "XVSA_JFE_OPT";
pub const ENV_LIB_GEN: &str = "XVSA_LIB_GEN";
pub const ENV_LIB_JAR_FILTER: &str = "XVSA_LIB_JAR_FILTER";
pub const ENV_LIB_CLASS_FILTER: &str = "XVSA_LIB_CLASS_FILTER";
pub const ENV_IGNORE_ERROR: &str = "XVSA_IGNORE_ERROR";
pub const ENV_JFE_SKIP: &str = "XVSA_JFE_SKIP";

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub tool_root: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub src_list_path: PathBuf,
    pub extra_options: Vec<String>,
    pub lib_generation: bool,
    pub jar_policy: SelectionPolicy,
    pub class_filter: ClassFilter,
    pub ignore_error: bool,
    pub skip_tool: bool,
    pub track_tool_sources: bool,
}

impl GenerationConfig {
    pub fn new(output_dir: PathBuf, src_list_path: PathBuf) -> Self {
        Self {
            tool_root: None,
            output_dir,
            src_list_path,
            extra_options: Vec::new(),
            lib_generation: false,
            jar_policy: SelectionPolicy::default(),
            class_filter: ClassFilter::default(),
            ignore_error: false,
            skip_tool: false,
            track_tool_sources: false,
        }
    }

    pub fn tool_binary(&self) -> Option<PathBuf> {
        self.tool_root
            .as_ref()
            .map(|root| root.join("lib").join("1.0").join("mapfej"))
    }

    pub fn baseline(&self) -> BaselineOptions {
        BaselineOptions::new(self.extra_options.clone())
    }

    /// Directory holding per-module `.src.list` files.
    pub fn source_list_dir(&self) -> PathBuf {
        if self.src_list_path.is_dir() {
            return self.src_list_path.clone();
        }
        match self.src_list_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

pub fn default_output_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("build").join("target")
}

pub fn default_src_list_path(project_dir: &Path) -> PathBuf {
    project_dir.join("build").join("sources.json")
}

pub fn resolve_output_dir(
    cli: &Cli,
    project_dir: &Path,
    env: &impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(p) = cli.output.clone() {
        return p;
    }
    if let Some(p) = env(ENV_OUTPUT) {
        return PathBuf::from(p);
    }
    default_output_dir(project_dir)
}

pub fn resolve_config(
    cli: &Cli,
    args: &GenerationArgs,
    project_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<GenerationConfig> {
    let skip_tool = args.skip_jfe || env_flag(&env, ENV_JFE_SKIP);

    let tool_root = cli.home.clone().or_else(|| env(ENV_HOME).map(PathBuf::from));
    if tool_root.is_none() && !skip_tool {
        bail!("xvsa home not set, use --home or {ENV_HOME}");
    }

    let output_dir = resolve_output_dir(cli, project_dir, &env);

    let src_list_path = match cli.src_list.clone() {
        Some(p) => p,
        None => env(ENV_SRC_LIST)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_src_list_path(project_dir)),
    };
    let src_list_path = std::path::absolute(&src_list_path).unwrap_or(src_list_path);

    let mut extra_options = args.jfe_opts.clone();
    if extra_options.is_empty() {
        extra_options = env_list(&env, ENV_JFE_OPT);
    }

    let mut lib_jar_filter = args.lib_jar_filter.clone();
    if lib_jar_filter.is_empty() {
        lib_jar_filter = env_list(&env, ENV_LIB_JAR_FILTER);
    }

    let mut lib_class_filter = args.lib_class_filter.clone();
    if lib_class_filter.is_empty() {
        lib_class_filter = env_list(&env, ENV_LIB_CLASS_FILTER);
    }

    Ok(GenerationConfig {
        tool_root,
        output_dir,
        src_list_path,
        extra_options,
        lib_generation: args.lib_gen || env_flag(&env, ENV_LIB_GEN),
        jar_policy: SelectionPolicy::new(args.exclude_all_libs, lib_jar_filter),
        class_filter: ClassFilter {
            deny_list: true,
            prefixes: lib_class_filter,
        },
        ignore_error: args.ignore_error || env_flag(&env, ENV_IGNORE_ERROR),
        skip_tool,
        track_tool_sources: args.track_sources,
    })
}

fn env_flag(env: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    env(key).is_some_and(|v| v == "true" || v == "1")
}

fn env_list(env: &impl Fn(&str) -> Option<String>, key: &str) -> Vec<String> {
    env(key)
        .map(|v| {
            v.split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
