//! Command lines for the `mapfej` front-end.
//!
//! Token order matters to the tool; extra options always follow the fixed
//! baseline so a later duplicate overrides it on the tool side.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::filter::ClassFilter;

const ALLOW_PHANTOM_REFS: &str = "-allow-phantom-refs=true";
const INPUT_CLASS: &str = "-fC,";
const INPUT_DIR: &str = "-fD,";
const OUTPUT_OBJECT: &str = "-fB,";
const CLASSPATH: &str = "-cp=";
const HELP: &str = "-h";
const VTABLE: &str = "-VTABLE=true";
const LIB_GEN_ONLY: &str = "-libGenOnly=true";
const LIB_FILTER_MODE: &str = "-libFilterBlackList=";
const LIB_FILTER: &str = "-libFilter=";

/// Baseline options shared by every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineOptions {
    pub extra: Vec<String>,
}

impl BaselineOptions {
    pub fn new(extra: Vec<String>) -> Self {
        Self { extra }
    }

    fn append_to(&self, tokens: &mut Vec<String>) {
        tokens.push(ALLOW_PHANTOM_REFS.to_string());
        tokens.extend(self.extra.iter().cloned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    tokens: Vec<String>,
}

impl ToolCommand {
    fn start(executable: &Path) -> Self {
        Self {
            tokens: vec![executable.to_string_lossy().to_string()],
        }
    }

    /// Cheap syntax check of the extra options; `-h` keeps the tool from doing real work.
    pub fn verify(
        executable: &Path,
        input: &Path,
        output: &Path,
        baseline: &BaselineOptions,
    ) -> Self {
        let mut cmd = Self::start(executable);
        cmd.push_path(INPUT_CLASS, input);
        cmd.push_path(OUTPUT_OBJECT, output);
        baseline.append_to(&mut cmd.tokens);
        cmd.tokens.push(HELP.to_string());
        cmd
    }

    pub fn application(
        executable: &Path,
        input_dirs: &BTreeSet<PathBuf>,
        output: &Path,
        classpath: &BTreeSet<PathBuf>,
        baseline: &BaselineOptions,
    ) -> Self {
        let mut cmd = Self::start(executable);
        for dir in input_dirs {
            cmd.push_path(INPUT_DIR, dir);
            cmd.push_path(CLASSPATH, dir);
        }
        cmd.push_path(OUTPUT_OBJECT, output);
        for entry in classpath {
            cmd.push_path(CLASSPATH, entry);
        }
        baseline.append_to(&mut cmd.tokens);
        cmd
    }

    /// Shared prefix of every library invocation; see [`ToolCommand::push_target`].
    pub fn library(executable: &Path, baseline: &BaselineOptions, filter: &ClassFilter) -> Self {
        let mut cmd = Self::start(executable);
        baseline.append_to(&mut cmd.tokens);
        cmd.tokens.push(VTABLE.to_string());
        cmd.tokens.push(LIB_GEN_ONLY.to_string());
        cmd.tokens.push(format!("{LIB_FILTER_MODE}{}", filter.deny_list));
        for prefix in &filter.prefixes {
            cmd.tokens.push(format!("{LIB_FILTER}{prefix}"));
        }
        cmd
    }

    pub fn push_target(&mut self, jar: &Path, output: &Path) {
        self.push_path(INPUT_CLASS, jar);
        self.push_path(OUTPUT_OBJECT, output);
    }

    pub fn pop_target(&mut self) {
        let keep = self.tokens.len().saturating_sub(2).max(1);
        self.tokens.truncate(keep);
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.tokens.push(arg.into());
    }

    fn push_path(&mut self, option: &str, path: &Path) {
        self.tokens.push(format!("{option}{}", path.display()));
    }

    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}
