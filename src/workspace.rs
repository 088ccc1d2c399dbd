//! Multi-module plans.
//!
//! Modules of one plan share an orchestrator, so option verification happens
//! once and library objects land in one output directory. A module error is
//! recorded and its siblings keep going; a verification failure stops the
//! whole plan.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::GenError;
use crate::orchestrator::{ModuleInput, ModuleReport, Orchestrator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspacePlan {
    pub modules: Vec<ModuleInput>,
}

impl WorkspacePlan {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workspace plan: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse workspace plan: {}", path.display()))
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ModuleOutcome {
    Completed(ModuleReport),
    Failed { module: String, error: String },
    NotRun { module: String },
}

impl ModuleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ModuleOutcome::Failed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceReport {
    pub modules: Vec<ModuleOutcome>,
    pub aborted: bool,
}

impl WorkspaceReport {
    pub fn failed_modules(&self) -> usize {
        self.modules.iter().filter(|m| m.is_failure()).count()
    }
}

pub fn run_plan(orchestrator: &Orchestrator, plan: &WorkspacePlan, parallel: bool) -> WorkspaceReport {
    let aborted = AtomicBool::new(false);
    let run_one = |module: &ModuleInput| -> ModuleOutcome {
        if aborted.load(Ordering::SeqCst) {
            return ModuleOutcome::NotRun {
                module: module.name.clone(),
            };
        }
        match orchestrator.run_module(module) {
            Ok(report) => ModuleOutcome::Completed(report),
            Err(err) => record_failure(&aborted, module, err),
        }
    };

    let modules = if parallel {
        plan.modules.par_iter().map(run_one).collect()
    } else {
        plan.modules.iter().map(run_one).collect()
    };

    WorkspaceReport {
        modules,
        aborted: aborted.load(Ordering::SeqCst),
    }
}

fn record_failure(aborted: &AtomicBool, module: &ModuleInput, err: GenError) -> ModuleOutcome {
    if err.is_run_fatal() {
        aborted.store(true, Ordering::SeqCst);
        tracing::error!(module = %module.name, error = %err, "aborting remaining modules");
    } else {
        tracing::error!(module = %module.name, error = %err, "module failed");
    }
    ModuleOutcome::Failed {
        module: module.name.clone(),
        error: err.to_string(),
    }
}
