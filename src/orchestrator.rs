//! Per-module generation pass.
//!
//! A module moves through `Idle → InputPrepared → OutputPrepared →
//! ClasspathPrepared → Verified → ApplicationGenerated → LibrariesGenerated →
//! Done`. A failed precondition ends it in `Skipped` without touching sibling
//! modules.
//!
//! Library objects are cached by file name in the shared output directory.
//! The check-then-write is not locked: two modules racing on the same jar are
//! assumed to produce identical objects, and an object left behind by a
//! crashed tool run is reused as if it were complete. A run that reports
//! failure has its object removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::command::ToolCommand;
use crate::config::GenerationConfig;
use crate::error::{GenError, Result};
use crate::filter::SelectionPolicy;
use crate::manifest::write_list;
use crate::naming;
use crate::recorder::SourceFileRecorder;
use crate::runner::{Capture, ProcessRunner};
use crate::scan::expand_sources;

const VERIFY_INPUT: &str = "xvsa.verify.class";
const VERIFY_OUTPUT: &str = "xvsa.dummy.o";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInput {
    pub name: String,
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
    #[serde(default)]
    pub class_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    #[serde(default)]
    pub source_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Idle,
    InputPrepared,
    OutputPrepared,
    ClasspathPrepared,
    Verified,
    ApplicationGenerated,
    LibrariesGenerated,
    Done,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryStatus {
    Generated,
    Cached,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryRecord {
    pub jar: String,
    pub artifact: String,
    pub status: LibraryStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub state: ModuleState,
    pub skip_reason: Option<String>,
    pub tool_skipped: bool,
    pub output: Option<String>,
    pub libraries: Vec<LibraryRecord>,
    /// Library object names, in the order written to `<module>.lib.output.list`.
    pub manifest: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl ModuleReport {
    fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            state: ModuleState::Idle,
            skip_reason: None,
            tool_skipped: false,
            output: None,
            libraries: Vec::new(),
            manifest: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.state == ModuleState::Skipped
    }
}

struct ModuleRun<'a> {
    module: &'a ModuleInput,
    report: ModuleReport,
    started: Instant,
    inputs: BTreeSet<PathBuf>,
    classpath: BTreeSet<PathBuf>,
    output_dir: PathBuf,
    output_file: PathBuf,
}

impl ModuleRun<'_> {
    fn advance(&mut self, state: ModuleState) {
        tracing::debug!(module = %self.module.name, ?state, "module state");
        self.report.state = state;
    }

    fn skip(mut self, reason: impl Into<String>) -> ModuleReport {
        let reason = reason.into();
        tracing::warn!(module = %self.module.name, %reason, "skip module due to preparation failure");
        self.report.state = ModuleState::Skipped;
        self.report.skip_reason = Some(reason);
        self.finish()
    }

    fn finish(mut self) -> ModuleReport {
        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        self.report
    }

    fn inputs_display(&self) -> String {
        self.inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    config: GenerationConfig,
    runner: Arc<dyn ProcessRunner>,
    recorder: Arc<SourceFileRecorder>,
    verified: Mutex<bool>,
}

impl Orchestrator {
    pub fn new(config: GenerationConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config,
            runner,
            recorder: Arc::new(SourceFileRecorder::new()),
            verified: Mutex::new(false),
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<SourceFileRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn recorder(&self) -> &Arc<SourceFileRecorder> {
        &self.recorder
    }

    pub fn is_verified(&self) -> bool {
        *self.verified.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run_module(&self, module: &ModuleInput) -> Result<ModuleReport> {
        tracing::info!(
            module = %module.name,
            tool_root = ?self.config.tool_root,
            ignore_error = self.config.ignore_error,
            "module generation start"
        );
        let mut run = ModuleRun {
            module,
            report: ModuleReport::new(&module.name),
            started: Instant::now(),
            inputs: BTreeSet::new(),
            classpath: BTreeSet::new(),
            output_dir: PathBuf::new(),
            output_file: PathBuf::new(),
        };

        run.inputs = existing_absolute(&module.class_dirs);
        if run.inputs.is_empty() {
            return Ok(run.skip("class input path does not exist"));
        }
        run.advance(ModuleState::InputPrepared);

        if let Err(reason) = self.prepare_output(&mut run) {
            return Ok(run.skip(reason));
        }
        run.advance(ModuleState::OutputPrepared);

        run.classpath = existing_absolute(&module.classpath);
        run.advance(ModuleState::ClasspathPrepared);

        self.dump_module_info(&run)?;
        self.dump_source_list(&run)?;

        if self.config.skip_tool {
            tracing::warn!(module = %module.name, "finishing module without running jfe");
            run.report.tool_skipped = true;
            run.advance(ModuleState::Done);
            return Ok(run.finish());
        }

        let Some(executable) = self.prepare_binary()? else {
            let missing = self
                .config
                .tool_binary()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Ok(run.skip(format!("jfe binary {missing} does not exist")));
        };

        let project_dir = module
            .project_dir
            .clone()
            .unwrap_or_else(|| run.output_dir.clone());
        if !self.ensure_verified(&executable, &project_dir)? {
            return Ok(run.skip("unable to create the option verification input"));
        }
        run.advance(ModuleState::Verified);

        let mut application = ToolCommand::application(
            &executable,
            &run.inputs,
            &run.output_file,
            &run.classpath,
            &self.config.baseline(),
        );
        if self.config.track_tool_sources {
            application.push_arg(SourceFileRecorder::tool_option(&self.config.src_list_path));
        }
        self.execute(&mut run, &application)?;
        run.advance(ModuleState::ApplicationGenerated);

        self.generate_libraries(&mut run, &executable)?;
        run.advance(ModuleState::LibrariesGenerated);

        tracing::info!(
            module = %module.name,
            output = %run.output_file.display(),
            "module generation complete"
        );
        run.advance(ModuleState::Done);
        Ok(run.finish())
    }

    fn prepare_output(&self, run: &mut ModuleRun<'_>) -> std::result::Result<(), String> {
        let output_dir = std::path::absolute(&self.config.output_dir)
            .unwrap_or_else(|_| self.config.output_dir.clone());
        if let Err(err) = std::fs::create_dir_all(&output_dir) {
            tracing::info!(path = %output_dir.display(), error = %err, "cannot create output directory");
        }
        if !output_dir.is_dir() {
            return Err(format!("output directory {} does not exist", output_dir.display()));
        }
        run.output_file = output_dir.join(naming::module_object(&run.module.name));
        run.report.output = Some(run.output_file.display().to_string());
        run.output_dir = output_dir;
        Ok(())
    }

    fn dump_module_info(&self, run: &ModuleRun<'_>) -> Result<()> {
        let dependencies: Vec<String> = run
            .classpath
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        write_list(
            &run.output_dir.join(naming::dependency_list(&run.module.name)),
            &dependencies,
        )?;

        let folders: Vec<String> = run.inputs.iter().map(|p| p.display().to_string()).collect();
        write_list(
            &run.output_dir.join(naming::input_dir_list(&run.module.name)),
            &folders,
        )
    }

    fn dump_source_list(&self, run: &ModuleRun<'_>) -> Result<()> {
        let files = expand_sources(&run.module.source_paths)?;
        let dir = self.config.source_list_dir();
        std::fs::create_dir_all(&dir).map_err(|source| GenError::RecorderWrite {
            path: dir.clone(),
            source,
        })?;
        self.recorder
            .record_module_sources(&dir.join(naming::source_list(&run.module.name)), &files)
    }

    fn prepare_binary(&self) -> Result<Option<PathBuf>> {
        let Some(executable) = self.config.tool_binary() else {
            return Err(GenError::Configuration(
                "xvsa home not set, check the tool root setting".to_string(),
            ));
        };
        if !executable.exists() {
            tracing::warn!(path = %executable.display(), "jfe binary does not exist, check the tool root setting");
            return Ok(None);
        }
        Ok(Some(executable))
    }

    /// Runs the option check once for the lifetime of this orchestrator.
    fn ensure_verified(&self, executable: &Path, project_dir: &Path) -> Result<bool> {
        let mut verified = self.verified.lock().unwrap_or_else(|e| e.into_inner());
        if *verified {
            return Ok(true);
        }

        let input = std::path::absolute(project_dir.join(VERIFY_INPUT))?;
        let output = std::path::absolute(project_dir.join(VERIFY_OUTPUT))?;
        if !input.exists() {
            if let Err(err) = std::fs::File::create(&input) {
                tracing::info!(path = %input.display(), error = %err, "unable to create verification input");
                return Ok(false);
            }
        }

        let cmd = ToolCommand::verify(executable, &input, &output, &self.config.baseline());
        tracing::info!(command = %cmd, "verifying jfe options");
        let outcome = self.runner.run(&cmd, Capture::Stdout);
        if input.exists() {
            let _ = std::fs::remove_file(&input);
        }

        let reason = match outcome {
            Ok(out) if out.success() => {
                *verified = true;
                return Ok(true);
            }
            Ok(out) => out.describe_status(),
            Err(err) => err.to_string(),
        };
        Err(GenError::Verification {
            command: cmd.to_string(),
            reason,
        })
    }

    /// Returns `Ok(false)` for a tool failure that `ignore_error` downgraded.
    fn execute(&self, run: &mut ModuleRun<'_>, cmd: &ToolCommand) -> Result<bool> {
        tracing::info!(module = %run.module.name, command = %cmd, "jfe command");
        let track = self.config.track_tool_sources;
        if track {
            self.recorder.pre_run_gather(&self.config.src_list_path)?;
        }

        let failure = match self.runner.run(cmd, Capture::Inherit) {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.describe_status()),
            Err(err) => Some(err.to_string()),
        };

        let collected = if track {
            self.recorder.post_run_collect(&self.config.src_list_path)
        } else {
            Ok(())
        };

        let Some(reason) = failure else {
            return collected.map(|()| true);
        };

        if run.output_file.exists() {
            let _ = std::fs::remove_file(&run.output_file);
        }
        collected?;
        let err = GenError::ToolFailure {
            module: run.module.name.clone(),
            inputs: run.inputs_display(),
            command: cmd.to_string(),
            reason,
        };
        if self.config.ignore_error {
            tracing::error!(module = %run.module.name, error = %err, "jfe failed, continuing");
            run.report.warnings.push(err.to_string());
            return Ok(false);
        }
        Err(err)
    }

    fn generate_libraries(&self, run: &mut ModuleRun<'_>, executable: &Path) -> Result<()> {
        if !self.config.lib_generation {
            tracing::warn!(module = %run.module.name, "skipping v-table generation for libraries");
            return Ok(());
        }

        let mut command = ToolCommand::library(
            executable,
            &self.config.baseline(),
            &self.config.class_filter,
        );
        let classpath: Vec<PathBuf> = run.classpath.iter().cloned().collect();
        for jar in classpath {
            if !jar.is_file() {
                tracing::warn!(path = %jar.display(), "cannot find one library file");
                continue;
            }
            if !is_library_selected(&self.config.jar_policy, &jar) {
                tracing::debug!(path = %jar.display(), "library not selected");
                continue;
            }

            let artifact = naming::artifact_name_for_path(&jar);
            let location = run.output_dir.join(&artifact);
            let jar_display = jar.display().to_string();

            if location.exists() {
                tracing::warn!(
                    jar = %jar_display,
                    path = %location.display(),
                    "library generated before, using pre-existing object"
                );
                run.report.manifest.push(artifact.clone());
                run.report.libraries.push(LibraryRecord {
                    jar: jar_display,
                    artifact,
                    status: LibraryStatus::Cached,
                });
                continue;
            }

            tracing::info!(jar = %jar_display, path = %location.display(), "generating library");
            command.push_target(&jar, &location);
            let outcome = self.execute(run, &command);
            command.pop_target();
            if !matches!(outcome, Ok(true)) && location.exists() {
                let _ = std::fs::remove_file(&location);
            }

            let status = if outcome? {
                run.report.manifest.push(artifact.clone());
                tracing::info!(jar = %jar_display, "library generation complete");
                LibraryStatus::Generated
            } else {
                LibraryStatus::Failed
            };
            run.report.libraries.push(LibraryRecord {
                jar: jar_display,
                artifact,
                status,
            });
        }

        write_list(
            &run.output_dir.join(naming::library_output_list(&run.module.name)),
            &run.report.manifest,
        )
    }
}

fn is_library_selected(policy: &SelectionPolicy, jar: &Path) -> bool {
    let name = jar
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    policy.is_selected(&name)
}

fn existing_absolute(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths
        .iter()
        .filter(|p| p.exists())
        .filter_map(|p| std::path::absolute(p).ok())
        .collect()
}
