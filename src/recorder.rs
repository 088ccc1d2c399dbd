//! Source-file list recorder.
//!
//! Source lists are JSON arrays of absolute paths. A list found on disk is a
//! one-shot work item: it is folded into the in-memory accumulation and the
//! file removed. Persisting writes the deduplicated union back out and clears
//! the accumulation.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::error::{GenError, Result};

const TOOL_OPTION_PREFIX: &str = "-srcPathOutput,";

#[derive(Debug, Default)]
pub struct SourceFileRecorder {
    pending: Mutex<Vec<Vec<String>>>,
}

impl SourceFileRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<String>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of lists waiting to be persisted.
    pub fn pending_lists(&self) -> usize {
        self.lock().len()
    }

    pub fn load_and_consume(&self, path: &Path) -> Result<()> {
        let mut pending = self.lock();
        consume_into(&mut pending, path)
    }

    pub fn merge_and_persist(&self, path: &Path, extra: &[String]) -> Result<()> {
        let mut pending = self.lock();
        persist_from(&mut pending, path, extra)
    }

    /// Folds a list left behind by an earlier run into the accumulation.
    pub fn pre_run_gather(&self, path: &Path) -> Result<()> {
        let path = absolute(path);
        let mut pending = self.lock();
        if path.exists() {
            tracing::info!(path = %path.display(), "saving pre-existing source list before jfe run");
            consume_into(&mut pending, &path)?;
        }
        if !path.parent().is_some_and(is_writable_dir) {
            return Err(GenError::Configuration(format!(
                "cannot write to the source list: {}",
                path.display()
            )));
        }
        Ok(())
    }

    /// Picks up the list the tool wrote and saves the merged union in its place.
    pub fn post_run_collect(&self, path: &Path) -> Result<()> {
        let path = absolute(path);
        let mut pending = self.lock();
        if path.exists() {
            consume_into(&mut pending, &path)?;
        } else {
            tracing::warn!(path = %path.display(), "source list does not exist after jfe run");
        }
        tracing::info!(lists = pending.len(), "recovering source list");
        persist_from(&mut pending, &path, &[])
    }

    /// Writes one module's own list. Lists gathered for other destinations
    /// stay pending.
    pub fn record_module_sources(&self, path: &Path, files: &[String]) -> Result<()> {
        tracing::info!(path = %path.display(), files = files.len(), "dumping source list");
        let _pending = self.lock();
        persist_from(&mut Vec::new(), path, files)
    }

    pub fn tool_option(path: &Path) -> String {
        format!("{TOOL_OPTION_PREFIX}{}", absolute(path).display())
    }
}

fn consume_into(pending: &mut Vec<Vec<String>>, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| GenError::RecorderRead {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(list) = parse_list(&raw) else {
        tracing::warn!(
            path = %path.display(),
            "previous source list is empty or not a JSON array, skipping"
        );
        return Ok(());
    };

    tracing::info!(
        path = %path.display(),
        files = list.len(),
        lists = pending.len() + 1,
        "added existing source list"
    );
    pending.push(list);

    std::fs::remove_file(path).map_err(|source| GenError::RecorderDelete {
        path: path.to_path_buf(),
        source,
    })
}

fn persist_from(pending: &mut Vec<Vec<String>>, path: &Path, extra: &[String]) -> Result<()> {
    let merged: BTreeSet<&str> = pending
        .iter()
        .flatten()
        .chain(extra.iter())
        .map(String::as_str)
        .collect();
    let json = serde_json::to_string(&merged).map_err(|e| GenError::RecorderWrite {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    pending.clear();

    std::fs::write(path, json).map_err(|source| GenError::RecorderWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_list(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Permission bits say nothing about this process, so create and remove a
/// scratch file instead.
fn is_writable_dir(dir: &Path) -> bool {
    static CHECKS: AtomicU64 = AtomicU64::new(0);
    if !dir.is_dir() {
        return false;
    }
    let scratch = dir.join(format!(
        ".xvsa-write-check-{}-{}",
        std::process::id(),
        CHECKS.fetch_add(1, Ordering::Relaxed)
    ));
    match OpenOptions::new().write(true).create_new(true).open(&scratch) {
        Ok(_) => {
            let _ = std::fs::remove_file(&scratch);
            true
        }
        Err(err) => {
            tracing::debug!(path = %dir.display(), error = %err, "directory is not writable");
            false
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "xvsa_jfe_recorder_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn read_list(path: &Path) -> Vec<String> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn merge_yields_deduplicated_union_of_all_lists() -> anyhow::Result<()> {
        let base = temp_dir("union");
        let a = base.join("a.json");
        let b = base.join("b.json");
        let out = base.join("sources.json");
        std::fs::write(&a, r#"["/s/A.java","/s/B.java"]"#)?;
        std::fs::write(&b, r#"["/s/B.java","/s/C.java","/s/A.java"]"#)?;

        let recorder = SourceFileRecorder::new();
        recorder.load_and_consume(&b)?;
        recorder.load_and_consume(&a)?;
        assert_eq!(recorder.pending_lists(), 2);
        assert!(!a.exists());
        assert!(!b.exists());

        recorder.merge_and_persist(&out, &strings(&["/s/D.java", "/s/A.java"]))?;
        assert_eq!(recorder.pending_lists(), 0);
        assert_eq!(
            read_list(&out),
            strings(&["/s/A.java", "/s/B.java", "/s/C.java", "/s/D.java"])
        );

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn missing_file_is_a_no_op() -> anyhow::Result<()> {
        let base = temp_dir("missing");
        let recorder = SourceFileRecorder::new();
        recorder.load_and_consume(&base.join("nope.json"))?;
        assert_eq!(recorder.pending_lists(), 0);
        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn malformed_list_is_skipped_softly() -> anyhow::Result<()> {
        let base = temp_dir("malformed");
        let bad = base.join("bad.json");
        let empty = base.join("empty.json");
        let object = base.join("object.json");
        std::fs::write(&bad, "[\"/s/A.java\",")?;
        std::fs::write(&empty, "")?;
        std::fs::write(&object, r#"{"a":1}"#)?;

        let recorder = SourceFileRecorder::new();
        recorder.load_and_consume(&bad)?;
        recorder.load_and_consume(&empty)?;
        recorder.load_and_consume(&object)?;
        assert_eq!(recorder.pending_lists(), 0);

        let out = base.join("out.json");
        recorder.merge_and_persist(&out, &[])?;
        assert_eq!(std::fs::read_to_string(&out)?, "[]");

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn non_string_entries_are_ignored() -> anyhow::Result<()> {
        let base = temp_dir("mixed");
        let list = base.join("mixed.json");
        std::fs::write(&list, r#"["/s/A.java", 3, null, {"x":1}, "/s/B.java"]"#)?;

        let recorder = SourceFileRecorder::new();
        recorder.load_and_consume(&list)?;
        let out = base.join("out.json");
        recorder.merge_and_persist(&out, &[])?;
        assert_eq!(read_list(&out), strings(&["/s/A.java", "/s/B.java"]));

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn repeated_persist_is_byte_identical() -> anyhow::Result<()> {
        let base = temp_dir("idempotent");
        let out = base.join("sources.json");
        let recorder = SourceFileRecorder::new();
        let files = strings(&["/s/Z.java", "/s/A.java", "/s/Z.java"]);

        recorder.merge_and_persist(&out, &files)?;
        let first = std::fs::read(&out)?;
        recorder.merge_and_persist(&out, &files)?;
        assert_eq!(first, std::fs::read(&out)?);

        recorder.post_run_collect(&out)?;
        let collected = std::fs::read(&out)?;
        recorder.post_run_collect(&out)?;
        assert_eq!(collected, std::fs::read(&out)?);
        assert_eq!(first, collected);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn pre_and_post_run_keep_sources_from_both_runs() -> anyhow::Result<()> {
        let base = temp_dir("around_run");
        let out = base.join("sources.json");
        std::fs::write(&out, r#"["/s/Old.java"]"#)?;

        let recorder = SourceFileRecorder::new();
        recorder.pre_run_gather(&out)?;
        assert!(!out.exists());

        // The tool writes a fresh list during its run.
        std::fs::write(&out, r#"["/s/New.java","/s/Old.java"]"#)?;
        recorder.post_run_collect(&out)?;
        assert_eq!(read_list(&out), strings(&["/s/New.java", "/s/Old.java"]));

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn module_list_written_mid_run_keeps_gathered_sources() -> anyhow::Result<()> {
        let base = temp_dir("interleaved");
        let shared = base.join("sources.json");
        let module_list = base.join("b.src.list");
        std::fs::write(&shared, r#"["/s/Old.java"]"#)?;

        let recorder = SourceFileRecorder::new();
        recorder.pre_run_gather(&shared)?;
        recorder.record_module_sources(&module_list, &strings(&["/b/B.java"]))?;
        assert_eq!(recorder.pending_lists(), 1);

        std::fs::write(&shared, r#"["/s/New.java"]"#)?;
        recorder.post_run_collect(&shared)?;

        assert_eq!(read_list(&shared), strings(&["/s/New.java", "/s/Old.java"]));
        assert_eq!(read_list(&module_list), strings(&["/b/B.java"]));

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn pre_run_rejects_directory_this_process_cannot_write() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let base = temp_dir("read_only");
        let locked = base.join("locked");
        std::fs::create_dir_all(&locked)?;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555))?;

        // Privileged users write through the mode bits; nothing to assert then.
        let bypass = locked.join("bypass");
        if std::fs::write(&bypass, "").is_ok() {
            let _ = std::fs::remove_file(&bypass);
        } else {
            let recorder = SourceFileRecorder::new();
            let err = recorder
                .pre_run_gather(&locked.join("sources.json"))
                .unwrap_err();
            assert!(matches!(err, GenError::Configuration(_)));
        }

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))?;
        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn write_check_leaves_no_scratch_files() -> anyhow::Result<()> {
        let base = temp_dir("scratch");
        assert!(is_writable_dir(&base));
        assert!(!is_writable_dir(&base.join("missing")));
        assert_eq!(std::fs::read_dir(&base)?.count(), 0);
        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn pre_run_rejects_missing_parent_directory() {
        let base = temp_dir("no_parent");
        let recorder = SourceFileRecorder::new();
        let err = recorder
            .pre_run_gather(&base.join("missing").join("sources.json"))
            .unwrap_err();
        assert!(matches!(err, GenError::Configuration(_)));
        let _ = std::fs::remove_dir_all(base);
    }

    #[test]
    fn persist_into_missing_directory_fails_with_write_error() {
        let base = temp_dir("write_fail");
        let recorder = SourceFileRecorder::new();
        let err = recorder
            .merge_and_persist(&base.join("missing").join("out.json"), &strings(&["/a"]))
            .unwrap_err();
        assert!(matches!(err, GenError::RecorderWrite { .. }));
        assert_eq!(recorder.pending_lists(), 0);
        let _ = std::fs::remove_dir_all(base);
    }

    #[test]
    fn concurrent_callers_lose_no_paths() -> anyhow::Result<()> {
        let base = temp_dir("concurrent");
        let recorder = Arc::new(SourceFileRecorder::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let recorder = Arc::clone(&recorder);
            let list = base.join(format!("list-{i}.json"));
            std::fs::write(&list, format!(r#"["/s/F{i}.java","/s/Shared.java"]"#))?;
            handles.push(std::thread::spawn(move || recorder.load_and_consume(&list)));
        }
        for handle in handles {
            handle.join().expect("recorder thread panicked")?;
        }

        let out = base.join("all.json");
        recorder.merge_and_persist(&out, &[])?;
        assert_eq!(read_list(&out).len(), 9);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn tool_option_points_at_absolute_path() {
        let option = SourceFileRecorder::tool_option(Path::new("build/sources.json"));
        assert!(option.starts_with("-srcPathOutput,"));
        let path = option.trim_start_matches("-srcPathOutput,");
        assert!(Path::new(path).is_absolute());
        assert!(path.ends_with("sources.json"));
    }
}
