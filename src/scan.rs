use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Expands declared source paths into absolute `.java` file paths.
///
/// Files are taken as-is, directories are walked; paths that do not exist are
/// dropped.
pub fn expand_sources(paths: &[PathBuf]) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    for path in paths {
        let abs = std::path::absolute(path)?;
        if abs.is_file() {
            files.push(abs.to_string_lossy().to_string());
        } else if abs.is_dir() {
            let mut found = walk_with_extension(&abs, "java");
            found.sort();
            files.extend(found.into_iter().map(|p| p.to_string_lossy().to_string()));
        } else {
            tracing::info!(path = %abs.display(), "invalid source path");
        }
    }
    Ok(files)
}

pub fn scan_jars(base_path: &Path) -> io::Result<Vec<PathBuf>> {
    let base = std::path::absolute(base_path)?;
    let mut jars = walk_with_extension(&base, "jar");
    jars.sort();
    Ok(jars)
}

fn walk_with_extension(base_path: &Path, extension: &'static str) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|e| e == extension) {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    rx.iter().collect()
}
