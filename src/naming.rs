//! Output file naming.
//!
//! Library artifact names must be stable across processes: modules built
//! independently share one output directory and find each other's artifacts
//! by name alone.

use std::path::Path;

pub const OBJECT_SUFFIX: &str = ".o";
const DEFAULT_MODULE_NAME: &str = "output";

/// Maps a dependency path to the file name of its library object.
///
/// Only the final path segment is used; every `.` and `:` becomes `-`.
pub fn artifact_name(identifier: &str) -> String {
    let file_name = identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier);
    format!("{}{OBJECT_SUFFIX}", file_name.replace(['.', ':'], "-"))
}

pub fn artifact_name_for_path(jar: &Path) -> String {
    artifact_name(&jar.to_string_lossy())
}

fn module_stem(module: &str) -> &str {
    if module.is_empty() {
        DEFAULT_MODULE_NAME
    } else {
        module
    }
}

pub fn module_object(module: &str) -> String {
    format!("{}{OBJECT_SUFFIX}", module_stem(module))
}

pub fn dependency_list(module: &str) -> String {
    format!("{}.lib.list", module_stem(module))
}

pub fn input_dir_list(module: &str) -> String {
    format!("{}.dir.list", module_stem(module))
}

pub fn library_output_list(module: &str) -> String {
    format!("{}.lib.output.list", module_stem(module))
}

pub fn source_list(module: &str) -> String {
    format!("{}.src.list", module_stem(module))
}
