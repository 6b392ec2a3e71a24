//! Recursive definition-directory walking shared by the registry and the
//! graph loader.

use std::fs;
use std::path::Path;

use bluegraph_common::{GraphError, GraphErrorKind};

/// Visit every file under `dir` (recursively) whose extension matches
/// `ext`, in path-sorted order so repeated loads see files in the same
/// sequence. Rejects `dir` if it is not a directory.
pub(crate) fn walk_files<F>(dir: &Path, ext: &str, visit: &mut F) -> Result<(), GraphError>
where
    F: FnMut(&Path, Vec<u8>) -> Result<(), GraphError>,
{
    let meta = fs::metadata(dir).map_err(|e| {
        GraphError::new(GraphErrorKind::Io)
            .with_message(format!("failed to access path {}: {e}", dir.display()))
    })?;
    if !meta.is_dir() {
        return Err(GraphError::new(GraphErrorKind::Io)
            .with_message(format!("{} is not a directory", dir.display())));
    }
    walk_dir(dir, ext, visit)
}

fn walk_dir<F>(dir: &Path, ext: &str, visit: &mut F) -> Result<(), GraphError>
where
    F: FnMut(&Path, Vec<u8>) -> Result<(), GraphError>,
{
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(GraphError::from)?
        .collect::<Result<_, _>>()
        .map_err(GraphError::from)?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, ext, visit)?;
        } else if path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)) {
            let bytes = fs::read(&path).map_err(GraphError::from)?;
            visit(&path, bytes)?;
        }
    }
    Ok(())
}
