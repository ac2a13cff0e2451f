//! Directory helpers shared by discovery and the format loaders.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::aggregate::{TraceFormat, AVERAGE_DIR};

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Display label: the first three `_` tokens of the directory name. An
/// `average` directory takes its parent's label with an `avg` suffix.
pub fn experiment_label(dir: &Path) -> String {
    let short = |p: &Path| {
        file_name(p)
            .map(|n| n.split('_').take(3).collect::<Vec<_>>().join("_"))
            .unwrap_or_else(|| p.display().to_string())
    };

    match (file_name(dir), dir.parent()) {
        (Some(AVERAGE_DIR), Some(parent)) if file_name(parent).is_some() => format!("{}_avg", short(parent)),
        _ => short(dir),
    }
}

/// `dir/name` when it is a regular file.
pub fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let path = dir.join(name);
    path.is_file().then_some(path)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// First file (in sorted order, files before subdirectories) under `dir`
/// whose name satisfies `matches`. `average` subdirectories belong to
/// their own experiment and are not searched.
pub fn find_file(dir: &Path, matches: fn(&str) -> bool) -> io::Result<Option<PathBuf>> {
    let entries = sorted_entries(dir)?;

    if let Some(hit) = entries
        .iter()
        .find(|p| p.is_file() && file_name(p).is_some_and(matches))
    {
        return Ok(Some(hit.clone()));
    }

    for sub in entries.iter().filter(|p| p.is_dir() && file_name(p) != Some(AVERAGE_DIR)) {
        match find_file(sub, matches) {
            Ok(Some(hit)) => return Ok(Some(hit)),
            Ok(None) => {}
            Err(e) => log::warn!("cannot search {}: {}", sub.display(), e),
        }
    }
    Ok(None)
}

fn holds_trace(dir: &Path) -> io::Result<bool> {
    Ok(sorted_entries(dir)?.iter().any(|p| {
        p.is_file() && file_name(p).is_some_and(|n| TraceFormat::ALL.iter().any(|f| f.recognizes(n)))
    }))
}

/// Every directory under `root` (including `root`) that directly holds a
/// recognized trace file or is named `average`, sorted by path.
///
/// Below a per-event experiment only `average` children are visited: its
/// other subdirectories are searched by its own loaders.
pub fn discover_experiments(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let is_average = file_name(&dir) == Some(AVERAGE_DIR);
        let owns_subdirs = match holds_trace(&dir) {
            Ok(true) => {
                found.push(dir.clone());
                !is_average
            }
            Ok(false) if is_average => {
                found.push(dir.clone());
                false
            }
            Ok(false) => false,
            Err(e) if dir == root => return Err(e),
            Err(e) => {
                log::warn!("skipping {}: {}", dir.display(), e);
                continue;
            }
        };
        match sorted_entries(&dir) {
            Ok(entries) => pending.extend(
                entries
                    .into_iter()
                    .filter(|p| p.is_dir())
                    .filter(|p| !owns_subdirs || file_name(p) == Some(AVERAGE_DIR)),
            ),
            Err(e) => log::warn!("cannot list {}: {}", dir.display(), e),
        }
    }

    found.sort();
    Ok(found)
}
