//! Hook resolution.
//!
//! Hook scripts are found by name in a single directory. For an event the
//! resolver tries names from most to least specific:
//!
//! | Order | Name                          | Requires         |
//! |-------|-------------------------------|------------------|
//! | 1     | `{event}-{repository}-{branch}` | repository, branch |
//! | 2     | `all-{repository}-{branch}`     | repository, branch |
//! | 3     | `{event}-{repository}`          | repository       |
//! | 4     | `all-{repository}`              | repository       |
//! | 5     | `{event}`                       |                  |
//! | 6     | `all`                           |                  |
//!
//! Only executable regular files qualify. Every qualifying name then acts as a
//! prefix: further executables whose names start with it ("child hooks", such
//! as `all-lint` for `all`) are appended after the direct matches.
//!
//! The prefix match is plain, so `all` also picks up a file named `allocator`.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::metadata::EventMetadata;

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// Name shared by hooks that run for every event.
pub const ALL_EVENTS: &str = "all";

/// How a hook was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOrigin {
    /// Named directly by one of the candidate patterns
    Direct,
    /// Found by prefix match against a direct hook
    Child,
}

/// A hook script selected for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCandidate {
    pub path: PathBuf,
    pub origin: HookOrigin,
}

impl HookCandidate {
    /// The hook name reported in results: the file name of its path.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Candidate hook names for `metadata`, most specific first.
pub fn candidate_names(metadata: &EventMetadata) -> Vec<String> {
    let event = &metadata.event;
    let mut names = Vec::with_capacity(6);

    if let Some(repository) = metadata.repository_name.as_deref() {
        if let Some(branch) = metadata.branch.as_deref() {
            names.push(format!("{event}-{repository}-{branch}"));
            names.push(format!("{ALL_EVENTS}-{repository}-{branch}"));
        }
        names.push(format!("{event}-{repository}"));
        names.push(format!("{ALL_EVENTS}-{repository}"));
    }
    names.push(event.to_string());
    names.push(ALL_EVENTS.to_string());

    names
}

/// Resolves the ordered, duplicate-free list of hooks to run for `metadata`.
///
/// Returns an empty list when nothing qualifies; a missing hooks directory
/// is not an error.
pub fn resolve(metadata: &EventMetadata, hooks_dir: &Path) -> Vec<HookCandidate> {
    debug!("checking executable hook scripts...");

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    let mut prefixes = Vec::new();

    for name in candidate_names(metadata) {
        if !is_contained_name(&name) {
            warn!(hook = %name, "ignoring hook name escaping the hooks directory");
            continue;
        }

        let path = hooks_dir.join(&name);
        if is_executable_file(&path) && seen.insert(path.clone()) {
            resolved.push(HookCandidate {
                path,
                origin: HookOrigin::Direct,
            });
            prefixes.push(name);
        }
    }

    debug!("checking executable hook scripts...done.");

    if resolved.is_empty() {
        return resolved;
    }

    debug!("checking executable child hook scripts...");
    for prefix in &prefixes {
        for path in child_hooks(hooks_dir, prefix) {
            if seen.insert(path.clone()) {
                debug!(hook = %path.display(), "adding child hook");
                resolved.push(HookCandidate {
                    path,
                    origin: HookOrigin::Child,
                });
            }
        }
    }
    debug!("checking executable child hook scripts...done.");

    resolved
}

/// Executable files in `hooks_dir` whose names start with `prefix`, in name order.
fn child_hooks(hooks_dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(hooks_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                hooks_path = %hooks_dir.display(),
                error = %e,
                "failed to list hooks directory"
            );
            return Vec::new();
        }
    };

    let mut children: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .filter(|path| is_executable_file(path))
        .collect();
    children.sort();
    children
}

/// Rejects names that would leave the hooks directory once joined to it.
fn is_contained_name(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

/// Returns `true` for a regular file with at least one execute bit set.
#[cfg(unix)]
pub fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
