//! Payload backup.
//!
//! When a backup directory is configured and exists, every parsed payload is
//! copied to `{backup_dir}/{YYYYmmdd-HHMMSS}-{event}.json`. Backups are best
//! effort: a failure is logged and the request carries on.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;

/// Writes `payload` into `backup_dir`, returning the created file.
pub fn backup_payload(backup_dir: Option<&Path>, event: &str, payload: &Value) -> Option<PathBuf> {
    let Some(backup_dir) = backup_dir.filter(|dir| dir.is_dir()) else {
        info!("backup not created; backup path not given or invalid");
        return None;
    };

    let file_name = format!(
        "{}-{}.json",
        Local::now().format("%Y%m%d-%H%M%S"),
        sanitize_event(event)
    );
    let path = backup_dir.join(file_name);
    debug!(backup_file = %path.display(), "backup file set");

    let written = serde_json::to_vec(payload)
        .map_err(std::io::Error::from)
        .and_then(|bytes| fs::write(&path, bytes));

    match written {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(backup_file = %path.display(), error = %e, "failed to write payload backup");
            None
        }
    }
}

/// Keeps the event name usable as part of a file name.
fn sanitize_event(event: &str) -> String {
    event
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
