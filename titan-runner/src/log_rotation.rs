//! Size cap for the launch diagnostics log.
//!
//! `titan.log` only ever grows by appends from the runner. At startup the
//! front end calls [`cap_log_file`]; once the file reaches
//! [`MAX_LOG_BYTES`] it is truncated to zero and starts over.

use std::fs;
use std::io;
use std::path::Path;

/// Truncation threshold for `titan.log`.
pub const MAX_LOG_BYTES: u64 = 5_000_000;

/// Truncate `log_path` if its size is at least `max_bytes`.
///
/// Returns `true` if the file was truncated, `false` if it was under the
/// threshold or did not exist yet.
///
/// # Errors
/// Returns `io::Error` only on unexpected filesystem failures; a missing
/// file is silently skipped.
pub fn cap_log_file(log_path: &Path, max_bytes: u64) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if size < max_bytes {
        return Ok(false);
    }

    fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(log_path)?;
    Ok(true)
}

/// Cap `<home>/.titan/titan.log`. Failures are logged, never fatal.
pub fn cap_logs(home: &Path) {
    let log_path = titan_core::paths::log_path(home);
    match cap_log_file(&log_path, MAX_LOG_BYTES) {
        Ok(true) => tracing::info!(path = %log_path.display(), "log file truncated"),
        Ok(false) => {}
        Err(err) => {
            tracing::warn!(path = %log_path.display(), error = %err, "unable to cap log file")
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
