//! Content hashing and run ids.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use wl_project::schema::Project;

/// Hash of everything that determines a run's outcome.
pub fn compute_content_hash(project: &Project, solver: &str, version: &str) -> String {
    let mut hasher = Sha256::new();

    let project_json = serde_json::to_string(project).unwrap_or_default();
    hasher.update(project_json.as_bytes());
    hasher.update(solver.as_bytes());
    hasher.update(version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

/// `<UTC timestamp>-<12 hex digits of the content hash>`; sorts by start time.
pub fn compute_run_id(started: &DateTime<Utc>, content_hash: &str) -> String {
    let short = content_hash.get(..12).unwrap_or(content_hash);
    format!("{}-{}", started.format("%Y%m%dT%H%M%S%3fZ"), short)
}
