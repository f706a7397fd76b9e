use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use spydom_core::Target;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::RunSummary;

pub const REPORT_FILENAME: &str = "report.json";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    generated_utc: String,
    dispatched: usize,
    completed: usize,
    abandoned: usize,
    task_failures: usize,
    interrupted: bool,
    targets: Vec<TargetEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct TargetEntry<'a> {
    url: &'a str,
    directory: String,
    status: Status,
    artifacts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Completed,
    Abandoned,
    Pending,
}

/// Summarize the output tree into `{output_dir}/report.json`.
pub fn write_report(
    output_dir: &Path,
    targets: &[Target],
    summary: &RunSummary,
) -> Result<PathBuf, ReportError> {
    let completed: HashSet<&Target> = summary.completed_targets.iter().collect();
    let abandoned: HashSet<&Target> = summary.abandoned_targets.iter().collect();
    let target_dirs: HashSet<String> = targets.iter().map(Target::output_dir_name).collect();

    let mut entries = Vec::with_capacity(targets.len());
    for target in targets {
        let directory = target.output_dir_name();
        let root = output_dir.join(&directory);
        let artifacts = if root.is_dir() {
            let mut found = BTreeSet::new();
            collect_artifacts(output_dir, &root, &root, &target_dirs, &mut found)?;
            found.into_iter().collect()
        } else {
            Vec::new()
        };
        let status = if abandoned.contains(target) {
            Status::Abandoned
        } else if completed.contains(target) {
            Status::Completed
        } else {
            Status::Pending
        };
        entries.push(TargetEntry {
            url: target.as_str(),
            directory,
            status,
            artifacts,
        });
    }

    let report = Report {
        generated_utc: Utc::now().to_rfc3339(),
        dispatched: summary.dispatched,
        completed: summary.completed,
        abandoned: summary.abandoned,
        task_failures: summary.task_failures,
        interrupted: summary.interrupted,
        targets: entries,
    };

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let path = writer.write(REPORT_FILENAME, serde_json::to_string_pretty(&report)?)?;
    Ok(path)
}

/// Files under `dir`, relative to `base`, skipping directories that belong to other targets.
fn collect_artifacts(
    output_dir: &Path,
    base: &Path,
    dir: &Path,
    target_dirs: &HashSet<String>,
    found: &mut BTreeSet<String>,
) -> Result<(), ReportError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let owner = relative(output_dir, &path);
            if !target_dirs.contains(&owner) {
                collect_artifacts(output_dir, base, &path, target_dirs, found)?;
            }
        } else {
            found.insert(relative(base, &path));
        }
    }
    Ok(())
}

fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
