// src/artifacts/checker.rs

//! Existence and size checks for build output.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::artifacts::manifest::Manifest;
use crate::fs::{FileSystem, RealFileSystem};

/// What a single verification pass found at one manifest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Found { size: u64 },
    Missing,
    /// The path could not be inspected for a reason other than absence
    /// (e.g. permission denied).
    Unreadable { error: String },
}

/// Verification result for one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ReportRepr")]
pub struct ArtifactReport {
    path: PathBuf,
    status: ArtifactStatus,
}

impl ArtifactReport {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> &ArtifactStatus {
        &self.status
    }

    pub fn found(&self) -> bool {
        matches!(self.status, ArtifactStatus::Found { .. })
    }

    /// Byte size; only ever `Some` for found artifacts.
    pub fn size(&self) -> Option<u64> {
        match self.status {
            ArtifactStatus::Found { size } => Some(size),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ArtifactStatus::Unreadable { error } => Some(error),
            _ => None,
        }
    }
}

/// Flat wire shape: `{"path": .., "found": .., "size": ..}`.
#[derive(Serialize)]
struct ReportRepr {
    path: PathBuf,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ArtifactReport> for ReportRepr {
    fn from(report: ArtifactReport) -> Self {
        let found = report.found();
        let size = report.size();
        let error = report.error().map(str::to_string);
        Self {
            path: report.path,
            found,
            size,
            error,
        }
    }
}

/// Checks a manifest against an output directory.
///
/// Only metadata is consulted; file contents are never read. Absence is a
/// normal outcome, so `verify` itself cannot fail.
#[derive(Debug, Clone)]
pub struct ArtifactChecker {
    fs: Arc<dyn FileSystem>,
}

impl Default for ArtifactChecker {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl ArtifactChecker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// One report per manifest entry, in manifest order.
    pub fn verify(&self, root: &Path, manifest: &Manifest) -> Vec<ArtifactReport> {
        if !self.fs.is_dir(root) {
            warn!(
                root = %root.display(),
                "output directory does not exist; every artifact will be missing"
            );
        }

        manifest
            .entries()
            .iter()
            .map(|entry| {
                let status = self.probe(&root.join(&entry.path));
                debug!(
                    path = %entry.path.display(),
                    expected = entry.expected,
                    ?status,
                    "checked artifact"
                );
                ArtifactReport {
                    path: entry.path.clone(),
                    status,
                }
            })
            .collect()
    }

    fn probe(&self, full: &Path) -> ArtifactStatus {
        match self.fs.size_of(full) {
            Ok(size) => ArtifactStatus::Found { size },
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
            {
                ArtifactStatus::Missing
            }
            Err(e) => ArtifactStatus::Unreadable {
                error: e.to_string(),
            },
        }
    }
}

/// Paths of expected entries that were not confirmed present, split into
/// `(missing, unreadable)`. Optional entries never appear here.
pub fn unmet_expectations(
    manifest: &Manifest,
    reports: &[ArtifactReport],
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut missing = Vec::new();
    let mut unreadable = Vec::new();

    for (entry, report) in manifest.entries().iter().zip(reports) {
        if !entry.expected {
            continue;
        }
        match report.status() {
            ArtifactStatus::Found { .. } => {}
            ArtifactStatus::Missing => missing.push(entry.path.clone()),
            ArtifactStatus::Unreadable { .. } => unreadable.push(entry.path.clone()),
        }
    }

    (missing, unreadable)
}
