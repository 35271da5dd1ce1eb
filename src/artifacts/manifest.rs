// src/artifacts/manifest.rs

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::errors::{DevtoolError, Result};
use crate::fs::FileSystem;

/// Entry document served for every unmatched route by the static asset
/// server (single-page-application fallback).
pub const DEFAULT_ENTRY_DOCUMENT: &str = "index.html";

/// One path a build is expected to produce, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    /// Optional entries (`expected = false`) are reported but never fail a
    /// build.
    pub expected: bool,
}

impl ManifestEntry {
    pub fn expected(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected: true,
        }
    }

    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected: false,
        }
    }
}

/// Ordered list of expected build artifacts.
///
/// Order only matters for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from entries, rejecting paths that escape the output
    /// directory.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self> {
        for entry in &entries {
            validate_relative(&entry.path)?;
        }
        Ok(Self { entries })
    }

    /// Every path is an expected artifact.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::new(paths.into_iter().map(ManifestEntry::expected).collect())
    }

    /// Parse the manifest file format.
    ///
    /// ```text
    /// # comment
    /// index.html
    /// assets/app.js
    /// ?robots.txt
    /// ```
    ///
    /// One relative path per line. Blank lines and `#` comments are skipped;
    /// a leading `?` marks the entry optional.
    pub fn parse(contents: &str) -> Result<Self> {
        Self::from_lines(contents.lines())
    }

    /// Same rules as [`Manifest::parse`], one item per line.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = Vec::new();
        for (idx, raw) in lines.into_iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (path, expected) = match line.strip_prefix('?') {
                Some(rest) => (rest.trim(), false),
                None => (line, true),
            };
            if path.is_empty() {
                return Err(DevtoolError::ManifestError(format!(
                    "line {}: empty path after '?'",
                    idx + 1
                )));
            }

            let path = PathBuf::from(path);
            validate_relative(&path).map_err(|e| match e {
                DevtoolError::ManifestError(msg) => {
                    DevtoolError::ManifestError(format!("line {}: {msg}", idx + 1))
                }
                other => other,
            })?;
            entries.push(ManifestEntry { path, expected });
        }
        Ok(Self { entries })
    }

    /// Read and parse a manifest file.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let contents = fs.read_to_string(path).map_err(|e| {
            DevtoolError::ManifestError(format!("reading {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Make sure the SPA entry document is listed and mandatory.
    ///
    /// Appended when absent; an optional listing is upgraded to expected.
    pub fn require_entry_document(&mut self, name: impl AsRef<Path>) -> Result<()> {
        let name = name.as_ref();
        validate_relative(name)?;
        let wanted = without_cur_dir(name);
        match self
            .entries
            .iter_mut()
            .find(|e| without_cur_dir(&e.path) == wanted)
        {
            Some(entry) => entry.expected = true,
            None => self.entries.push(ManifestEntry::expected(name)),
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `./a/./b` and `a/b` name the same artifact.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn validate_relative(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(DevtoolError::ManifestError("empty artifact path".to_string()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(DevtoolError::ManifestError(format!(
                    "artifact path '{}' must not contain '..'",
                    path.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(DevtoolError::ManifestError(format!(
                    "artifact path '{}' must be relative",
                    path.display()
                )));
            }
        }
    }
    Ok(())
}
