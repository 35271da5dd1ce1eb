// src/artifacts/mod.rs

//! Build artifact verification.
//!
//! - [`manifest`] defines the ordered list of paths a build is expected to
//!   produce and parses the manifest file format.
//! - [`checker`] resolves each entry under an output directory and reports
//!   whether it exists (and how large it is) without reading contents.

pub mod checker;
pub mod manifest;

pub use checker::{ArtifactChecker, ArtifactReport, ArtifactStatus};
pub use manifest::{Manifest, ManifestEntry, DEFAULT_ENTRY_DOCUMENT};
