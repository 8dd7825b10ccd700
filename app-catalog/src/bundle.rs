// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The consolidated bundle artifact.
//!
//! The bundle is a pure function of the validated record set: records
//! sorted lexicographically by `id` plus aggregate counters, serialized
//! as JSON. Rebuilding from identical inputs yields byte-identical
//! output so the published artifact diffs cleanly under change tracking.

use {
    crate::{CatalogError, ProfileRecord},
    serde::{Deserialize, Serialize},
    std::{io::Write, path::Path},
};

/// Format version stamped into the artifact.
pub const BUNDLE_FORMAT_VERSION: &str = "1.0.0";

/// The consolidated catalog artifact. Derived, never hand-edited.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConsolidatedBundle {
    pub version: String,

    /// Total record count.
    pub total_apps: usize,

    /// Records whose `ai_status` is not `none`.
    pub ai_apps: usize,

    /// Records ordered by `id`.
    pub apps: Vec<ProfileRecord>,
}

impl ConsolidatedBundle {
    /// Serialize as the published JSON document.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        Ok(json)
    }

    /// Write the artifact to `path` atomically.
    ///
    /// The document is staged in a temporary file in the destination
    /// directory and renamed into place, so a consumer never observes a
    /// half-written bundle.
    pub fn write(&self, path: &Path) -> Result<(), CatalogError> {
        let json = self.to_json()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(json.as_bytes())?;
        staged.persist(path)?;

        Ok(())
    }
}

/// Merge pre-validated records into a [ConsolidatedBundle].
///
/// Validity is the validator's job; this only establishes deterministic
/// ordering and computes the counters.
pub fn build_bundle(records: &[&ProfileRecord]) -> ConsolidatedBundle {
    let mut apps = records.iter().map(|r| (*r).clone()).collect::<Vec<_>>();
    apps.sort_by(|a, b| a.id.cmp(&b.id));

    let ai_apps = apps.iter().filter(|r| r.ai_status.is_ai()).count();

    ConsolidatedBundle {
        version: BUNDLE_FORMAT_VERSION.to_string(),
        total_apps: apps.len(),
        ai_apps,
        apps,
    }
}
