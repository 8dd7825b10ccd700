// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immutable snapshot of the on-disk record set.
//!
//! One pipeline run loads all records exactly once; the validator and the
//! bundle builder are pure functions of the snapshot. Nothing in this
//! module mutates source files.

use {
    crate::{CatalogError, ProfileRecord},
    std::path::{Path, PathBuf},
};

/// One record file as loaded from disk.
///
/// Parsing happens in two stages so that the validator can report precise
/// violations for malformed records: the raw YAML document is kept even
/// when it does not deserialize into a [ProfileRecord].
#[derive(Clone, Debug)]
pub struct SnapshotEntry {
    path: PathBuf,
    file_name: String,
    raw: Option<serde_yaml::Value>,
    record: Option<ProfileRecord>,
    parse_error: Option<String>,
}

impl SnapshotEntry {
    /// Absolute path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the record file (e.g. `cursor.yaml`).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Raw YAML document, if the file held valid YAML.
    pub fn raw(&self) -> Option<&serde_yaml::Value> {
        self.raw.as_ref()
    }

    /// Fully typed record, if the document conformed to the schema.
    pub fn record(&self) -> Option<&ProfileRecord> {
        self.record.as_ref()
    }

    /// Why the file failed to parse into a typed record.
    pub fn parse_error(&self) -> Option<&str> {
        self.parse_error.as_deref()
    }
}

/// All profile records under an apps directory, loaded once.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Load every `*.yaml` / `*.yml` file directly under `apps_dir`.
    ///
    /// Entries are ordered by file name so downstream passes are
    /// deterministic regardless of directory enumeration order. A file
    /// that fails to parse still yields an entry; the failure is
    /// surfaced by the validator, not here.
    pub fn load(apps_dir: &Path) -> Result<Self, CatalogError> {
        if !apps_dir.is_dir() {
            return Err(CatalogError::AppsDirMissing(apps_dir.to_path_buf()));
        }

        let mut paths = std::fs::read_dir(apps_dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect::<Vec<_>>();

        paths.sort();

        let entries = paths
            .into_iter()
            .map(|path| Self::load_entry(path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    fn load_entry(path: PathBuf) -> Result<SnapshotEntry, CatalogError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let data = std::fs::read_to_string(&path)?;

        let (raw, record, parse_error) = match serde_yaml::from_str::<serde_yaml::Value>(&data) {
            Ok(raw) => match serde_yaml::from_value::<ProfileRecord>(raw.clone()) {
                Ok(mut record) => {
                    // Provider order is irrelevant; normalize it on load so
                    // bundle output is stable.
                    record.providers.sort();
                    record.providers.dedup();

                    (Some(raw), Some(record), None)
                }
                Err(e) => (Some(raw), None, Some(e.to_string())),
            },
            Err(e) => (None, None, Some(e.to_string())),
        };

        Ok(SnapshotEntry {
            path,
            file_name,
            raw,
            record,
            parse_error,
        })
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// All entries that parsed into a typed record.
    pub fn records(&self) -> Vec<&ProfileRecord> {
        self.entries.iter().filter_map(|e| e.record()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
