// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linux desktop-entry probing.
//!
//! Installed applications advertise themselves through `.desktop` files
//! under the XDG applications directories. The probe reads `Name=` and
//! `Exec=` out of each; both are required to form a candidate.

use {
    crate::{
        candidate::{CandidateRecord, ProbeOutcome},
        classify, DiscoverOptions, Probe,
    },
    app_catalog::{normalize_id, LinuxSignature},
    chrono::Utc,
    std::path::{Path, PathBuf},
};

/// Discovery probe for Linux desktop entries.
#[derive(Clone, Debug)]
pub struct LinuxProbe {
    search_roots: Vec<PathBuf>,
}

impl Default for LinuxProbe {
    fn default() -> Self {
        Self::new(DiscoverOptions::default())
    }
}

impl LinuxProbe {
    pub fn new(_options: DiscoverOptions) -> Self {
        let mut search_roots = vec![
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/usr/local/share/applications"),
        ];

        if let Some(home) = dirs::home_dir() {
            search_roots.push(home.join(".local/share/applications"));
        }

        Self { search_roots }
    }

    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    /// Probe a single `.desktop` file.
    pub fn probe_desktop_file(&self, path: &Path) -> ProbeOutcome {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => return ProbeOutcome::skipped(path, format!("unreadable: {}", e)),
        };

        let mut name = None;
        let mut exec = None;

        // First occurrence wins; later Name=/Exec= lines belong to
        // [Desktop Action] sections.
        for line in content.lines() {
            if name.is_none() {
                if let Some(value) = line.strip_prefix("Name=") {
                    let value = value.trim();
                    if !value.is_empty() {
                        name = Some(value.to_string());
                    }
                }
            }

            if exec.is_none() {
                if let Some(value) = line.strip_prefix("Exec=") {
                    // Drop arguments and %-field codes.
                    if let Some(token) = value.split_whitespace().next() {
                        exec = Some(token.to_string());
                    }
                }
            }
        }

        let name = match name {
            Some(name) => name,
            None => return ProbeOutcome::skipped(path, "no Name entry"),
        };

        let executable_name = match exec
            .as_deref()
            .map(Path::new)
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            Some(exe) => exe.to_string(),
            None => return ProbeOutcome::skipped(path, "no Exec entry"),
        };

        // A localized or symbol-only Name normalizes to nothing; fall
        // back to the desktop entry's own file stem.
        let mut id = normalize_id(&name);
        if id.is_empty() {
            id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(normalize_id)
                .unwrap_or_default();
        }
        if id.is_empty() {
            return ProbeOutcome::skipped(path, "name normalizes to an empty id");
        }

        let hint = classify::classify(&name, "");

        ProbeOutcome::Candidate(Box::new(CandidateRecord {
            id,
            category: classify::category(&name, hint).to_string(),
            vendor: None,
            source_path: path.display().to_string(),
            macos: None,
            windows: None,
            linux: Some(LinuxSignature { executable_name }),
            version: None,
            ai_hint: hint,
            discovered_at: Utc::now(),
            icon_file: None,
            name,
        }))
    }
}

impl Probe for LinuxProbe {
    fn platform(&self) -> &'static str {
        "linux"
    }

    fn default_roots(&self) -> Vec<PathBuf> {
        self.search_roots.clone()
    }

    fn scan_root(&self, root: &Path) -> Vec<ProbeOutcome> {
        let mut paths = match std::fs::read_dir(root) {
            Ok(entries) => entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path.extension().and_then(|e| e.to_str()) == Some("desktop")
                })
                .collect::<Vec<_>>(),
            Err(e) => {
                log::warn!("unable to read {}: {}", root.display(), e);
                return vec![];
            }
        };

        paths.sort();

        paths
            .into_iter()
            .map(|path| self.probe_desktop_file(&path))
            .collect()
    }
}
