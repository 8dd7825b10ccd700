// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Windows executable probing.
//!
//! Windows carries no bundle descriptor comparable to `Info.plist`, so
//! the probe walks the usual install roots for executables and keeps
//! only those matching the AI keyword lists. The `publisher` signature
//! field is manual enrichment and is never populated here.

use {
    crate::{
        candidate::{CandidateRecord, ProbeOutcome},
        classify, DiscoverOptions, Probe,
    },
    app_catalog::{normalize_id, WindowsSignature},
    chrono::Utc,
    std::path::{Path, PathBuf},
};

/// Executable name fragments that mark installers rather than
/// applications.
const INSTALLER_FRAGMENTS: &[&str] = &["uninstall", "update", "setup", "installer"];

/// Discovery probe for Windows executables.
#[derive(Clone, Debug)]
pub struct WindowsProbe {
    search_roots: Vec<PathBuf>,
}

impl Default for WindowsProbe {
    fn default() -> Self {
        Self::new(DiscoverOptions::default())
    }
}

impl WindowsProbe {
    pub fn new(_options: DiscoverOptions) -> Self {
        let mut search_roots = vec![];

        for var in ["PROGRAMFILES", "PROGRAMFILES(X86)"] {
            if let Ok(value) = std::env::var(var) {
                search_roots.push(PathBuf::from(value));
            }
        }

        if let Ok(value) = std::env::var("LOCALAPPDATA") {
            search_roots.push(PathBuf::from(value).join("Programs"));
        }

        Self { search_roots }
    }

    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    /// Probe a single executable file.
    pub fn probe_executable(&self, path: &Path) -> ProbeOutcome {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return ProbeOutcome::skipped(path, "unreadable file name"),
        };

        let lower = file_name.to_lowercase();
        if INSTALLER_FRAGMENTS.iter().any(|f| lower.contains(f)) {
            return ProbeOutcome::skipped(path, "installer/updater executable");
        }

        let name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => return ProbeOutcome::skipped(path, "no executable name"),
        };

        let id = normalize_id(&name);
        if id.is_empty() {
            return ProbeOutcome::skipped(path, "name normalizes to an empty id");
        }

        let hint = classify::classify(&name, "");
        if !hint.is_ai_app && !hint.is_ai_host {
            // Program Files holds thousands of executables; without a
            // descriptor to read, only keyword matches are worth a
            // reviewer's time.
            return ProbeOutcome::skipped(path, "not a known AI-related application");
        }

        ProbeOutcome::Candidate(Box::new(CandidateRecord {
            id,
            category: classify::category(&name, hint).to_string(),
            vendor: None,
            source_path: path.display().to_string(),
            macos: None,
            windows: Some(WindowsSignature {
                executable_name: file_name,
                publisher: None,
            }),
            linux: None,
            version: None,
            ai_hint: hint,
            discovered_at: Utc::now(),
            icon_file: None,
            name,
        }))
    }
}

impl Probe for WindowsProbe {
    fn platform(&self) -> &'static str {
        "windows"
    }

    fn default_roots(&self) -> Vec<PathBuf> {
        self.search_roots.clone()
    }

    fn scan_root(&self, root: &Path) -> Vec<ProbeOutcome> {
        walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .flatten()
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.eq_ignore_ascii_case("exe"))
                        .unwrap_or(false)
            })
            .map(|entry| self.probe_executable(entry.path()))
            .collect()
    }
}
