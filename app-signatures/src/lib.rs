// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery probes for installed application identity signatures.
//!
//! Each supported platform has a probe that inspects installed
//! applications and emits best-effort [candidate::CandidateRecord]s.
//! Candidates are never published directly; they are input to a human
//! review step that turns them into catalog profile records.
//!
//! Extraction is deliberately forgiving: system metadata is messy and
//! inconsistently populated, so a bundle that cannot yield its one
//! mandatory identity field is skipped with a diagnostic while
//! enumeration of the remaining bundles continues.

pub mod candidate;
pub mod classify;
pub mod linux;
pub mod macos;
pub mod windows;

pub use {
    candidate::{CandidateRecord, DiscoveryReport, ProbeOutcome},
    linux::LinuxProbe,
    macos::{AppBundle, MacosProbe},
    windows::WindowsProbe,
};

use std::path::{Path, PathBuf};

/// Platform-specific discovery capability.
///
/// Implementations share one shape: locate the platform's metadata
/// source, extract the mandatory identity field or skip, enrich with
/// whatever optional fields are independently available.
pub trait Probe {
    /// Platform key used in record signatures (`macos`, `windows`, `linux`).
    fn platform(&self) -> &'static str;

    /// Search roots scanned by [Probe::discover].
    fn default_roots(&self) -> Vec<PathBuf>;

    /// Probe every candidate under a single directory.
    ///
    /// Per-item fault isolation: one malformed application must never
    /// stop enumeration of the rest.
    fn scan_root(&self, root: &Path) -> Vec<ProbeOutcome>;

    /// Probe all default search roots. Roots that do not exist are
    /// silently ignored.
    fn discover(&self) -> Vec<ProbeOutcome> {
        let mut outcomes = vec![];

        for root in self.default_roots() {
            if root.is_dir() {
                outcomes.extend(self.scan_root(&root));
            }
        }

        outcomes
    }
}

/// Icon extraction settings shared by probe constructors.
///
/// Only the macOS probe currently knows how to extract icons; the other
/// platforms accept and ignore the setting.
#[derive(Clone, Debug, Default)]
pub struct DiscoverOptions {
    /// Directory to write extracted `<id>.png` icons into.
    pub icons_dir: Option<PathBuf>,
}

/// Obtain the probe for the host platform, if it is supported.
pub fn host_probe(options: DiscoverOptions) -> Option<Box<dyn Probe>> {
    match std::env::consts::OS {
        "macos" => Some(Box::new(MacosProbe::new(options))),
        "windows" => Some(Box::new(WindowsProbe::new(options))),
        "linux" => Some(Box::new(LinuxProbe::new(options))),
        _ => None,
    }
}
