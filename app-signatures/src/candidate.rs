// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Candidate records emitted by the discovery probes.

use {
    crate::classify::AiHint,
    anyhow::Result,
    app_catalog::{
        AiStatus, LinuxSignature, MacosSignature, ProfileRecord, RecordMetadata, Signatures,
        WindowsSignature,
    },
    chrono::{DateTime, SecondsFormat, Utc},
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
};

/// One discovered application, pending human review.
///
/// Mirrors the profile record shape plus discovery provenance and the
/// advisory AI classification hint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CandidateRecord {
    /// Normalized identifier derived from the display name.
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    pub category: String,

    /// Where this application was discovered.
    pub source_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macos: Option<MacosSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<WindowsSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<LinuxSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub ai_hint: AiHint,

    pub discovered_at: DateTime<Utc>,

    /// File name of an extracted icon, when icon extraction ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_file: Option<String>,
}

impl CandidateRecord {
    /// The `ai_status` value suggested by the keyword hint.
    pub fn suggested_status(&self) -> AiStatus {
        if self.ai_hint.is_ai_app {
            AiStatus::Native
        } else if self.ai_hint.is_ai_host {
            AiStatus::Host
        } else {
            AiStatus::None
        }
    }

    /// Shape this candidate as a profile record for the review workflow.
    pub fn to_profile_record(&self) -> ProfileRecord {
        ProfileRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            ai_status: self.suggested_status(),
            signatures: Signatures {
                macos: self.macos.clone(),
                windows: self.windows.clone(),
                linux: self.linux.clone(),
            },
            providers: vec![],
            metadata: Some(RecordMetadata {
                discovered_at: Some(
                    self.discovered_at
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                version_discovered: self.version.clone(),
            }),
            icon_ref: self.icon_file.clone(),
        }
    }

    /// Render the candidate as an editable YAML record file.
    pub fn to_yaml(&self) -> Result<String> {
        let body = serde_yaml::to_string(&self.to_profile_record())?;

        // Commented provenance header for the human reviewer.
        Ok(format!(
            "# {}\n# Discovered from: {}\n{}",
            self.name, self.source_path, body
        ))
    }
}

/// Outcome of probing a single application.
///
/// Skips are the normal case, not an exceptional one: metadata-poor or
/// unsigned applications are everywhere. They are carried as values so a
/// batch scan can log them without aborting.
#[derive(Clone, Debug)]
pub enum ProbeOutcome {
    Candidate(Box<CandidateRecord>),
    Skipped { path: PathBuf, reason: String },
}

impl ProbeOutcome {
    pub fn skipped(path: &Path, reason: impl Into<String>) -> Self {
        Self::Skipped {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn candidate(&self) -> Option<&CandidateRecord> {
        match self {
            Self::Candidate(c) => Some(c),
            Self::Skipped { .. } => None,
        }
    }

    pub fn into_candidate(self) -> Option<CandidateRecord> {
        match self {
            Self::Candidate(c) => Some(*c),
            Self::Skipped { .. } => None,
        }
    }
}

/// Split a batch of outcomes into candidates and logged skips.
pub fn collect_candidates(outcomes: Vec<ProbeOutcome>) -> Vec<CandidateRecord> {
    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            ProbeOutcome::Candidate(c) => Some(*c),
            ProbeOutcome::Skipped { path, reason } => {
                log::debug!("skipping {}: {}", path.display(), reason);
                None
            }
        })
        .collect()
}

/// Sort candidates for presentation: AI apps first, then AI hosts, then
/// by case-insensitive name.
pub fn sort_candidates(candidates: &mut [CandidateRecord]) {
    candidates.sort_by(|a, b| {
        (!a.ai_hint.is_ai_app, !a.ai_hint.is_ai_host, a.name.to_lowercase()).cmp(&(
            !b.ai_hint.is_ai_app,
            !b.ai_hint.is_ai_host,
            b.name.to_lowercase(),
        ))
    });
}

/// JSON report a discovery run writes to stdout.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveryReport {
    pub platform: String,
    pub discovered_at: DateTime<Utc>,
    pub total_apps: usize,
    pub ai_apps: usize,
    pub ai_host_apps: usize,
    pub apps: Vec<CandidateRecord>,
}

impl DiscoveryReport {
    pub fn new(platform: &str, mut apps: Vec<CandidateRecord>) -> Self {
        sort_candidates(&mut apps);

        let ai_apps = apps.iter().filter(|a| a.ai_hint.is_ai_app).count();
        let ai_host_apps = apps.iter().filter(|a| a.ai_hint.is_ai_host).count();

        Self {
            platform: platform.to_string(),
            discovered_at: Utc::now(),
            total_apps: apps.len(),
            ai_apps,
            ai_host_apps,
            apps,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        Ok(json)
    }
}
