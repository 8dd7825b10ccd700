// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The canonical schema for one application profile record.

use serde::{Deserialize, Serialize};

/// AI involvement classification for an application.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiStatus {
    /// The application is itself an AI product.
    Native,
    /// The application ships built-in AI features.
    Enabled,
    /// The application hosts third-party AI extensions.
    Host,
    /// No known AI involvement. Terminal classification.
    None,
}

impl AiStatus {
    /// String values accepted in authored records.
    pub const VALUES: [&'static str; 4] = ["native", "enabled", "host", "none"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Enabled => "enabled",
            Self::Host => "host",
            Self::None => "none",
        }
    }

    /// Whether this status counts towards the `ai_apps` bundle counter.
    pub fn is_ai(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for AiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// macOS identity signature for an application bundle.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MacosSignature {
    /// `CFBundleIdentifier` value. Mandatory.
    pub bundle_id: String,

    /// Apple Developer Team ID from the code signature, when signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    /// Filesystem paths the bundle was discovered at.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    /// `CFBundleExecutable` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_name: Option<String>,
}

/// Windows identity signature.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WindowsSignature {
    /// Executable file name (e.g. `Cursor.exe`). Mandatory.
    pub executable_name: String,

    /// Authenticode publisher name. Populated by manual enrichment, not
    /// by the discovery probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

/// Linux identity signature.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LinuxSignature {
    /// Executable file name. Mandatory.
    pub executable_name: String,
}

/// Per-platform signatures for one record.
///
/// At least one platform entry must be present. That invariant is
/// enforced by the validator, never assumed here.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Signatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macos: Option<MacosSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<WindowsSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<LinuxSignature>,
}

impl Signatures {
    pub fn is_empty(&self) -> bool {
        self.macos.is_none() && self.windows.is_none() && self.linux.is_none()
    }

    /// Platform keys with a signature present.
    pub fn platforms(&self) -> Vec<&'static str> {
        let mut res = vec![];

        if self.macos.is_some() {
            res.push("macos");
        }
        if self.windows.is_some() {
            res.push("windows");
        }
        if self.linux.is_some() {
            res.push("linux");
        }

        res
    }
}

/// Discovery provenance carried on a record. Advisory only; never used
/// for matching.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_discovered: Option<String>,
}

/// One application entry in the catalog.
///
/// Records are authored as one YAML file per application. The `id` is the
/// join key the monitoring agent matches on and is immutable once
/// published.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProfileRecord {
    /// Globally unique identifier. Lowercase letters, digits, hyphens.
    pub id: String,

    /// Display name. Not unique.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    pub ai_status: AiStatus,

    #[serde(default)]
    pub signatures: Signatures,

    /// Upstream AI services the application is known to call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,

    /// File name of an icon asset under the icons directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

/// Whether `id` conforms to the record identifier character class.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Derive a normalized record identifier from a display name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` to a
/// single hyphen, and strips leading/trailing hyphens.
pub fn normalize_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        let c = c.to_ascii_lowercase();

        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !id.is_empty() {
                id.push('-');
            }
            pending_hyphen = false;
            id.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    id
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_id_simple() {
        assert_eq!(normalize_id("Cursor"), "cursor");
        assert_eq!(normalize_id("Visual Studio Code"), "visual-studio-code");
        assert_eq!(normalize_id("  ChatGPT  "), "chatgpt");
        assert_eq!(normalize_id("copy.ai"), "copy-ai");
        assert_eq!(normalize_id("DALL·E 3"), "dall-e-3");
        assert_eq!(normalize_id("---"), "");
        assert_eq!(normalize_id(""), "");
    }

    #[test]
    fn id_charset() {
        assert!(is_valid_id("cursor"));
        assert!(is_valid_id("gpt-4-client"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("Cursor"));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id("under_score"));
    }

    #[test]
    fn normalized_ids_are_valid() {
        for name in ["Cursor", "Visual Studio Code", "copy.ai", "Émulateur X"] {
            assert!(is_valid_id(&normalize_id(name)), "{}", name);
        }
    }

    #[test]
    fn ai_status_yaml_values() {
        for (text, status) in [
            ("native", AiStatus::Native),
            ("enabled", AiStatus::Enabled),
            ("host", AiStatus::Host),
            ("none", AiStatus::None),
        ] {
            let parsed: AiStatus = serde_yaml::from_str(text).unwrap();
            assert_eq!(parsed, status);
            assert_eq!(status.as_str(), text);
        }

        assert!(serde_yaml::from_str::<AiStatus>("experimental").is_err());
    }

    #[test]
    fn record_yaml_round_trip() {
        let yaml = r#"
id: cursor
name: "Cursor"
vendor: "Anysphere"
ai_status: native
signatures:
  macos:
    bundle_id: "com.todesktop.230313mzl4w4u92"
    team_id: "ABC123DEF4"
    paths:
      - "/Applications/Cursor.app"
    executable_name: "Cursor"
providers:
  - anthropic
  - openai
metadata:
  discovered_at: "2025-11-02T10:00:00Z"
  version_discovered: "0.42.3"
icon_ref: "cursor.png"
"#;

        let record: ProfileRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.id, "cursor");
        assert_eq!(record.ai_status, AiStatus::Native);
        assert_eq!(record.signatures.platforms(), vec!["macos"]);
        assert_eq!(
            record.signatures.macos.as_ref().unwrap().team_id.as_deref(),
            Some("ABC123DEF4")
        );

        // Absent optional members stay absent on re-serialization.
        let out = serde_yaml::to_string(&record).unwrap();
        assert!(!out.contains("windows"));
        assert!(!out.contains("publisher"));
    }

    #[test]
    fn minimal_record_parses() {
        let yaml = "id: foo\nname: Foo\nai_status: none\nsignatures:\n  linux:\n    executable_name: foo\n";
        let record: ProfileRecord = serde_yaml::from_str(yaml).unwrap();
        assert!(record.vendor.is_none());
        assert!(record.providers.is_empty());
        assert!(record.metadata.is_none());
        assert!(!record.signatures.is_empty());
    }
}
