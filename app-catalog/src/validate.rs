// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema and cross-record invariant enforcement.
//!
//! The validator is a read-only full pass over a [Snapshot]: it never
//! mutates source records and never stops at the first problem. Every
//! violation found is collected into a [ValidationReport] so a human can
//! fix all issues in one pass. Violations are data, not errors; it is the
//! caller's job to treat a non-empty report as a hard stop.

use {
    crate::{
        record::{is_valid_id, AiStatus},
        snapshot::{Snapshot, SnapshotEntry},
        ProfileRecord,
    },
    std::{collections::BTreeMap, path::Path},
};

/// Which invariant a violation breaches.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckKind {
    /// The file is not parseable as a record at all.
    Parse,
    /// A required field is absent or empty.
    RequiredField,
    /// `id` contains characters outside `[a-z0-9-]`.
    IdCharset,
    /// `ai_status` is outside the enumerated values.
    EnumValue,
    /// No platform signature is present.
    MissingSignature,
    /// A present platform signature lacks its mandatory field.
    SignatureField,
    /// `icon_ref` does not resolve to an existing asset.
    IconAsset,
    /// The same `id` appears in more than one record.
    DuplicateId,
    /// Record file name does not match the record `id`.
    FileName,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::RequiredField => "required-field",
            Self::IdCharset => "id-charset",
            Self::EnumValue => "ai-status",
            Self::MissingSignature => "signatures",
            Self::SignatureField => "signature-field",
            Self::IconAsset => "icon-asset",
            Self::DuplicateId => "duplicate-id",
            Self::FileName => "file-name",
        }
    }
}

/// One invariant breach in one record.
#[derive(Clone, Debug)]
pub struct Violation {
    /// File name of the offending record.
    pub record: String,
    pub check: CheckKind,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: [{}] {}",
            self.record,
            self.check.as_str(),
            self.message
        )
    }
}

/// The complete result of validating one snapshot.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Records from `snapshot` with no violation attached to them.
    ///
    /// A published bundle must only ever contain these.
    pub fn valid_records<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a ProfileRecord> {
        snapshot
            .entries()
            .iter()
            .filter(|entry| !self.violations.iter().any(|v| v.record == entry.file_name()))
            .filter_map(|entry| entry.record())
            .collect()
    }

    fn push(&mut self, record: &str, check: CheckKind, message: impl Into<String>) {
        self.violations.push(Violation {
            record: record.to_string(),
            check,
            message: message.into(),
        });
    }
}

/// Validate every record in `snapshot` plus cross-record invariants.
///
/// `icons_dir` is where `icon_ref` values are resolved.
pub fn validate_snapshot(snapshot: &Snapshot, icons_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    for entry in snapshot.entries() {
        match entry.record() {
            Some(record) => check_record(&mut report, entry, record, icons_dir),
            None => check_malformed(&mut report, entry),
        }
    }

    check_duplicate_ids(&mut report, snapshot);

    report
}

fn check_record(
    report: &mut ValidationReport,
    entry: &SnapshotEntry,
    record: &ProfileRecord,
    icons_dir: &Path,
) {
    let name = entry.file_name();

    if record.id.is_empty() {
        report.push(name, CheckKind::RequiredField, "id must not be empty");
    } else if !is_valid_id(&record.id) {
        report.push(
            name,
            CheckKind::IdCharset,
            format!(
                "id {:?} must contain only lowercase letters, digits, and hyphens",
                record.id
            ),
        );
    } else {
        let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
        if stem != record.id {
            report.push(
                name,
                CheckKind::FileName,
                format!("file name should be {}.yaml to match id", record.id),
            );
        }
    }

    if record.name.is_empty() {
        report.push(name, CheckKind::RequiredField, "name must not be empty");
    }

    if record.signatures.is_empty() {
        report.push(
            name,
            CheckKind::MissingSignature,
            "at least one platform signature is required",
        );
    }

    if let Some(macos) = &record.signatures.macos {
        if macos.bundle_id.is_empty() {
            report.push(
                name,
                CheckKind::SignatureField,
                "macos signature requires bundle_id",
            );
        }
    }

    if let Some(windows) = &record.signatures.windows {
        if windows.executable_name.is_empty() {
            report.push(
                name,
                CheckKind::SignatureField,
                "windows signature requires executable_name",
            );
        }
    }

    if let Some(linux) = &record.signatures.linux {
        if linux.executable_name.is_empty() {
            report.push(
                name,
                CheckKind::SignatureField,
                "linux signature requires executable_name",
            );
        }
    }

    if let Some(icon) = &record.icon_ref {
        if !icons_dir.join(icon).is_file() {
            report.push(
                name,
                CheckKind::IconAsset,
                format!("icon asset {} not found in {}", icon, icons_dir.display()),
            );
        }
    }
}

/// Produce targeted violations for a record that failed typed parsing.
///
/// Authored records commonly break in a handful of ways (bad enum value,
/// missing mandatory signature field). Reporting those precisely beats
/// surfacing an opaque deserialization error.
fn check_malformed(report: &mut ValidationReport, entry: &SnapshotEntry) {
    let name = entry.file_name();

    let map = match entry.raw().and_then(|raw| raw.as_mapping()) {
        Some(map) => map,
        None => {
            report.push(
                name,
                CheckKind::Parse,
                entry
                    .parse_error()
                    .unwrap_or("file is not a YAML mapping")
                    .to_string(),
            );
            return;
        }
    };

    let before = report.violations.len();

    for field in ["id", "name", "ai_status"] {
        match raw_str(map, field) {
            Some(value) if !value.is_empty() => {}
            _ => report.push(
                name,
                CheckKind::RequiredField,
                format!("{} is required", field),
            ),
        }
    }

    if let Some(status) = raw_str(map, "ai_status") {
        if !AiStatus::VALUES.contains(&status) {
            report.push(
                name,
                CheckKind::EnumValue,
                format!(
                    "ai_status {:?} is not one of {}",
                    status,
                    AiStatus::VALUES.join(", ")
                ),
            );
        }
    }

    match raw_value(map, "signatures").and_then(|v| v.as_mapping()) {
        Some(signatures) if !signatures.is_empty() => {
            for (platform, mandatory) in [
                ("macos", "bundle_id"),
                ("windows", "executable_name"),
                ("linux", "executable_name"),
            ] {
                if let Some(sig) = raw_value(signatures, platform) {
                    let present = sig
                        .as_mapping()
                        .and_then(|m| raw_str(m, mandatory))
                        .map(|v| !v.is_empty())
                        .unwrap_or(false);

                    if !present {
                        report.push(
                            name,
                            CheckKind::SignatureField,
                            format!("{} signature requires {}", platform, mandatory),
                        );
                    }
                }
            }
        }
        _ => report.push(
            name,
            CheckKind::MissingSignature,
            "at least one platform signature is required",
        ),
    }

    // Nothing we recognize is wrong; fall back to the deserializer's own
    // account so the failure is never silent.
    if report.violations.len() == before {
        report.push(
            name,
            CheckKind::Parse,
            entry.parse_error().unwrap_or("unknown parse error").to_string(),
        );
    }
}

fn check_duplicate_ids(report: &mut ValidationReport, snapshot: &Snapshot) {
    let mut by_id: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for entry in snapshot.entries() {
        let id = match entry.record() {
            Some(record) => Some(record.id.as_str()),
            None => entry
                .raw()
                .and_then(|raw| raw.as_mapping())
                .and_then(|map| raw_str(map, "id")),
        };

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            by_id.entry(id).or_default().push(entry.file_name());
        }
    }

    for (id, files) in by_id {
        if files.len() > 1 {
            // Report against every offender, not just the later ones.
            for file in &files {
                report.push(
                    file,
                    CheckKind::DuplicateId,
                    format!("id {:?} also used by {}", id, other_files(file, &files)),
                );
            }
        }
    }
}

fn other_files(this: &str, all: &[&str]) -> String {
    all.iter()
        .filter(|f| **f != this)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn raw_value<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a serde_yaml::Value> {
    map.get(&serde_yaml::Value::String(key.to_string()))
}

fn raw_str<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a str> {
    raw_value(map, key).and_then(|v| v.as_str())
}

#[cfg(test)]
mod test {
    use {super::*, std::path::PathBuf};

    fn write_apps(files: &[(&str, &str)]) -> anyhow::Result<(tempfile::TempDir, PathBuf)> {
        let td = tempfile::tempdir()?;
        let apps = td.path().join("apps");
        std::fs::create_dir_all(apps.join("icons"))?;

        for (file, content) in files {
            std::fs::write(apps.join(file), content)?;
        }

        let icons = apps.join("icons");
        Ok((td, icons))
    }

    fn validate(files: &[(&str, &str)]) -> anyhow::Result<(ValidationReport, Snapshot)> {
        let (td, icons) = write_apps(files)?;
        let snapshot = Snapshot::load(icons.parent().unwrap())?;
        let report = validate_snapshot(&snapshot, &icons);
        drop(td);
        Ok((report, snapshot))
    }

    const GOOD: &str = "id: cursor\nname: Cursor\nai_status: native\nsignatures:\n  linux:\n    executable_name: cursor\n";

    #[test]
    fn clean_set_has_no_violations() -> anyhow::Result<()> {
        let (report, snapshot) = validate(&[("cursor.yaml", GOOD)])?;
        assert!(report.is_clean(), "{:?}", report.violations());
        assert_eq!(report.valid_records(&snapshot).len(), 1);
        Ok(())
    }

    #[test]
    fn duplicate_id_reported_against_both_records() -> anyhow::Result<()> {
        let other = "id: cursor\nname: Cursor Two\nai_status: none\nsignatures:\n  linux:\n    executable_name: cursor2\n";
        let (report, _) = validate(&[("cursor.yaml", GOOD), ("cursor-two.yaml", other)])?;

        let dups = report
            .violations()
            .iter()
            .filter(|v| v.check == CheckKind::DuplicateId)
            .collect::<Vec<_>>();
        assert_eq!(dups.len(), 2);

        let mut files = dups.iter().map(|v| v.record.as_str()).collect::<Vec<_>>();
        files.sort();
        assert_eq!(files, vec!["cursor-two.yaml", "cursor.yaml"]);

        Ok(())
    }

    #[test]
    fn missing_signatures_excludes_record() -> anyhow::Result<()> {
        let no_sigs = "id: ghost\nname: Ghost\nai_status: none\n";
        let (report, snapshot) = validate(&[("cursor.yaml", GOOD), ("ghost.yaml", no_sigs)])?;

        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::MissingSignature && v.record == "ghost.yaml"));

        let valid = report.valid_records(&snapshot);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, "cursor");

        Ok(())
    }

    #[test]
    fn bad_enum_value_reported() -> anyhow::Result<()> {
        let bad = "id: foo\nname: Foo\nai_status: experimental\nsignatures:\n  linux:\n    executable_name: foo\n";
        let (report, _) = validate(&[("foo.yaml", bad)])?;

        let v = report
            .violations()
            .iter()
            .find(|v| v.check == CheckKind::EnumValue)
            .expect("enum violation expected");
        assert!(v.message.contains("experimental"));

        Ok(())
    }

    #[test]
    fn signature_missing_mandatory_field() -> anyhow::Result<()> {
        // macOS signature without bundle_id fails typed parsing; the
        // validator still pins the violation on the exact field.
        let bad = "id: foo\nname: Foo\nai_status: none\nsignatures:\n  macos:\n    team_id: ABC123\n";
        let (report, _) = validate(&[("foo.yaml", bad)])?;

        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::SignatureField && v.message.contains("bundle_id")));

        Ok(())
    }

    #[test]
    fn id_charset_enforced() -> anyhow::Result<()> {
        let bad = "id: Not_Valid\nname: Foo\nai_status: none\nsignatures:\n  linux:\n    executable_name: foo\n";
        let (report, _) = validate(&[("foo.yaml", bad)])?;

        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::IdCharset));

        Ok(())
    }

    #[test]
    fn missing_icon_asset_reported() -> anyhow::Result<()> {
        let with_icon = "id: cursor\nname: Cursor\nai_status: native\nsignatures:\n  linux:\n    executable_name: cursor\nicon_ref: cursor.png\n";
        let (report, _) = validate(&[("cursor.yaml", with_icon)])?;

        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::IconAsset));

        Ok(())
    }

    #[test]
    fn present_icon_asset_is_clean() -> anyhow::Result<()> {
        let (td, icons) = write_apps(&[(
            "cursor.yaml",
            "id: cursor\nname: Cursor\nai_status: native\nsignatures:\n  linux:\n    executable_name: cursor\nicon_ref: cursor.png\n",
        )])?;
        std::fs::write(icons.join("cursor.png"), b"\x89PNG")?;

        let snapshot = Snapshot::load(icons.parent().unwrap())?;
        let report = validate_snapshot(&snapshot, &icons);
        assert!(report.is_clean(), "{:?}", report.violations());

        drop(td);
        Ok(())
    }

    #[test]
    fn file_name_must_match_id() -> anyhow::Result<()> {
        let (report, _) = validate(&[("other.yaml", GOOD)])?;

        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::FileName));

        Ok(())
    }

    #[test]
    fn unparseable_file_reported_not_fatal() -> anyhow::Result<()> {
        let (report, snapshot) = validate(&[("bad.yaml", ": ["), ("cursor.yaml", GOOD)])?;

        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::Parse && v.record == "bad.yaml"));
        assert_eq!(report.valid_records(&snapshot).len(), 1);

        Ok(())
    }

    #[test]
    fn full_pass_reports_all_violations() -> anyhow::Result<()> {
        // Two independent problems in one set; both must be present.
        let a = "id: Bad_Id\nname: A\nai_status: none\nsignatures:\n  linux:\n    executable_name: a\n";
        let b = "id: b\nname: B\nai_status: none\n";
        let (report, _) = validate(&[("bad-id.yaml", a), ("b.yaml", b)])?;

        assert!(report.violations().len() >= 2);
        assert!(report.violations().iter().any(|v| v.check == CheckKind::IdCharset));
        assert!(report
            .violations()
            .iter()
            .any(|v| v.check == CheckKind::MissingSignature));

        Ok(())
    }
}
