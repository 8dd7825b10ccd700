// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! macOS application bundle probing.

use {
    crate::{
        candidate::{CandidateRecord, ProbeOutcome},
        classify, DiscoverOptions, Probe,
    },
    anyhow::{anyhow, Context, Result},
    app_catalog::{normalize_id, MacosSignature},
    chrono::Utc,
    std::{
        collections::HashSet,
        path::{Path, PathBuf},
        process::Command,
    },
};

/// An installed application bundle backed by a directory.
///
/// Opens the bundle's `Info.plist` and exposes the identity keys the
/// probe cares about. Plist values are frequently missing or of the
/// wrong type in the wild; every accessor besides the constructor is
/// lenient and returns `None` for anything unusable.
#[derive(Clone, Debug)]
pub struct AppBundle {
    root: PathBuf,

    /// Name of the root directory, `.app` suffix included.
    root_name: String,

    /// Whether `Info.plist` sits at the bundle root instead of under
    /// `Contents/`.
    shallow: bool,

    info_plist: plist::Dictionary,
}

impl AppBundle {
    /// Open an application bundle from its root directory.
    ///
    /// Errors if the directory does not hold a parseable `Info.plist`;
    /// that is the one structural requirement for a bundle.
    pub fn open(directory: &Path) -> Result<Self> {
        if !directory.is_dir() {
            return Err(anyhow!("{} is not a directory", directory.display()));
        }

        let root_name = directory
            .file_name()
            .ok_or_else(|| anyhow!("unable to resolve bundle directory name"))?
            .to_string_lossy()
            .to_string();

        let deep_plist = directory.join("Contents").join("Info.plist");
        let shallow_plist = directory.join("Info.plist");

        let (shallow, info_plist_path) = if deep_plist.is_file() {
            (false, deep_plist)
        } else if shallow_plist.is_file() {
            (true, shallow_plist)
        } else {
            return Err(anyhow!("Info.plist not found; not an application bundle"));
        };

        let data = std::fs::read(&info_plist_path)
            .with_context(|| format!("reading {}", info_plist_path.display()))?;
        let value = plist::Value::from_reader(std::io::Cursor::new(data))
            .with_context(|| format!("parsing {}", info_plist_path.display()))?;
        let info_plist = value
            .into_dictionary()
            .ok_or_else(|| anyhow!("{} is not a dictionary", info_plist_path.display()))?;

        Ok(Self {
            root: directory.to_path_buf(),
            root_name,
            shallow,
            info_plist,
        })
    }

    /// The root directory of this bundle.
    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    /// Resolve a path under the bundle's content directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        if self.shallow {
            self.root.join(path.as_ref())
        } else {
            self.root.join("Contents").join(path.as_ref())
        }
    }

    fn plist_string(&self, key: &str) -> Option<String> {
        self.info_plist
            .get(key)
            .and_then(|v| v.as_string())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
    }

    /// `CFBundleIdentifier`. The mandatory identity field.
    pub fn identifier(&self) -> Option<String> {
        self.plist_string("CFBundleIdentifier")
    }

    /// Best-effort display name: `CFBundleName`, then
    /// `CFBundleDisplayName`, then the directory stem.
    pub fn display_name(&self) -> String {
        self.plist_string("CFBundleName")
            .or_else(|| self.plist_string("CFBundleDisplayName"))
            .unwrap_or_else(|| {
                self.root_name
                    .strip_suffix(".app")
                    .unwrap_or(&self.root_name)
                    .to_string()
            })
    }

    /// `CFBundleShortVersionString`.
    pub fn version(&self) -> Option<String> {
        self.plist_string("CFBundleShortVersionString")
    }

    /// `CFBundleExecutable`.
    pub fn executable(&self) -> Option<String> {
        self.plist_string("CFBundleExecutable")
    }

    /// Vendor guess parsed out of `NSHumanReadableCopyright`.
    pub fn vendor_guess(&self) -> Option<String> {
        self.plist_string("NSHumanReadableCopyright")
            .as_deref()
            .and_then(vendor_from_copyright)
    }

    /// Locate the bundle's icon source file under `Resources/`.
    ///
    /// Follows `CFBundleIconFile` / `CFBundleIconName` (with and without
    /// the `.icns` extension) and finally falls back to the first
    /// `.icns` file in the resources directory.
    pub fn icon_source(&self) -> Option<PathBuf> {
        let resources = self.resolve_path("Resources");

        let declared = self
            .plist_string("CFBundleIconFile")
            .or_else(|| self.plist_string("CFBundleIconName"))?;

        let with_ext = if declared.ends_with(".icns") {
            declared.clone()
        } else {
            format!("{}.icns", declared)
        };

        for file_name in [with_ext, declared] {
            let path = resources.join(file_name);
            if path.is_file() {
                return Some(path);
            }
        }

        let mut icns = std::fs::read_dir(&resources)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("icns")
            })
            .collect::<Vec<_>>();
        icns.sort();

        icns.into_iter().next()
    }
}

/// Extract the copyright holder from an `NSHumanReadableCopyright`
/// string such as `"© 2024 Acme Inc. All rights reserved."`.
pub fn vendor_from_copyright(copyright: &str) -> Option<String> {
    let rest = copyright.split('©').nth(1)?.trim_start();

    // Strip a leading year or year range, but not digits that belong to
    // the vendor name itself ("1Password").
    let rest = match rest.find(|c: char| !(c.is_ascii_digit() || c == '-' || c == ',')) {
        Some(idx) if idx > 0 && rest[idx..].starts_with(char::is_whitespace) => {
            rest[idx..].trim_start()
        }
        Some(_) => rest,
        None => "",
    };

    let end = rest
        .find('.')
        .into_iter()
        .chain(rest.find("All rights"))
        .min()
        .unwrap_or(rest.len());

    let vendor = rest[..end].trim();

    if vendor.is_empty() {
        None
    } else {
        Some(vendor.to_string())
    }
}

/// Query `codesign` for the Apple Developer Team ID of a bundle.
///
/// Unsigned applications are common and `codesign` exits non-zero for
/// them; any failure here yields `None` and never blocks the rest of
/// extraction.
pub fn probe_team_id(bundle_path: &Path) -> Option<String> {
    let output = Command::new("codesign")
        .arg("-dv")
        .arg(bundle_path)
        .output()
        .ok()?;

    // codesign prints signature details on stderr.
    let details = String::from_utf8_lossy(&output.stderr);

    for line in details.lines() {
        if let Some(value) = line.trim().strip_prefix("TeamIdentifier=") {
            let value = value.trim();
            if !value.is_empty() && value != "not set" {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Convert an `.icns` file to a 128x128 PNG via the system `sips` tool.
fn icns_to_png(icns: &Path) -> Option<Vec<u8>> {
    let staging = tempfile::Builder::new().suffix(".png").tempfile().ok()?;

    let output = Command::new("sips")
        .args(["-s", "format", "png", "-z", "128", "128"])
        .arg(icns)
        .arg("--out")
        .arg(staging.path())
        .output()
        .ok()?;

    if output.status.success() {
        std::fs::read(staging.path()).ok().filter(|d| !d.is_empty())
    } else {
        None
    }
}

/// Discovery probe for macOS application bundles.
#[derive(Clone, Debug)]
pub struct MacosProbe {
    search_roots: Vec<PathBuf>,
    icons_dir: Option<PathBuf>,
}

impl Default for MacosProbe {
    fn default() -> Self {
        Self::new(DiscoverOptions::default())
    }
}

impl MacosProbe {
    pub fn new(options: DiscoverOptions) -> Self {
        let mut search_roots = vec![PathBuf::from("/Applications")];

        if let Some(home) = dirs::home_dir() {
            search_roots.push(home.join("Applications"));
        }

        search_roots.push(PathBuf::from("/System/Applications"));

        Self {
            search_roots,
            icons_dir: options.icons_dir,
        }
    }

    /// Replace the default search roots. Mostly for tests.
    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    /// Probe one `.app` directory.
    ///
    /// Missing `CFBundleIdentifier` is a skip; every enrichment field is
    /// extracted independently of the others.
    pub fn probe_bundle(&self, path: &Path) -> ProbeOutcome {
        let bundle = match AppBundle::open(path) {
            Ok(bundle) => bundle,
            Err(e) => return ProbeOutcome::skipped(path, format!("{:#}", e)),
        };

        let bundle_id = match bundle.identifier() {
            Some(id) => id,
            None => return ProbeOutcome::skipped(path, "no CFBundleIdentifier"),
        };

        let name = bundle.display_name();
        let hint = classify::classify(&name, &bundle_id);
        let team_id = probe_team_id(path);

        let mut id = normalize_id(&name);
        if id.is_empty() {
            // Symbol-only display name; derive from the bundle identifier.
            id = normalize_id(&bundle_id);
        }

        let mut candidate = CandidateRecord {
            id,
            category: classify::category(&name, hint).to_string(),
            vendor: bundle.vendor_guess(),
            source_path: path.display().to_string(),
            macos: Some(MacosSignature {
                bundle_id: bundle_id.clone(),
                team_id,
                paths: vec![path.display().to_string()],
                executable_name: bundle.executable(),
            }),
            windows: None,
            linux: None,
            version: bundle.version(),
            ai_hint: hint,
            discovered_at: Utc::now(),
            icon_file: None,
            name,
        };

        if let Some(icons_dir) = &self.icons_dir {
            candidate.icon_file = self.extract_icon(&bundle, &candidate.id, icons_dir);
        }

        ProbeOutcome::Candidate(Box::new(candidate))
    }

    fn extract_icon(&self, bundle: &AppBundle, id: &str, icons_dir: &Path) -> Option<String> {
        let source = bundle.icon_source()?;
        let png = icns_to_png(&source)?;

        let file_name = format!("{}.png", id);
        match std::fs::write(icons_dir.join(&file_name), png) {
            Ok(()) => Some(file_name),
            Err(e) => {
                log::warn!(
                    "unable to write icon for {}: {}",
                    bundle.root_dir().display(),
                    e
                );
                None
            }
        }
    }

    fn scan_into(&self, root: &Path, seen: &mut HashSet<String>, outcomes: &mut Vec<ProbeOutcome>) {
        // `.app` directories at the top level plus one level of
        // subdirectories (Utilities and the like). Never descend into a
        // bundle itself.
        for entry in walkdir::WalkDir::new(root)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.file_type().is_dir()
                    && !e
                        .path()
                        .parent()
                        .map(|p| p.extension().and_then(|x| x.to_str()) == Some("app"))
                        .unwrap_or(false)
            })
            .flatten()
        {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("app") {
                continue;
            }

            let outcome = self.probe_bundle(entry.path());

            if let Some(candidate) = outcome.candidate() {
                let bundle_id = candidate
                    .macos
                    .as_ref()
                    .map(|s| s.bundle_id.clone())
                    .unwrap_or_default();

                // The same application often appears under multiple
                // roots; first discovery wins.
                if !seen.insert(bundle_id) {
                    continue;
                }
            }

            outcomes.push(outcome);
        }
    }
}

impl Probe for MacosProbe {
    fn platform(&self) -> &'static str {
        "macos"
    }

    fn default_roots(&self) -> Vec<PathBuf> {
        self.search_roots.clone()
    }

    fn scan_root(&self, root: &Path) -> Vec<ProbeOutcome> {
        // A root that is itself a bundle is probed directly.
        if root.extension().and_then(|e| e.to_str()) == Some("app") {
            return vec![self.probe_bundle(root)];
        }

        let mut seen = HashSet::new();
        let mut outcomes = vec![];
        self.scan_into(root, &mut seen, &mut outcomes);

        outcomes
    }

    fn discover(&self) -> Vec<ProbeOutcome> {
        let mut seen = HashSet::new();
        let mut outcomes = vec![];

        for root in &self.search_roots {
            if root.is_dir() {
                self.scan_into(root, &mut seen, &mut outcomes);
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_plist(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
        let mut dict = plist::Dictionary::new();
        for (key, value) in entries {
            dict.insert(key.to_string(), plist::Value::from(value.to_string()));
        }

        std::fs::create_dir_all(path.parent().unwrap())?;
        plist::Value::from(dict).to_file_xml(path)?;

        Ok(())
    }

    fn make_app(root: &Path, name: &str, entries: &[(&str, &str)]) -> Result<PathBuf> {
        let app = root.join(format!("{}.app", name));
        write_plist(&app.join("Contents").join("Info.plist"), entries)?;

        Ok(app)
    }

    #[test]
    fn probe_extracts_identity() -> Result<()> {
        let td = tempfile::tempdir()?;
        let app = make_app(
            td.path(),
            "Cursor",
            &[
                ("CFBundleIdentifier", "com.todesktop.230313mzl4w4u92"),
                ("CFBundleName", "Cursor"),
                ("CFBundleShortVersionString", "0.42.3"),
                ("CFBundleExecutable", "Cursor"),
                ("NSHumanReadableCopyright", "© 2024 Anysphere Inc. All rights reserved."),
            ],
        )?;

        let probe = MacosProbe::default();
        let candidate = probe.probe_bundle(&app).into_candidate().expect("candidate");

        assert_eq!(candidate.id, "cursor");
        assert_eq!(candidate.name, "Cursor");
        assert_eq!(candidate.vendor.as_deref(), Some("Anysphere Inc"));
        assert_eq!(candidate.version.as_deref(), Some("0.42.3"));
        assert!(candidate.ai_hint.is_ai_app);

        let sig = candidate.macos.expect("macos signature");
        assert_eq!(sig.bundle_id, "com.todesktop.230313mzl4w4u92");
        assert_eq!(sig.executable_name.as_deref(), Some("Cursor"));
        assert_eq!(sig.paths, vec![app.display().to_string()]);

        Ok(())
    }

    #[test]
    fn missing_identifier_skips_but_scan_continues() -> Result<()> {
        let td = tempfile::tempdir()?;

        make_app(td.path(), "Broken", &[("CFBundleName", "Broken")])?;
        make_app(
            td.path(),
            "Zed",
            &[("CFBundleIdentifier", "dev.zed.Zed"), ("CFBundleName", "Zed")],
        )?;

        let probe = MacosProbe::default();
        let outcomes = probe.scan_root(td.path());
        assert_eq!(outcomes.len(), 2);

        let candidates = outcomes
            .iter()
            .filter_map(|o| o.candidate())
            .collect::<Vec<_>>();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "zed");

        assert!(outcomes.iter().any(|o| matches!(
            o,
            ProbeOutcome::Skipped { reason, .. } if reason.contains("CFBundleIdentifier")
        )));

        Ok(())
    }

    #[test]
    fn unsigned_bundle_still_yields_candidate() -> Result<()> {
        // No real code signature anywhere near this bundle; the signer
        // probe must come back empty without failing extraction.
        let td = tempfile::tempdir()?;
        let app = make_app(
            td.path(),
            "Plain",
            &[("CFBundleIdentifier", "org.example.plain")],
        )?;

        let candidate = MacosProbe::default()
            .probe_bundle(&app)
            .into_candidate()
            .expect("candidate");

        assert_eq!(candidate.macos.unwrap().team_id, None);

        Ok(())
    }

    #[test]
    fn scan_finds_apps_one_level_deep_and_dedups() -> Result<()> {
        let td = tempfile::tempdir()?;

        make_app(
            td.path(),
            "Zed",
            &[("CFBundleIdentifier", "dev.zed.Zed"), ("CFBundleName", "Zed")],
        )?;
        make_app(
            &td.path().join("Utilities"),
            "Deep",
            &[("CFBundleIdentifier", "org.example.deep")],
        )?;
        // Same bundle id under another name; only the first wins.
        make_app(
            &td.path().join("Utilities"),
            "Zed Copy",
            &[("CFBundleIdentifier", "dev.zed.Zed")],
        )?;

        let probe = MacosProbe::default();
        let mut ids = probe
            .scan_root(td.path())
            .into_iter()
            .filter_map(|o| o.into_candidate())
            .map(|c| c.macos.unwrap().bundle_id)
            .collect::<Vec<_>>();
        ids.sort();

        assert_eq!(ids, vec!["dev.zed.Zed", "org.example.deep"]);

        Ok(())
    }

    #[test]
    fn fallback_name_from_directory_stem() -> Result<()> {
        let td = tempfile::tempdir()?;
        let app = make_app(
            td.path(),
            "Nameless",
            &[("CFBundleIdentifier", "org.example.nameless")],
        )?;

        let candidate = MacosProbe::default()
            .probe_bundle(&app)
            .into_candidate()
            .expect("candidate");
        assert_eq!(candidate.name, "Nameless");
        assert_eq!(candidate.id, "nameless");

        Ok(())
    }

    #[test]
    fn vendor_copyright_parsing() {
        assert_eq!(
            vendor_from_copyright("© 2024 Acme Inc. All rights reserved."),
            Some("Acme Inc".to_string())
        );
        assert_eq!(
            vendor_from_copyright("Copyright © 2019-2024 Example Corp"),
            Some("Example Corp".to_string())
        );
        assert_eq!(
            vendor_from_copyright("© Anysphere All rights reserved"),
            Some("Anysphere".to_string())
        );
        assert_eq!(
            vendor_from_copyright("© 2024 1Password"),
            Some("1Password".to_string())
        );
        assert_eq!(vendor_from_copyright("no copyright symbol"), None);
        assert_eq!(vendor_from_copyright("© 2024"), None);
    }

    #[test]
    fn icon_source_resolution() -> Result<()> {
        let td = tempfile::tempdir()?;
        let app = make_app(
            td.path(),
            "Iconic",
            &[
                ("CFBundleIdentifier", "org.example.iconic"),
                ("CFBundleIconFile", "AppIcon"),
            ],
        )?;

        let resources = app.join("Contents").join("Resources");
        std::fs::create_dir_all(&resources)?;
        std::fs::write(resources.join("AppIcon.icns"), b"icns")?;

        let bundle = AppBundle::open(&app)?;
        assert_eq!(bundle.icon_source(), Some(resources.join("AppIcon.icns")));

        Ok(())
    }

    #[test]
    fn icon_source_falls_back_to_any_icns() -> Result<()> {
        let td = tempfile::tempdir()?;
        let app = make_app(
            td.path(),
            "Fallback",
            &[
                ("CFBundleIdentifier", "org.example.fallback"),
                ("CFBundleIconFile", "Missing"),
            ],
        )?;

        let resources = app.join("Contents").join("Resources");
        std::fs::create_dir_all(&resources)?;
        std::fs::write(resources.join("other.icns"), b"icns")?;

        let bundle = AppBundle::open(&app)?;
        assert_eq!(bundle.icon_source(), Some(resources.join("other.icns")));

        Ok(())
    }

    #[test]
    fn not_a_bundle_errors() -> Result<()> {
        let td = tempfile::tempdir()?;

        let empty = td.path().join("Empty.app");
        std::fs::create_dir_all(&empty)?;
        assert!(AppBundle::open(&empty).is_err());
        assert!(AppBundle::open(&td.path().join("missing")).is_err());

        Ok(())
    }

    #[test]
    fn shallow_bundle_supported() -> Result<()> {
        let td = tempfile::tempdir()?;
        let app = td.path().join("Shallow.app");
        write_plist(
            &app.join("Info.plist"),
            &[("CFBundleIdentifier", "org.example.shallow")],
        )?;

        let bundle = AppBundle::open(&app)?;
        assert_eq!(bundle.identifier().as_deref(), Some("org.example.shallow"));
        assert_eq!(bundle.display_name(), "Shallow");

        Ok(())
    }
}
