// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `appcat` - discover installed applications and build the identity
//! catalog bundle.

use {
    anyhow::{anyhow, Context, Result},
    app_catalog::{build_bundle, validate_snapshot, Snapshot, ValidationReport},
    app_signatures::{
        candidate::{collect_candidates, DiscoveryReport},
        host_probe, DiscoverOptions, Probe,
    },
    clap::{Arg, ArgMatches, Command},
    log::{info, LevelFilter},
    std::path::PathBuf,
};

fn command_discover(args: &ArgMatches) -> Result<()> {
    // Usage errors must leave no partial work behind, so the path
    // argument is checked before anything touches the filesystem.
    let single_path = match args.value_of("path") {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.is_dir() {
                return Err(anyhow!(
                    "{} does not resolve to an existing directory",
                    path.display()
                ));
            }

            Some(path)
        }
        None => None,
    };

    let yaml_dir = args.value_of("yaml_dir").map(PathBuf::from);

    let icons_dir = if args.is_present("with_icons") {
        let dir = match (args.value_of("icons_dir"), &yaml_dir) {
            (Some(dir), _) => PathBuf::from(dir),
            (None, Some(yaml_dir)) => yaml_dir.join("icons"),
            (None, None) => {
                return Err(anyhow!(
                    "--with-icons requires --icons-dir or --yaml-dir to place the icons"
                ));
            }
        };

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating icons directory {}", dir.display()))?;

        Some(dir)
    } else {
        None
    };

    let probe = host_probe(DiscoverOptions { icons_dir })
        .ok_or_else(|| anyhow!("unsupported platform: {}", std::env::consts::OS))?;

    info!("discovering applications on {}", probe.platform());

    let outcomes = match &single_path {
        Some(path) => probe.scan_root(path),
        None => probe.discover(),
    };

    let probed = outcomes.len();
    let mut candidates = collect_candidates(outcomes);

    if args.is_present("ai_only") {
        candidates.retain(|c| c.ai_hint.is_ai_app || c.ai_hint.is_ai_host);
    }

    let report = DiscoveryReport::new(probe.platform(), candidates);
    info!(
        "probed {} entries: {} candidates, {} AI apps, {} AI hosts",
        probed, report.total_apps, report.ai_apps, report.ai_host_apps
    );

    if let Some(yaml_dir) = yaml_dir {
        std::fs::create_dir_all(&yaml_dir)
            .with_context(|| format!("creating {}", yaml_dir.display()))?;

        for candidate in &report.apps {
            let path = yaml_dir.join(format!("{}.yaml", candidate.id));
            std::fs::write(&path, candidate.to_yaml()?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
    } else {
        print!("{}", report.to_json()?);
    }

    Ok(())
}

fn load_and_validate(args: &ArgMatches) -> Result<(Snapshot, ValidationReport, PathBuf)> {
    let apps_dir = PathBuf::from(args.value_of("apps_dir").unwrap_or("apps"));
    let icons_dir = args
        .value_of("icons_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| apps_dir.join("icons"));

    let snapshot = Snapshot::load(&apps_dir)
        .with_context(|| format!("loading records from {}", apps_dir.display()))?;

    let report = validate_snapshot(&snapshot, &icons_dir);

    Ok((snapshot, report, apps_dir))
}

fn command_validate(args: &ArgMatches) -> Result<()> {
    let (snapshot, report, apps_dir) = load_and_validate(args)?;

    for violation in report.violations() {
        println!("{}", violation);
    }

    if !report.is_clean() {
        return Err(anyhow!(
            "{} violation(s) across {} record(s)",
            report.violations().len(),
            snapshot.len()
        ));
    }

    info!(
        "{} record(s) in {} are valid",
        snapshot.len(),
        apps_dir.display()
    );

    Ok(())
}

fn command_build(args: &ArgMatches) -> Result<()> {
    let (snapshot, report, _) = load_and_validate(args)?;

    // A release build must never publish while violations exist.
    if !report.is_clean() {
        for violation in report.violations() {
            println!("{}", violation);
        }

        return Err(anyhow!(
            "refusing to build: {} validation violation(s)",
            report.violations().len()
        ));
    }

    let output = PathBuf::from(args.value_of("output").unwrap_or("apps.json"));

    let bundle = build_bundle(&report.valid_records(&snapshot));
    bundle
        .write(&output)
        .with_context(|| format!("publishing {}", output.display()))?;

    info!(
        "wrote {} with {} app(s) ({} AI-related)",
        output.display(),
        bundle.total_apps,
        bundle.ai_apps
    );

    Ok(())
}

fn main_impl() -> Result<()> {
    let app = Command::new("appcat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Discover installed applications and build the identity catalog")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(
        Command::new("discover")
            .about("Probe installed applications and emit candidate records")
            .arg(
                Arg::new("path")
                    .help("Probe a single directory instead of the default search roots"),
            )
            .arg(
                Arg::new("yaml_dir")
                    .long("yaml-dir")
                    .takes_value(true)
                    .value_name("DIR")
                    .help("Write one YAML candidate file per application to DIR"),
            )
            .arg(
                Arg::new("ai_only")
                    .long("ai-only")
                    .help("Only emit applications matching the AI keyword lists"),
            )
            .arg(
                Arg::new("with_icons")
                    .long("with-icons")
                    .help("Extract application icons as PNG"),
            )
            .arg(
                Arg::new("icons_dir")
                    .long("icons-dir")
                    .takes_value(true)
                    .value_name("DIR")
                    .help("Directory to save extracted icons"),
            ),
    );

    let app = app.subcommand(
        Command::new("validate")
            .about("Check all profile records against the catalog invariants")
            .arg(
                Arg::new("apps_dir")
                    .long("apps-dir")
                    .takes_value(true)
                    .value_name("DIR")
                    .default_value("apps")
                    .help("Directory holding the per-application YAML records"),
            )
            .arg(
                Arg::new("icons_dir")
                    .long("icons-dir")
                    .takes_value(true)
                    .value_name("DIR")
                    .help("Directory icon references resolve against [default: <apps-dir>/icons]"),
            ),
    );

    let app = app.subcommand(
        Command::new("build")
            .about("Validate all records and publish the consolidated bundle")
            .arg(
                Arg::new("apps_dir")
                    .long("apps-dir")
                    .takes_value(true)
                    .value_name("DIR")
                    .default_value("apps")
                    .help("Directory holding the per-application YAML records"),
            )
            .arg(
                Arg::new("icons_dir")
                    .long("icons-dir")
                    .takes_value(true)
                    .value_name("DIR")
                    .help("Directory icon references resolve against [default: <apps-dir>/icons]"),
            )
            .arg(
                Arg::new("output")
                    .long("output")
                    .short('o')
                    .takes_value(true)
                    .value_name("FILE")
                    .default_value("apps.json")
                    .help("Where to write the bundle artifact"),
            ),
    );

    let matches = app.get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("discover", args)) => command_discover(args),
        Some(("validate", args)) => command_validate(args),
        Some(("build", args)) => command_build(args),
        _ => Err(anyhow!("unknown command")),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
