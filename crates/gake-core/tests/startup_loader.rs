use std::fs;
use std::path::PathBuf;

use gake_core::startup::{StartupConfigSource, StartupOverrideSource, StartupResolvedFrom};
use gake_core::{ConfigPaths, GakeError, StartupLoader, StartupOverrides};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("gake.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let paths = ConfigPaths::new(dir.path().join("absent.json"), None);

    let (cfg, report) =
        StartupLoader::load_layered(&paths, &StartupOverrides::empty(), &StartupOverrides::empty())
            .unwrap();

    assert!(report.is_defaults());
    assert!(!report.has_overrides());
    assert_eq!(cfg.product_name, "Gake");
    assert_eq!(cfg.battery_min_seconds, 900);
    assert_eq!(cfg.battery_min_percent, 15);
    assert!(cfg.quit_is_benign);
}

#[test]
fn file_layer_is_applied_and_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "assets": { "root": "/srv/gake" },
            "logging": { "file": false },
            "battery": { "min_percent": 20 }
        }"#,
    );

    let (cfg, report) = StartupLoader::load_layered(
        &ConfigPaths::new(&path, None),
        &StartupOverrides::empty(),
        &StartupOverrides::empty(),
    )
    .unwrap();

    assert_eq!(cfg.assets_root, PathBuf::from("/srv/gake"));
    assert!(!cfg.log_file);
    assert_eq!(cfg.battery_min_percent, 20);
    assert_eq!(report.used_file(), Some(path.as_path()));
    assert!(matches!(report.resolved_from, StartupResolvedFrom::Absolute));
    assert!(matches!(report.source, StartupConfigSource::File { .. }));
    assert_eq!(report.overrides.len(), 3);
    assert!(report
        .overrides
        .iter()
        .all(|o| o.source == StartupOverrideSource::File));
}

#[test]
fn env_and_programmatic_layers_win_over_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "assets": { "root": "/from/file" } }"#);

    let env = StartupOverrides {
        assets_root: Some(PathBuf::from("/from/env")),
        ..StartupOverrides::default()
    };
    let programmatic = StartupOverrides {
        state_dir: Some(dir.path().to_path_buf()),
        ..StartupOverrides::default()
    };

    let (cfg, report) =
        StartupLoader::load_layered(&ConfigPaths::new(&path, None), &env, &programmatic).unwrap();

    assert_eq!(cfg.assets_root, PathBuf::from("/from/env"));
    assert_eq!(cfg.state_dir.as_deref(), Some(dir.path()));
    assert_eq!(report.source, StartupConfigSource::Mixed);
    assert_eq!(report.used_file(), Some(path.as_path()));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{ not json");

    let err = StartupLoader::load_layered(
        &ConfigPaths::new(&path, None),
        &StartupOverrides::empty(),
        &StartupOverrides::empty(),
    )
    .unwrap_err();

    assert!(matches!(err, GakeError::ConfigParse { .. }));
}

#[test]
fn misspelled_key_in_a_section_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "battery": { "min_secnods": 60 } }"#);

    let err = StartupLoader::load_layered(
        &ConfigPaths::new(&path, None),
        &StartupOverrides::empty(),
        &StartupOverrides::empty(),
    )
    .unwrap_err();

    assert!(matches!(err, GakeError::ConfigParse { .. }));
}

#[test]
fn root_dir_is_searched() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, r#"{ "product": "Gake-Test" }"#);

    let paths = ConfigPaths::new("gake.json", None).with_root_dir(dir.path());
    let (cfg, report) =
        StartupLoader::load_layered(&paths, &StartupOverrides::empty(), &StartupOverrides::empty())
            .unwrap();

    assert_eq!(cfg.product_name, "Gake-Test");
    assert!(matches!(report.resolved_from, StartupResolvedFrom::RootDir));
}
