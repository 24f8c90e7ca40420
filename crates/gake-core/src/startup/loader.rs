use crate::error::{GakeError, GakeResult};
use crate::startup::{
    ConfigPaths, StartupConfig, StartupConfigSource, StartupLoadReport, StartupOverride,
    StartupOverrideSource, StartupOverrides, StartupResolvedFrom,
};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct StartupLoader;

impl StartupLoader {
    /// Loads startup config with layering:
    /// defaults -> file -> env.
    #[inline]
    pub fn load_json(paths: &ConfigPaths) -> GakeResult<(StartupConfig, StartupLoadReport)> {
        Self::load_json_with_overrides(paths, &StartupOverrides::empty())
    }

    /// Loads startup config with layering:
    /// defaults -> file -> env -> programmatic.
    #[inline]
    pub fn load_json_with_overrides(
        paths: &ConfigPaths,
        programmatic: &StartupOverrides,
    ) -> GakeResult<(StartupConfig, StartupLoadReport)> {
        Self::load_layered(paths, &StartupOverrides::from_env(), programmatic)
    }

    /// Same as [`StartupLoader::load_json_with_overrides`] with an explicit env layer.
    pub fn load_layered(
        paths: &ConfigPaths,
        env: &StartupOverrides,
        programmatic: &StartupOverrides,
    ) -> GakeResult<(StartupConfig, StartupLoadReport)> {
        // Defaults alone must start the game.
        let mut cfg = StartupConfig::default();
        let mut report = StartupLoadReport::default();

        // 1) File layer (optional)
        let mut file_used = false;
        if let Some(raw_path) = paths.startup_path() {
            if let Some((resolved, from)) = resolve_startup_file_optional(paths, raw_path) {
                let data =
                    fs::read_to_string(&resolved).map_err(|e| GakeError::io(&resolved, e))?;

                let parsed: RootJson =
                    serde_json::from_str(&data).map_err(|e| GakeError::ConfigParse {
                        path: resolved.clone(),
                        source: e,
                    })?;

                apply_root(&mut cfg, &mut report, parsed);

                cfg.source = StartupConfigSource::File {
                    path: resolved.clone(),
                };
                report.source = cfg.source.clone();
                report.file = Some(resolved);
                report.resolved_from = from;
                file_used = true;
            }
        }

        // 2) Env layer
        apply_overrides(&mut cfg, &mut report, StartupOverrideSource::Env, env);

        // 3) Programmatic layer
        apply_overrides(
            &mut cfg,
            &mut report,
            StartupOverrideSource::Programmatic,
            programmatic,
        );

        let mixed = report
            .overrides
            .iter()
            .any(|o| o.source != StartupOverrideSource::File);

        if mixed {
            cfg.source = StartupConfigSource::Mixed;
            report.source = StartupConfigSource::Mixed;

            if !file_used {
                report.file = None;
                report.resolved_from = StartupResolvedFrom::NotProvided;
            }
        }

        Ok((cfg, report))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RootJson {
    product: Option<String>,
    state_dir: Option<String>,
    assets: Option<AssetsJson>,
    logging: Option<LoggingJson>,
    battery: Option<BatteryJson>,
    signals: Option<SignalsJson>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AssetsJson {
    root: Option<String>,
    splash: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingJson {
    file: Option<bool>,
    filter: Option<String>,
    colors: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BatteryJson {
    min_seconds: Option<i64>,
    min_percent: Option<i32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SignalsJson {
    quit_is_benign: Option<bool>,
}

fn apply_root(cfg: &mut StartupConfig, report: &mut StartupLoadReport, src: RootJson) {
    let ov = StartupOverrides {
        product_name: src.product,
        state_dir: src.state_dir.map(PathBuf::from),
        assets_root: src
            .assets
            .as_ref()
            .and_then(|a| a.root.as_ref())
            .map(PathBuf::from),
        splash_asset: src
            .assets
            .as_ref()
            .and_then(|a| a.splash.as_ref())
            .map(PathBuf::from),
        log_file: src.logging.as_ref().and_then(|l| l.file),
        log_filter: src.logging.as_ref().and_then(|l| l.filter.clone()),
        log_colors: src.logging.as_ref().and_then(|l| l.colors),
        battery_min_seconds: src.battery.as_ref().and_then(|b| b.min_seconds),
        battery_min_percent: src.battery.as_ref().and_then(|b| b.min_percent),
        quit_is_benign: src.signals.and_then(|s| s.quit_is_benign),
    };

    apply_overrides(cfg, report, StartupOverrideSource::File, &ov);
}

fn apply_overrides(
    cfg: &mut StartupConfig,
    report: &mut StartupLoadReport,
    source: StartupOverrideSource,
    ov: &StartupOverrides,
) {
    if let Some(v) = ov.product_name.clone() {
        apply_value(report, source, "product_name", &mut cfg.product_name, v);
    }

    if let Some(v) = ov.assets_root.clone() {
        apply_path(report, source, "assets_root", &mut cfg.assets_root, v);
    }

    if let Some(v) = ov.splash_asset.clone() {
        apply_path(report, source, "splash_asset", &mut cfg.splash_asset, v);
    }

    if let Some(v) = ov.state_dir.clone() {
        let from = cfg
            .state_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<env fallback>".to_owned());
        let to = v.display().to_string();
        if from != to {
            cfg.state_dir = Some(v);
            report.overrides.push(StartupOverride {
                key: "state_dir",
                source,
                from,
                to,
            });
        }
    }

    if let Some(v) = ov.log_file {
        apply_value(report, source, "log_file", &mut cfg.log_file, v);
    }

    if let Some(v) = ov.log_filter.clone() {
        apply_value(report, source, "log_filter", &mut cfg.log_filter, v);
    }

    if let Some(v) = ov.log_colors {
        apply_value(report, source, "log_colors", &mut cfg.log_colors, v);
    }

    if let Some(v) = ov.battery_min_seconds {
        apply_value(
            report,
            source,
            "battery_min_seconds",
            &mut cfg.battery_min_seconds,
            v,
        );
    }

    if let Some(v) = ov.battery_min_percent {
        apply_value(
            report,
            source,
            "battery_min_percent",
            &mut cfg.battery_min_percent,
            v,
        );
    }

    if let Some(v) = ov.quit_is_benign {
        apply_value(report, source, "quit_is_benign", &mut cfg.quit_is_benign, v);
    }
}

fn apply_value<T>(
    report: &mut StartupLoadReport,
    source: StartupOverrideSource,
    key: &'static str,
    slot: &mut T,
    to: T,
) where
    T: PartialEq + ToString,
{
    if *slot == to {
        return;
    }
    let from = slot.to_string();
    let to_s = to.to_string();
    *slot = to;
    report.overrides.push(StartupOverride {
        key,
        source,
        from,
        to: to_s,
    });
}

fn apply_path(
    report: &mut StartupLoadReport,
    source: StartupOverrideSource,
    key: &'static str,
    slot: &mut PathBuf,
    to: PathBuf,
) {
    let from = slot.display().to_string();
    let to_s = to.display().to_string();
    if from == to_s {
        return;
    }
    *slot = to;
    report.overrides.push(StartupOverride {
        key,
        source,
        from,
        to: to_s,
    });
}

fn resolve_startup_file_optional(
    paths: &ConfigPaths,
    raw: &Path,
) -> Option<(PathBuf, StartupResolvedFrom)> {
    if raw.is_absolute() {
        return raw
            .is_file()
            .then(|| (raw.to_path_buf(), StartupResolvedFrom::Absolute));
    }

    if let Ok(cwd) = std::env::current_dir() {
        let p = cwd.join(raw);
        if p.is_file() {
            return Some((p, StartupResolvedFrom::Cwd));
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join(raw);
            if p.is_file() {
                return Some((p, StartupResolvedFrom::ExeDir));
            }
        }
    }

    if let Some(root) = paths.root_dir.as_deref() {
        let p = root.join(raw);
        if p.is_file() {
            return Some((p, StartupResolvedFrom::RootDir));
        }
    }

    None
}
