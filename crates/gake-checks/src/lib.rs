//! Startup checks run before gameplay: asset verification, the log splash, and the battery gate.

pub mod power;
pub mod registry;
pub mod splash;
pub mod verify;

use std::path::PathBuf;

use gake_core::{CrashCause, Dialog, StartupConfig};
use gake_modules_logging::{logmsg, Category, Priority, HIGHLIGHT, HIGHLIGHT_END};

pub use power::{
    evaluate_power, BatteryThresholds, PowerSource, PowerState, PowerStatus, PowerVerdict,
    SysfsPowerSource,
};
pub use registry::{AssetDescriptor, AssetDigest, ASSET_REGISTRY, DIGEST_LEN};
pub use splash::{select_splash, splash_index, EntropySource, FixedEntropy, OsEntropy};
pub use verify::{verify_all, verify_asset, AssetFailure, VerificationReport};

/// Result of [`StartupChecks::run_checks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Playable, but the player has been warned to look at their battery.
    BatteryIndeterminate,
    Proceed,
    AssetsInvalid,
    BatteryInsufficient,
}

impl CheckOutcome {
    #[inline]
    pub fn may_proceed(self) -> bool {
        matches!(self, CheckOutcome::Proceed | CheckOutcome::BatteryIndeterminate)
    }

    /// Crash cause the caller should raise, if any.
    pub fn crash_cause(self) -> Option<CrashCause> {
        match self {
            CheckOutcome::Proceed | CheckOutcome::BatteryIndeterminate => None,
            CheckOutcome::AssetsInvalid => Some(CrashCause::AssetsInvalid),
            CheckOutcome::BatteryInsufficient => Some(CrashCause::BatteryInsufficient),
        }
    }
}

/// Everything `run_checks` consults. Built from config; each collaborator can be swapped.
pub struct StartupChecks<'a> {
    product: String,
    assets_root: PathBuf,
    registry: &'a [AssetDescriptor],
    splash_path: PathBuf,
    thresholds: BatteryThresholds,
    entropy: Box<dyn EntropySource + 'a>,
    power: Box<dyn PowerSource + 'a>,
    dialog: &'a dyn Dialog,
}

impl<'a> StartupChecks<'a> {
    pub fn from_config(cfg: &StartupConfig, dialog: &'a dyn Dialog) -> Self {
        Self {
            product: cfg.product_name.clone(),
            assets_root: cfg.assets_root.clone(),
            registry: ASSET_REGISTRY,
            splash_path: cfg.splash_path(),
            thresholds: BatteryThresholds {
                min_seconds: cfg.battery_min_seconds,
                min_percent: cfg.battery_min_percent,
            },
            entropy: Box::new(OsEntropy),
            power: Box::new(SysfsPowerSource::default()),
            dialog,
        }
    }

    pub fn with_registry(mut self, registry: &'a [AssetDescriptor]) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_entropy(mut self, entropy: impl EntropySource + 'a) -> Self {
        self.entropy = Box::new(entropy);
        self
    }

    pub fn with_power_source(mut self, power: impl PowerSource + 'a) -> Self {
        self.power = Box::new(power);
        self
    }

    /// Assets first (fatal), then the splash (cosmetic), then power (soft).
    pub fn run_checks(&mut self) -> CheckOutcome {
        let report = verify_all(&self.assets_root, self.registry);
        if !report.is_ok() {
            return CheckOutcome::AssetsInvalid;
        }

        self.log_splash();
        self.check_power()
    }

    fn log_splash(&mut self) {
        match select_splash(&self.splash_path, self.entropy.as_mut()) {
            Some(text) => logmsg!(
                Priority::Info,
                Category::Checks,
                "{HIGHLIGHT}{text}{HIGHLIGHT_END}"
            ),
            None => logmsg!(Priority::Notice, Category::Checks, "No log splash found."),
        }
    }

    fn check_power(&self) -> CheckOutcome {
        let status = self.power.query();
        match evaluate_power(status, self.thresholds) {
            PowerVerdict::Indeterminate => {
                logmsg!(
                    Priority::Warning,
                    Category::Checks,
                    "Battery state is indeterminable!  Warning user…"
                );
                self.dialog.warn(
                    &format!("{} | Battery State Indeterminable", self.product),
                    "Please check your battery before playing.",
                );
                CheckOutcome::BatteryIndeterminate
            }
            PowerVerdict::Insufficient => {
                logmsg!(
                    Priority::Error,
                    Category::Checks,
                    "User does not have enough battery left! ({}s, {}%)",
                    status.seconds,
                    status.percent
                );
                CheckOutcome::BatteryInsufficient
            }
            PowerVerdict::Proceed => {
                if status.state != PowerState::NoBattery {
                    logmsg!(Priority::Info, Category::Checks, "Battery is fine.");
                }
                CheckOutcome::Proceed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_crash_codes() {
        assert_eq!(CheckOutcome::AssetsInvalid.crash_cause().map(|c| c.code()), Some(0x0C));
        assert_eq!(
            CheckOutcome::BatteryInsufficient.crash_cause().map(|c| c.code()),
            Some(0x0D)
        );
        assert_eq!(CheckOutcome::Proceed.crash_cause(), None);
        assert!(CheckOutcome::BatteryIndeterminate.may_proceed());
        assert!(!CheckOutcome::AssetsInvalid.may_proceed());
    }
}
