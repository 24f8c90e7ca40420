use std::fs;
use std::path::{Path, PathBuf};

/// Default sysfs location of power supplies on Linux.
pub const SYSFS_POWER_SUPPLY: &str = "/sys/class/power_supply";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Unknown,
    NoBattery,
    OnBattery,
    Charging,
    Charged,
}

/// One fresh reading. `-1` marks an unknown estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStatus {
    pub state: PowerState,
    pub seconds: i64,
    pub percent: i32,
}

impl PowerStatus {
    pub const UNKNOWN: i64 = -1;

    #[inline]
    pub const fn new(state: PowerState, seconds: i64, percent: i32) -> Self {
        Self {
            state,
            seconds,
            percent,
        }
    }

    #[inline]
    pub const fn unknown() -> Self {
        Self::new(PowerState::Unknown, -1, -1)
    }
}

/// Host power query. Never cached: every call reads the host again.
pub trait PowerSource {
    fn query(&self) -> PowerStatus;
}

/// Reads `type`, `status`, `capacity` and the energy/charge counters under a sysfs root.
#[derive(Debug, Clone)]
pub struct SysfsPowerSource {
    root: PathBuf,
}

impl Default for SysfsPowerSource {
    fn default() -> Self {
        Self::new(SYSFS_POWER_SUPPLY)
    }
}

impl SysfsPowerSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_trimmed(path: &Path) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_owned())
    }

    fn read_num(path: &Path) -> Option<i64> {
        Self::read_trimmed(path)?.parse().ok()
    }

    /// System batteries only; `scope = Device` marks peripherals such as wireless mice.
    fn batteries(&self) -> Option<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).ok()?;

        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| Self::read_trimmed(&p.join("type")).as_deref() == Some("Battery"))
            .filter(|p| Self::read_trimmed(&p.join("scope")).as_deref() != Some("Device"))
            .collect();
        found.sort();
        Some(found)
    }

    fn seconds_left(bat: &Path) -> i64 {
        let pair = |now: &str, rate: &str| -> Option<i64> {
            let amount = Self::read_num(&bat.join(now))?;
            let rate = Self::read_num(&bat.join(rate))?.abs();
            (rate > 0 && amount >= 0).then(|| amount.saturating_mul(3600) / rate)
        };

        pair("energy_now", "power_now")
            .or_else(|| pair("charge_now", "current_now"))
            .unwrap_or(PowerStatus::UNKNOWN)
    }
}

impl PowerSource for SysfsPowerSource {
    fn query(&self) -> PowerStatus {
        let Some(batteries) = self.batteries() else {
            log::debug!(target: "power", "no power supply class at {}", self.root.display());
            return PowerStatus::unknown();
        };
        let Some(bat) = batteries.first() else {
            return PowerStatus::new(PowerState::NoBattery, -1, -1);
        };

        let status = Self::read_trimmed(&bat.join("status")).unwrap_or_default();
        let state = match status.as_str() {
            "Discharging" => PowerState::OnBattery,
            "Charging" => PowerState::Charging,
            "Full" | "Not charging" => PowerState::Charged,
            _ => PowerState::Unknown,
        };

        let percent = Self::read_num(&bat.join("capacity"))
            .map(|p| p.clamp(0, 100) as i32)
            .unwrap_or(-1);
        let seconds = if state == PowerState::OnBattery {
            Self::seconds_left(bat)
        } else {
            -1
        };

        log::debug!(
            target: "power",
            "{}: status={status:?} percent={percent} seconds={seconds}",
            bat.display()
        );
        PowerStatus::new(state, seconds, percent)
    }
}

/// Minimum charge required to start on battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryThresholds {
    pub min_seconds: i64,
    pub min_percent: i32,
}

impl Default for BatteryThresholds {
    fn default() -> Self {
        Self {
            min_seconds: 900,
            min_percent: 15,
        }
    }
}

/// Three-valued power decision. Callers must keep `Indeterminate` apart from `Proceed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerVerdict {
    Proceed,
    Indeterminate,
    Insufficient,
}

/// Both estimates unknown is indeterminate. A single unknown estimate compares as `-1`, so it
/// counts as below its threshold.
pub fn evaluate_power(status: PowerStatus, limits: BatteryThresholds) -> PowerVerdict {
    match status.state {
        PowerState::NoBattery | PowerState::Charging | PowerState::Charged => PowerVerdict::Proceed,
        PowerState::Unknown => PowerVerdict::Indeterminate,
        PowerState::OnBattery => {
            if status.seconds < 0 && status.percent < 0 {
                return PowerVerdict::Indeterminate;
            }

            if status.seconds < limits.min_seconds || status.percent < limits.min_percent {
                PowerVerdict::Insufficient
            } else {
                PowerVerdict::Proceed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn on_battery(seconds: i64, percent: i32) -> PowerStatus {
        PowerStatus::new(PowerState::OnBattery, seconds, percent)
    }

    #[test]
    fn battery_thresholds() {
        let t = BatteryThresholds::default();
        assert_eq!(evaluate_power(on_battery(1000, 50), t), PowerVerdict::Proceed);
        assert_eq!(evaluate_power(on_battery(800, 50), t), PowerVerdict::Insufficient);
        assert_eq!(evaluate_power(on_battery(1000, 10), t), PowerVerdict::Insufficient);
        assert_eq!(evaluate_power(on_battery(-1, -1), t), PowerVerdict::Indeterminate);
        assert_eq!(evaluate_power(on_battery(900, 15), t), PowerVerdict::Proceed);
    }

    #[test]
    fn single_unknown_estimate_counts_as_low() {
        let t = BatteryThresholds::default();
        assert_eq!(evaluate_power(on_battery(-1, 50), t), PowerVerdict::Insufficient);
        assert_eq!(evaluate_power(on_battery(7200, -1), t), PowerVerdict::Insufficient);
        assert_eq!(evaluate_power(on_battery(-1, 5), t), PowerVerdict::Insufficient);
    }

    #[test]
    fn non_battery_states() {
        let t = BatteryThresholds::default();
        let s = |state| PowerStatus::new(state, -1, -1);
        assert_eq!(evaluate_power(s(PowerState::NoBattery), t), PowerVerdict::Proceed);
        assert_eq!(evaluate_power(s(PowerState::Charging), t), PowerVerdict::Proceed);
        assert_eq!(evaluate_power(s(PowerState::Charged), t), PowerVerdict::Proceed);
        assert_eq!(evaluate_power(s(PowerState::Unknown), t), PowerVerdict::Indeterminate);
    }

    fn supply(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, value) in files {
            fs::write(dir.join(file), format!("{value}\n")).unwrap();
        }
    }

    #[test]
    fn sysfs_discharging_battery() {
        let root = TempDir::new().unwrap();
        supply(root.path(), "AC", &[("type", "Mains"), ("online", "0")]);
        supply(
            root.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("capacity", "42"),
                ("energy_now", "20000000"),
                ("power_now", "10000000"),
            ],
        );

        let st = SysfsPowerSource::new(root.path()).query();
        assert_eq!(st, on_battery(7200, 42));
    }

    #[test]
    fn sysfs_without_batteries() {
        let root = TempDir::new().unwrap();
        supply(root.path(), "AC", &[("type", "Mains"), ("online", "1")]);
        supply(
            root.path(),
            "hidpp_battery_0",
            &[("type", "Battery"), ("scope", "Device"), ("status", "Discharging")],
        );

        assert_eq!(
            SysfsPowerSource::new(root.path()).query().state,
            PowerState::NoBattery
        );
    }

    #[test]
    fn sysfs_missing_root_is_unknown() {
        let root = TempDir::new().unwrap();
        let st = SysfsPowerSource::new(root.path().join("absent")).query();
        assert_eq!(st, PowerStatus::unknown());
    }

    #[test]
    fn sysfs_charging_has_no_estimate() {
        let root = TempDir::new().unwrap();
        supply(
            root.path(),
            "BAT1",
            &[("type", "Battery"), ("status", "Charging"), ("capacity", "80")],
        );
        let st = SysfsPowerSource::new(root.path()).query();
        assert_eq!(st, PowerStatus::new(PowerState::Charging, -1, 80));
    }
}
