//! Best-effort external-power detection, one probe per platform.
//!
//! Every probe collapses to a tri-state answer: `Some(true)` on mains
//! power, `Some(false)` on battery, `None` when the platform gives no
//! usable signal. Probe failures of any kind are `None`; nothing here may
//! abort a run.

#[cfg(target_os = "linux")]
pub async fn ac_online() -> Option<bool> {
    linux::probe().await
}

#[cfg(target_os = "macos")]
pub async fn ac_online() -> Option<bool> {
    macos::probe().await
}

#[cfg(target_os = "windows")]
pub async fn ac_online() -> Option<bool> {
    windows::probe().await
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub async fn ac_online() -> Option<bool> {
    None
}

#[cfg(target_os = "linux")]
mod linux {
    use std::path::{Path, PathBuf};

    use tokio::fs;

    const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

    pub async fn probe() -> Option<bool> {
        probe_dir(Path::new(POWER_SUPPLY_DIR)).await
    }

    /// Prefer a Mains supply's `online` flag; fall back to treating a
    /// charging or full battery as external power.
    pub(crate) async fn probe_dir(base: &Path) -> Option<bool> {
        let supplies = list_supplies(base).await?;

        for supply in &supplies {
            let Ok(typ) = fs::read_to_string(supply.join("type")).await else {
                continue;
            };
            if typ.trim().eq_ignore_ascii_case("mains") {
                if let Ok(online) = fs::read_to_string(supply.join("online")).await {
                    return Some(online.trim() == "1");
                }
            }
        }

        for supply in &supplies {
            if let Ok(status) = fs::read_to_string(supply.join("status")).await {
                let status = status.trim().to_ascii_lowercase();
                if status == "charging" || status == "full" {
                    return Some(true);
                }
            }
        }

        None
    }

    async fn list_supplies(base: &Path) -> Option<Vec<PathBuf>> {
        let mut entries = fs::read_dir(base).await.ok()?;
        let mut supplies = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            supplies.push(entry.path());
        }
        if supplies.is_empty() {
            None
        } else {
            Some(supplies)
        }
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use tokio::process::Command;

    pub async fn probe() -> Option<bool> {
        let output = Command::new("pmset").args(["-g", "batt"]).output().await.ok()?;
        parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// The first line of `pmset -g batt` names the current power source.
    pub(crate) fn parse(text: &str) -> Option<bool> {
        let first = text.lines().next()?.to_ascii_lowercase();
        if first.contains("ac power") {
            Some(true)
        } else if first.contains("battery power") {
            Some(false)
        } else {
            None
        }
    }
}

#[cfg(target_os = "windows")]
mod windows {
    use tokio::process::Command;

    pub async fn probe() -> Option<bool> {
        let output = Command::new("WMIC")
            .args(["Path", "Win32_Battery", "Get", "BatteryStatus"])
            .output()
            .await
            .ok()?;
        parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Win32_Battery.BatteryStatus: 1 = discharging, 2 = on AC. Desktops
    /// report no battery rows at all, which stays inconclusive.
    pub(crate) fn parse(text: &str) -> Option<bool> {
        for line in text.lines().skip(1) {
            match line.trim() {
                "2" => return Some(true),
                "1" => return Some(false),
                _ => {}
            }
        }
        None
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, target_os = "linux"))]
mod tests {
    use tempfile::TempDir;
    use tokio::fs;

    use super::linux::probe_dir;

    async fn write_supply(dir: &TempDir, name: &str, files: &[(&str, &str)]) {
        let path = dir.path().join(name);
        fs::create_dir_all(&path).await.unwrap();
        for (file, contents) in files {
            fs::write(path.join(file), contents).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_mains_online() {
        let dir = TempDir::new().unwrap();
        write_supply(&dir, "AC", &[("type", "Mains\n"), ("online", "1\n")]).await;
        assert_eq!(probe_dir(dir.path()).await, Some(true));
    }

    #[tokio::test]
    async fn test_mains_offline() {
        let dir = TempDir::new().unwrap();
        write_supply(&dir, "AC", &[("type", "Mains\n"), ("online", "0\n")]).await;
        assert_eq!(probe_dir(dir.path()).await, Some(false));
    }

    #[tokio::test]
    async fn test_charging_battery_implies_external_power() {
        let dir = TempDir::new().unwrap();
        write_supply(&dir, "BAT0", &[("type", "Battery\n"), ("status", "Charging\n")]).await;
        assert_eq!(probe_dir(dir.path()).await, Some(true));
    }

    #[tokio::test]
    async fn test_discharging_battery_is_inconclusive() {
        let dir = TempDir::new().unwrap();
        write_supply(&dir, "BAT0", &[("type", "Battery\n"), ("status", "Discharging\n")]).await;
        assert_eq!(probe_dir(dir.path()).await, None);
    }

    #[tokio::test]
    async fn test_missing_directory_is_inconclusive() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no_such_dir");
        assert_eq!(probe_dir(&missing).await, None);
    }
}
