use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TapPoint {
    pub x: i32,
    pub y: i32,
}

impl TapPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen coordinates for the scanner workflow. The defaults are tuned for a
/// 1080x1920 emulator with the auditor app pinned to its stock layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GestureSettings {
    pub scan: TapPoint,
    pub share: TapPoint,
    pub cancel: TapPoint,
    pub home: TapPoint,
    pub permission_allow: TapPoint,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            scan: TapPoint::new(945, 1650),
            share: TapPoint::new(910, 128),
            cancel: TapPoint::new(654, 1078),
            home: TapPoint::new(540, 1855),
            permission_allow: TapPoint::new(780, 1080),
        }
    }
}

/// Fixed settle delays, in milliseconds. These are the only timeout mechanism
/// the engine has: device animations and cache writes must finish within them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelaySettings {
    pub launch_settle_ms: u64,
    pub pre_scan_ms: u64,
    pub scan_result_ms: u64,
    pub between_taps_ms: u64,
    pub permission_ms: u64,
    pub recovery_ms: u64,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            launch_settle_ms: 3000,
            pre_scan_ms: 1000,
            scan_result_ms: 5000,
            between_taps_ms: 1000,
            permission_ms: 1000,
            recovery_ms: 1000,
        }
    }
}

#[cfg(test)]
impl DelaySettings {
    pub fn zeroed() -> Self {
        Self {
            launch_settle_ms: 0,
            pre_scan_ms: 0,
            scan_result_ms: 0,
            between_taps_ms: 0,
            permission_ms: 0,
            recovery_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScannerSettings {
    pub package: String,
    pub thumbnail_suffix: String,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            package: "com.google.android.apps.accessibility.auditor".to_string(),
            thumbnail_suffix: "thumbnail.png".to_string(),
        }
    }
}

impl ScannerSettings {
    pub fn export_dir(&self) -> String {
        format!("/data/data/{}/cache/export", self.package)
    }

    pub fn screenshots_dir(&self) -> String {
        format!("/data/data/{}/files/screenshots", self.package)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenSettings {
    pub device_dump_dir: String,
    pub launcher_components: Vec<String>,
    pub crash_keywords: Vec<String>,
    pub allow_marker: String,
    pub deny_marker: String,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            device_dump_dir: "/sdcard".to_string(),
            launcher_components: vec!["com.android.launcher3".to_string()],
            crash_keywords: vec![
                "has stopped".to_string(),
                "isn't responding".to_string(),
                "keeps stopping".to_string(),
            ],
            allow_marker: "ALLOW".to_string(),
            deny_marker: "DENY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSettings {
    pub adb_path: String,
    pub aapt_path: String,
    pub command_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            adb_path: String::new(),
            aapt_path: String::new(),
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub gestures: GestureSettings,
    #[serde(default)]
    pub delays: DelaySettings,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub screen: ScreenSettings,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("AXPROBE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".axprobe_config.json")
}

pub fn backup_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".axprobe_config.backup.json")
}

pub fn load_config() -> Result<ExplorerConfig, EngineError> {
    load_config_from_path(&config_path())
}

pub fn load_config_from_path(path: &Path) -> Result<ExplorerConfig, EngineError> {
    if !path.exists() {
        return Ok(ExplorerConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| EngineError::system(format!("Failed to read config: {err}"), ""))?;
    let config: ExplorerConfig = serde_json::from_str(&raw)
        .map_err(|err| EngineError::system(format!("Failed to parse config: {err}"), ""))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &ExplorerConfig,
    path: &Path,
    backup_path: &Path,
) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| EngineError::system(format!("Failed to serialize config: {err}"), ""))?;
    fs::write(path, payload)
        .map_err(|err| EngineError::system(format!("Failed to write config: {err}"), ""))?;
    Ok(())
}

fn validate_config(mut config: ExplorerConfig) -> ExplorerConfig {
    if config.tools.command_timeout_secs == 0 {
        config.tools.command_timeout_secs = 30;
    }
    // A delay above ten minutes is a typo, not a tuning choice.
    const MAX_DELAY_MS: u64 = 600_000;
    let defaults = DelaySettings::default();
    let clamp = |value: u64, fallback: u64| if value > MAX_DELAY_MS { fallback } else { value };
    config.delays.launch_settle_ms =
        clamp(config.delays.launch_settle_ms, defaults.launch_settle_ms);
    config.delays.pre_scan_ms = clamp(config.delays.pre_scan_ms, defaults.pre_scan_ms);
    config.delays.scan_result_ms = clamp(config.delays.scan_result_ms, defaults.scan_result_ms);
    config.delays.between_taps_ms = clamp(config.delays.between_taps_ms, defaults.between_taps_ms);
    config.delays.permission_ms = clamp(config.delays.permission_ms, defaults.permission_ms);
    config.delays.recovery_ms = clamp(config.delays.recovery_ms, defaults.recovery_ms);
    if config.scanner.package.trim().is_empty() {
        config.scanner.package = ScannerSettings::default().package;
    }
    if config.screen.device_dump_dir.trim().is_empty() {
        config.screen.device_dump_dir = ScreenSettings::default().device_dump_dir;
    }
    if config.screen.launcher_components.is_empty() {
        config.screen.launcher_components = ScreenSettings::default().launcher_components;
    }
    if config.screen.crash_keywords.is_empty() {
        config.screen.crash_keywords = ScreenSettings::default().crash_keywords;
    }
    config
}

pub fn pause(ms: u64) {
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_carries_scanner_workflow() {
        let config = ExplorerConfig::default();
        assert_eq!(config.gestures.scan, TapPoint::new(945, 1650));
        assert_eq!(config.delays.launch_settle_ms, 3000);
        assert!(config
            .scanner
            .export_dir()
            .starts_with("/data/data/com.google.android.apps.accessibility.auditor"));
        assert_eq!(config.screen.crash_keywords.len(), 3);
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().expect("tmp");
        let config = load_config_from_path(&dir.path().join("missing.json")).expect("load");
        assert_eq!(config, ExplorerConfig::default());
    }

    #[test]
    fn validate_clamps_bad_values() {
        let mut config = ExplorerConfig::default();
        config.tools.command_timeout_secs = 0;
        config.delays.scan_result_ms = 1_000_000;
        config.scanner.package = "  ".to_string();
        config.screen.launcher_components.clear();
        let validated = validate_config(config);
        assert_eq!(validated.tools.command_timeout_secs, 30);
        assert_eq!(validated.delays.scan_result_ms, 5000);
        assert!(!validated.scanner.package.trim().is_empty());
        assert!(!validated.screen.launcher_components.is_empty());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::TempDir::new().expect("tmp");
        let path = dir.path().join("config.json");
        let backup = dir.path().join("config.backup.json");
        let mut config = ExplorerConfig::default();
        config.gestures.scan = TapPoint::new(1, 2);
        save_config_to_path(&config, &path, &backup).expect("save");
        let loaded = load_config_from_path(&path).expect("load");
        assert_eq!(loaded.gestures.scan, TapPoint::new(1, 2));
    }
}
