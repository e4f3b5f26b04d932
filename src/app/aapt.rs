use std::path::Path;
use std::time::Duration;

use regex::Regex;

use crate::app::device::runner::run_command;
use crate::app::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNames {
    /// Package declared in the manifest, used to address components.
    pub defined: String,
    /// Namespace prefix that the application's own activities live under.
    pub used: String,
}

fn single_quoted(line: &str, re: &Regex) -> Option<String> {
    re.captures(line)
        .map(|caps| caps[1].to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_badging_package(output: &str) -> Option<String> {
    let re = Regex::new(r"name='([^']*)'").ok()?;
    output
        .lines()
        .find(|line| line.trim_start().starts_with("package:"))
        .and_then(|line| single_quoted(line, &re))
}

pub fn parse_badging_launchable_activity(output: &str) -> Option<String> {
    let re = Regex::new(r"name='([^']*)'").ok()?;
    output
        .lines()
        .find(|line| line.trim_start().starts_with("launchable-activity:"))
        .and_then(|line| single_quoted(line, &re))
}

/// Derive the namespace the app's own activities live under. Normally this is
/// the defined package, but obfuscated or wrapped apps sometimes declare a
/// launcher class outside it; in that case the launcher's class-name prefix
/// is the better namespace filter.
pub fn derive_used_package(defined: &str, launcher: Option<&str>) -> String {
    let Some(launcher) = launcher.filter(|name| !name.is_empty()) else {
        return defined.to_string();
    };
    if launcher.starts_with('.') || launcher.contains(defined) {
        return defined.to_string();
    }
    match launcher.rsplit_once('.') {
        Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
        _ => defined.to_string(),
    }
}

/// Run `aapt dump badging` on the host and resolve both package names.
pub fn resolve_package_names(
    aapt_program: &str,
    apk_path: &Path,
    timeout_secs: u64,
    trace_id: &str,
) -> Result<PackageNames, EngineError> {
    let args = vec![
        "dump".to_string(),
        "badging".to_string(),
        apk_path.to_string_lossy().to_string(),
    ];
    let output = run_command(
        aapt_program,
        &args,
        Duration::from_secs(timeout_secs.max(1)),
        trace_id,
    )?;
    let defined = parse_badging_package(&output.stdout).ok_or_else(|| {
        EngineError::validation(
            format!("No package name in badging for {}", apk_path.display()),
            trace_id,
        )
    })?;
    let launcher = parse_badging_launchable_activity(&output.stdout);
    let used = derive_used_package(&defined, launcher.as_deref());
    Ok(PackageNames { defined, used })
}
