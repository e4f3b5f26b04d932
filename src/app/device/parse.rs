use crate::app::models::{ForegroundSnapshot, InstallOutcome};

/// Extract the resumed/focused components from `dumpsys activity activities`
/// output. Lines look like:
///
///   mResumedActivity: ActivityRecord{af63f4 u0 com.example/.MainActivity t12}
pub fn parse_foreground_components(output: &str) -> ForegroundSnapshot {
    let mut snapshot = ForegroundSnapshot::default();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("mResumedActivity") && snapshot.resumed.is_none() {
            snapshot.resumed = component_token(trimmed);
        } else if trimmed.starts_with("mFocusedActivity") && snapshot.focused.is_none() {
            snapshot.focused = component_token(trimmed);
        }
        if snapshot.resumed.is_some() && snapshot.focused.is_some() {
            break;
        }
    }
    snapshot
}

fn component_token(line: &str) -> Option<String> {
    line.split_whitespace()
        .find(|token| token.contains('/'))
        .map(|token| token.trim_end_matches('}').to_string())
}

/// Classify `adb install` output. The install command exits zero even on many
/// failures, so the stdout text is the only reliable signal.
pub fn parse_install_outcome(output: &str) -> InstallOutcome {
    for line in output.lines() {
        if line.contains("Failure") || line.contains("Error") {
            return InstallOutcome::Failure(output.replace('\n', ", "));
        }
    }
    InstallOutcome::Success
}

/// Resolve `pkg/.Relative` or `pkg/com.full.Name` to the full activity name.
pub fn full_activity_name(component: &str) -> Option<String> {
    let (package, activity) = component.split_once('/')?;
    if let Some(relative) = activity.strip_prefix('.') {
        Some(format!("{package}.{relative}"))
    } else {
        Some(activity.to_string())
    }
}

pub fn validate_device_path(path: &str) -> Result<(), String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("device path is required".to_string());
    }
    if !trimmed.starts_with('/') {
        return Err("device path must be absolute".to_string());
    }
    if trimmed.contains('\0') {
        return Err("device path contains invalid characters".to_string());
    }
    if trimmed == "/" {
        return Err("device path must not be root".to_string());
    }
    for segment in trimmed.split('/') {
        if segment == ".." {
            return Err("device path must not contain '..' segments".to_string());
        }
    }
    Ok(())
}
