use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::app::device::parse::{
    parse_foreground_components, parse_install_outcome, validate_device_path,
};
use crate::app::device::runner::{run_command, CommandOutput};
use crate::app::device::DeviceControl;
use crate::app::config::TapPoint;
use crate::app::models::{ForegroundSnapshot, InstallOutcome, LaunchAttempt};

/// `DeviceControl` implementation driving one device through the `adb`
/// binary. All calls are blocking; there is no overlap between device
/// operations for one serial.
pub struct AdbDevice {
    program: String,
    serial: String,
    timeout: Duration,
    trace_id: String,
}

impl AdbDevice {
    pub fn new(
        program: impl Into<String>,
        serial: impl Into<String>,
        timeout_secs: u64,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            serial: serial.into(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            trace_id: trace_id.into(),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn run(&self, args: Vec<String>) -> Option<CommandOutput> {
        let mut full = vec!["-s".to_string(), self.serial.clone()];
        full.extend(args);
        match run_command(&self.program, &full, self.timeout, &self.trace_id) {
            Ok(output) => Some(output),
            Err(err) => {
                warn!(
                    trace_id = %self.trace_id,
                    serial = %self.serial,
                    error = %err.error,
                    "adb command failed"
                );
                None
            }
        }
    }

    fn shell(&self, args: &[&str]) -> Option<CommandOutput> {
        let mut full = vec!["shell".to_string()];
        full.extend(args.iter().map(|arg| arg.to_string()));
        self.run(full)
    }
}

impl DeviceControl for AdbDevice {
    fn install_apk(&self, apk_path: &Path) -> InstallOutcome {
        let args = vec![
            "install".to_string(),
            "-r".to_string(),
            apk_path.to_string_lossy().to_string(),
        ];
        match self.run(args) {
            Some(output) => {
                let combined = format!("{}\n{}", output.stdout, output.stderr);
                parse_install_outcome(&combined)
            }
            None => InstallOutcome::Failure("adb unreachable".to_string()),
        }
    }

    fn uninstall_package(&self, package: &str) -> bool {
        self.run(vec!["uninstall".to_string(), package.to_string()])
            .map(|output| output.succeeded())
            .unwrap_or(false)
    }

    fn launch_activity(&self, attempt: &LaunchAttempt) -> bool {
        let mut args = vec![
            "shell".to_string(),
            "am".to_string(),
            "start".to_string(),
            "-S".to_string(),
            "-n".to_string(),
            attempt.component(),
        ];
        if let Some(action) = &attempt.action {
            args.push("-a".to_string());
            args.push(action.clone());
        }
        if let Some(category) = &attempt.category {
            args.push("-c".to_string());
            args.push(category.clone());
        }
        for extra in &attempt.extras {
            extra.push_args(&mut args);
        }
        match self.run(args) {
            // `am start` reports bad components on stdout with a zero exit.
            Some(output) => output.succeeded() && !output.stdout.contains("Error:"),
            None => false,
        }
    }

    fn tap(&self, point: TapPoint) -> bool {
        let x = point.x.to_string();
        let y = point.y.to_string();
        self.shell(&["input", "tap", &x, &y])
            .map(|output| output.succeeded())
            .unwrap_or(false)
    }

    fn dump_ui_tree(&self, device_dest: &str) -> bool {
        self.shell(&["uiautomator", "dump", device_dest])
            .map(|output| output.succeeded())
            .unwrap_or(false)
    }

    fn pull(&self, device_path: &str, local_dest_dir: &Path) -> bool {
        let args = vec![
            "pull".to_string(),
            device_path.to_string(),
            local_dest_dir.to_string_lossy().to_string(),
        ];
        self.run(args)
            .map(|output| output.succeeded())
            .unwrap_or(false)
    }

    fn delete_device_path(&self, device_path: &str) -> bool {
        if let Err(reason) = validate_device_path(device_path) {
            warn!(
                trace_id = %self.trace_id,
                path = device_path,
                reason = %reason,
                "refusing device delete"
            );
            return false;
        }
        self.shell(&["rm", "-rf", device_path])
            .map(|output| output.succeeded())
            .unwrap_or(false)
    }

    fn clear_log_buffer(&self) -> bool {
        self.run(vec!["logcat".to_string(), "-c".to_string()])
            .map(|output| output.succeeded())
            .unwrap_or(false)
    }

    fn foreground_components(&self) -> ForegroundSnapshot {
        match self.shell(&["dumpsys", "activity", "activities"]) {
            Some(output) => parse_foreground_components(&output.stdout),
            None => ForegroundSnapshot::default(),
        }
    }
}
