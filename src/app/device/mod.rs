pub mod adb;
pub mod locator;
pub mod parse;
pub mod runner;

use std::path::Path;

use crate::app::config::TapPoint;
use crate::app::models::{ForegroundSnapshot, InstallOutcome, LaunchAttempt};

/// The seam between the exploration engine and one physical or virtual
/// device. Every call may fail; failure is reported as a boolean or outcome
/// value, never a panic, so callers can apply their fail-safe defaults.
pub trait DeviceControl {
    fn install_apk(&self, apk_path: &Path) -> InstallOutcome;
    fn uninstall_package(&self, package: &str) -> bool;
    fn launch_activity(&self, attempt: &LaunchAttempt) -> bool;
    fn tap(&self, point: TapPoint) -> bool;
    fn dump_ui_tree(&self, device_dest: &str) -> bool;
    /// Pull a device file or directory into `local_dest_dir`, mirroring
    /// `adb pull`: the pulled entry lands under its device basename.
    fn pull(&self, device_path: &str, local_dest_dir: &Path) -> bool;
    fn delete_device_path(&self, device_path: &str) -> bool;
    fn clear_log_buffer(&self) -> bool;
    fn foreground_components(&self) -> ForegroundSnapshot;
}
