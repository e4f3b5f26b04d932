use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::warn;
use zip::ZipArchive;

use crate::app::config::{pause, ExplorerConfig};
use crate::app::device::DeviceControl;
use crate::app::events::{EventSink, ExploreEvent};
use crate::app::fsutil::{clean_dir_contents, move_file, ResultPaths};

const COMPONENT: &str = "collector";

/// Drive the scanner and harvest its output for one activity. Invoked only
/// after a `Normal` verdict. Every step tolerates missing artifacts: a file
/// that never appeared is logged and skipped, and already-collected results
/// are never touched. The scratch directory is empty again on return.
pub fn collect(
    device: &dyn DeviceControl,
    activity: &str,
    app_name: &str,
    paths: &ResultPaths,
    config: &ExplorerConfig,
    events: &dyn EventSink,
) {
    clear_device_outputs(device, config);
    run_scan_gestures(device, config);

    let scratch = paths.scratch_dir();
    if let Err(err) = fs::create_dir_all(&scratch) {
        warn!(activity, error = %err, "cannot create scratch dir, skipping collection");
        events.emit(ExploreEvent::new(COMPONENT, "scratch-unavailable").with_activity(activity));
        return;
    }

    harvest_issue_archive(device, activity, app_name, paths, config, events);
    harvest_screenshot(device, activity, app_name, paths, config, events);

    clear_device_outputs(device, config);
}

/// The scanner's own UI: trigger the scan, open the share sheet to force the
/// export to disk, dismiss it, and leave the app. Delays are tuned to the
/// scanner's animation timing.
fn run_scan_gestures(device: &dyn DeviceControl, config: &ExplorerConfig) {
    pause(config.delays.pre_scan_ms);
    device.tap(config.gestures.scan);
    pause(config.delays.scan_result_ms);
    device.tap(config.gestures.share);
    pause(config.delays.between_taps_ms);
    device.tap(config.gestures.cancel);
    pause(config.delays.between_taps_ms);
    device.tap(config.gestures.home);
    pause(config.delays.between_taps_ms);
}

fn clear_device_outputs(device: &dyn DeviceControl, config: &ExplorerConfig) {
    device.delete_device_path(&config.scanner.export_dir());
    device.delete_device_path(&config.scanner.screenshots_dir());
}

fn harvest_issue_archive(
    device: &dyn DeviceControl,
    activity: &str,
    app_name: &str,
    paths: &ResultPaths,
    config: &ExplorerConfig,
    events: &dyn EventSink,
) {
    let scratch = paths.scratch_dir();
    let pulled = device.pull(&config.scanner.export_dir(), &scratch);
    let export_dir = scratch.join("export");

    let mut archived: Option<PathBuf> = None;
    if pulled && export_dir.is_dir() {
        if let Some(zip_path) = first_with_extension(&export_dir, "zip") {
            let dest = paths.issues_dir(app_name).join(format!("{activity}.zip"));
            match move_file(&zip_path, &dest) {
                Ok(()) => archived = Some(dest),
                Err(err) => warn!(activity, error = %err, "failed to move issue archive"),
            }
        }
    }
    if let Err(err) = clean_dir_contents(&scratch) {
        warn!(activity, error = %err, "failed to clear scratch after export pull");
    }

    let Some(zip_path) = archived else {
        events.emit(ExploreEvent::new(COMPONENT, "no-export").with_activity(activity));
        return;
    };
    match extract_issue_archive(&zip_path, activity, &paths.issues_dir(app_name)) {
        Ok(extracted) => {
            events.emit(
                ExploreEvent::new(COMPONENT, "issues-extracted")
                    .with_activity(activity)
                    .with_detail(format!("{extracted} files")),
            );
        }
        Err(err) => {
            warn!(activity, error = %err, "failed to extract issue archive");
            events.emit(ExploreEvent::new(COMPONENT, "archive-unreadable").with_activity(activity));
        }
    }
}

/// Extract the scanner's export zip directly into the issues folder, renaming
/// the text/image members to the activity stem. The zip is removed afterwards
/// so only the renamed members remain.
fn extract_issue_archive(
    zip_path: &Path,
    activity: &str,
    issues_dir: &Path,
) -> Result<usize, String> {
    let file = File::open(zip_path)
        .map_err(|err| format!("Failed to open {}: {err}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|err| format!("Invalid archive {}: {err}", zip_path.display()))?;
    let mut extracted = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| format!("Failed to read archive entry: {err}"))?;
        let name = entry.name().to_lowercase();
        let target = if name.ends_with(".txt") {
            issues_dir.join(format!("{activity}.txt"))
        } else if name.ends_with(".png") {
            issues_dir.join(format!("{activity}.png"))
        } else {
            continue;
        };
        let mut output = File::create(&target)
            .map_err(|err| format!("Failed to create {}: {err}", target.display()))?;
        std::io::copy(&mut entry, &mut output)
            .map_err(|err| format!("Failed to extract to {}: {err}", target.display()))?;
        extracted += 1;
    }
    fs::remove_file(zip_path)
        .map_err(|err| format!("Failed to remove {}: {err}", zip_path.display()))?;
    Ok(extracted)
}

fn harvest_screenshot(
    device: &dyn DeviceControl,
    activity: &str,
    app_name: &str,
    paths: &ResultPaths,
    config: &ExplorerConfig,
    events: &dyn EventSink,
) {
    let scratch = paths.scratch_dir();
    let pulled = device.pull(&config.scanner.screenshots_dir(), &scratch);

    let mut moved = false;
    if pulled {
        if let Some(png) = find_screenshot(&scratch, &config.scanner.thumbnail_suffix) {
            let dest = paths
                .screenshot_dir(app_name)
                .join(format!("{activity}.png"));
            match move_file(&png, &dest) {
                Ok(()) => moved = true,
                Err(err) => warn!(activity, error = %err, "failed to move screenshot"),
            }
        }
    }
    if !moved {
        events.emit(ExploreEvent::new(COMPONENT, "no-screenshot").with_activity(activity));
    }
    if let Err(err) = clean_dir_contents(&scratch) {
        warn!(activity, error = %err, "failed to clear scratch after screenshot pull");
    }
}

fn first_with_extension(dir: &Path, extension: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Depth-first search for the first non-thumbnail PNG under `dir`.
fn find_screenshot(dir: &Path, thumbnail_suffix: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            if let Some(found) = find_screenshot(&path, thumbnail_suffix) {
                return Some(found);
            }
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.ends_with(".png") && !name.ends_with(thumbnail_suffix) {
            return Some(path);
        }
    }
    None
}
