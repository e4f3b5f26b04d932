use std::fs;
use std::path::Path;

use tracing::warn;

use crate::app::config::{pause, ExplorerConfig};
use crate::app::device::DeviceControl;
use crate::app::events::{EventSink, ExploreEvent};
use crate::app::models::{ForegroundSnapshot, ScreenVerdict};

const COMPONENT: &str = "classifier";

/// Classify the screen left behind by a launch attempt. Every ambiguous
/// branch resolves to `Abnormal`; the pulled UI tree is retained as
/// `layouts/<activity>.xml` only on a `Normal` verdict.
pub fn classify(
    device: &dyn DeviceControl,
    activity: &str,
    layouts_dir: &Path,
    config: &ExplorerConfig,
    events: &dyn EventSink,
) -> ScreenVerdict {
    let xml_name = format!("{activity}.xml");
    let device_path = format!(
        "{}/{}",
        config.screen.device_dump_dir.trim_end_matches('/'),
        xml_name
    );
    let local_path = layouts_dir.join(&xml_name);

    device.dump_ui_tree(&device_path);
    let pulled = device.pull(&device_path, layouts_dir);
    device.delete_device_path(&device_path);

    if !pulled || !local_path.is_file() {
        events.emit(ExploreEvent::new(COMPONENT, "dump-missing").with_activity(activity));
        return ScreenVerdict::Abnormal;
    }

    let tree = match fs::read_to_string(&local_path) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(activity, error = %err, "failed to read pulled ui tree");
            discard_layout(&local_path);
            events.emit(ExploreEvent::new(COMPONENT, "dump-unreadable").with_activity(activity));
            return ScreenVerdict::Abnormal;
        }
    };

    if let Some(keyword) = config
        .screen
        .crash_keywords
        .iter()
        .find(|keyword| tree.contains(keyword.as_str()))
    {
        // The tree documents a transient crash dialog, not a scan result.
        discard_layout(&local_path);
        events.emit(
            ExploreEvent::new(COMPONENT, "crash-dialog")
                .with_activity(activity)
                .with_detail(keyword.clone()),
        );
        return ScreenVerdict::Abnormal;
    }

    let upper = tree.to_uppercase();
    if upper.contains(&config.screen.allow_marker) && upper.contains(&config.screen.deny_marker) {
        // Exactly one accept tap per classification, before the final verdict.
        device.tap(config.gestures.permission_allow);
        pause(config.delays.permission_ms);
        events.emit(ExploreEvent::new(COMPONENT, "permission-accepted").with_activity(activity));
    }

    let foreground = device.foreground_components();
    if on_home_screen(&foreground, &config.screen.launcher_components) {
        discard_layout(&local_path);
        events.emit(ExploreEvent::new(COMPONENT, "home-fallback").with_activity(activity));
        return ScreenVerdict::Abnormal;
    }

    events.emit(ExploreEvent::new(COMPONENT, "normal").with_activity(activity));
    ScreenVerdict::Normal
}

/// An unobtainable foreground state counts as the home screen: `Normal`
/// requires positive evidence that the activity holds focus.
fn on_home_screen(snapshot: &ForegroundSnapshot, launcher_components: &[String]) -> bool {
    let (Some(resumed), Some(focused)) = (&snapshot.resumed, &snapshot.focused) else {
        return true;
    };
    launcher_components
        .iter()
        .any(|launcher| resumed.contains(launcher.as_str()) || focused.contains(launcher.as_str()))
}

fn discard_layout(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "failed to remove layout file");
    }
}
