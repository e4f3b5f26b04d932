use tracing::warn;

use crate::app::config::{pause, ExplorerConfig};
use crate::app::device::DeviceControl;
use crate::app::events::{EventSink, ExploreEvent};

/// Best-effort corrective gesture after an abnormal verdict: one tap at the
/// home/back coordinate, then a short pause. Success is not verified; the
/// next activity's launch re-establishes a known state either way.
pub fn recover(device: &dyn DeviceControl, config: &ExplorerConfig, events: &dyn EventSink) {
    if !device.tap(config.gestures.home) {
        warn!("recovery tap failed");
    }
    pause(config.delays.recovery_ms);
    events.emit(ExploreEvent::new("recovery", "tapped-home"));
}
