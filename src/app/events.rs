use serde::Serialize;
use tracing::info;

/// One step of the exploration pipeline, reported through an [`EventSink`]
/// so harnesses can assert on outcomes instead of scraping log text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExploreEvent {
    pub component: &'static str,
    pub activity: Option<String>,
    pub outcome: String,
    pub detail: Option<String>,
}

impl ExploreEvent {
    pub fn new(component: &'static str, outcome: impl Into<String>) -> Self {
        Self {
            component,
            activity: None,
            outcome: outcome.into(),
            detail: None,
        }
    }

    pub fn with_activity(mut self, activity: &str) -> Self {
        self.activity = Some(activity.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait EventSink {
    fn emit(&self, event: ExploreEvent);
}

/// Production sink: forwards every event to the tracing pipeline.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ExploreEvent) {
        info!(
            component = event.component,
            activity = event.activity.as_deref().unwrap_or("-"),
            outcome = %event.outcome,
            detail = event.detail.as_deref().unwrap_or(""),
            "explore event"
        );
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<ExploreEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<ExploreEvent> {
        self.events.lock().expect("event sink lock").clone()
    }

    pub fn outcomes(&self, component: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.component == component)
            .map(|event| event.outcome)
            .collect()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, event: ExploreEvent) {
        self.events.lock().expect("event sink lock").push(event);
    }
}
