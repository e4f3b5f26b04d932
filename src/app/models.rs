use serde::{Deserialize, Serialize};

use crate::app::extras::ExtraParam;

/// A declared `(action, category)` pair that can launch an activity directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryIntent {
    pub action: Option<String>,
    pub category: Option<String>,
}

impl EntryIntent {
    pub fn new(action: Option<&str>, category: Option<&str>) -> Self {
        Self {
            action: action.map(str::to_string),
            category: category.map(str::to_string),
        }
    }

    pub fn is_bare(&self) -> bool {
        self.action.is_none() && self.category.is_none()
    }
}

/// One activity from the manifest, with its entry intents in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntry {
    pub identifier: String,
    pub entry_intents: Vec<EntryIntent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScreenVerdict {
    Normal,
    Abnormal,
}

/// Transient description of one `am start` invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchAttempt {
    pub package: String,
    pub activity: String,
    pub action: Option<String>,
    pub category: Option<String>,
    pub extras: Vec<ExtraParam>,
}

impl LaunchAttempt {
    pub fn component(&self) -> String {
        format!("{}/{}", self.package, self.activity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplorationResult {
    pub activity: String,
    pub verdict: ScreenVerdict,
    pub artifacts_collected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationSummary {
    pub app_name: String,
    pub package_name: String,
    pub total_activities: usize,
    pub launched_activities: usize,
    pub unlaunched_activities: usize,
    pub activities_with_issues: usize,
}

/// Resumed/focused components reported by the device after a launch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForegroundSnapshot {
    pub resumed: Option<String>,
    pub focused: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstallOutcome {
    Success,
    Failure(String),
}
