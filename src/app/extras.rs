use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// The closed set of synthetic intent-extra types. Each kind carries one fixed
/// sentinel value and maps to one `am start` flag; adding a kind is a
/// compile-time change, not a string comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtraKind {
    Str,
    Int,
    Bool,
    Float,
    Long,
}

impl ExtraKind {
    pub fn from_api_name(name: &str) -> Option<Self> {
        match name {
            "getString" | "getStringArray" => Some(Self::Str),
            "getInt" | "getIntArray" => Some(Self::Int),
            "getBoolean" | "getBooleanArray" => Some(Self::Bool),
            "getFloat" | "getFloatArray" => Some(Self::Float),
            "getLong" | "getLongArray" => Some(Self::Long),
            _ => None,
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Self::Str => "--es",
            Self::Int => "--ei",
            Self::Bool => "--ez",
            Self::Float => "--ef",
            Self::Long => "--el",
        }
    }

    pub fn sentinel(self) -> &'static str {
        match self {
            Self::Str => "test",
            Self::Int => "1",
            Self::Bool => "False",
            Self::Float => "0.1",
            Self::Long => "1",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtraParam {
    pub kind: ExtraKind,
    pub key: String,
}

impl ExtraParam {
    pub fn push_args(&self, args: &mut Vec<String>) {
        args.push(self.kind.flag().to_string());
        args.push(self.key.clone());
        args.push(self.kind.sentinel().to_string());
    }
}

/// File-backed source of per-activity synthetic extras. The file is produced
/// by an external static-analysis stage; one line per activity:
///
///   com.example.app.MainActivity:getString__query;getInt__page
#[derive(Debug, Default)]
pub struct ExtrasSource {
    by_activity: HashMap<String, Vec<ExtraParam>>,
}

impl ExtrasSource {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "extras file unreadable, continuing without extras");
                return Self::empty();
            }
        };
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Self {
        let mut by_activity = HashMap::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((activity, declared)) = line.split_once(':') else {
                continue;
            };
            let params = parse_declared_params(declared);
            by_activity.insert(activity.trim().to_string(), params);
        }
        Self { by_activity }
    }

    pub fn for_activity(&self, activity: &str) -> &[ExtraParam] {
        self.by_activity
            .get(activity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn parse_declared_params(declared: &str) -> Vec<ExtraParam> {
    let mut params = Vec::new();
    for part in declared.trim().split(';') {
        let Some((api, key)) = part.split_once("__") else {
            continue;
        };
        // Unknown accessor names are skipped, not errors: the analysis stage
        // emits more API names than the launch command can express.
        let Some(kind) = ExtraKind::from_api_name(api.trim()) else {
            continue;
        };
        if key.trim().is_empty() {
            continue;
        }
        params.push(ExtraParam {
            kind,
            key: key.trim().to_string(),
        });
    }
    params
}
