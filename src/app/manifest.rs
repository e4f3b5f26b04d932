use std::collections::HashMap;

use regex::Regex;

use crate::app::models::{ActivityEntry, EntryIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InActivity,
    InIntentFilter,
}

/// Extract activities and their declared entry intents from manifest text.
///
/// This is a deliberate line-oriented scan, not an XML parse: repackaged
/// manifests are frequently truncated or mangled, and a malformed activity
/// must cost only its own entry, never the rest of the map. Activities are
/// returned in declaration order; identifiers outside `used_package` are
/// skipped; a leading-dot shorthand is resolved against `used_package`.
pub fn extract_activity_intents(manifest: &str, used_package: &str) -> Vec<ActivityEntry> {
    let name_attr = match Regex::new(r#"android:name="([^"]*)""#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut entries: Vec<ActivityEntry> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();
    let mut state = ScanState::Outside;
    let mut current: Option<usize> = None;
    let mut pending_action: Option<String> = None;
    let mut pending_category: Option<String> = None;

    let attr_value = |line: &str| -> Option<String> {
        name_attr
            .captures(line)
            .map(|caps| caps[1].to_string())
            .filter(|value| !value.is_empty())
    };

    for raw in manifest.lines() {
        let line = raw.trim();
        if line.starts_with("<activity") {
            state = ScanState::InActivity;
            current = None;
            if let Some(mut name) = attr_value(line) {
                if name.starts_with('.') {
                    name = format!("{used_package}{name}");
                }
                if name.contains(used_package) {
                    let index = *index_by_id.entry(name.clone()).or_insert_with(|| {
                        entries.push(ActivityEntry {
                            identifier: name.clone(),
                            entry_intents: Vec::new(),
                        });
                        entries.len() - 1
                    });
                    current = Some(index);
                }
            }
            if line.ends_with("/>") {
                state = ScanState::Outside;
                current = None;
            }
        } else if line.starts_with("<intent-filter") && state == ScanState::InActivity {
            state = ScanState::InIntentFilter;
            pending_action = None;
            pending_category = None;
        } else if line.starts_with("<action") && state == ScanState::InIntentFilter {
            if let Some(value) = attr_value(line) {
                pending_action = Some(value);
            }
        } else if line.starts_with("<category") && state == ScanState::InIntentFilter {
            if let Some(value) = attr_value(line) {
                pending_category = Some(value);
            }
        } else if line.starts_with("</intent-filter>") && state == ScanState::InIntentFilter {
            state = ScanState::InActivity;
            if pending_action.is_some() || pending_category.is_some() {
                if let Some(index) = current {
                    entries[index].entry_intents.push(EntryIntent {
                        action: pending_action.take(),
                        category: pending_category.take(),
                    });
                }
            }
            pending_action = None;
            pending_category = None;
        } else if line.starts_with("</activity>") {
            state = ScanState::Outside;
            current = None;
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <application>
        <activity android:name=".MainActivity">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
                <category android:name="android.intent.category.LAUNCHER"/>
            </intent-filter>
            <intent-filter>
                <action android:name="android.intent.action.VIEW"/>
                <category android:name="android.intent.category.DEFAULT"/>
            </intent-filter>
        </activity>
        <activity android:name="com.example.app.SettingsActivity"/>
        <activity android:name="com.thirdparty.ads.AdActivity">
            <intent-filter>
                <action android:name="android.intent.action.VIEW"/>
            </intent-filter>
        </activity>
        <activity android:name="com.example.app.AboutActivity">
        </activity>
    </application>
</manifest>
"#;

    #[test]
    fn extracts_in_declaration_order_with_dot_resolution() {
        let entries = extract_activity_intents(MANIFEST, "com.example.app");
        let ids: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "com.example.app.MainActivity",
                "com.example.app.SettingsActivity",
                "com.example.app.AboutActivity",
            ]
        );
    }

    #[test]
    fn collects_one_pair_per_intent_filter_in_order() {
        let entries = extract_activity_intents(MANIFEST, "com.example.app");
        let main = &entries[0];
        assert_eq!(main.entry_intents.len(), 2);
        assert_eq!(
            main.entry_intents[0].action.as_deref(),
            Some("android.intent.action.MAIN")
        );
        assert_eq!(
            main.entry_intents[1].category.as_deref(),
            Some("android.intent.category.DEFAULT")
        );
    }

    #[test]
    fn self_closing_activity_has_no_intents() {
        let entries = extract_activity_intents(MANIFEST, "com.example.app");
        assert!(entries[1].entry_intents.is_empty());
        assert!(entries[2].entry_intents.is_empty());
    }

    #[test]
    fn foreign_package_activities_are_skipped() {
        let entries = extract_activity_intents(MANIFEST, "com.example.app");
        assert!(entries
            .iter()
            .all(|entry| !entry.identifier.contains("thirdparty")));
    }

    #[test]
    fn truncated_input_yields_partial_map() {
        let truncated = r#"
        <activity android:name=".FirstActivity">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"
"#;
        let entries = extract_activity_intents(truncated, "com.example.app");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identifier, "com.example.app.FirstActivity");
        // The unterminated filter never closed, so no pair was recorded.
        assert!(entries[0].entry_intents.is_empty());
    }

    #[test]
    fn intent_filter_without_names_records_nothing() {
        let manifest = r#"
        <activity android:name=".A">
            <intent-filter>
            </intent-filter>
        </activity>
"#;
        let entries = extract_activity_intents(manifest, "com.example.app");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].entry_intents.is_empty());
    }

    #[test]
    fn repeated_action_keeps_the_last_one() {
        let manifest = r#"
        <activity android:name=".A">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
                <action android:name="android.intent.action.VIEW"/>
            </intent-filter>
        </activity>
"#;
        let entries = extract_activity_intents(manifest, "com.example.app");
        assert_eq!(
            entries[0].entry_intents[0].action.as_deref(),
            Some("android.intent.action.VIEW")
        );
    }

    #[test]
    fn empty_name_attribute_is_ignored() {
        let manifest = r#"<activity android:name="">"#;
        let entries = extract_activity_intents(manifest, "com.example.app");
        assert!(entries.is_empty());
    }
}
