use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::app::aapt::PackageNames;
use crate::app::classifier::classify;
use crate::app::collector::collect;
use crate::app::config::{pause, ExplorerConfig};
use crate::app::device::DeviceControl;
use crate::app::events::{EventSink, ExploreEvent};
use crate::app::extras::ExtrasSource;
use crate::app::fsutil::ResultPaths;
use crate::app::manifest::extract_activity_intents;
use crate::app::models::{
    ActivityEntry, ApplicationSummary, EntryIntent, ExplorationResult, InstallOutcome,
    LaunchAttempt, ScreenVerdict,
};
use crate::app::recovery::recover;
use crate::app::stats::{append_install_error, append_summary_row};

const COMPONENT: &str = "explorer";

/// Per-activity state machine: try each declared entry intent in declaration
/// order, then a bare launch; the first `Normal` verdict wins and triggers
/// artifact collection, every `Abnormal` one triggers recovery. No activity
/// is launched again after its first `Normal`.
pub struct Explorer<'a> {
    device: &'a dyn DeviceControl,
    config: &'a ExplorerConfig,
    paths: &'a ResultPaths,
    extras: &'a ExtrasSource,
    events: &'a dyn EventSink,
}

impl<'a> Explorer<'a> {
    pub fn new(
        device: &'a dyn DeviceControl,
        config: &'a ExplorerConfig,
        paths: &'a ResultPaths,
        extras: &'a ExtrasSource,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            device,
            config,
            paths,
            extras,
            events,
        }
    }

    pub fn explore_all(
        &self,
        app_name: &str,
        package: &str,
        activities: &[ActivityEntry],
    ) -> Vec<ExplorationResult> {
        activities
            .iter()
            .map(|entry| self.explore_activity(app_name, package, entry))
            .collect()
    }

    fn explore_activity(
        &self,
        app_name: &str,
        package: &str,
        entry: &ActivityEntry,
    ) -> ExplorationResult {
        let extras = self.extras.for_activity(&entry.identifier).to_vec();

        let mut intents: Vec<EntryIntent> = entry.entry_intents.clone();
        intents.push(EntryIntent::default());

        for intent in &intents {
            let attempt = LaunchAttempt {
                package: package.to_string(),
                activity: entry.identifier.clone(),
                action: intent.action.clone(),
                category: intent.category.clone(),
                extras: extras.clone(),
            };
            let verdict = self.launch_and_classify(app_name, &attempt);
            if verdict == ScreenVerdict::Normal {
                collect(
                    self.device,
                    &entry.identifier,
                    app_name,
                    self.paths,
                    self.config,
                    self.events,
                );
                self.events.emit(
                    ExploreEvent::new(COMPONENT, "launched").with_activity(&entry.identifier),
                );
                return ExplorationResult {
                    activity: entry.identifier.clone(),
                    verdict: ScreenVerdict::Normal,
                    artifacts_collected: true,
                };
            }
            recover(self.device, self.config, self.events);
        }

        self.events
            .emit(ExploreEvent::new(COMPONENT, "exhausted").with_activity(&entry.identifier));
        ExplorationResult {
            activity: entry.identifier.clone(),
            verdict: ScreenVerdict::Abnormal,
            artifacts_collected: false,
        }
    }

    fn launch_and_classify(&self, app_name: &str, attempt: &LaunchAttempt) -> ScreenVerdict {
        self.device.clear_log_buffer();
        if !self.device.launch_activity(attempt) {
            // The screen state is whatever the previous attempt left behind;
            // classifying it would attribute a stale tree to this activity.
            warn!(activity = %attempt.activity, "launch command failed");
            return ScreenVerdict::Abnormal;
        }
        pause(self.config.delays.launch_settle_ms);
        classify(
            self.device,
            &attempt.activity,
            &self.paths.layouts_dir(app_name),
            self.config,
            self.events,
        )
    }

    pub fn summarize(
        &self,
        app_name: &str,
        package: &str,
        results: &[ExplorationResult],
    ) -> ApplicationSummary {
        let total = results.len();
        let launched = results
            .iter()
            .filter(|result| result.verdict == ScreenVerdict::Normal)
            .count();
        ApplicationSummary {
            app_name: app_name.to_string(),
            package_name: package.to_string(),
            total_activities: total,
            launched_activities: launched,
            unlaunched_activities: total - launched,
            activities_with_issues: count_issue_activities(&self.paths.issues_dir(app_name)),
        }
    }
}

/// Count activities with at least one collected artifact, deduplicated by
/// file stem across `.txt`/`.png`/`.zip`.
pub fn count_issue_activities(issues_dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(issues_dir) else {
        return 0;
    };
    let mut stems: HashSet<String> = HashSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if !matches!(extension, "txt" | "png" | "zip") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            stems.insert(stem.to_string());
        }
    }
    stems.len()
}

/// One application's exploration job: where its launchable APK and extracted
/// manifest live, and what to call it in the result tree.
#[derive(Debug, Clone)]
pub struct ApplicationJob {
    pub apk_path: PathBuf,
    pub apk_name: String,
    pub manifest_path: PathBuf,
    pub package_names: PackageNames,
    pub keep_installed: bool,
}

/// Full pipeline for one application: install, extract, explore, summarize,
/// uninstall. Returns `None` when the application could not be explored at
/// all (missing APK, install failure, missing manifest); that outcome is
/// recorded in the install-error log instead of fabricating a zero-activity
/// summary row.
pub fn run_application(
    device: &dyn DeviceControl,
    config: &ExplorerConfig,
    paths: &ResultPaths,
    extras: &ExtrasSource,
    events: &dyn EventSink,
    job: &ApplicationJob,
) -> Option<ApplicationSummary> {
    if !job.apk_path.is_file() {
        record_skip(paths, events, &job.apk_name, "missing launchable apk");
        return None;
    }

    match device.install_apk(&job.apk_path) {
        InstallOutcome::Success => {}
        InstallOutcome::Failure(reason) => {
            record_skip(paths, events, &job.apk_name, &reason);
            return None;
        }
    }

    let manifest = match fs::read_to_string(&job.manifest_path) {
        Ok(manifest) => manifest,
        Err(err) => {
            record_skip(
                paths,
                events,
                &job.apk_name,
                &format!("missing manifest: {err}"),
            );
            if !job.keep_installed {
                device.uninstall_package(&job.package_names.defined);
            }
            return None;
        }
    };

    if let Err(err) = paths.ensure_app_dirs(&job.apk_name) {
        warn!(app = %job.apk_name, error = %err, "cannot prepare result tree");
        record_skip(paths, events, &job.apk_name, &err);
        if !job.keep_installed {
            device.uninstall_package(&job.package_names.defined);
        }
        return None;
    }

    let activities = extract_activity_intents(&manifest, &job.package_names.used);
    info!(
        app = %job.apk_name,
        package = %job.package_names.defined,
        activities = activities.len(),
        "starting exploration"
    );

    let explorer = Explorer::new(device, config, paths, extras, events);
    let results = explorer.explore_all(&job.apk_name, &job.package_names.defined, &activities);
    let summary = explorer.summarize(&job.apk_name, &job.package_names.defined, &results);

    if let Err(err) = append_summary_row(&paths.aggregate_log(), &summary) {
        warn!(app = %job.apk_name, error = %err, "failed to append aggregate row");
    }

    if !job.keep_installed {
        device.uninstall_package(&job.package_names.defined);
    }

    info!(
        app = %job.apk_name,
        launched = summary.launched_activities,
        unlaunched = summary.unlaunched_activities,
        with_issues = summary.activities_with_issues,
        "exploration finished"
    );
    Some(summary)
}

fn record_skip(paths: &ResultPaths, events: &dyn EventSink, apk_name: &str, reason: &str) {
    warn!(app = apk_name, reason, "skipping application");
    if let Err(err) = append_install_error(&paths.install_error_log(), apk_name, reason) {
        warn!(app = apk_name, error = %err, "failed to record install error");
    }
    events.emit(
        ExploreEvent::new(COMPONENT, "skipped")
            .with_activity(apk_name)
            .with_detail(reason.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::DelaySettings;
    use crate::app::device::fake::FakeDevice;
    use crate::app::events::RecordingSink;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    const APP: &str = "demo";
    const PKG: &str = "com.example.app";

    fn test_config() -> ExplorerConfig {
        let mut config = ExplorerConfig::default();
        config.delays = DelaySettings::zeroed();
        config
    }

    fn test_paths(tmp: &TempDir) -> ResultPaths {
        let paths = ResultPaths::new(tmp.path().join("results"), "emulator-5554");
        paths.ensure_app_dirs(APP).expect("dirs");
        paths
    }

    fn entry(identifier: &str, intents: &[(&str, &str)]) -> ActivityEntry {
        ActivityEntry {
            identifier: identifier.to_string(),
            entry_intents: intents
                .iter()
                .map(|&(action, category)| EntryIntent::new(Some(action), Some(category)))
                .collect(),
        }
    }

    fn push_normal_screen(device: &FakeDevice) {
        device.push_tree(Some("<hierarchy><node text=\"ok\"/></hierarchy>"));
        device.push_foreground("com.example.app/.Main", "com.example.app/.Main");
    }

    #[test]
    fn first_normal_intent_wins_and_collects_once() {
        let tmp = TempDir::new().expect("tmp");
        let paths = test_paths(&tmp);
        let config = test_config();
        let extras = ExtrasSource::empty();
        let device = FakeDevice::new();
        let sink = RecordingSink::default();
        push_normal_screen(&device);

        let activity = entry(
            "com.example.app.MainActivity",
            &[
                ("android.intent.action.VIEW", "android.intent.category.DEFAULT"),
                ("android.intent.action.MAIN", "android.intent.category.LAUNCHER"),
            ],
        );
        let explorer = Explorer::new(&device, &config, &paths, &extras, &sink);
        let results = explorer.explore_all(APP, PKG, std::slice::from_ref(&activity));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].verdict, ScreenVerdict::Normal);
        assert!(results[0].artifacts_collected);
        // One launch: the first declared intent already classified normal.
        let launches = device.launches.borrow();
        assert_eq!(launches.len(), 1);
        assert_eq!(
            launches[0].action.as_deref(),
            Some("android.intent.action.VIEW")
        );
        assert_eq!(device.log_clears.get(), 1);
        assert_eq!(sink.outcomes("explorer"), vec!["launched".to_string()]);
    }

    #[test]
    fn abnormal_intents_fall_back_to_bare_launch() {
        let tmp = TempDir::new().expect("tmp");
        let paths = test_paths(&tmp);
        let config = test_config();
        let extras = ExtrasSource::empty();
        let device = FakeDevice::new();
        let sink = RecordingSink::default();
        // Declared intent: crash dialog. Bare fallback: normal screen.
        device.push_tree(Some("<node text=\"Example has stopped\"/>"));
        push_normal_screen(&device);

        let activity = entry(
            "com.example.app.MainActivity",
            &[("android.intent.action.VIEW", "android.intent.category.DEFAULT")],
        );
        let explorer = Explorer::new(&device, &config, &paths, &extras, &sink);
        let result = &explorer.explore_all(APP, PKG, std::slice::from_ref(&activity))[0];

        assert_eq!(result.verdict, ScreenVerdict::Normal);
        let launches = device.launches.borrow();
        assert_eq!(launches.len(), 2);
        assert!(launches[1].action.is_none() && launches[1].category.is_none());
        // The abnormal first attempt triggered exactly one recovery tap
        // (home), before the collector's four gesture taps.
        let home = config.gestures.home;
        assert_eq!(device.taps.borrow()[0], home);
    }

    #[test]
    fn exhausted_activity_attempts_at_most_intents_plus_one() {
        let tmp = TempDir::new().expect("tmp");
        let paths = test_paths(&tmp);
        let config = test_config();
        let extras = ExtrasSource::empty();
        let device = FakeDevice::new();
        let sink = RecordingSink::default();
        // All pulls fail: every attempt classifies abnormal.

        let activity = entry(
            "com.example.app.BrokenActivity",
            &[
                ("android.intent.action.VIEW", "android.intent.category.DEFAULT"),
                ("android.intent.action.EDIT", "android.intent.category.DEFAULT"),
            ],
        );
        let explorer = Explorer::new(&device, &config, &paths, &extras, &sink);
        let result = &explorer.explore_all(APP, PKG, std::slice::from_ref(&activity))[0];

        assert_eq!(result.verdict, ScreenVerdict::Abnormal);
        assert!(!result.artifacts_collected);
        assert_eq!(device.launches.borrow().len(), 3);
        assert_eq!(sink.outcomes("explorer"), vec!["exhausted".to_string()]);
    }

    #[test]
    fn extras_ride_along_on_every_attempt() {
        let tmp = TempDir::new().expect("tmp");
        let paths = test_paths(&tmp);
        let config = test_config();
        let extras = ExtrasSource::parse("com.example.app.MainActivity:getString__query\n");
        let device = FakeDevice::new();
        let sink = RecordingSink::default();
        push_normal_screen(&device);

        let activity = entry("com.example.app.MainActivity", &[]);
        let explorer = Explorer::new(&device, &config, &paths, &extras, &sink);
        explorer.explore_all(APP, PKG, std::slice::from_ref(&activity));

        let launches = device.launches.borrow();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].extras.len(), 1);
        assert_eq!(launches[0].extras[0].key, "query");
    }

    #[test]
    fn summary_counts_balance() {
        let tmp = TempDir::new().expect("tmp");
        let paths = test_paths(&tmp);
        let config = test_config();
        let extras = ExtrasSource::empty();
        let device = FakeDevice::new();
        let sink = RecordingSink::default();
        // First activity normal, second exhausted.
        push_normal_screen(&device);

        let activities = vec![
            entry("com.example.app.GoodActivity", &[]),
            entry("com.example.app.BadActivity", &[]),
        ];
        let explorer = Explorer::new(&device, &config, &paths, &extras, &sink);
        let results = explorer.explore_all(APP, PKG, &activities);
        let summary = explorer.summarize(APP, PKG, &results);

        assert_eq!(summary.total_activities, 2);
        assert_eq!(summary.launched_activities, 1);
        assert_eq!(summary.unlaunched_activities, 1);
        assert_eq!(
            summary.launched_activities + summary.unlaunched_activities,
            summary.total_activities
        );
    }

    #[test]
    fn issue_count_deduplicates_by_stem() {
        let tmp = TempDir::new().expect("tmp");
        let issues = tmp.path().join("issues");
        fs::create_dir_all(&issues).expect("dir");
        fs::write(issues.join("a.Act.txt"), "x").expect("txt");
        fs::write(issues.join("a.Act.png"), "x").expect("png");
        fs::write(issues.join("b.Act.zip"), "x").expect("zip");
        fs::write(issues.join("notes.log"), "x").expect("log");
        assert_eq!(count_issue_activities(&issues), 2);
        assert_eq!(count_issue_activities(&tmp.path().join("missing")), 0);
    }

    fn write_manifest(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("AndroidManifest.xml");
        fs::write(
            &path,
            r#"
<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <application>
        <activity android:name=".MainActivity">
            <intent-filter>
                <action android:name="android.intent.action.VIEW"/>
                <category android:name="android.intent.category.DEFAULT"/>
            </intent-filter>
        </activity>
        <activity android:name=".BrokenActivity"/>
    </application>
</manifest>
"#,
        )
        .expect("manifest");
        path
    }

    fn job(tmp: &TempDir, apk_path: PathBuf) -> ApplicationJob {
        ApplicationJob {
            apk_path,
            apk_name: APP.to_string(),
            manifest_path: write_manifest(tmp),
            package_names: PackageNames {
                defined: PKG.to_string(),
                used: PKG.to_string(),
            },
            keep_installed: false,
        }
    }

    #[test]
    fn end_to_end_normal_activity_is_collected_and_logged() {
        let tmp = TempDir::new().expect("tmp");
        let paths = ResultPaths::new(tmp.path().join("results"), "emulator-5554");
        let config = test_config();
        let extras = ExtrasSource::empty();
        let sink = RecordingSink::default();

        let apk = tmp.path().join("demo.apk");
        fs::write(&apk, b"apk").expect("apk");

        let device = FakeDevice::new();
        // MainActivity via declared intent: normal. BrokenActivity bare
        // attempt: crash dialog.
        push_normal_screen(&device);
        device.push_tree(Some("<node text=\"Example keeps stopping\"/>"));

        // Issue archive fixture so the summary sees one activity with issues.
        let export_fixture = tmp.path().join("fixture-export");
        fs::create_dir_all(&export_fixture).expect("fixture");
        let zip_file = fs::File::create(export_fixture.join("export.zip")).expect("zip");
        let mut writer = zip::ZipWriter::new(zip_file);
        writer
            .start_file("report.txt", FileOptions::<()>::default())
            .expect("entry");
        writer.write_all(b"1 issue").expect("body");
        writer.finish().expect("finish");
        device.map_dir(&config.scanner.export_dir(), &export_fixture);

        let summary = run_application(
            &device,
            &config,
            &paths,
            &extras,
            &sink,
            &job(&tmp, apk),
        )
        .expect("summary");

        assert_eq!(summary.total_activities, 2);
        assert_eq!(summary.launched_activities, 1);
        assert_eq!(summary.unlaunched_activities, 1);
        assert_eq!(summary.activities_with_issues, 1);

        // BrokenActivity's crash layout was discarded; MainActivity's kept.
        let layouts = paths.layouts_dir(APP);
        assert!(layouts.join("com.example.app.MainActivity.xml").is_file());
        assert!(!layouts.join("com.example.app.BrokenActivity.xml").exists());

        let log = fs::read_to_string(paths.aggregate_log()).expect("log");
        assert!(log.lines().count() == 2);
        assert!(log.contains("demo,com.example.app,2,1,1,1"));

        assert_eq!(device.uninstalls.borrow().as_slice(), [PKG.to_string()]);
    }

    #[test]
    fn missing_apk_is_recorded_not_summarized() {
        let tmp = TempDir::new().expect("tmp");
        let paths = ResultPaths::new(tmp.path().join("results"), "emulator-5554");
        let config = test_config();
        let extras = ExtrasSource::empty();
        let sink = RecordingSink::default();
        let device = FakeDevice::new();

        let summary = run_application(
            &device,
            &config,
            &paths,
            &extras,
            &sink,
            &job(&tmp, tmp.path().join("nope.apk")),
        );

        assert!(summary.is_none());
        assert!(!paths.aggregate_log().exists());
        let errors = fs::read_to_string(paths.install_error_log()).expect("errors");
        assert!(errors.contains("missing launchable apk"));
        assert!(device.launches.borrow().is_empty());
    }

    #[test]
    fn install_failure_is_recorded_not_summarized() {
        let tmp = TempDir::new().expect("tmp");
        let paths = ResultPaths::new(tmp.path().join("results"), "emulator-5554");
        let config = test_config();
        let extras = ExtrasSource::empty();
        let sink = RecordingSink::default();

        let apk = tmp.path().join("demo.apk");
        fs::write(&apk, b"apk").expect("apk");
        let device = FakeDevice::new();
        *device.install_outcome.borrow_mut() = Some(InstallOutcome::Failure(
            "Failure [INSTALL_FAILED_OLDER_SDK]".to_string(),
        ));

        let summary = run_application(
            &device,
            &config,
            &paths,
            &extras,
            &sink,
            &job(&tmp, apk),
        );

        assert!(summary.is_none());
        let errors = fs::read_to_string(paths.install_error_log()).expect("errors");
        assert!(errors.contains("INSTALL_FAILED_OLDER_SDK"));
        assert_eq!(sink.outcomes("explorer"), vec!["skipped".to_string()]);
    }
}
