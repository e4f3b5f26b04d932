use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use uuid::Uuid;

use axprobe::app::aapt::{resolve_package_names, PackageNames};
use axprobe::app::config::{load_config, load_config_from_path};
use axprobe::app::device::adb::AdbDevice;
use axprobe::app::device::locator::{resolve_tool_program, validate_tool_program};
use axprobe::app::events::TracingSink;
use axprobe::app::explorer::{run_application, ApplicationJob};
use axprobe::app::extras::ExtrasSource;
use axprobe::app::fsutil::ResultPaths;
use axprobe::app::logging::init_logging;

/// Explore every declared activity of an Android application on one device
/// and harvest accessibility-scan artifacts into a per-activity result tree.
#[derive(Debug, Parser)]
#[command(name = "axprobe", version)]
struct Cli {
    /// Device serial, e.g. emulator-5554; falls back to ANDROID_SERIAL
    #[arg(short, long)]
    serial: Option<String>,

    /// Launchable (repackaged) APK to explore
    #[arg(long)]
    apk: PathBuf,

    /// Application name used in the result tree; defaults to the APK stem
    #[arg(long)]
    name: Option<String>,

    /// Results root; also holds the per-device scratch directory
    #[arg(long, default_value = "results")]
    results: PathBuf,

    /// Extracted AndroidManifest.xml; defaults to
    /// <results>/apktool/<name>/AndroidManifest.xml
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Synthetic intent-extras file produced by the analysis stage
    #[arg(long)]
    extras_file: Option<PathBuf>,

    /// Configuration file; defaults to AXPROBE_CONFIG_PATH or
    /// ~/.axprobe_config.json
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leave the application installed after exploration
    #[arg(long)]
    keep_installed: bool,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();

    let Some(serial) = cli
        .serial
        .clone()
        .or_else(|| std::env::var("ANDROID_SERIAL").ok())
        .filter(|serial| !serial.trim().is_empty())
    else {
        error!(trace_id = %trace_id, "no device serial given (--serial or ANDROID_SERIAL)");
        return ExitCode::from(2);
    };

    let config = match cli
        .config
        .as_deref()
        .map(load_config_from_path)
        .unwrap_or_else(load_config)
    {
        Ok(config) => config,
        Err(err) => {
            error!(trace_id = %trace_id, error = %err, "failed to load configuration");
            return ExitCode::from(2);
        }
    };

    let adb_program = resolve_tool_program(&config.tools.adb_path, "adb");
    if let Err(reason) = validate_tool_program(&adb_program, "adb") {
        error!(trace_id = %trace_id, reason = %reason, "adb unavailable");
        return ExitCode::from(2);
    }
    let aapt_program = resolve_tool_program(&config.tools.aapt_path, "aapt");
    if let Err(reason) = validate_tool_program(&aapt_program, "aapt") {
        error!(trace_id = %trace_id, reason = %reason, "aapt unavailable");
        return ExitCode::from(2);
    }

    let apk_name = cli.name.clone().unwrap_or_else(|| {
        cli.apk
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "app".to_string())
    });

    // With no APK on disk there is nothing to resolve; run_application will
    // record the skip in the install-error log.
    let package_names = if cli.apk.is_file() {
        match resolve_package_names(
            &aapt_program,
            &cli.apk,
            config.tools.command_timeout_secs,
            &trace_id,
        ) {
            Ok(names) => names,
            Err(err) => {
                error!(trace_id = %trace_id, error = %err, "failed to resolve package names");
                return ExitCode::from(1);
            }
        }
    } else {
        PackageNames {
            defined: String::new(),
            used: String::new(),
        }
    };

    let manifest_path = cli.manifest.clone().unwrap_or_else(|| {
        cli.results
            .join("apktool")
            .join(&apk_name)
            .join("AndroidManifest.xml")
    });
    let extras = cli
        .extras_file
        .as_deref()
        .map(ExtrasSource::load)
        .unwrap_or_else(ExtrasSource::empty);

    let device = AdbDevice::new(
        adb_program,
        serial.clone(),
        config.tools.command_timeout_secs,
        trace_id.clone(),
    );
    let paths = ResultPaths::new(cli.results.clone(), serial.clone());
    let job = ApplicationJob {
        apk_path: cli.apk.clone(),
        apk_name,
        manifest_path,
        package_names,
        keep_installed: cli.keep_installed,
    };

    info!(
        trace_id = %trace_id,
        serial = %serial,
        apk = %cli.apk.display(),
        "starting activity exploration"
    );

    match run_application(&device, &config, &paths, &extras, &TracingSink, &job) {
        Some(summary) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).unwrap_or_default()
            );
            ExitCode::SUCCESS
        }
        None => {
            error!(trace_id = %trace_id, "application could not be explored");
            ExitCode::from(1)
        }
    }
}
