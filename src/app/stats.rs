use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::app::models::ApplicationSummary;

const AGGREGATE_HEADER: &str =
    "apk_name,pkg_name,all_act_num,launched_act_num,act_not_launched,act_num_with_issue";

const INSTALL_ERROR_HEADER: &str = "apk_name,reason,recorded_at";

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// Append-only with the header written exactly once at creation; rows from
// parallel per-device processes may interleave in any order.
fn append_row(path: &Path, header: &str, row: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create {}: {err}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("Failed to open {}: {err}", path.display()))?;
    let is_new = file
        .metadata()
        .map(|meta| meta.len() == 0)
        .unwrap_or(false);
    if is_new {
        writeln!(file, "{header}")
            .map_err(|err| format!("Failed to write header to {}: {err}", path.display()))?;
    }
    writeln!(file, "{row}")
        .map_err(|err| format!("Failed to append to {}: {err}", path.display()))?;
    Ok(())
}

pub fn append_summary_row(path: &Path, summary: &ApplicationSummary) -> Result<(), String> {
    let row = format!(
        "{},{},{},{},{},{}",
        csv_field(&summary.app_name),
        csv_field(&summary.package_name),
        summary.total_activities,
        summary.launched_activities,
        summary.unlaunched_activities,
        summary.activities_with_issues,
    );
    append_row(path, AGGREGATE_HEADER, &row)
}

pub fn append_install_error(path: &Path, apk_name: &str, reason: &str) -> Result<(), String> {
    let row = format!(
        "{},{},{}",
        csv_field(apk_name),
        csv_field(reason),
        Utc::now().to_rfc3339(),
    );
    append_row(path, INSTALL_ERROR_HEADER, &row)
}
