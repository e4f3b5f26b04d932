use std::fs;
use std::path::{Path, PathBuf};

/// Layout of the per-run result tree. One engine instance owns one results
/// root and one serial-named scratch directory; parallel instances on other
/// devices use disjoint roots or serials and never contend.
#[derive(Debug, Clone)]
pub struct ResultPaths {
    root: PathBuf,
    serial: String,
}

impl ResultPaths {
    pub fn new(root: impl Into<PathBuf>, serial: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            serial: serial.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn aggregate_log(&self) -> PathBuf {
        self.root.join("log.csv")
    }

    pub fn install_error_log(&self) -> PathBuf {
        self.root.join("install_errors.csv")
    }

    /// Reused across every activity of one application; must be cleared
    /// between pulls so artifacts never leak across activities.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(&self.serial)
    }

    pub fn app_output_dir(&self, app_name: &str) -> PathBuf {
        self.root.join("outputs").join(app_name)
    }

    pub fn issues_dir(&self, app_name: &str) -> PathBuf {
        self.app_output_dir(app_name).join("issues")
    }

    pub fn screenshot_dir(&self, app_name: &str) -> PathBuf {
        self.app_output_dir(app_name).join("screenshot")
    }

    pub fn layouts_dir(&self, app_name: &str) -> PathBuf {
        self.app_output_dir(app_name).join("layouts")
    }

    pub fn ensure_app_dirs(&self, app_name: &str) -> Result<(), String> {
        for dir in [
            self.issues_dir(app_name),
            self.screenshot_dir(app_name),
            self.layouts_dir(app_name),
            self.scratch_dir(),
        ] {
            fs::create_dir_all(&dir)
                .map_err(|err| format!("Failed to create {}: {err}", dir.display()))?;
        }
        Ok(())
    }
}

/// Remove everything inside `dir` while keeping the directory itself.
/// A missing directory is not an error.
pub fn clean_dir_contents(dir: &Path) -> Result<(), String> {
    if !dir.exists() {
        return Ok(());
    }
    let entries =
        fs::read_dir(dir).map_err(|err| format!("Failed to read {}: {err}", dir.display()))?;
    for entry in entries {
        let entry = entry.map_err(|err| format!("Failed to scan {}: {err}", dir.display()))?;
        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
    }
    Ok(())
}

pub fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

/// Rename with a copy fallback for cross-filesystem moves.
pub fn move_file(src: &Path, dest: &Path) -> Result<(), String> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    fs::copy(src, dest)
        .map_err(|err| format!("Failed to copy {} -> {}: {err}", src.display(), dest.display()))?;
    fs::remove_file(src)
        .map_err(|err| format!("Failed to remove {}: {err}", src.display()))?;
    Ok(())
}
