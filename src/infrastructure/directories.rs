use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    pub browser_profile_dir: PathBuf,
    pub db_path: PathBuf,
    pub targets_path: PathBuf,
}

pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let data_dir = ensure_dir(PathBuf::from(&cfg.data_dir))?;
    let logs_dir = ensure_dir(PathBuf::from(&cfg.logs_dir))?;
    let screenshots_dir = ensure_dir(data_dir.join("screenshots"))?;
    let browser_profile_dir = ensure_dir(data_dir.join("browser_profile"))?;
    let db_path = data_dir.join(&cfg.db_filename);
    let targets_path = data_dir.join(&cfg.targets_filename);

    let probe_file = data_dir.join(".write-test");
    fs::write(&probe_file, b"ok")?;
    fs::remove_file(&probe_file)?;

    Ok(ResolvedPaths {
        data_dir,
        logs_dir,
        screenshots_dir,
        browser_profile_dir,
        db_path,
        targets_path,
    })
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}
