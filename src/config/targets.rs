use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Target;

#[derive(Debug, Serialize, Deserialize)]
struct TargetFile {
    #[serde(default)]
    targets: Vec<Target>,
}

/// Loads the target list. A missing file is an empty list, not an error.
pub fn load_targets(path: &Path) -> Result<Vec<Target>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read targets file {}", path.display()))?;
    let file: TargetFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse targets file {}", path.display()))?;
    Ok(file.targets)
}

pub fn save_targets(path: &Path, targets: &[Target]) -> Result<()> {
    let file = TargetFile {
        targets: targets.to_vec(),
    };
    let payload = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, payload)
        .with_context(|| format!("failed to write targets file {}", path.display()))?;
    Ok(())
}
