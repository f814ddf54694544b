use super::App;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub async fn export(app: &App, output: Option<PathBuf>) -> Result<()> {
    let export = app.store.export_state().await;
    let json = serde_json::to_string_pretty(&export)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} session(s) to {}", export.sessions.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn import(app: &App, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let count = app.store.import_state(&text).await?;
    println!("Imported {count} session(s)");
    Ok(())
}
