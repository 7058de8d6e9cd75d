//! `vea config`: Configuration management commands.

use std::path::{Path, PathBuf};

use vea_config::AppConfig;

fn resolve(config_path: Option<&Path>) -> PathBuf {
    match config_path {
        Some(p) => p.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    }
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve(config_path);
    let config =
        AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", resolve(config_path).display());
    Ok(())
}

/// Write the default config file; an existing file is left alone.
pub async fn init(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve(config_path);
    if path.exists() {
        println!("  Config file exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("✅ Created config file: {}", path.display());
    Ok(())
}
