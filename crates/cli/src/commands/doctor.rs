//! `vea doctor`: Check config and source directories.

use std::path::Path;

use vea_config::AppConfig;
use vea_sources::JsonlRecordLoader;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Vea Doctor — Source Diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    // Check config
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };
    let config = if path.exists() {
        match AppConfig::load_with_env(&path) {
            Ok(config) => {
                println!("  ✅ Config file valid ({})", path.display());
                config
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                println!();
                println!("  ⚠️  Fix the config before running a brief.");
                return Ok(());
            }
        }
    } else {
        println!("  ⚠️  No config file — run `vea config --init` (using defaults)");
        issues += 1;
        AppConfig::default()
    };

    println!("  ✅ Timezone: {}", config.timezone);
    println!("  ✅ Directive trigger: {}", config.trigger);

    // Check source directories
    for (label, dir) in [
        ("Journal directory", &config.sources.journal_dir),
        ("Notes directory", &config.sources.notes_dir),
        ("Records directory", &config.sources.records_dir),
    ] {
        if dir.is_dir() {
            println!("  ✅ {label}: {}", dir.display());
        } else {
            println!("  ⚠️  {label} missing: {}", dir.display());
            issues += 1;
        }
    }

    match JsonlRecordLoader::discover(&config.sources.records_dir) {
        Ok(loaders) if loaders.is_empty() => {
            println!("  ⚠️  No provider dumps (*.jsonl) — only journals and notes will be used");
        }
        Ok(loaders) => {
            for loader in &loaders {
                println!("  ✅ Provider dump: {}", loader.path().display());
            }
        }
        Err(e) => {
            println!("  ❌ Cannot list provider dumps: {e}");
            issues += 1;
        }
    }

    match &config.summarizer.command {
        Some(cmd) => println!("  ✅ Summarizer command: {cmd}"),
        None => println!("  ⚠️  No summarizer command — briefs print the context document"),
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
