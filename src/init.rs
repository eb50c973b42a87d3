//! Project initialization for nestland
//!
//! `nestland init` creates `.nestland/` with the database and a default config

use crate::config::Config;
use crate::db::{Database, CURRENT_SCHEMA};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Initialize nestland in `root`. Returns the database path.
pub fn init_project(root: &Path) -> Result<PathBuf, String> {
    println!("\n{}", "Initializing Nestland Command Center...".cyan().bold());
    println!("   Directory: {}\n", root.display());

    // 1. Create .nestland directory
    let nestland_dir = root.join(".nestland");
    create_dir_if_missing(&nestland_dir)?;

    // 2. Open the database once to create tables
    let db_path = nestland_dir.join("nestland.db");
    let existed = db_path.exists();
    Database::open_at(&db_path).map_err(|e| format!("Could not create database: {}", e))?;
    if existed {
        println!("   {} .nestland/nestland.db (schema {})", "Checked".yellow(), CURRENT_SCHEMA);
    } else {
        println!("   {} .nestland/nestland.db (schema {})", "Creating".green(), CURRENT_SCHEMA);
    }

    // 3. Default config
    let config_path = nestland_dir.join("config.toml");
    write_file_if_missing(&config_path, &Config::default().to_toml(), ".nestland/config.toml")?;

    // 4. Keep the database out of version control
    add_to_gitignore(root)?;

    println!("\n{}", "Nestland initialized!".green().bold());
    println!("\nNext steps:");
    println!("  1. Run {} to create a process", "nestland process add \"Client Onboarding\"".cyan());
    println!("  2. Run {} to add steps", "nestland step add client-onboarding \"Intake call\" --lane Client".cyan());
    println!("  3. Run {} to start the dashboard API", "nestland serve".cyan());
    println!();

    Ok(db_path)
}

fn create_dir_if_missing(path: &Path) -> Result<(), String> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("Could not create {}: {}", path.display(), e))?;
        println!("   {} {}", "Creating".green(), path.display());
    }
    Ok(())
}

fn write_file_if_missing(path: &Path, content: &str, display_name: &str) -> Result<(), String> {
    if path.exists() {
        println!("   {} {} (already exists)", "Skipping".yellow(), display_name);
    } else {
        fs::write(path, content).map_err(|e| format!("Could not write {}: {}", display_name, e))?;
        println!("   {} {}", "Creating".green(), display_name);
    }
    Ok(())
}

fn add_to_gitignore(root: &Path) -> Result<(), String> {
    let gitignore_path = root.join(".gitignore");
    let entry = ".nestland/nestland.db";

    if gitignore_path.exists() {
        let content = fs::read_to_string(&gitignore_path)
            .map_err(|e| format!("Could not read .gitignore: {}", e))?;
        if content.lines().any(|l| l.trim() == entry) {
            return Ok(());
        }
        let mut updated = content;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(entry);
        updated.push('\n');
        fs::write(&gitignore_path, updated)
            .map_err(|e| format!("Could not update .gitignore: {}", e))?;
        println!("   {} .gitignore (added {})", "Updated".green(), entry);
    } else {
        fs::write(&gitignore_path, format!("{}\n", entry))
            .map_err(|e| format!("Could not write .gitignore: {}", e))?;
        println!("   {} .gitignore", "Creating".green());
    }
    Ok(())
}
