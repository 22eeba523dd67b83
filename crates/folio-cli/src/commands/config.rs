//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use folio_core::{Config, Tier};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "restore_grace_ms": config.restore_grace_ms,
                    "page_lines": config.page_lines,
                    "tier": config.tier,
                    "log_file": config.log_file,
                    "theme": config.theme,
                    "documents": config.documents,
                    "rules": config.rules
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:          {}", config.data_dir.display());
            println!("  restore_grace_ms:  {}", config.restore_grace_ms);
            println!("  page_lines:        {}", config.page_lines);
            println!("  tier:              {}", config.tier);
            println!(
                "  log_file:          {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  theme.font_family: {}", config.theme.font_family);
            println!("  theme.font_size:   {}", config.theme.font_size);
            println!("  theme.line_height: {}", config.theme.line_height);
            println!();
            println!("Documents:");
            for entry in &config.documents {
                println!("  {} = {} ({})", entry.id, entry.name, entry.path);
            }
            println!();
            println!("Rules:");
            for rule in &config.rules {
                println!("  {} -> {}", rule.word, rule.replacement);
            }
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "restore_grace_ms" => {
            config.restore_grace_ms = value
                .parse()
                .context("Invalid value for restore_grace_ms. Use a number of milliseconds.")?;
        }
        "page_lines" => {
            config.page_lines = value
                .parse()
                .context("Invalid value for page_lines. Use a positive number.")?;
        }
        "tier" => {
            config.tier = value.parse::<Tier>().map_err(anyhow::Error::msg)?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "theme.font_family" => {
            config.theme.font_family = value.to_string();
        }
        "theme.font_size" => {
            config.theme.font_size = value.to_string();
        }
        "theme.line_height" => {
            config.theme.line_height = value
                .parse()
                .context("Invalid value for theme.line_height. Use a number.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, restore_grace_ms, page_lines, tier, log_file, \
                 theme.font_family, theme.font_size, theme.line_height",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "restore_grace_ms", "500").unwrap();
        apply(&mut config, "tier", "session").unwrap();
        apply(&mut config, "log_file", "/tmp/folio.log").unwrap();
        apply(&mut config, "theme.line_height", "2.0").unwrap();

        assert_eq!(config.restore_grace_ms, 500);
        assert_eq!(config.tier, Tier::Session);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/folio.log")));
        assert_eq!(config.theme.line_height, 2.0);

        apply(&mut config, "log_file", "none").unwrap();
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "sync_url", "ws://x").is_err());
        assert!(apply(&mut config, "tier", "forever").is_err());
        assert!(apply(&mut config, "page_lines", "-1").is_err());
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        std::fs::write(&path, format!("data_dir = {:?}\n", data_dir.to_string_lossy())).unwrap();
        let output = Output::new(OutputFormat::Quiet);

        set("page_lines".to_string(), "30".to_string(), Some(&path), &output).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.page_lines, 30);
        assert_eq!(config.data_dir, data_dir);
    }
}
