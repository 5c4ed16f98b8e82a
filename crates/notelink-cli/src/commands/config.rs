//! Config command handlers

use anyhow::{Context as _, Result};

use notelink_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:                {}", config.data_dir.display());
            println!("  link_scheme:             {}", config.link_scheme);
            println!("  attachments_dir:         {}", config.attachments_dir);
            println!("  filename_template:       {}", config.filename_template);
            println!("  link_template:           {}", config.link_template);
            println!(
                "  insert_link_position:    {}",
                config.insert_link_position.as_str()
            );
            println!("  render_poll_interval_ms: {}", config.render_poll_interval_ms);
            println!("  render_max_attempts:     {}", config.render_max_attempts);
            println!("  log_level:               {}", config.log_level);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    config.set(&key, &value)?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
