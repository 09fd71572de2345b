//! CLI module for Alejandria
//!
//! Provides command-line interface parsing for the alejandria-server binary.

use crate::utils::toml_config::{AppConfig, ConfigError, ConfigManager};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Alejandria - research search and summarization relay
#[derive(Parser, Debug)]
#[command(
    name = "alejandria-server",
    version,
    about = "Alejandria - research search and summarization relay",
    long_about = "Searches research papers and summarizes them with an LLM, streaming\n\
                  progress to clients over WebSockets.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  alejandria-server                       # Start the server\n    \
                  alejandria-server --config my.toml      # Use a custom config file\n    \
                  alejandria-server config --validate     # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "alejandria.toml", global = true)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the effective configuration
    Config {
        /// Validate the configuration instead of printing it
        #[arg(long)]
        validate: bool,

        /// With --validate, also require the LLM API key to be set
        #[arg(long, requires = "validate")]
        strict: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Load the config manager for `path`.
///
/// A missing file yields the built-in defaults; the flag reports whether
/// the file was read.
pub fn load_config_manager(path: &Path) -> Result<(ConfigManager, bool), ConfigError> {
    if path.exists() {
        Ok((ConfigManager::new(path)?, true))
    } else {
        Ok((ConfigManager::from_config(AppConfig::default()), false))
    }
}

/// Text printed by the `config` subcommand.
pub fn config_report(config: &AppConfig, validate: bool, strict: bool) -> Result<String, ConfigError> {
    if !validate {
        return toml::to_string_pretty(config)
            .map_err(|e| ConfigError::ValidationError(format!("Failed to render config: {}", e)));
    }

    if strict {
        config.validate_strict()?;
    } else {
        config.validate()?;
    }

    Ok(format!(
        "Configuration is valid\n  server:     {}:{}\n  search:     {} (timeout {}s, max {} results)\n  llm:        {} at {}\n  summarizer: {:?}",
        config.server.host,
        config.server.port,
        config.search.arxiv_base_url,
        config.search.timeout_secs,
        config.search.max_results,
        config.llm.model,
        config.llm.base_url,
        config.summarizer.dispatch,
    ))
}
