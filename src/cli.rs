//! Command-line argument parsing for querygate.

use clap::Parser;
use std::path::PathBuf;

/// Read-only SQL gateway for LLM-generated queries against tenant databases.
#[derive(Parser, Debug)]
#[command(name = "querygate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, env = "QUERYGATE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// HTTP bind address (overrides config)
    #[arg(long, env = "QUERYGATE_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// HTTP bind port (overrides config)
    #[arg(short = 'p', long, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,
}

impl Cli {
    /// Parses CLI arguments from the process environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, falling back to the platform default.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::AppConfig::default_path)
    }
}
