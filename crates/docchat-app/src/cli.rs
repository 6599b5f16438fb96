//! CLI argument definitions for the docchat server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use docchat_core::DocChatConfig;

pub const CONFIG_ENV: &str = "DOCCHAT_CONFIG";
pub const PORT_ENV: &str = "DOCCHAT_PORT";
pub const PERSIST_DIR_ENV: &str = "CHROMA_PERSIST_DIR";

/// docchat - chat with an uploaded PDF, with a built-in calculator.
#[derive(Parser, Debug, Default)]
#[command(name = "docchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// API server bind address.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Directory uploaded PDFs are written to.
    #[arg(long = "upload-dir")]
    pub upload_dir: Option<PathBuf>,

    /// Directory holding one subdirectory per document collection.
    #[arg(long = "persist-dir")]
    pub persist_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > DOCCHAT_CONFIG env var > ./docchat.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from("docchat.toml")
    }

    /// Apply flag and environment overrides on top of the loaded config.
    pub fn apply(&self, config: &mut DocChatConfig) {
        self.apply_with_env(config, |key| std::env::var(key).ok());
    }

    fn apply_with_env(&self, config: &mut DocChatConfig, env: impl Fn(&str) -> Option<String>) {
        if let Some(port) = self.port {
            config.server.port = port;
        } else if let Some(port) = env(PORT_ENV).and_then(|v| v.parse::<u16>().ok()) {
            config.server.port = port;
        }

        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }

        if let Some(ref dir) = self.upload_dir {
            config.storage.upload_dir = dir.to_string_lossy().to_string();
        }

        if let Some(ref dir) = self.persist_dir {
            config.storage.persist_dir = dir.to_string_lossy().to_string();
        } else if let Some(dir) = env(PERSIST_DIR_ENV).filter(|d| !d.is_empty()) {
            config.storage.persist_dir = dir;
        }

        if let Some(ref level) = self.log_level {
            config.server.log_level = level.clone();
        }
    }
}
