// Path: crates/cli/src/commands/config.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oraclegate_types::config::{
    ConditionConfig, OracleConfig, RetrievalConfig, StorageBackend, StorageConfig,
};
use oraclegate_types::keys::ALBUM_DROP_KIND;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
pub struct ConfigCmdArgs {
    #[clap(subcommand)]
    pub command: ConfigSubCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubCommands {
    /// Generate a sample oraclegate.toml.
    New {
        /// Write to this file instead of stdout.
        #[clap(long)]
        out: Option<PathBuf>,
        /// Database file for the redb backend.
        #[clap(long, default_value = "oraclegate.redb")]
        db: PathBuf,
        /// Global staleness bound in seconds.
        #[clap(long, default_value = "3600")]
        max_age_secs: u64,
    },
    /// Parse and validate the file given by --config.
    Check,
}

fn sample(db: PathBuf, max_age_secs: u64) -> OracleConfig {
    OracleConfig {
        retrieval: RetrievalConfig {
            max_age_secs,
            io_timeout_ms: 2000,
        },
        storage: StorageConfig {
            backend: StorageBackend::Redb,
            path: Some(db),
        },
        conditions: vec![ConditionConfig {
            kind: ALBUM_DROP_KIND.to_string(),
            max_age_secs: None,
        }],
    }
}

pub fn run(args: ConfigCmdArgs, config: &Path) -> Result<()> {
    match args.command {
        ConfigSubCommands::New {
            out,
            db,
            max_age_secs,
        } => {
            let cfg = sample(db, max_age_secs);
            cfg.validate()?;
            let text = cfg.to_toml_string()?;
            match out {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "wrote config");
                }
                None => print!("{text}"),
            }
        }
        ConfigSubCommands::Check => {
            let cfg = OracleConfig::load(config)
                .with_context(|| format!("invalid config {}", config.display()))?;
            println!(
                "{}",
                serde_json::json!({
                    "ok": true,
                    "backend": format!("{:?}", cfg.storage.backend).to_lowercase(),
                    "max_age_secs": cfg.retrieval.max_age_secs,
                    "conditions": cfg.conditions.iter().map(|c| c.kind.clone()).collect::<Vec<_>>(),
                })
            );
        }
    }
    Ok(())
}
