//! Configuration for the `prazos` binary.
//!
//! Read from `prazos.toml` (or `--config`), overlaid with `PRAZOS_*`
//! environment variables; nested keys use `__`, e.g.
//! `PRAZOS_INSTALLMENTS__DELETE_CHUNK_SIZE=200`.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use prazos_core::store::MAX_BATCH_WRITES;
use prazos_installments::InstallmentSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// SQLite file holding the `prazos` collection; `~` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:   PathBuf,
  #[serde(default)]
  pub installments: InstallmentSettings,
}

fn default_store_path() -> PathBuf {
  PathBuf::from("~/.local/share/prazos/prazos.db")
}

impl AppConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PRAZOS")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;

    let chunk = cfg.installments.delete_chunk_size;
    if chunk == 0 || chunk > MAX_BATCH_WRITES {
      bail!("delete_chunk_size must be between 1 and {MAX_BATCH_WRITES}, got {chunk}");
    }

    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_uses_defaults() {
    let cfg = AppConfig::load(Path::new("/nonexistent/prazos.toml")).unwrap();
    assert_eq!(cfg.installments.delete_chunk_size, 450);
    assert!(cfg.store_path.ends_with("prazos.db"));
  }

  #[test]
  fn tilde_expansion() {
    let expanded = expand_tilde(Path::new("/abs/path.db"));
    assert_eq!(expanded, PathBuf::from("/abs/path.db"));

    let expanded = expand_tilde(Path::new("~/x.db"));
    match std::env::var("HOME") {
      Ok(home) => assert_eq!(expanded, PathBuf::from(home).join("x.db")),
      Err(_) => assert_eq!(expanded, PathBuf::from("~/x.db")),
    }
  }

  #[test]
  fn only_leading_tilde_slash_expands() {
    assert_eq!(expand_tilde(Path::new("~x.db")), PathBuf::from("~x.db"));
    assert_eq!(expand_tilde(Path::new("data/~/x.db")), PathBuf::from("data/~/x.db"));
  }
}
