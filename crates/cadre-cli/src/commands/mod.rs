//! CLI subcommands.

pub mod list;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use cadre_core::config::{self, ConfigLoader, Configuration};

/// Resolve and load the configuration: an explicit `--config` path, or the
/// nearest `cadre.yaml` walking upward from the current directory.
pub(crate) fn load_configuration(
    path: Option<&str>,
    strict: bool,
) -> Result<Configuration, String> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => {
            let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
            config::find_default(&cwd).ok_or_else(|| {
                format!(
                    "no {} found in the current directory or any parent up to the git root",
                    config::DEFAULT_FILE_NAME
                )
            })?
        }
    };
    ConfigLoader::new()
        .strict(strict)
        .load(&path)
        .map_err(|e| e.to_string())
}

/// Parse a `KEY=VALUE` input argument.
pub(crate) fn parse_key_val(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid input `{pair}` (expected KEY=VALUE)")),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
