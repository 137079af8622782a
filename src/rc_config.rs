use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration loaded from a `.fedcheckrc` TOML file.
///
/// Looked up first in the working directory, then in `$HOME`.
/// CLI flags always take precedence over file values.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RcConfig {
    pub federations: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub validate: Option<bool>,
    pub workers: Option<usize>,
    pub max_in_flight: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub pacing_ms: Option<u64>,
    pub max_redirects: Option<u32>,
    pub retry_protected: Option<bool>,
    pub json: Option<bool>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
    pub fail_under: Option<f64>,
}

impl RcConfig {
    pub fn load(working_dir: &Path) -> Self {
        let candidates = [
            Some(working_dir.join(".fedcheckrc")),
            dirs_home().map(|h| h.join(".fedcheckrc")),
        ];

        for candidate in candidates.iter().flatten() {
            if let Ok(contents) = std::fs::read_to_string(candidate) {
                match toml::from_str::<RcConfig>(&contents) {
                    Ok(cfg) => {
                        tracing::debug!(path = %candidate.display(), "loaded rc file");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(path = %candidate.display(), error = %e, "ignoring invalid rc file");
                    }
                }
            }
        }

        RcConfig::default()
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let cfg: RcConfig = toml::from_str(
            r#"
            validate = true
            workers = 4
            federations = "feds.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.validate, Some(true));
        assert_eq!(cfg.workers, Some(4));
        assert_eq!(cfg.federations.as_deref(), Some(Path::new("feds.json")));
        assert!(cfg.timeout_secs.is_none());
    }
}
