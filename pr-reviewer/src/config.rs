//! Reviewer settings from the environment.
//!
//! | var                  | default              |
//! |----------------------|----------------------|
//! | `GITHUB_WEB_BASE`    | `https://github.com` |
//! | `REVIEW_CONCURRENCY` | 5                    |
//! | `INDEX_CONCURRENCY`  | 2                    |
//! | `STEP_MAX_ATTEMPTS`  | 3                    |
//! | `STEP_BACKOFF_MS`    | 500                  |
//! | `REVIEWER_DATA_DIR`  | `code_data/reviewer` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ai_llm_service::error_handler::opt_env;

use crate::errors::{ConfigError, ReviewResult};
use crate::json_file::data_root;
use crate::workflow::RetryPolicy;

#[derive(Debug, Clone)]
pub struct ReviewerConfig {
    pub web_base: String,
    pub review_concurrency: usize,
    pub index_concurrency: usize,
    pub retry: RetryPolicy,
    /// Holds the JSON store files and the `journal/` directory.
    pub data_dir: PathBuf,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            web_base: "https://github.com".into(),
            review_concurrency: 5,
            index_concurrency: 2,
            retry: RetryPolicy::default(),
            data_dir: PathBuf::from("code_data/reviewer"),
        }
    }
}

impl ReviewerConfig {
    pub fn from_env() -> ReviewResult<Self> {
        let defaults = Self::default();

        let web_base = opt_env("GITHUB_WEB_BASE").unwrap_or(defaults.web_base);
        if !(web_base.starts_with("http://") || web_base.starts_with("https://")) {
            return Err(ConfigError::InvalidVar {
                var: "GITHUB_WEB_BASE",
                reason: format!("expected an http(s) URL, got '{web_base}'"),
            }
            .into());
        }

        let review_concurrency = positive(
            "REVIEW_CONCURRENCY",
            parse_env("REVIEW_CONCURRENCY")?.unwrap_or(defaults.review_concurrency),
        )?;
        let index_concurrency = positive(
            "INDEX_CONCURRENCY",
            parse_env("INDEX_CONCURRENCY")?.unwrap_or(defaults.index_concurrency),
        )?;
        let max_attempts = positive(
            "STEP_MAX_ATTEMPTS",
            parse_env("STEP_MAX_ATTEMPTS")?.unwrap_or(defaults.retry.max_attempts),
        )?;
        let backoff_ms: u64 = parse_env("STEP_BACKOFF_MS")?
            .unwrap_or(defaults.retry.backoff.as_millis() as u64);

        Ok(Self {
            web_base: web_base.trim_end_matches('/').to_string(),
            review_concurrency,
            index_concurrency,
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(backoff_ms)),
            data_dir: data_root(),
        })
    }

    pub fn journal_dir(&self) -> PathBuf {
        self.data_dir.join("journal")
    }
}

fn parse_env<T: FromStr>(var: &'static str) -> ReviewResult<Option<T>> {
    match opt_env(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidVar {
                var,
                reason: format!("cannot parse '{raw}'"),
            }
            .into()
        }),
    }
}

fn positive<T: PartialOrd + Default>(var: &'static str, value: T) -> ReviewResult<T> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidVar {
            var,
            reason: "must be greater than zero".into(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ReviewerConfig::default();
        assert_eq!(cfg.review_concurrency, 5);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.backoff, Duration::from_millis(500));
        assert_eq!(cfg.journal_dir(), PathBuf::from("code_data/reviewer/journal"));
    }

    #[test]
    fn zero_is_rejected() {
        let err = positive("REVIEW_CONCURRENCY", 0usize).unwrap_err();
        assert!(err.to_string().contains("REVIEW_CONCURRENCY"));
        assert_eq!(positive("STEP_MAX_ATTEMPTS", 2u32).unwrap(), 2);
    }
}
