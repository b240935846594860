use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{LedgerError, Result};
use crate::parsing::TrailingMinus;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_WORKBOOK: &str = "daily_report_template.xlsx";

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub api_key: String,
    pub model: String,
    pub workbook_path: PathBuf,
    /// Copy the previous document aside before every save.
    pub backup_on_save: bool,
    /// Hold the store's write lock from load through save.
    pub serialize_writes: bool,
    pub trailing_minus: TrailingMinus,
}

impl LedgerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            workbook_path: PathBuf::from(DEFAULT_WORKBOOK),
            backup_on_save: false,
            serialize_writes: true,
            trailing_minus: TrailingMinus::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_workbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.workbook_path = path.into();
        self
    }

    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_on_save = enabled;
        self
    }

    pub fn with_trailing_minus(mut self, policy: TrailingMinus) -> Self {
        self.trailing_minus = policy;
        self
    }

    /// Reads `GEMINI_API_KEY`, `GEMINI_MODEL`, `LEDGER_WORKBOOK`,
    /// `LEDGER_BACKUP` and `LEDGER_TRAILING_MINUS`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            LedgerError::Configuration("GEMINI_API_KEY environment variable not set".to_string())
        })?;

        let mut config = Self::new(api_key);
        if let Some(model) = get("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(path) = get("LEDGER_WORKBOOK") {
            config.workbook_path = PathBuf::from(path);
        }
        if let Some(flag) = get("LEDGER_BACKUP") {
            config.backup_on_save = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(policy) = get("LEDGER_TRAILING_MINUS") {
            config.trailing_minus = match policy.to_ascii_lowercase().as_str() {
                "strip" => TrailingMinus::Strip,
                "negate" => TrailingMinus::Negate,
                other => {
                    return Err(LedgerError::Configuration(format!(
                        "LEDGER_TRAILING_MINUS must be 'strip' or 'negate', got '{}'",
                        other
                    )))
                }
            };
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_api_key() {
        let err = LedgerConfig::from_vars(&vars(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let config = LedgerConfig::from_vars(&vars(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.workbook_path, PathBuf::from(DEFAULT_WORKBOOK));
        assert!(config.serialize_writes);
        assert_eq!(config.trailing_minus, TrailingMinus::Strip);

        let config = LedgerConfig::from_vars(&vars(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("LEDGER_WORKBOOK", "/tmp/ledger.xlsx"),
            ("LEDGER_BACKUP", "yes"),
            ("LEDGER_TRAILING_MINUS", "Negate"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.workbook_path, PathBuf::from("/tmp/ledger.xlsx"));
        assert!(config.backup_on_save);
        assert_eq!(config.trailing_minus, TrailingMinus::Negate);
    }

    #[test]
    fn test_unknown_trailing_minus_policy() {
        let result = LedgerConfig::from_vars(&vars(&[
            ("GEMINI_API_KEY", "k"),
            ("LEDGER_TRAILING_MINUS", "flip"),
        ]));
        assert!(result.is_err());
    }
}
