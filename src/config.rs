//! JSON configuration file.
//!
//! ```json
//! {
//!   "database": "imports.db",
//!   "preview_rows": 25,
//!   "use_custom_columns": true,
//!   "custom_columns": [
//!     { "name": "company", "sql_type": "NVARCHAR(255)" },
//!     { "name": "phone", "sql_type": "NVARCHAR(50)" }
//!   ],
//!   "column_hints": { "Company Name": "company", "tel": "phone" }
//! }
//! ```
//!
//! Every key is optional.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};
use crate::execution::ImportOptions;
use crate::processing::{normalize_column_name, CleanOptions};
use crate::reconcile::ReconcileConfig;
use crate::types::{CatalogType, ColumnDescriptor};

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// One column of the fixed destination schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomColumn {
    pub name: String,
    /// Declared type, e.g. `NVARCHAR(255)`.
    pub sql_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// SQLite database file.
    pub database: Option<PathBuf>,
    pub preview_rows: usize,
    /// Load only `custom_columns`, created with their declared types.
    pub use_custom_columns: bool,
    pub custom_columns: Vec<CustomColumn>,
    /// File header → custom column name. Keys are normalized before use.
    pub column_hints: BTreeMap<String, String>,
    /// Replaces the default null tokens when set.
    pub null_tokens: Option<Vec<String>>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            database: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            use_custom_columns: false,
            custom_columns: Vec::new(),
            column_hints: BTreeMap::new(),
            null_tokens: None,
        }
    }
}

impl ImporterConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ImportResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check the fixed schema and hints for consistency.
    pub fn validate(&self) -> ImportResult<()> {
        let config_err = |message: String| ImportError::Config { message };

        if self.preview_rows == 0 {
            return Err(config_err("preview_rows must be at least 1".to_string()));
        }
        if self.use_custom_columns && self.custom_columns.is_empty() {
            return Err(config_err(
                "use_custom_columns is set but custom_columns is empty".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for c in &self.custom_columns {
            if c.name.is_empty() || normalize_column_name(&c.name) != c.name {
                return Err(config_err(format!(
                    "custom column '{}' must be lowercase letters, digits and underscores",
                    c.name
                )));
            }
            if !names.insert(c.name.as_str()) {
                return Err(config_err(format!("custom column '{}' is listed twice", c.name)));
            }
            if c.sql_type.trim().is_empty() {
                return Err(config_err(format!("custom column '{}' has no sql_type", c.name)));
            }
        }
        if self.use_custom_columns {
            if let Some((from, to)) = self
                .column_hints
                .iter()
                .find(|(_, to)| !names.contains(to.as_str()))
            {
                return Err(config_err(format!(
                    "column hint '{from}' points to '{to}', which is not a custom column"
                )));
            }
        }
        Ok(())
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            use_fixed_schema: self.use_custom_columns,
            fixed_columns: self
                .custom_columns
                .iter()
                .map(|c| ColumnDescriptor::catalog(c.name.clone(), CatalogType::parse(&c.sql_type)))
                .collect(),
            rename_hints: self
                .column_hints
                .iter()
                .map(|(from, to)| (normalize_column_name(from), to.clone()))
                .collect(),
        }
    }

    pub fn clean_options(&self) -> CleanOptions {
        match &self.null_tokens {
            Some(tokens) => CleanOptions {
                null_tokens: tokens.clone(),
            },
            None => CleanOptions::default(),
        }
    }

    /// Import options carrying this config's cleaning and reconciliation settings.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            clean: self.clean_options(),
            reconcile: self.reconcile_config(),
            ..ImportOptions::default()
        }
    }
}
