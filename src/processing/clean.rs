//! Cell cleaning applied before any schema decision.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DataSet, Value};

static PHONE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^ph:\s*").expect("valid phone prefix regex"));

/// Tokens treated as missing values (compared after trimming).
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Options for [`clean`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOptions {
    /// Text cells equal to one of these (after trimming) become [`Value::Null`].
    pub null_tokens: Vec<String>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CleanOptions {
    fn is_null_token(&self, s: &str) -> bool {
        self.null_tokens.iter().any(|t| t == s)
    }
}

/// Whether a column holds phone numbers (its name contains `tel` or `phone`).
pub fn is_phone_column(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("tel") || name.contains("phone")
}

/// Clean every cell of `dataset`, returning the cleaned copy.
///
/// - Text cells are trimmed; text equal to a null token becomes null.
/// - In phone columns a leading `ph:` prefix (any case, plus following whitespace) is removed.
/// - Non-text cells are left as they are.
///
/// `clean(&clean(x, o), o) == clean(x, o)` for any input.
pub fn clean(dataset: &DataSet, options: &CleanOptions) -> DataSet {
    let phone_cols: Vec<bool> = dataset.columns.iter().map(|c| is_phone_column(c)).collect();

    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(phone_cols.iter())
                .map(|(cell, &phone)| clean_value(cell, phone, options))
                .collect()
        })
        .collect();

    DataSet::new(dataset.columns.clone(), rows)
}

fn clean_value(cell: &Value, phone: bool, options: &CleanOptions) -> Value {
    let Value::Utf8(raw) = cell else {
        return cell.clone();
    };

    let mut text = raw.trim();
    if phone {
        while let Some(m) = PHONE_PREFIX.find(text) {
            text = text[m.end()..].trim();
        }
    }

    if options.is_null_token(text) {
        Value::Null
    } else {
        Value::Utf8(text.to_string())
    }
}
