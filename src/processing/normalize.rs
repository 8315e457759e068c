//! Header normalization for [`crate::types::DataSet`].

use std::collections::HashMap;

use crate::error::{IdentifierKind, ImportError, ImportResult};
use crate::types::DataSet;

/// Map a raw header to a lowercase identifier made only of `[a-z0-9_]`.
///
/// Steps, in order: trim, replace internal whitespace with `_`, lowercase, drop every other
/// character. Never fails; the result may be empty.
///
/// ```rust
/// use sql_importer::processing::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Company Name"), "company_name");
/// assert_eq!(normalize_column_name(" A.b-c:D "), "abcd");
/// ```
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Normalize every header of `dataset` in place.
///
/// Fails with [`ImportError::DuplicateColumn`] when two headers collapse to the same name and
/// with [`ImportError::InvalidIdentifier`] when a header normalizes to nothing.
pub fn normalize_headers(dataset: &mut DataSet) -> ImportResult<()> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(dataset.columns.len());
    let mut normalized = Vec::with_capacity(dataset.columns.len());

    for raw in &dataset.columns {
        let name = normalize_column_name(raw);
        if name.is_empty() {
            return Err(ImportError::InvalidIdentifier {
                kind: IdentifierKind::Column,
                value: raw.clone(),
            });
        }
        if let Some(first) = seen.get(&name) {
            return Err(ImportError::DuplicateColumn {
                raw: vec![(*first).to_string(), raw.clone()],
                name,
            });
        }
        seen.insert(name.clone(), raw);
        normalized.push(name);
    }

    log::debug!("normalized headers {:?} -> {:?}", dataset.columns, normalized);
    dataset.columns = normalized;
    Ok(())
}
