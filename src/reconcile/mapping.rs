//! File-column → destination-column mappings.

use std::collections::HashSet;

use crate::error::{ImportError, ImportResult};
use crate::types::{ColumnDescriptor, DataSet};

/// Where one file column goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    /// Load into this destination column.
    Column(String),
    /// Do not load.
    Skip,
}

/// Mapping from file column names to destination columns or [`ColumnTarget::Skip`].
///
/// File columns without an entry are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, ColumnTarget)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `file_column` onto `table_column`, replacing any earlier entry for it.
    pub fn map(mut self, file_column: impl Into<String>, table_column: impl Into<String>) -> Self {
        self.set(file_column.into(), ColumnTarget::Column(table_column.into()));
        self
    }

    pub fn skip(mut self, file_column: impl Into<String>) -> Self {
        self.set(file_column.into(), ColumnTarget::Skip);
        self
    }

    pub fn set(&mut self, file_column: String, target: ColumnTarget) {
        match self.entries.iter_mut().find(|(f, _)| *f == file_column) {
            Some(entry) => entry.1 = target,
            None => self.entries.push((file_column, target)),
        }
    }

    pub fn get(&self, file_column: &str) -> Option<&ColumnTarget> {
        self.entries
            .iter()
            .find(|(f, _)| f == file_column)
            .map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnTarget)> {
        self.entries.iter().map(|(f, t)| (f.as_str(), t))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rename mapped columns, drop everything else.
    ///
    /// Targets must name destination columns (matched case-insensitively, renamed to the
    /// destination's spelling) and be unique; every key must be a column of `incoming`.
    pub fn apply(
        &self,
        table: &str,
        incoming: &DataSet,
        destination: &[ColumnDescriptor],
    ) -> ImportResult<DataSet> {
        let invalid = |message: String| ImportError::InvalidMapping {
            table: table.to_string(),
            message,
        };

        let mut used: HashSet<&str> = HashSet::new();
        let mut keep: Vec<&str> = Vec::new();
        let mut renamed: Vec<(String, String)> = Vec::new();

        for (file_column, target) in self.iter() {
            if incoming.index_of(file_column).is_none() {
                return Err(invalid(format!("'{file_column}' is not a column of the file")));
            }
            let ColumnTarget::Column(target) = target else {
                continue;
            };
            let dest = destination
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(target))
                .ok_or_else(|| invalid(format!("'{target}' is not a column of the table")))?;
            if !used.insert(dest.name.as_str()) {
                return Err(invalid(format!(
                    "more than one file column is mapped to '{}'",
                    dest.name
                )));
            }
            keep.push(file_column);
            renamed.push((file_column.to_string(), dest.name.clone()));
        }

        // Preserve file column order.
        let ordered: Vec<&str> = incoming
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| keep.contains(c))
            .collect();
        let mut out = incoming.select_columns(&ordered);
        out.rename_columns(|c| {
            renamed
                .iter()
                .find(|(from, _)| from == c)
                .map(|(_, to)| to.clone())
        });
        Ok(out)
    }
}

impl FromIterator<(String, ColumnTarget)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (String, ColumnTarget)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (file_column, target) in iter {
            mapping.set(file_column, target);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnMapping, ColumnTarget};
    use crate::error::ImportError;
    use crate::types::{CatalogType, ColumnDescriptor, DataSet, Value};

    fn incoming() -> DataSet {
        DataSet::new(
            vec!["person".to_string(), "companyname".to_string(), "tel".to_string()],
            vec![vec![
                Value::Utf8("Ada".to_string()),
                Value::Utf8("Engines Ltd".to_string()),
                Value::Utf8("555".to_string()),
            ]],
        )
    }

    fn destination() -> Vec<ColumnDescriptor> {
        ["Contact_Person", "company", "phone"]
            .iter()
            .map(|n| ColumnDescriptor::catalog(*n, CatalogType::with_length("nvarchar", 255)))
            .collect()
    }

    #[test]
    fn renames_and_drops() {
        let mapping = ColumnMapping::new()
            .map("person", "contact_person")
            .skip("companyname")
            .map("tel", "phone");
        let out = mapping.apply("contacts", &incoming(), &destination()).unwrap();

        assert_eq!(out.columns, vec!["Contact_Person", "phone"]);
        assert_eq!(
            out.rows[0],
            vec![Value::Utf8("Ada".to_string()), Value::Utf8("555".to_string())]
        );
    }

    #[test]
    fn unmapped_columns_are_skipped() {
        let mapping = ColumnMapping::new().map("tel", "phone");
        let out = mapping.apply("contacts", &incoming(), &destination()).unwrap();
        assert_eq!(out.columns, vec!["phone"]);
        assert_eq!(out.row_count(), 1);
    }

    #[test]
    fn rejects_duplicate_and_unknown_targets() {
        let dup = ColumnMapping::new().map("person", "phone").map("tel", "phone");
        assert!(matches!(
            dup.apply("contacts", &incoming(), &destination()),
            Err(ImportError::InvalidMapping { .. })
        ));

        let unknown = ColumnMapping::new().map("tel", "fax");
        assert!(matches!(
            unknown.apply("contacts", &incoming(), &destination()),
            Err(ImportError::InvalidMapping { .. })
        ));

        let not_in_file = ColumnMapping::new().map("email", "phone");
        assert!(matches!(
            not_in_file.apply("contacts", &incoming(), &destination()),
            Err(ImportError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn later_entries_replace_earlier_ones() {
        let mapping: ColumnMapping = vec![
            ("tel".to_string(), ColumnTarget::Column("phone".to_string())),
            ("tel".to_string(), ColumnTarget::Skip),
        ]
        .into_iter()
        .collect();
        assert_eq!(mapping.get("tel"), Some(&ColumnTarget::Skip));
        assert_eq!(mapping.iter().count(), 1);
    }
}
