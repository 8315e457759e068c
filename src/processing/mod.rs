//! In-memory preparation of a freshly read [`crate::types::DataSet`].
//!
//! The processing layer runs before anything touches the destination:
//!
//! - [`normalize_headers()`]: headers become safe, unique, lowercase identifiers
//! - [`clean()`]: null unification, trimming and phone-prefix stripping
//! - [`infer_columns()`]: storage type proposals for a table that must be created
//!
//! ## Example: normalize → clean → infer
//!
//! ```rust
//! use sql_importer::processing::{clean, infer_columns, normalize_headers, CleanOptions};
//! use sql_importer::types::{DataSet, StorageType, Value};
//!
//! let mut ds = DataSet::new(
//!     vec!["Customer ID".to_string(), "Phone".to_string()],
//!     vec![
//!         vec![Value::Utf8(" 1 ".to_string()), Value::Utf8("Ph: 555-1234".to_string())],
//!         vec![Value::Utf8("2".to_string()), Value::Utf8("NaN".to_string())],
//!     ],
//! );
//!
//! normalize_headers(&mut ds).unwrap();
//! let ds = clean(&ds, &CleanOptions::default());
//! assert_eq!(ds.columns, vec!["customer_id", "phone"]);
//! assert_eq!(ds.rows[0][1], Value::Utf8("555-1234".to_string()));
//! assert_eq!(ds.rows[1][1], Value::Null);
//!
//! let columns = infer_columns(&ds);
//! assert_eq!(columns[0].column_type.family(), StorageType::Integer64);
//! ```

pub mod clean;
pub mod infer;
pub mod normalize;

pub use clean::{clean, is_phone_column, CleanOptions, DEFAULT_NULL_TOKENS};
pub use infer::{infer_columns, infer_storage_type, parse_timestamp};
pub use normalize::{normalize_column_name, normalize_headers};
