//! Row structs mirroring the database tables.
//!
//! Each submodule contains a `FromRow` struct per table and the conversion
//! into the matching `assetflow-core` type. Enumerations are stored as text
//! and parsed on the way out.

pub mod actor;
pub mod asset;
pub mod audit;
pub mod location;
pub mod movement;
pub mod notification;

use std::str::FromStr;

use assetflow_core::store::StoreError;

/// Parse a text column into a core enumeration.
pub(crate) fn parse_column<T>(column: &'static str, value: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| StoreError::Backend(format!("column {column}: {e}")))
}
