//! Internal code allocation and physical label normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::store::{SequenceStore, StoreError};

/// Label value for assets that have not been tagged yet.
pub const PENDING_LABEL: &str = "PENDING";

/// Prefix used for areas without a dedicated mapping.
pub const DEFAULT_PREFIX: &str = "INV";

/// Physical labels: uppercase alphanumerics with `-`, `.`, `/` or `_` separators.
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9._/-]{0,49}$").expect("valid regex"));

/// Map an area code to its internal-code prefix.
pub fn area_prefix(area_code: &str) -> &'static str {
    match area_code.trim().to_ascii_lowercase().as_str() {
        "sistemas" => "SIS",
        "operaciones" => "OPE",
        "laboratorio" => "LAB",
        _ => DEFAULT_PREFIX,
    }
}

/// Format `<PREFIX>-<YEAR>-<SEQ:04>`. Sequences past 9999 keep growing.
pub fn format_internal_code(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{prefix}-{year}-{sequence:04}")
}

/// Draw the next internal code for `(prefix, year)` from the store's atomic
/// counter. Concurrent callers always receive distinct codes.
pub async fn allocate_internal_code<S>(
    store: &S,
    prefix: &str,
    year: i32,
) -> Result<String, StoreError>
where
    S: SequenceStore + ?Sized,
{
    let sequence = store.next_sequence(prefix, year).await?;
    Ok(format_internal_code(prefix, year, sequence))
}

/// Normalize an optional physical label: blank becomes [`PENDING_LABEL`],
/// anything else is trimmed and uppercased.
pub fn normalize_label(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => PENDING_LABEL.to_string(),
        Some(label) => label.to_uppercase(),
    }
}

/// Whether a normalized, non-pending label has an acceptable shape.
pub fn is_valid_label(label: &str) -> bool {
    label != PENDING_LABEL && LABEL_RE.is_match(label)
}
