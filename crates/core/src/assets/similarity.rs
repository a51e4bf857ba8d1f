//! Best-effort "similar asset type name" advisory.
//!
//! Never blocks creation; callers show the result as a hint.

use serde::Serialize;

use super::AssetType;

/// Words this short or shorter are ignored when looking for partial matches.
const MIN_WORD_LEN: usize = 4;
const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimilarNameAdvice {
    /// Existing name equal to the candidate, ignoring case and surrounding space.
    pub exact: Option<String>,
    /// Up to three existing names sharing a significant word with the candidate.
    pub similar: Vec<String>,
}

impl SimilarNameAdvice {
    pub fn is_clear(&self) -> bool {
        self.exact.is_none() && self.similar.is_empty()
    }
}

/// Compare `candidate` against the asset types of one area.
pub fn similar_type_names(candidate: &str, existing: &[AssetType]) -> SimilarNameAdvice {
    let wanted = candidate.trim().to_lowercase();
    if wanted.is_empty() {
        return SimilarNameAdvice::default();
    }

    let exact = existing
        .iter()
        .find(|t| t.name.trim().to_lowercase() == wanted)
        .map(|t| t.name.clone());

    let words: Vec<&str> = wanted
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .collect();

    let mut similar = Vec::new();
    for asset_type in existing {
        if similar.len() == MAX_SUGGESTIONS {
            break;
        }
        let name = asset_type.name.to_lowercase();
        if Some(&asset_type.name) == exact.as_ref() {
            continue;
        }
        if words.iter().any(|w| name.contains(w)) && !similar.contains(&asset_type.name) {
            similar.push(asset_type.name.clone());
        }
    }

    SimilarNameAdvice { exact, similar }
}
