//! Mapping inference between a source and a target table.
//!
//! Every target column is scored against every source column by a
//! [`MatcherCascade`]; the best source per target becomes the suggestion.

#![deny(unsafe_code)]

mod engine;
mod matcher;
mod normalize;

pub use engine::{CAST_PENALTY, MappingEngine};
pub use matcher::{
    Containment, ExactName, MatchOutcome, MatcherCascade, NameMatcher, NormalizedName,
};
pub use normalize::{NAME_PREFIXES, NAME_SUFFIXES, normalize_pair, tokens_pair_by_prefix};
