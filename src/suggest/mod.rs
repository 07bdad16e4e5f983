//! In-memory suggestion engine: phrase indexing, prefix lookup and match
//! highlighting.

pub mod index;
pub mod prefix_map;
pub mod spans;

pub use index::{clean_query, tokenize, Candidate, PhraseIndex, DEFAULT_CATEGORY};
pub use spans::{MatchSpans, Span};
