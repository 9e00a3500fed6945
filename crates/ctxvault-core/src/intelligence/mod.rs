//! Relevance lifecycle: decay, boosts, defragmentation and reflection.
//!
//! Every operation here writes to both the note store and the search index.
//! Relevance always stays within `[0, 1]`.

mod decay;
mod defrag;
mod reflect;

pub use decay::{
    apply_decay, apply_decay_at, boost_relevance, deprecate, DecayReport, DECAY_EPSILON,
    DEPRECATE_AMOUNT,
};
pub use defrag::{defrag, word_overlap, DefragOptions, DefragReport, MERGE_OVERLAP};
pub use reflect::{reflect_on_sessions, ReflectOptions, ReflectReport, REFLECT_AGENT, SESSIONS_DIR};
