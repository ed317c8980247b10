//! Per-block coherence primitives.
//!
//! This crate provides the leaf types shared by every directory policy:
//! the `CoherenceState` a tracked block is in, the `DirectoryBlockInfo`
//! wrapper an entry hands to the protocol controller, and `SharerSet`,
//! a fixed-capacity bit vector over core ids.

mod sharers;
mod state;

pub use sharers::{SharerSet, SharerIter};
pub use state::{CoherenceState, DirectoryBlockInfo, StateParseError};

/// Identifier of a simulated core.
pub type CoreId = u32;
