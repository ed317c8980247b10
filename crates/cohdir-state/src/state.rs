//! Coherence state of a tracked block.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Directory-side coherence state of a memory block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoherenceState {
    /// No core holds a copy.
    #[default]
    Uncached,
    /// One or more cores hold read-only copies.
    Shared,
    /// A single owner supplies data; other cores may share.
    Owned,
    /// A single core holds a clean copy with write permission.
    Exclusive,
    /// A single core holds a dirty copy.
    Modified,
}

impl CoherenceState {
    /// All states in protocol order.
    pub const ALL: [Self; 5] = [
        Self::Uncached,
        Self::Shared,
        Self::Owned,
        Self::Exclusive,
        Self::Modified,
    ];

    /// Lowercase name used in config files and replay scripts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncached => "uncached",
            Self::Shared => "shared",
            Self::Owned => "owned",
            Self::Exclusive => "exclusive",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for CoherenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown coherence state name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown coherence state '{0}'")]
pub struct StateParseError(pub String);

impl FromStr for CoherenceState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StateParseError(s.to_string()))
    }
}

/// Per-entry holder of the block's coherence state.
///
/// The entry owns it; the protocol controller borrows it to drive its own
/// transitions. Directory policies never change it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectoryBlockInfo {
    state: CoherenceState,
}

impl DirectoryBlockInfo {
    /// Create block info in the given state.
    #[must_use]
    pub const fn new(state: CoherenceState) -> Self {
        Self { state }
    }

    /// Current coherence state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> CoherenceState {
        self.state
    }

    /// Move the block to a new coherence state.
    #[inline]
    pub const fn set_state(&mut self, state: CoherenceState) {
        self.state = state;
    }
}
