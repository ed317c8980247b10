//! Coherence directory bookkeeping.
//!
//! A [`Directory`] is a fixed table of [`DirectoryEntry`] slots. Each entry
//! records which cores share a memory block, which core owns it, and the
//! block's coherence state. Hardware directories only have room for a few
//! sharer pointers per entry; the [`DirectoryType`] decides what happens
//! past that limit:
//!
//! - `limited_no_broadcast`: the add is rejected and a victim sharer named.
//! - `limited_broadcast`: the entry falls back to "every core is a sharer".
//! - `limitless`: tracking continues and accesses pay a software-trap penalty.
//!
//! # Example
//!
//! ```
//! use cohdir::{AddSharer, Directory, DirectoryType};
//! use cohdir_config::ConfigFile;
//!
//! let mut dir = Directory::new(DirectoryType::LimitedNoBroadcast, 16, 2, 64, &ConfigFile::new())?;
//! let entry = &mut dir[3];
//! assert_eq!(entry.add_sharer(9), AddSharer::Added);
//! assert_eq!(entry.add_sharer(4), AddSharer::Added);
//! assert_eq!(entry.add_sharer(1), AddSharer::Rejected { evict: 4 });
//! # Ok::<(), cohdir::Error>(())
//! ```

mod directory;
mod entry;
mod error;
mod kind;
pub mod metrics;
pub mod script;

pub use directory::{
    DIRECTORY_TYPE_KEY, Directory, DirectoryConfig, MAX_HW_SHARERS_KEY, SOFTWARE_TRAP_PENALTY_KEY,
    TOTAL_CORES_KEY, TOTAL_ENTRIES_KEY,
};
pub use entry::{AddSharer, BroadcastEntry, DirectoryEntry, LimitedEntry, LimitlessEntry, SharersList};
pub use error::{Error, Result};
pub use kind::DirectoryType;

pub use cohdir_state::{CoherenceState, CoreId, DirectoryBlockInfo};
