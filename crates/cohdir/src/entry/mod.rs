//! Directory entries.
//!
//! One entry tracks one directory slot: the block tag occupying it, the
//! owning core, the set of sharers and the block's coherence state. Every
//! entry answers the same operations, but what happens once more cores share
//! a block than the hardware can point to depends on the policy:
//!
//! - [`LimitedEntry`] rejects the extra sharer and nominates a victim.
//! - [`BroadcastEntry`] gives up precision and treats every core as a sharer.
//! - [`LimitlessEntry`] keeps tracking and charges a software-trap penalty.
//!
//! [`DirectoryEntry`] is the tagged union a [`Directory`](crate::Directory)
//! stores contiguously, one per slot.
//!
//! Callers must respect the preconditions of the mutators (never add a
//! present sharer, never remove an absent one, only make a sharer the owner).
//! Violations are bugs in the caller and abort via `assert!`.

mod broadcast;
mod limited;
mod limitless;

pub use broadcast::BroadcastEntry;
pub use limited::LimitedEntry;
pub use limitless::LimitlessEntry;

use cohdir_state::{CoreId, DirectoryBlockInfo, SharerSet};

use crate::DirectoryType;

/// Result of [`DirectoryEntry::add_sharer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddSharer {
    /// The sharer is now tracked.
    Added,
    /// Hardware tracking is full. Nothing changed; the caller should
    /// invalidate `evict`, remove it, and retry.
    Rejected { evict: CoreId },
}

impl AddSharer {
    /// Whether the sharer was accepted.
    #[must_use]
    pub const fn accepted(self) -> bool {
        matches!(self, Self::Added)
    }

    /// Sharer the directory wants evicted, if the add was rejected.
    #[must_use]
    pub const fn eviction_candidate(self) -> Option<CoreId> {
        match self {
            Self::Added => None,
            Self::Rejected { evict } => Some(evict),
        }
    }
}

/// Result of [`DirectoryEntry::sharers_list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SharersList {
    /// Every core must be treated as a sharer. There is no explicit list;
    /// this never means "no sharers".
    All,
    /// Exactly these cores share the block, in ascending order.
    Tracked(Vec<CoreId>),
}

impl SharersList {
    /// Whether every core must be treated as a sharer.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Explicitly tracked sharers; empty when [`is_all`](Self::is_all).
    #[must_use]
    pub fn tracked(&self) -> &[CoreId] {
        match self {
            Self::All => &[],
            Self::Tracked(list) => list,
        }
    }

    /// Split into `(all_present, explicit_list)`.
    #[must_use]
    pub fn into_parts(self) -> (bool, Vec<CoreId>) {
        match self {
            Self::All => (true, Vec::new()),
            Self::Tracked(list) => (false, list),
        }
    }
}

/// Fields every policy shares, with no policy logic attached.
#[derive(Clone, Debug)]
pub(crate) struct EntryFields {
    pub max_hw_sharers: u32,
    pub max_num_sharers: u32,
    pub owner: Option<CoreId>,
    pub address: Option<u64>,
    pub block_info: DirectoryBlockInfo,
    pub sharers: SharerSet,
}

impl EntryFields {
    /// Sharer storage spans the full core-id universe (`max_num_sharers`).
    pub fn new(max_hw_sharers: u32, max_num_sharers: u32) -> Self {
        assert!(
            max_hw_sharers > 0 && max_hw_sharers <= max_num_sharers,
            "invalid sharer limits: max_hw_sharers = {max_hw_sharers}, max_num_sharers = {max_num_sharers}"
        );
        Self {
            max_hw_sharers,
            max_num_sharers,
            owner: None,
            address: None,
            block_info: DirectoryBlockInfo::default(),
            sharers: SharerSet::new(max_num_sharers),
        }
    }

    /// Insert into the precise set, asserting the add precondition.
    pub fn insert_sharer(&mut self, core: CoreId) {
        assert!(
            self.sharers.insert(core),
            "core {core} is already a sharer (sharers: {:?})",
            self.sharers
        );
    }

    /// Remove from the precise set, asserting the remove precondition.
    pub fn take_sharer(&mut self, core: CoreId) {
        assert!(
            self.sharers.remove(core),
            "core {core} is not a sharer (sharers: {:?})",
            self.sharers
        );
    }

    /// Owner check shared by the precise policies.
    pub fn assert_owner_tracked(&self, owner: CoreId) {
        assert!(
            self.sharers.contains(owner),
            "owner {owner} is not a sharer (sharers: {:?})",
            self.sharers
        );
    }
}

/// Operations each policy implements.
pub(crate) trait SharerPolicy {
    fn fields(&self) -> &EntryFields;
    fn fields_mut(&mut self) -> &mut EntryFields;

    fn has_sharer(&self, core: CoreId) -> bool;
    fn add_sharer(&mut self, core: CoreId) -> AddSharer;
    fn remove_sharer(&mut self, core: CoreId);
    fn num_sharers(&self) -> u32;
    fn sharers_list(&self) -> SharersList;

    /// Assert that `owner` may own the block in the current mode.
    fn check_owner(&self, owner: CoreId);

    fn owner(&self) -> Option<CoreId> {
        self.fields().owner
    }

    fn one_sharer(&self) -> Option<CoreId> {
        self.fields().sharers.first()
    }

    fn latency(&self) -> u64 {
        0
    }
}

/// A directory slot under one of the three sharer-tracking policies.
#[derive(Clone, Debug)]
pub enum DirectoryEntry {
    LimitedNoBroadcast(LimitedEntry),
    LimitedBroadcast(BroadcastEntry),
    Limitless(LimitlessEntry),
}

macro_rules! dispatch {
    ($self:expr, $entry:ident => $body:expr) => {
        match $self {
            DirectoryEntry::LimitedNoBroadcast($entry) => $body,
            DirectoryEntry::LimitedBroadcast($entry) => $body,
            DirectoryEntry::Limitless($entry) => $body,
        }
    };
}

impl DirectoryEntry {
    /// Create an empty entry of the given policy.
    ///
    /// `software_trap_penalty` is only used by [`DirectoryType::Limitless`].
    ///
    /// # Panics
    ///
    /// Panics if `max_hw_sharers` is zero or exceeds `max_num_sharers`.
    #[must_use]
    pub fn new(
        directory_type: DirectoryType,
        max_hw_sharers: u32,
        max_num_sharers: u32,
        software_trap_penalty: u64,
    ) -> Self {
        match directory_type {
            DirectoryType::LimitedNoBroadcast => {
                Self::LimitedNoBroadcast(LimitedEntry::new(max_hw_sharers, max_num_sharers))
            }
            DirectoryType::LimitedBroadcast => {
                Self::LimitedBroadcast(BroadcastEntry::new(max_hw_sharers, max_num_sharers))
            }
            DirectoryType::Limitless => Self::Limitless(LimitlessEntry::new(
                max_hw_sharers,
                max_num_sharers,
                software_trap_penalty,
            )),
        }
    }

    /// Policy of this entry.
    #[must_use]
    pub const fn directory_type(&self) -> DirectoryType {
        match self {
            Self::LimitedNoBroadcast(_) => DirectoryType::LimitedNoBroadcast,
            Self::LimitedBroadcast(_) => DirectoryType::LimitedBroadcast,
            Self::Limitless(_) => DirectoryType::Limitless,
        }
    }

    /// Whether `core` holds (or, in broadcast mode, may hold) a copy.
    #[must_use]
    pub fn has_sharer(&self, core: CoreId) -> bool {
        dispatch!(self, e => e.has_sharer(core))
    }

    /// Start tracking `core` as a sharer.
    ///
    /// # Panics
    ///
    /// Panics if `core` is already a tracked sharer.
    pub fn add_sharer(&mut self, core: CoreId) -> AddSharer {
        dispatch!(self, e => e.add_sharer(core))
    }

    /// Stop tracking `core` as a sharer.
    ///
    /// # Panics
    ///
    /// Panics if `core` is not a sharer.
    pub fn remove_sharer(&mut self, core: CoreId) {
        dispatch!(self, e => e.remove_sharer(core));
    }

    /// Number of sharers (the overflow count in broadcast mode).
    #[must_use]
    pub fn num_sharers(&self) -> u32 {
        dispatch!(self, e => e.num_sharers())
    }

    /// Current owner, if any.
    ///
    /// # Panics
    ///
    /// In broadcast policy, panics if the recorded owner is no longer a sharer.
    #[must_use]
    pub fn owner(&self) -> Option<CoreId> {
        dispatch!(self, e => e.owner())
    }

    /// One explicitly tracked sharer, to forward a request to.
    ///
    /// This is the lowest tracked core id. It is `None` when the entry has no
    /// sharers and in broadcast mode, where no individual core is known.
    #[must_use]
    pub fn one_sharer(&self) -> Option<CoreId> {
        dispatch!(self, e => e.one_sharer())
    }

    /// Set or clear the owner.
    ///
    /// # Panics
    ///
    /// Panics if `owner` is `Some` core that is not a sharer.
    pub fn set_owner(&mut self, owner: Option<CoreId>) {
        dispatch!(self, e => {
            if let Some(core) = owner {
                e.check_owner(core);
            }
            e.fields_mut().owner = owner;
        });
    }

    /// Tag of the block currently occupying this slot.
    #[must_use]
    pub fn address(&self) -> Option<u64> {
        dispatch!(self, e => e.fields().address)
    }

    /// Record the tag of the block now occupying this slot.
    pub fn set_address(&mut self, address: u64) {
        dispatch!(self, e => e.fields_mut().address = Some(address));
    }

    /// Mark the slot as holding no block.
    pub fn clear_address(&mut self) {
        dispatch!(self, e => e.fields_mut().address = None);
    }

    /// Sharers, or [`SharersList::All`] when precision has been given up.
    #[must_use]
    pub fn sharers_list(&self) -> SharersList {
        dispatch!(self, e => e.sharers_list())
    }

    /// Extra cycles to charge for touching this entry in its current mode.
    #[must_use]
    pub fn latency(&self) -> u64 {
        dispatch!(self, e => e.latency())
    }

    /// Coherence state holder, for the protocol controller.
    #[must_use]
    pub fn block_info(&self) -> &DirectoryBlockInfo {
        dispatch!(self, e => &e.fields().block_info)
    }

    /// Mutable coherence state holder, for the protocol controller.
    pub fn block_info_mut(&mut self) -> &mut DirectoryBlockInfo {
        dispatch!(self, e => &mut e.fields_mut().block_info)
    }

    /// Sharers trackable at no extra cost.
    #[must_use]
    pub fn max_hw_sharers(&self) -> u32 {
        dispatch!(self, e => e.fields().max_hw_sharers)
    }

    /// Size of the core-id universe backing the sharer storage.
    #[must_use]
    pub fn max_num_sharers(&self) -> u32 {
        dispatch!(self, e => e.fields().max_num_sharers)
    }
}
