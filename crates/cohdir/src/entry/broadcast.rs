//! Limited directory with broadcast fallback (Dir_i B).

use cohdir_state::CoreId;
use tracing::debug;

use super::{AddSharer, EntryFields, SharerPolicy, SharersList};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tracking {
    /// Sharers are held exactly in the bit set.
    Precise,
    /// Identities are lost; only the number of sharers is known.
    Global { count: u32 },
}

/// Entry that degrades to "every core is a sharer" past the hardware limit.
///
/// Adding a sharer to a full entry drops the explicit set and switches to a
/// plain counter. Precision only comes back once that counter drains to
/// zero. While degraded, `has_sharer` answers `true` for every core, so a
/// negative answer can only be trusted in precise mode.
#[derive(Clone, Debug)]
pub struct BroadcastEntry {
    fields: EntryFields,
    tracking: Tracking,
}

impl BroadcastEntry {
    #[must_use]
    pub fn new(max_hw_sharers: u32, max_num_sharers: u32) -> Self {
        Self {
            fields: EntryFields::new(max_hw_sharers, max_num_sharers),
            tracking: Tracking::Precise,
        }
    }

    /// Whether the entry has given up exact sharer tracking.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self.tracking, Tracking::Global { .. })
    }
}

impl SharerPolicy for BroadcastEntry {
    fn fields(&self) -> &EntryFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut EntryFields {
        &mut self.fields
    }

    fn has_sharer(&self, core: CoreId) -> bool {
        match self.tracking {
            Tracking::Precise => self.fields.sharers.contains(core),
            Tracking::Global { .. } => true,
        }
    }

    fn add_sharer(&mut self, core: CoreId) -> AddSharer {
        match &mut self.tracking {
            Tracking::Global { count } => *count += 1,
            Tracking::Precise => {
                let max_hw = self.fields.max_hw_sharers;
                if self.fields.sharers.len() < max_hw {
                    self.fields.insert_sharer(core);
                } else {
                    assert!(
                        !self.fields.sharers.contains(core),
                        "core {core} is already a sharer (sharers: {:?})",
                        self.fields.sharers
                    );
                    debug!(
                        core,
                        max_hw_sharers = max_hw,
                        address = ?self.fields.address,
                        "sharer limit exceeded, switching to broadcast"
                    );
                    self.fields.sharers.clear();
                    self.tracking = Tracking::Global { count: max_hw + 1 };
                }
            }
        }
        AddSharer::Added
    }

    fn remove_sharer(&mut self, core: CoreId) {
        match &mut self.tracking {
            Tracking::Precise => self.fields.take_sharer(core),
            Tracking::Global { count } => {
                assert!(*count > 0, "broadcast sharer count underflow removing core {core}");
                *count -= 1;
                if *count == 0 {
                    debug!(address = ?self.fields.address, "broadcast sharers drained, precise tracking restored");
                    self.tracking = Tracking::Precise;
                }
            }
        }
    }

    fn num_sharers(&self) -> u32 {
        match self.tracking {
            Tracking::Precise => self.fields.sharers.len(),
            Tracking::Global { count } => count,
        }
    }

    fn sharers_list(&self) -> SharersList {
        match self.tracking {
            Tracking::Precise => SharersList::Tracked(self.fields.sharers.to_vec()),
            Tracking::Global { .. } => SharersList::All,
        }
    }

    fn check_owner(&self, owner: CoreId) {
        match self.tracking {
            Tracking::Precise => self.fields.assert_owner_tracked(owner),
            Tracking::Global { count } => assert!(
                count > 0,
                "owner {owner} set on a broadcast entry with no sharers"
            ),
        }
    }

    fn owner(&self) -> Option<CoreId> {
        if let Some(owner) = self.fields.owner {
            self.check_owner(owner);
        }
        self.fields.owner
    }

    fn one_sharer(&self) -> Option<CoreId> {
        match self.tracking {
            Tracking::Precise => self.fields.sharers.first(),
            Tracking::Global { .. } => None,
        }
    }
}
