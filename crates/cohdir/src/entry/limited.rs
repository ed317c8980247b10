//! Limited directory without broadcast (Dir_i NB).

use cohdir_state::CoreId;

use super::{AddSharer, EntryFields, SharerPolicy, SharersList};

/// Entry that tracks at most `max_hw_sharers` cores and never overflows.
///
/// Once full, an add is refused and the lowest-numbered tracked sharer is
/// nominated for eviction. The caller invalidates it, removes it, retries.
#[derive(Clone, Debug)]
pub struct LimitedEntry {
    fields: EntryFields,
}

impl LimitedEntry {
    #[must_use]
    pub fn new(max_hw_sharers: u32, max_num_sharers: u32) -> Self {
        Self {
            fields: EntryFields::new(max_hw_sharers, max_num_sharers),
        }
    }

    fn is_full(&self) -> bool {
        self.fields.sharers.len() >= self.fields.max_hw_sharers
    }
}

impl SharerPolicy for LimitedEntry {
    fn fields(&self) -> &EntryFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut EntryFields {
        &mut self.fields
    }

    fn has_sharer(&self, core: CoreId) -> bool {
        self.fields.sharers.contains(core)
    }

    fn add_sharer(&mut self, core: CoreId) -> AddSharer {
        assert!(
            !self.fields.sharers.contains(core),
            "core {core} is already a sharer (sharers: {:?})",
            self.fields.sharers
        );
        if self.is_full() {
            let evict = self
                .fields
                .sharers
                .first()
                .expect("full limited entry has at least one sharer");
            return AddSharer::Rejected { evict };
        }
        self.fields.insert_sharer(core);
        AddSharer::Added
    }

    fn remove_sharer(&mut self, core: CoreId) {
        self.fields.take_sharer(core);
    }

    fn num_sharers(&self) -> u32 {
        self.fields.sharers.len()
    }

    fn sharers_list(&self) -> SharersList {
        SharersList::Tracked(self.fields.sharers.to_vec())
    }

    fn check_owner(&self, owner: CoreId) {
        self.fields.assert_owner_tracked(owner);
    }
}
