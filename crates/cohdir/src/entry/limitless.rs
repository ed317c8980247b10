//! LimitLESS directory: hardware pointers backed by a software trap.

use cohdir_state::CoreId;
use tracing::debug;

use super::{AddSharer, EntryFields, SharerPolicy, SharersList};

/// Entry that never rejects a sharer.
///
/// Up to `max_hw_sharers` sharers are free. The first add beyond that traps
/// to software, and from then on every access is charged
/// `software_trap_penalty` cycles. The trap stays armed for the lifetime of
/// the entry, even after sharers drop back under the hardware limit.
#[derive(Clone, Debug)]
pub struct LimitlessEntry {
    fields: EntryFields,
    software_trap_penalty: u64,
    software_trap_enabled: bool,
}

impl LimitlessEntry {
    #[must_use]
    pub fn new(max_hw_sharers: u32, max_num_sharers: u32, software_trap_penalty: u64) -> Self {
        Self {
            fields: EntryFields::new(max_hw_sharers, max_num_sharers),
            software_trap_penalty,
            software_trap_enabled: false,
        }
    }

    /// Whether this entry has overflowed into software tracking.
    #[must_use]
    pub const fn software_trap_enabled(&self) -> bool {
        self.software_trap_enabled
    }

    /// Configured trap penalty in cycles.
    #[must_use]
    pub const fn software_trap_penalty(&self) -> u64 {
        self.software_trap_penalty
    }
}

impl SharerPolicy for LimitlessEntry {
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
        let overflow = self.fields.sharers.len() >= self.fields.max_hw_sharers;
        self.fields.insert_sharer(core);
        if overflow && !self.software_trap_enabled {
            debug!(
                core,
                max_hw_sharers = self.fields.max_hw_sharers,
                penalty = self.software_trap_penalty,
                address = ?self.fields.address,
                "hardware pointers exhausted, trapping to software"
            );
            self.software_trap_enabled = true;
        }
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

    fn latency(&self) -> u64 {
        if self.software_trap_enabled {
            self.software_trap_penalty
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_up_to_hw_limit() {
        let mut entry = LimitlessEntry::new(4, 64, 50);
        for core in 0..4 {
            assert_eq!(entry.add_sharer(core), AddSharer::Added);
            assert_eq!(entry.latency(), 0);
        }
        assert!(!entry.software_trap_enabled());
    }

    #[test]
    fn test_overflow_charges_penalty() {
        let mut entry = LimitlessEntry::new(4, 64, 50);
        for core in 0..5 {
            entry.add_sharer(core);
        }
        assert!(entry.software_trap_enabled());
        assert_eq!(entry.num_sharers(), 5);
        assert_eq!(entry.latency(), 50);
        assert_eq!(entry.sharers_list(), SharersList::Tracked(vec![0, 1, 2, 3, 4]));
    }

    #[test]
    fn test_trap_latch_never_clears() {
        let mut entry = LimitlessEntry::new(2, 16, 7);
        for core in [1, 2, 3] {
            entry.add_sharer(core);
        }
        for core in [1, 2, 3] {
            entry.remove_sharer(core);
            assert_eq!(entry.latency(), 7);
        }
        assert_eq!(entry.num_sharers(), 0);
        assert!(entry.software_trap_enabled());
    }

    #[test]
    fn test_tracks_beyond_hw_limit_precisely() {
        let mut entry = LimitlessEntry::new(1, 256, 0);
        for core in (0..256).step_by(3) {
            entry.add_sharer(core);
        }
        assert!(entry.has_sharer(255));
        assert!(!entry.has_sharer(254));
        assert_eq!(entry.num_sharers(), 86);
        // Penalty of zero still latches
        assert!(entry.software_trap_enabled());
        assert_eq!(entry.latency(), 0);
    }

    #[test]
    #[should_panic(expected = "already a sharer")]
    fn test_double_add_panics() {
        let mut entry = LimitlessEntry::new(2, 16, 7);
        entry.add_sharer(1);
        entry.add_sharer(1);
    }
}
