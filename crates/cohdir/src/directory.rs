//! Fixed-size directory of entries.

use std::ops::{Index, IndexMut};

use cohdir_config::ConfigReader;
use tracing::{debug, error, info};

use crate::entry::DirectoryEntry;
use crate::{DirectoryType, Error, Result};

/// Trap penalty for the limitless policy, in cycles.
pub const SOFTWARE_TRAP_PENALTY_KEY: &str =
    "perf_model/dram_directory/limitless/software_trap_penalty";
/// Directory policy name.
pub const DIRECTORY_TYPE_KEY: &str = "perf_model/dram_directory/directory_type";
/// Number of directory slots.
pub const TOTAL_ENTRIES_KEY: &str = "perf_model/dram_directory/total_entries";
/// Hardware sharer pointers per entry.
pub const MAX_HW_SHARERS_KEY: &str = "perf_model/dram_directory/max_hw_sharers";
/// Number of cores; bounds the core ids an entry can track.
pub const TOTAL_CORES_KEY: &str = "general/total_cores";

/// Table of directory entries, all under the same policy.
///
/// The directory owns every entry for its whole lifetime and only lends them
/// out by reference. Slot-to-block mapping is the caller's business.
#[derive(Clone, Debug)]
pub struct Directory {
    directory_type: DirectoryType,
    max_hw_sharers: u32,
    max_num_sharers: u32,
    software_trap_penalty: u64,
    entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// Build a directory of `num_entries` empty entries.
    ///
    /// For [`DirectoryType::Limitless`] the trap penalty is read from
    /// [`SOFTWARE_TRAP_PENALTY_KEY`]; if it cannot be read the error is logged
    /// and the penalty is 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSharerLimits`] if `max_hw_sharers` is zero or
    /// exceeds `max_num_sharers`.
    pub fn new(
        directory_type: DirectoryType,
        num_entries: usize,
        max_hw_sharers: u32,
        max_num_sharers: u32,
        config: &dyn ConfigReader,
    ) -> Result<Self> {
        if max_hw_sharers == 0 || max_hw_sharers > max_num_sharers {
            error!(max_hw_sharers, max_num_sharers, "invalid directory sharer limits");
            return Err(Error::InvalidSharerLimits {
                max_hw_sharers,
                max_num_sharers,
            });
        }

        let software_trap_penalty = match directory_type {
            DirectoryType::Limitless => read_trap_penalty(config),
            DirectoryType::LimitedNoBroadcast | DirectoryType::LimitedBroadcast => 0,
        };

        let template = DirectoryEntry::new(
            directory_type,
            max_hw_sharers,
            max_num_sharers,
            software_trap_penalty,
        );
        let entries = vec![template; num_entries];

        info!(
            %directory_type,
            num_entries,
            max_hw_sharers,
            max_num_sharers,
            software_trap_penalty,
            "created directory"
        );

        Ok(Self {
            directory_type,
            max_hw_sharers,
            max_num_sharers,
            software_trap_penalty,
            entries,
        })
    }

    /// Build a directory from a policy name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDirectoryType`] if `type_str` is not one of
    /// `limited_no_broadcast`, `limited_broadcast` or `limitless`, and
    /// otherwise the errors of [`Directory::new`].
    pub fn from_type_str(
        type_str: &str,
        num_entries: usize,
        max_hw_sharers: u32,
        max_num_sharers: u32,
        config: &dyn ConfigReader,
    ) -> Result<Self> {
        let directory_type = type_str.parse::<DirectoryType>().inspect_err(|e| {
            error!(directory_type = type_str, error = %e, "unsupported directory type");
        })?;
        Self::new(
            directory_type,
            num_entries,
            max_hw_sharers,
            max_num_sharers,
            config,
        )
    }

    /// Policy shared by every entry.
    #[must_use]
    pub const fn directory_type(&self) -> DirectoryType {
        self.directory_type
    }

    /// Hardware sharer limit of every entry.
    #[must_use]
    pub const fn max_hw_sharers(&self) -> u32 {
        self.max_hw_sharers
    }

    /// Core-id universe of every entry.
    #[must_use]
    pub const fn max_num_sharers(&self) -> u32 {
        self.max_num_sharers
    }

    /// Extra cycles a limitless entry charges once it has trapped; 0 for the
    /// other policies.
    #[must_use]
    pub const fn software_trap_penalty(&self) -> u64 {
        self.software_trap_penalty
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range. Use [`get`](Self::get) for a
    /// checked lookup.
    #[inline]
    #[must_use]
    pub fn entry(&self, slot: usize) -> &DirectoryEntry {
        &self.entries[slot]
    }

    /// Mutable entry at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    #[inline]
    pub fn entry_mut(&mut self, slot: usize) -> &mut DirectoryEntry {
        &mut self.entries[slot]
    }

    /// Entry at `slot`, or `None` if out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&DirectoryEntry> {
        self.entries.get(slot)
    }

    /// Mutable entry at `slot`, or `None` if out of range.
    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut DirectoryEntry> {
        self.entries.get_mut(slot)
    }

    /// Iterate entries in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryEntry> {
        self.entries.iter()
    }
}

impl Index<usize> for Directory {
    type Output = DirectoryEntry;

    fn index(&self, slot: usize) -> &DirectoryEntry {
        self.entry(slot)
    }
}

impl IndexMut<usize> for Directory {
    fn index_mut(&mut self, slot: usize) -> &mut DirectoryEntry {
        self.entry_mut(slot)
    }
}

impl<'a> IntoIterator for &'a Directory {
    type Item = &'a DirectoryEntry;
    type IntoIter = std::slice::Iter<'a, DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Read the limitless trap penalty, falling back to 0 on any failure.
fn read_trap_penalty(config: &dyn ConfigReader) -> u64 {
    match config.get_int(SOFTWARE_TRAP_PENALTY_KEY) {
        Ok(value) => u64::try_from(value).unwrap_or_else(|_| {
            error!(
                key = SOFTWARE_TRAP_PENALTY_KEY,
                value, "negative software trap penalty, using 0"
            );
            0
        }),
        Err(e) => {
            error!(
                key = SOFTWARE_TRAP_PENALTY_KEY,
                error = %e,
                "could not read software trap penalty, using 0"
            );
            0
        }
    }
}

/// Directory parameters as found in a simulator configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub directory_type: DirectoryType,
    pub total_entries: usize,
    pub max_hw_sharers: u32,
    pub max_num_sharers: u32,
}

impl DirectoryConfig {
    /// Read directory parameters from `config`.
    ///
    /// `max_num_sharers` is the simulated core count.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is missing, malformed or out of range, or
    /// the directory type is unsupported.
    pub fn from_reader(config: &dyn ConfigReader) -> Result<Self> {
        let type_str = config.get_string(DIRECTORY_TYPE_KEY)?;
        let directory_type = type_str.parse::<DirectoryType>().inspect_err(|e| {
            error!(directory_type = %type_str, error = %e, "unsupported directory type");
        })?;
        let total_entries = read_bounded(config, TOTAL_ENTRIES_KEY)?;
        let max_hw_sharers = read_bounded(config, MAX_HW_SHARERS_KEY)?;
        let max_num_sharers = read_bounded(config, TOTAL_CORES_KEY)?;

        let parsed = Self {
            directory_type,
            total_entries,
            max_hw_sharers,
            max_num_sharers,
        };
        debug!(?parsed, "read directory config");
        Ok(parsed)
    }

    /// Build the directory these parameters describe.
    ///
    /// # Errors
    ///
    /// See [`Directory::new`].
    pub fn build(&self, config: &dyn ConfigReader) -> Result<Directory> {
        Directory::new(
            self.directory_type,
            self.total_entries,
            self.max_hw_sharers,
            self.max_num_sharers,
            config,
        )
    }
}

fn read_bounded<T: TryFrom<i64>>(config: &dyn ConfigReader, key: &'static str) -> Result<T> {
    let value = config.get_int(key)?;
    T::try_from(value).map_err(|_| Error::ConfigOutOfRange { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohdir_config::ConfigFile;

    fn penalty_config(value: &str) -> ConfigFile {
        let mut config = ConfigFile::new();
        config.set(SOFTWARE_TRAP_PENALTY_KEY, value);
        config
    }

    #[test]
    fn test_creates_uniform_entries() {
        let dir = Directory::new(DirectoryType::LimitedBroadcast, 8, 2, 16, &ConfigFile::new())
            .unwrap();
        assert_eq!(dir.len(), 8);
        assert!(dir.iter().all(|e| e.directory_type() == DirectoryType::LimitedBroadcast));
        assert!(dir.iter().all(|e| e.max_hw_sharers() == 2 && e.max_num_sharers() == 16));
    }

    #[test]
    fn test_unsupported_type_fails() {
        let err = Directory::from_type_str("full_map", 4, 2, 16, &ConfigFile::new()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDirectoryType(s) if s == "full_map"));
    }

    #[test]
    fn test_invalid_limits_fail() {
        let config = ConfigFile::new();
        assert!(matches!(
            Directory::new(DirectoryType::Limitless, 4, 0, 16, &config),
            Err(Error::InvalidSharerLimits { .. })
        ));
        assert!(matches!(
            Directory::new(DirectoryType::Limitless, 4, 17, 16, &config),
            Err(Error::InvalidSharerLimits { .. })
        ));
    }

    #[test]
    fn test_trap_penalty_read_for_limitless() {
        let mut dir =
            Directory::new(DirectoryType::Limitless, 2, 1, 8, &penalty_config("30")).unwrap();
        assert_eq!(dir.software_trap_penalty(), 30);
        dir[1].add_sharer(0);
        dir[1].add_sharer(1);
        assert_eq!(dir[1].latency(), 30);
        assert_eq!(dir[0].latency(), 0);
    }

    #[test]
    fn test_trap_penalty_defaults_to_zero() {
        for config in [ConfigFile::new(), penalty_config("lots"), penalty_config("-5")] {
            let mut dir = Directory::new(DirectoryType::Limitless, 1, 1, 8, &config).unwrap();
            assert_eq!(dir.software_trap_penalty(), 0);
            dir[0].add_sharer(0);
            dir[0].add_sharer(1);
            assert_eq!(dir[0].latency(), 0);
        }
    }

    #[test]
    fn test_other_policies_have_no_penalty() {
        for ty in [DirectoryType::LimitedNoBroadcast, DirectoryType::LimitedBroadcast] {
            let dir = Directory::new(ty, 1, 1, 8, &penalty_config("30")).unwrap();
            assert_eq!(dir.software_trap_penalty(), 0);
        }
    }

    #[test]
    fn test_checked_lookup() {
        let mut dir =
            Directory::new(DirectoryType::LimitedNoBroadcast, 3, 1, 4, &ConfigFile::new()).unwrap();
        assert!(dir.get(2).is_some());
        assert!(dir.get(3).is_none());
        assert!(dir.get_mut(3).is_none());
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_unchecked_lookup_out_of_range() {
        let dir =
            Directory::new(DirectoryType::LimitedNoBroadcast, 3, 1, 4, &ConfigFile::new()).unwrap();
        let _ = dir.entry(3);
    }

    #[test]
    fn test_zero_entries() {
        let dir = Directory::new(DirectoryType::Limitless, 0, 1, 4, &ConfigFile::new()).unwrap();
        assert!(dir.is_empty());
        assert!(dir.get(0).is_none());
    }

    #[test]
    fn test_directory_config_from_reader() {
        let config = ConfigFile::parse(
            "[general]\ntotal_cores = 32\n\
             [perf_model.dram_directory]\ndirectory_type = \"limited_broadcast\"\n\
             total_entries = 64\nmax_hw_sharers = 4\n",
        )
        .unwrap();
        let parsed = DirectoryConfig::from_reader(&config).unwrap();
        assert_eq!(
            parsed,
            DirectoryConfig {
                directory_type: DirectoryType::LimitedBroadcast,
                total_entries: 64,
                max_hw_sharers: 4,
                max_num_sharers: 32,
            }
        );
        let dir = parsed.build(&config).unwrap();
        assert_eq!(dir.len(), 64);
    }

    #[test]
    fn test_directory_config_errors() {
        let config = ConfigFile::parse(
            "[general]\ntotal_cores = -1\n\
             [perf_model.dram_directory]\ndirectory_type = \"limitless\"\n\
             total_entries = 64\nmax_hw_sharers = 4\n",
        )
        .unwrap();
        assert!(matches!(
            DirectoryConfig::from_reader(&config),
            Err(Error::ConfigOutOfRange { key: TOTAL_CORES_KEY, value: -1 })
        ));

        let config = ConfigFile::parse("[perf_model.dram_directory]\ndirectory_type = \"ackwise\"\n")
            .unwrap();
        assert!(matches!(
            DirectoryConfig::from_reader(&config),
            Err(Error::UnsupportedDirectoryType(_))
        ));

        assert!(matches!(
            DirectoryConfig::from_reader(&ConfigFile::new()),
            Err(Error::Config(e)) if e.is_not_found()
        ));
    }
}
