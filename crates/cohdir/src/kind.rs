//! Directory policy selection.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Sharer-tracking policy used by every entry of a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectoryType {
    /// Track up to the hardware limit; reject further sharers and name a victim.
    LimitedNoBroadcast,
    /// Track up to the hardware limit; beyond it, treat every core as a sharer.
    LimitedBroadcast,
    /// Track every sharer; charge a software-trap penalty past the hardware limit.
    Limitless,
}

impl DirectoryType {
    pub const ALL: [Self; 3] = [Self::LimitedNoBroadcast, Self::LimitedBroadcast, Self::Limitless];

    /// Configuration name of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LimitedNoBroadcast => "limited_no_broadcast",
            Self::LimitedBroadcast => "limited_broadcast",
            Self::Limitless => "limitless",
        }
    }
}

impl fmt::Display for DirectoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on the configuration name.
impl FromStr for DirectoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::UnsupportedDirectoryType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        for ty in DirectoryType::ALL {
            assert_eq!(ty.as_str().parse::<DirectoryType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(matches!(
            "Limitless".parse::<DirectoryType>(),
            Err(Error::UnsupportedDirectoryType(s)) if s == "Limitless"
        ));
        assert!("full_map".parse::<DirectoryType>().is_err());
        assert!("".parse::<DirectoryType>().is_err());
    }
}
