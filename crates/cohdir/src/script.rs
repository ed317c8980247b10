//! Replay scripts: drive a directory from a text file.
//!
//! One operation per line, `#` starts a comment:
//!
//! ```text
//! # slot op      arg
//! 0    add      3
//! 0    owner    3
//! 0    state    modified
//! 0    sharers
//! 0    remove   3
//! 1    address  0x80001000
//! ```
//!
//! Ops: `add <core>`, `remove <core>`, `has <core>`, `owner <core|none>`,
//! `get-owner`, `address <addr>`, `state <state>`, `sharers`, `one-sharer`,
//! `count`, `latency`.
//!
//! The replayer checks each op against the entry before applying it, so a
//! script that breaks an entry precondition fails with a [`ScriptError`]
//! rather than tripping the entry's assertions. Removing the owner, or the
//! last sharer while an owner is set, is refused: clear the owner first.

use std::fmt;

use cohdir_state::{CoherenceState, CoreId};
use thiserror::Error;
use tracing::trace;

use crate::metrics;
use crate::{AddSharer, Directory, SharersList};

/// Script parse or replay error. Line numbers are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: slot {slot} out of range (directory has {len} entries)")]
    SlotOutOfRange { line: usize, slot: usize, len: usize },

    #[error("line {line}: core {core} out of range (max {max_num_sharers} cores)")]
    CoreOutOfRange {
        line: usize,
        core: CoreId,
        max_num_sharers: u32,
    },

    #[error("line {line}: core {core} is already a sharer of slot {slot}")]
    AlreadySharer { line: usize, slot: usize, core: CoreId },

    #[error("line {line}: core {core} is not a sharer of slot {slot}")]
    NotASharer { line: usize, slot: usize, core: CoreId },

    #[error("line {line}: removing core {core} would leave owner {owner} of slot {slot} without a copy")]
    RemovesOwner {
        line: usize,
        slot: usize,
        core: CoreId,
        owner: CoreId,
    },
}

/// A single directory operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Add(CoreId),
    Remove(CoreId),
    Has(CoreId),
    SetOwner(Option<CoreId>),
    GetOwner,
    SetAddress(u64),
    SetState(CoherenceState),
    Sharers,
    OneSharer,
    Count,
    Latency,
}

/// An operation bound to a slot and its source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub slot: usize,
    pub op: Op,
}

/// Parsed replay script.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    /// Parse script text.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Parse`] for the first malformed line.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            steps.push(parse_step(line, content)?);
        }
        Ok(Self { steps })
    }

    /// Parsed steps in file order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn parse_step(line: usize, content: &str) -> Result<Step, ScriptError> {
    let err = |message: String| ScriptError::Parse { line, message };
    let mut tokens = content.split_whitespace();

    let slot_tok = tokens.next().ok_or_else(|| err("missing slot".to_string()))?;
    let slot = slot_tok
        .parse::<usize>()
        .map_err(|_| err(format!("invalid slot '{slot_tok}'")))?;
    let name = tokens.next().ok_or_else(|| err("missing operation".to_string()))?;
    let arg = tokens.next();
    if let Some(extra) = tokens.next() {
        return Err(err(format!("unexpected argument '{extra}'")));
    }

    let need_arg = || arg.ok_or_else(|| err(format!("'{name}' needs an argument")));
    let core = |tok: &str| {
        tok.parse::<CoreId>()
            .map_err(|_| err(format!("invalid core id '{tok}'")))
    };
    let no_arg = |op: Op| match arg {
        Some(tok) => Err(err(format!("'{name}' takes no argument, got '{tok}'"))),
        None => Ok(op),
    };

    let op = match name {
        "add" => Op::Add(core(need_arg()?)?),
        "remove" => Op::Remove(core(need_arg()?)?),
        "has" => Op::Has(core(need_arg()?)?),
        "owner" => match need_arg()? {
            "none" => Op::SetOwner(None),
            tok => Op::SetOwner(Some(core(tok)?)),
        },
        "get-owner" => no_arg(Op::GetOwner)?,
        "address" => Op::SetAddress(parse_address(need_arg()?).ok_or_else(|| {
            err(format!("invalid address '{}'", arg.unwrap_or_default()))
        })?),
        "state" => {
            let tok = need_arg()?;
            Op::SetState(
                tok.parse::<CoherenceState>()
                    .map_err(|e| err(e.to_string()))?,
            )
        }
        "sharers" => no_arg(Op::Sharers)?,
        "one-sharer" => no_arg(Op::OneSharer)?,
        "count" => no_arg(Op::Count)?,
        "latency" => no_arg(Op::Latency)?,
        other => return Err(err(format!("unknown operation '{other}'"))),
    };

    Ok(Step { line, slot, op })
}

fn parse_address(tok: &str) -> Option<u64> {
    match tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => tok.parse().ok(),
    }
}

/// Result of replaying one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Added,
    Rejected { evict: CoreId },
    Removed,
    Has(bool),
    OwnerSet(Option<CoreId>),
    Owner(Option<CoreId>),
    AddressSet(u64),
    StateSet(CoherenceState),
    Sharers(SharersList),
    OneSharer(Option<CoreId>),
    Count(u32),
    Latency(u64),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn owner(f: &mut fmt::Formatter<'_>, core: Option<CoreId>) -> fmt::Result {
            match core {
                Some(core) => write!(f, "{core}"),
                None => f.write_str("none"),
            }
        }

        match self {
            Self::Added => f.write_str("added"),
            Self::Rejected { evict } => write!(f, "rejected, evict {evict}"),
            Self::Removed => f.write_str("removed"),
            Self::Has(present) => write!(f, "{present}"),
            Self::OwnerSet(o) => {
                f.write_str("owner set to ")?;
                owner(f, *o)
            }
            Self::Owner(o) => {
                f.write_str("owner ")?;
                owner(f, *o)
            }
            Self::AddressSet(addr) => write!(f, "address {addr:#x}"),
            Self::StateSet(state) => write!(f, "state {state}"),
            Self::Sharers(SharersList::All) => f.write_str("sharers all"),
            Self::Sharers(SharersList::Tracked(list)) => {
                f.write_str("sharers [")?;
                for (i, core) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{core}")?;
                }
                f.write_str("]")
            }
            Self::OneSharer(o) => {
                f.write_str("one sharer ")?;
                owner(f, *o)
            }
            Self::Count(n) => write!(f, "count {n}"),
            Self::Latency(cycles) => write!(f, "latency {cycles}"),
        }
    }
}

/// Replays scripts against a directory.
pub struct Replay<'a> {
    directory: &'a mut Directory,
}

impl<'a> Replay<'a> {
    #[must_use]
    pub fn new(directory: &'a mut Directory) -> Self {
        Self { directory }
    }

    /// Apply every step of `script` in order.
    ///
    /// Stops at the first step that would break an entry precondition;
    /// steps before it stay applied.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScriptError`] encountered.
    pub fn run(&mut self, script: &Script) -> Result<Vec<(Step, Outcome)>, ScriptError> {
        script
            .steps()
            .iter()
            .map(|step| self.apply(step).map(|outcome| (*step, outcome)))
            .collect()
    }

    /// Apply a single step.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot or core is out of range, or the step
    /// would break an entry precondition.
    pub fn apply(&mut self, step: &Step) -> Result<Outcome, ScriptError> {
        let Step { line, slot, op } = *step;
        let len = self.directory.len();
        let max_num_sharers = self.directory.max_num_sharers();
        let directory_type = self.directory.directory_type();
        let entry = self
            .directory
            .get_mut(slot)
            .ok_or(ScriptError::SlotOutOfRange { line, slot, len })?;

        let check_core = |core: CoreId| {
            if core < max_num_sharers {
                Ok(())
            } else {
                Err(ScriptError::CoreOutOfRange {
                    line,
                    core,
                    max_num_sharers,
                })
            }
        };

        let outcome = match op {
            Op::Add(core) => {
                check_core(core)?;
                // Broadcast mode accepts any core
                if entry.has_sharer(core) && !entry.sharers_list().is_all() {
                    return Err(ScriptError::AlreadySharer { line, slot, core });
                }
                match entry.add_sharer(core) {
                    AddSharer::Added => Outcome::Added,
                    AddSharer::Rejected { evict } => Outcome::Rejected { evict },
                }
            }
            Op::Remove(core) => {
                if !entry.has_sharer(core) {
                    return Err(ScriptError::NotASharer { line, slot, core });
                }
                // A broadcast entry only knows the owner is covered while its count is non-zero
                if let Some(owner) = entry.owner()
                    && (owner == core || entry.num_sharers() == 1)
                {
                    return Err(ScriptError::RemovesOwner {
                        line,
                        slot,
                        core,
                        owner,
                    });
                }
                entry.remove_sharer(core);
                Outcome::Removed
            }
            Op::Has(core) => Outcome::Has(entry.has_sharer(core)),
            Op::SetOwner(owner) => {
                if let Some(core) = owner
                    && !entry.has_sharer(core)
                {
                    return Err(ScriptError::NotASharer { line, slot, core });
                }
                entry.set_owner(owner);
                Outcome::OwnerSet(owner)
            }
            Op::GetOwner => Outcome::Owner(entry.owner()),
            Op::SetAddress(addr) => {
                entry.set_address(addr);
                Outcome::AddressSet(addr)
            }
            Op::SetState(state) => {
                entry.block_info_mut().set_state(state);
                Outcome::StateSet(state)
            }
            Op::Sharers => Outcome::Sharers(entry.sharers_list()),
            Op::OneSharer => Outcome::OneSharer(entry.one_sharer()),
            Op::Count => Outcome::Count(entry.num_sharers()),
            Op::Latency => Outcome::Latency(entry.latency()),
        };

        trace!(line, slot, ?op, %outcome, "replayed step");
        metrics::record_outcome(directory_type, &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DirectoryType;
    use cohdir_config::ConfigFile;

    fn directory(ty: DirectoryType) -> Directory {
        Directory::new(ty, 2, 2, 8, &ConfigFile::new()).unwrap()
    }

    #[test]
    fn test_parse_all_ops() {
        let script = Script::parse(
            "# header\n\
             0 add 1\n\
             0 remove 1   # trailing\n\
             1 has 4\n\
             1 owner none\n\
             1 owner 3\n\
             1 get-owner\n\
             0 address 0x1000\n\
             0 address 4096\n\
             0 state Exclusive\n\
             0 sharers\n\
             0 one-sharer\n\
             0 count\n\
             \n\
             0 latency\n",
        )
        .unwrap();
        let ops: Vec<Op> = script.steps().iter().map(|s| s.op).collect();
        assert_eq!(
            ops,
            vec![
                Op::Add(1),
                Op::Remove(1),
                Op::Has(4),
                Op::SetOwner(None),
                Op::SetOwner(Some(3)),
                Op::GetOwner,
                Op::SetAddress(0x1000),
                Op::SetAddress(4096),
                Op::SetState(CoherenceState::Exclusive),
                Op::Sharers,
                Op::OneSharer,
                Op::Count,
                Op::Latency,
            ]
        );
        assert_eq!(script.steps()[0].line, 2);
        assert_eq!(script.steps().last().unwrap().line, 15);
    }

    #[test]
    fn test_parse_errors() {
        for (text, line) in [
            ("0 add", 1),
            ("x add 1", 1),
            ("0 frobnicate", 1),
            ("\n0 add one", 2),
            ("0 count 3", 1),
            ("0 one-sharer 2", 1),
            ("0 add 1 2", 1),
            ("0 state dirty", 1),
            ("0 address 0xzz", 1),
            ("0", 1),
        ] {
            match Script::parse(text) {
                Err(ScriptError::Parse { line: l, .. }) => assert_eq!(l, line, "{text:?}"),
                other => panic!("expected parse error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_replay_limited_rejects() {
        let mut dir = directory(DirectoryType::LimitedNoBroadcast);
        let script = Script::parse("0 add 5\n0 add 2\n0 add 7\n0 sharers").unwrap();
        let outcomes: Vec<Outcome> = Replay::new(&mut dir)
            .run(&script)
            .unwrap()
            .into_iter()
            .map(|(_, o)| o)
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Added,
                Outcome::Added,
                Outcome::Rejected { evict: 2 },
                Outcome::Sharers(SharersList::Tracked(vec![2, 5])),
            ]
        );
    }

    #[test]
    fn test_replay_broadcast_allows_add_in_global_mode() {
        let mut dir = directory(DirectoryType::LimitedBroadcast);
        let script = Script::parse("0 add 0\n0 add 1\n0 add 2\n0 add 3\n0 count\n0 sharers").unwrap();
        let results = Replay::new(&mut dir).run(&script).unwrap();
        assert_eq!(results[4].1, Outcome::Count(4));
        assert_eq!(results[5].1, Outcome::Sharers(SharersList::All));
    }

    #[test]
    fn test_replay_precondition_errors() {
        let mut dir = directory(DirectoryType::Limitless);
        let mut replay = Replay::new(&mut dir);

        let script = Script::parse("0 add 1\n0 add 1").unwrap();
        assert_eq!(
            replay.run(&script),
            Err(ScriptError::AlreadySharer { line: 2, slot: 0, core: 1 })
        );

        let script = Script::parse("1 remove 3").unwrap();
        assert_eq!(
            replay.run(&script),
            Err(ScriptError::NotASharer { line: 1, slot: 1, core: 3 })
        );

        let script = Script::parse("1 owner 3").unwrap();
        assert_eq!(
            replay.run(&script),
            Err(ScriptError::NotASharer { line: 1, slot: 1, core: 3 })
        );

        let script = Script::parse("5 count").unwrap();
        assert_eq!(
            replay.run(&script),
            Err(ScriptError::SlotOutOfRange { line: 1, slot: 5, len: 2 })
        );

        let script = Script::parse("0 add 8").unwrap();
        assert_eq!(
            replay.run(&script),
            Err(ScriptError::CoreOutOfRange { line: 1, core: 8, max_num_sharers: 8 })
        );
    }

    #[test]
    fn test_replay_refuses_to_remove_owner() {
        for ty in DirectoryType::ALL {
            let mut dir = directory(ty);
            let mut replay = Replay::new(&mut dir);
            let script = Script::parse("0 add 1\n0 owner 1\n0 remove 1\n0 get-owner").unwrap();
            assert_eq!(
                replay.run(&script),
                Err(ScriptError::RemovesOwner { line: 3, slot: 0, core: 1, owner: 1 }),
                "{ty}"
            );

            // The entry is untouched and the owner still reads back
            let script = Script::parse("0 get-owner\n0 owner none\n0 remove 1\n0 count").unwrap();
            let outcomes: Vec<Outcome> =
                replay.run(&script).unwrap().into_iter().map(|(_, o)| o).collect();
            assert_eq!(
                outcomes,
                vec![
                    Outcome::Owner(Some(1)),
                    Outcome::OwnerSet(None),
                    Outcome::Removed,
                    Outcome::Count(0),
                ],
                "{ty}"
            );
        }
    }

    #[test]
    fn test_replay_refuses_to_drain_broadcast_owner() {
        let mut dir = directory(DirectoryType::LimitedBroadcast);
        let mut replay = Replay::new(&mut dir);
        let script = Script::parse(
            "0 add 0\n0 add 1\n0 add 2\n0 owner 5\n0 remove 0\n0 remove 1\n0 remove 2",
        )
        .unwrap();
        assert_eq!(
            replay.run(&script),
            Err(ScriptError::RemovesOwner { line: 7, slot: 0, core: 2, owner: 5 })
        );

        let script = Script::parse("0 owner none\n0 remove 2\n0 get-owner").unwrap();
        let results = replay.run(&script).unwrap();
        assert_eq!(results[2].1, Outcome::Owner(None));
    }

    #[test]
    fn test_replay_one_sharer() {
        let mut dir = directory(DirectoryType::LimitedBroadcast);
        let script =
            Script::parse("0 one-sharer\n0 add 6\n0 add 4\n0 one-sharer\n0 add 1\n0 one-sharer")
                .unwrap();
        let results = Replay::new(&mut dir).run(&script).unwrap();
        assert_eq!(results[0].1, Outcome::OneSharer(None));
        assert_eq!(results[3].1, Outcome::OneSharer(Some(4)));
        // Third add overflows two hardware pointers
        assert_eq!(results[5].1, Outcome::OneSharer(None));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Rejected { evict: 3 }.to_string(), "rejected, evict 3");
        assert_eq!(Outcome::OwnerSet(None).to_string(), "owner set to none");
        assert_eq!(Outcome::Owner(Some(2)).to_string(), "owner 2");
        assert_eq!(Outcome::OneSharer(Some(4)).to_string(), "one sharer 4");
        assert_eq!(Outcome::OneSharer(None).to_string(), "one sharer none");
        assert_eq!(Outcome::AddressSet(0x40).to_string(), "address 0x40");
        assert_eq!(
            Outcome::Sharers(SharersList::Tracked(vec![1, 4])).to_string(),
            "sharers [1, 4]"
        );
        assert_eq!(Outcome::Sharers(SharersList::All).to_string(), "sharers all");
        assert_eq!(Outcome::StateSet(CoherenceState::Owned).to_string(), "state owned");
    }
}
