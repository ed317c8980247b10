//! Per-policy replay statistics over the `metrics` facade.
//!
//! [`record_outcome`] emits `cohdir_*` counters and a list-size histogram
//! labelled with the directory type. [`SummaryRecorder`] folds them into one
//! [`TypeStats`] row per [`DirectoryType`], which the CLI prints after a run.
//! Without an installed recorder the macros are no-ops.

use std::fmt::Write as _;
use std::sync::Arc;

use metrics::{
    Counter, CounterFn, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit, counter, histogram,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::DirectoryType;
use crate::SharersList;
use crate::script::Outcome;

const ADDS: &str = "cohdir_sharer_adds_total";
const REJECTIONS: &str = "cohdir_sharer_rejections_total";
const REMOVALS: &str = "cohdir_sharer_removals_total";
const BROADCAST_LISTS: &str = "cohdir_broadcast_lists_total";
const LATENCY_CYCLES: &str = "cohdir_latency_cycles_total";
const LIST_SIZE: &str = "cohdir_sharer_list_size";
const TYPE_LABEL: &str = "directory_type";

/// Record one replayed outcome.
pub fn record_outcome(directory_type: DirectoryType, outcome: &Outcome) {
    let ty = directory_type.as_str();

    match outcome {
        Outcome::Added => counter!(ADDS, TYPE_LABEL => ty).increment(1),
        Outcome::Rejected { .. } => counter!(REJECTIONS, TYPE_LABEL => ty).increment(1),
        Outcome::Removed => counter!(REMOVALS, TYPE_LABEL => ty).increment(1),
        Outcome::Sharers(SharersList::All) => {
            counter!(BROADCAST_LISTS, TYPE_LABEL => ty).increment(1);
        }
        Outcome::Sharers(SharersList::Tracked(list)) => {
            #[allow(clippy::cast_precision_loss)]
            histogram!(LIST_SIZE, TYPE_LABEL => ty).record(list.len() as f64);
        }
        Outcome::Latency(cycles) => counter!(LATENCY_CYCLES, TYPE_LABEL => ty).increment(*cycles),
        _ => {}
    }
}

/// What one directory policy did over a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TypeStats {
    pub adds: u64,
    pub rejections: u64,
    pub removals: u64,
    /// Sharer queries answered with "every core".
    pub broadcast_lists: u64,
    pub latency_cycles: u64,
    /// Sharer queries answered with an explicit list.
    pub lists_sampled: u64,
    pub largest_list: u64,
}

type StatsTable = Arc<RwLock<FxHashMap<DirectoryType, TypeStats>>>;

#[derive(Clone, Copy)]
enum Field {
    Adds,
    Rejections,
    Removals,
    BroadcastLists,
    LatencyCycles,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            ADDS => Some(Self::Adds),
            REJECTIONS => Some(Self::Rejections),
            REMOVALS => Some(Self::Removals),
            BROADCAST_LISTS => Some(Self::BroadcastLists),
            LATENCY_CYCLES => Some(Self::LatencyCycles),
            _ => None,
        }
    }

    const fn slot(self, stats: &mut TypeStats) -> &mut u64 {
        match self {
            Self::Adds => &mut stats.adds,
            Self::Rejections => &mut stats.rejections,
            Self::Removals => &mut stats.removals,
            Self::BroadcastLists => &mut stats.broadcast_lists,
            Self::LatencyCycles => &mut stats.latency_cycles,
        }
    }
}

/// Directory type named by a key's label, if it has one we know.
fn label_type(key: &Key) -> Option<DirectoryType> {
    key.labels()
        .find(|label| label.key() == TYPE_LABEL)
        .and_then(|label| label.value().parse().ok())
}

struct StatCounter {
    ty: DirectoryType,
    field: Field,
    table: StatsTable,
}

impl CounterFn for StatCounter {
    fn increment(&self, value: u64) {
        let mut table = self.table.write();
        *self.field.slot(table.entry(self.ty).or_default()) += value;
    }

    fn absolute(&self, value: u64) {
        let mut table = self.table.write();
        *self.field.slot(table.entry(self.ty).or_default()) = value;
    }
}

struct ListSizeHistogram {
    ty: DirectoryType,
    table: StatsTable,
}

impl HistogramFn for ListSizeHistogram {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn record(&self, value: f64) {
        let mut table = self.table.write();
        let stats = table.entry(self.ty).or_default();
        stats.lists_sampled += 1;
        stats.largest_list = stats.largest_list.max(value as u64);
    }
}

/// Recorder that keeps one [`TypeStats`] row per directory type.
///
/// Metrics outside the `cohdir_*` set, or without a known `directory_type`
/// label, are dropped.
#[derive(Default)]
pub struct SummaryRecorder {
    table: StatsTable,
}

impl SummaryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto this recorder's table.
    #[must_use]
    pub fn handle(&self) -> SummaryHandle {
        SummaryHandle {
            table: Arc::clone(&self.table),
        }
    }

    /// Install this recorder as the global metrics recorder.
    ///
    /// Returns `None` if a global recorder is already installed.
    #[must_use]
    pub fn install(self) -> Option<SummaryHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }
}

impl Recorder for SummaryRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let (Some(field), Some(ty)) = (Field::from_name(key.name()), label_type(key)) else {
            return Counter::noop();
        };
        Counter::from_arc(Arc::new(StatCounter {
            ty,
            field,
            table: Arc::clone(&self.table),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        match label_type(key) {
            Some(ty) if key.name() == LIST_SIZE => Histogram::from_arc(Arc::new(ListSizeHistogram {
                ty,
                table: Arc::clone(&self.table),
            })),
            _ => Histogram::noop(),
        }
    }
}

/// Read side of a [`SummaryRecorder`].
pub struct SummaryHandle {
    table: StatsTable,
}

impl SummaryHandle {
    /// Statistics for one directory type; all zero if it never ran.
    #[must_use]
    pub fn stats(&self, ty: DirectoryType) -> TypeStats {
        self.table.read().get(&ty).copied().unwrap_or_default()
    }

    /// One table row per directory type that recorded anything.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let table = self.table.read();
        if table.is_empty() {
            return "No directory activity recorded.\n".to_string();
        }

        let mut out = String::from("\n## Directory Summary\n\n");
        let _ = writeln!(
            out,
            "  {:<22} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
            "type", "adds", "rejects", "removes", "broadcast", "max_list", "cycles"
        );
        for ty in DirectoryType::ALL {
            let Some(stats) = table.get(&ty) else {
                continue;
            };
            let _ = writeln!(
                out,
                "  {:<22} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
                ty.as_str(),
                stats.adds,
                stats.rejections,
                stats.removals,
                stats.broadcast_lists,
                stats.largest_list,
                stats.latency_cycles
            );
        }
        out
    }

    /// Print the summary table to stdout.
    pub fn print_summary(&self) {
        print!("{}", self.render_summary());
    }
}
