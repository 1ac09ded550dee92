//! # Statistics Module
//!
//! This module provides statistics collection and reporting for the solver.
//! Each search produces a [`SearchStats`] record; the benchmark command
//! aggregates many of them into percentile summaries and renders a
//! side-by-side comparison of the heuristics.

use std::fmt::{self, Display};

use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table, modifiers, presets};

// Type aliases to keep signatures readable when describing comparison sections
type SectionAccessor = fn(&StatsSummary) -> &Metric;
type SectionDesc = (&'static str, &'static str, SectionAccessor);

/// Statistics for a single solve
///
/// `max_open`, `closed_nodes`, and `approx_bytes` describe the memory shape
/// of the search; the remaining fields describe the work done and the
/// solution found. `approx_bytes` is an order-of-magnitude estimate, not an
/// allocator measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SearchStats {
    /// Peak size of the open set over the run
    pub max_open: usize,
    /// Final size of the closed set
    pub closed_nodes: usize,
    /// Estimated bytes held by open and closed at termination
    pub approx_bytes: usize,
    /// Total number of successor states generated
    pub generated_nodes: usize,
    /// Number of duplicate states dropped when popped
    pub duplicates_pruned: usize,
    /// Number of moves in the solution found
    pub solution_moves: usize,
    /// Time taken to solve the puzzle in milliseconds
    pub duration_ms: u128,
}

impl Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "moves={}, max_open={}, closed={}, mem≈{}B, gen={}, pruned={}, time={}ms",
            self.solution_moves,
            self.max_open,
            self.closed_nodes,
            self.approx_bytes,
            self.generated_nodes,
            self.duplicates_pruned,
            self.duration_ms,
        )
    }
}

/// Aggregated statistics over many solves of one heuristic
///
/// Used by the benchmark command to compare heuristics across the same set
/// of boards.
#[derive(Clone, Debug, Default)]
pub struct StatsSummary {
    /// Number of solves included in this summary
    pub runs: usize,
    /// Solve time per run in milliseconds
    pub duration_ms: Metric,
    /// Closed-set size per run
    pub closed_nodes: Metric,
    /// Successor states generated per run
    pub generated_nodes: Metric,
    /// Duplicates dropped per run
    pub duplicates_pruned: Metric,
    /// Solution length per run
    pub solution_moves: Metric,
    /// Peak open-set size per run
    pub max_open: Metric,
    /// Estimated memory per run
    pub approx_bytes: Metric,
}

/// A numeric metric summarized by common percentiles
#[derive(Clone, Copy, Debug, Default)]
pub struct Metric {
    pub p50: u64,
    pub p75: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

impl Metric {
    #[inline]
    fn new(p50: u64, p75: u64, p90: u64, p95: u64, p99: u64) -> Self {
        Self {
            p50,
            p75,
            p90,
            p95,
            p99,
        }
    }

    /// Build a Metric from a slice and a projection function.
    /// Uses nearest-rank percentile on sorted values.
    #[inline]
    fn from_slice<T, F>(items: &[T], f: F) -> Self
    where
        F: Fn(&T) -> u64,
    {
        let n = items.len();
        if n == 0 {
            return Metric::default();
        }

        let mut vals: Vec<u64> = items.iter().map(f).collect();
        vals.sort_unstable();
        let idx = |p: u32| -> usize {
            // nearest-rank: ceil(p/100 * n), 1-based -> to 0-based index
            let rank = (p as usize * n).div_ceil(100);
            rank.saturating_sub(1).min(n - 1)
        };
        Metric::new(
            vals[idx(50)],
            vals[idx(75)],
            vals[idx(90)],
            vals[idx(95)],
            vals[idx(99)],
        )
    }
}

/// Converts a slice of individual stats into an aggregated summary
impl From<&[SearchStats]> for StatsSummary {
    fn from(value: &[SearchStats]) -> Self {
        Self {
            runs: value.len(),
            duration_ms: Metric::from_slice(value, |s| {
                u64::try_from(s.duration_ms).unwrap_or(u64::MAX)
            }),
            closed_nodes: Metric::from_slice(value, |s| s.closed_nodes as u64),
            generated_nodes: Metric::from_slice(value, |s| s.generated_nodes as u64),
            duplicates_pruned: Metric::from_slice(value, |s| s.duplicates_pruned as u64),
            solution_moves: Metric::from_slice(value, |s| s.solution_moves as u64),
            max_open: Metric::from_slice(value, |s| s.max_open as u64),
            approx_bytes: Metric::from_slice(value, |s| s.approx_bytes as u64),
        }
    }
}

// ---------- Rendering helpers (SRP: isolate table rendering) ----------

fn new_base_table() -> Table {
    let mut t = Table::new();
    t.load_preset(presets::UTF8_FULL_CONDENSED);
    t.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    t.set_content_arrangement(ContentArrangement::Dynamic);
    t
}

fn add_percentile_row(t: &mut Table, label: &str, m: &Metric) {
    t.add_row([
        Cell::new(label).add_attribute(Attribute::Bold),
        Cell::new(m.p50).set_alignment(CellAlignment::Right),
        Cell::new(m.p75).set_alignment(CellAlignment::Right),
        Cell::new(m.p90).set_alignment(CellAlignment::Right),
        Cell::new(m.p95).set_alignment(CellAlignment::Right),
        Cell::new(m.p99).set_alignment(CellAlignment::Right),
    ]);
}

fn add_value_row(t: &mut Table, metric: &str, value: &dyn Display) {
    t.add_row([
        Cell::new(metric).add_attribute(Attribute::Bold),
        Cell::new(format!("{value}")).set_alignment(CellAlignment::Right),
    ]);
}

fn print_percentile_section<'a>(
    title: &str,
    desc: &str,
    rows: impl IntoIterator<Item = (&'a str, &'a Metric)>,
) {
    println!("{title} – {desc}");

    let mut t = new_base_table();
    t.set_header([
        Cell::new(title).add_attribute(Attribute::Bold),
        Cell::new("P50"),
        Cell::new("P75"),
        Cell::new("P90"),
        Cell::new("P95"),
        Cell::new("P99"),
    ]);

    for (label, metric) in rows {
        add_percentile_row(&mut t, label, metric);
    }

    println!("{t}\n");
}

/// Prints a formatted comparison table across heuristics
///
/// Each entry pairs a heuristic name with its aggregated summary over the
/// same set of boards.
pub fn print_comparison_table(summaries: &[(&str, StatsSummary)]) {
    let runs = summaries.first().map_or(0, |(_, s)| s.runs);
    println!("\nHeuristic Comparison (runs: {runs})\n");

    // Descriptor: label, description, accessor to metric in a StatsSummary
    let sections: [SectionDesc; 7] = [
        (
            "Time per run (ms)",
            "Wall-clock time to solve one instance (milliseconds).",
            |s| &s.duration_ms,
        ),
        (
            "Nodes expanded",
            "Unique states moved to the closed set.",
            |s| &s.closed_nodes,
        ),
        (
            "Nodes generated",
            "Total successors pushed into the open set.",
            |s| &s.generated_nodes,
        ),
        (
            "Discards (duplicates)",
            "States dropped on pop because their board was already expanded.",
            |s| &s.duplicates_pruned,
        ),
        (
            "Solution length (moves)",
            "Number of moves in the solution path found.",
            |s| &s.solution_moves,
        ),
        (
            "Peak open set",
            "Maximum size of the open set observed (proxy for peak memory).",
            |s| &s.max_open,
        ),
        (
            "Approx memory (bytes)",
            "Order-of-magnitude estimate of state memory at termination.",
            |s| &s.approx_bytes,
        ),
    ];

    for (label, desc, accessor) in sections {
        let rows = summaries.iter().map(|(name, ss)| (*name, accessor(ss)));
        print_percentile_section(label, desc, rows);
    }

    println!("Legend:");
    println!("- Columns are percentiles: P50 (median), P75, P90, P95, P99.");
}

/// Prints a formatted table for a single run's statistics
///
/// Mirrors the labels used in the comparison table so outputs feel
/// consistent between `benchmark` and the solve commands.
pub fn print_run_stats(stats: &SearchStats) {
    let mut table = new_base_table();
    table.set_header(["Metric", "Value"]);

    add_value_row(&mut table, "Time (ms)", &stats.duration_ms);
    add_value_row(&mut table, "Nodes expanded", &stats.closed_nodes);
    add_value_row(&mut table, "Nodes generated", &stats.generated_nodes);
    add_value_row(
        &mut table,
        "Discards (duplicates)",
        &stats.duplicates_pruned,
    );
    add_value_row(&mut table, "Solution length (moves)", &stats.solution_moves);
    add_value_row(&mut table, "Peak open set", &stats.max_open);
    add_value_row(&mut table, "Approx memory (bytes)", &stats.approx_bytes);

    println!("\nRun statistics\n\n{table}");
}
