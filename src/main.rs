//! # npuzzle - N-Puzzle Solver
//!
//! An N-puzzle solver built on A* search, with a family of selectable
//! heuristics (misplaced tiles, Manhattan distance, linear conflicts,
//! n-max-swap) and two goal layouts (row-major and snail), plus parallel
//! benchmarking with rich statistics.
//!
//! The N-puzzle is a sliding puzzle on an NxN grid with N*N-1 numbered tiles
//! and one empty cell. The goal is to reach the target arrangement by
//! sliding tiles into the empty cell.
//!
//! ## CLI overview
//!
//! This binary exposes three subcommands:
//!
//! - `solve`: Solve one explicitly given board and print the move path.
//! - `solve-random`: Scramble a goal board and solve the result.
//! - `benchmark`: Generate random solvable boards and compare the
//!   heuristics in parallel.
//!
//! Run with `--help` for full details.
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]

use std::process;
use std::thread;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use colored::Colorize;
use indicatif::ParallelProgressIterator;
use indicatif::ProgressIterator;
use rayon::ThreadPoolBuilder;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::board::Board;
use crate::error::SolveError;
use crate::goal::Layout;
use crate::heuristic::{GoalMap, Heuristic};
use crate::solver::{CancelFlag, Solution, Solver};
use crate::stats::{SearchStats, StatsSummary, print_comparison_table, print_run_stats};

pub(crate) mod board;
pub(crate) mod error;
pub(crate) mod goal;
pub(crate) mod heuristic;
pub(crate) mod solver;
pub(crate) mod stats;

/// Default number of benchmark runs to perform
const DEFAULT_RUNS: usize = 200;

/// Default number of scramble steps to generate random boards
const DEFAULT_SCRAMBLE_STEPS: usize = 200;

/// Default side length of generated boards
const DEFAULT_SIDE: usize = 3;

/// Command-line arguments for the N-puzzle solver
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Enable debug logging of the search engine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands supported by the CLI
#[derive(Subcommand)]
enum Commands {
    /// Solve one board given as comma- or space-separated tiles, 0 for the
    /// empty cell
    Solve {
        /// The tiles in row-major order, e.g. `1,2,3,4,5,6,7,0,8`
        #[arg(value_delimiter = ',', num_args = 1..)]
        tiles: Vec<u16>,
        /// Heuristic to drive the search: misplaced-tiles, manhattan,
        /// manhattan-linear-conflicts, misplaced-linear-conflicts, or
        /// n-max-swap
        #[arg(long, default_value = "manhattan")]
        heuristic: String,
        /// Goal layout to solve towards (defaults to regular)
        #[arg(long, value_enum)]
        layout: Option<Layout>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Solve a single random board and print the path
    SolveRandom {
        /// Side length of the generated board
        #[arg(short, long, default_value_t = DEFAULT_SIDE)]
        size: usize,
        /// Number of scramble steps to generate random puzzle boards
        #[arg(long, default_value_t = DEFAULT_SCRAMBLE_STEPS)]
        scramble_steps: usize,
        /// Heuristic to drive the search: misplaced-tiles, manhattan,
        /// manhattan-linear-conflicts, misplaced-linear-conflicts, or
        /// n-max-swap
        #[arg(long, default_value = "manhattan")]
        heuristic: String,
        /// Goal layout to solve towards (defaults to regular)
        #[arg(long, value_enum)]
        layout: Option<Layout>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Run many random boards and compare heuristics with aggregate stats
    Benchmark {
        /// Number of test runs to perform for each heuristic
        #[arg(short, long, default_value_t = DEFAULT_RUNS)]
        runs: usize,
        /// Side length of the generated boards
        #[arg(short, long, default_value_t = DEFAULT_SIDE)]
        size: usize,
        /// Number of scramble steps to generate random puzzle boards
        #[arg(long, default_value_t = DEFAULT_SCRAMBLE_STEPS)]
        scramble_steps: usize,
        /// Goal layout to solve towards (defaults to regular)
        #[arg(long, value_enum)]
        layout: Option<Layout>,
        /// Number of worker threads to use (defaults to Rayon automatic)
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

/// Prints an error the way the shell expects and exits non-zero
fn fail(err: &SolveError) -> ! {
    eprintln!("{} {err}", "error:".red().bold());
    process::exit(1);
}

/// Arms a cancellation flag that fires once the deadline passes
fn deadline_flag(timeout_ms: Option<u64>) -> Option<CancelFlag> {
    timeout_ms.map(|ms| {
        let flag = CancelFlag::new();
        let timer = flag.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            timer.cancel();
        });
        flag
    })
}

/// Solves a raw request and prints the path, per-step heuristic, and
/// statistics. Validation, including the heuristic name, happens inside
/// the solve operation, so every rejection reaches the shell through
/// [`fail`].
fn solve_tiles(tiles: Vec<u16>, heuristic: &str, layout: Layout, timeout_ms: Option<u64>) {
    match solver::solve(heuristic, layout, tiles.clone(), deadline_flag(timeout_ms)) {
        Ok(solution) => {
            // solve() already validated these tiles and accepted the name
            let board = Board::from_valid(tiles);
            let heuristic = heuristic.parse::<Heuristic>().unwrap_or_default();
            println!("{}", "Solved".green().bold());
            print_solution(&board, &solution, heuristic, layout);
        }
        Err(err) => fail(&err),
    }
}

/// Solves one board and prints the path, per-step heuristic, and statistics
fn run_and_print(board: Board, heuristic: Heuristic, layout: Layout, timeout_ms: Option<u64>) {
    let mut solver = Solver::new(heuristic, layout);
    if let Some(flag) = deadline_flag(timeout_ms) {
        solver = solver.with_cancel(flag);
    }
    match solver.solve_board(board.clone()) {
        Ok(solution) => {
            println!("{}", "Solved".green().bold());
            print_solution(&board, &solution, heuristic, layout);
        }
        Err(err) => fail(&err),
    }
}

/// Walks the solution path from the start board, printing every
/// intermediate board with its heuristic estimate
fn print_solution(start: &Board, solution: &Solution, heuristic: Heuristic, layout: Layout) {
    let goal = GoalMap::new(layout.build(start.side()));
    let moves = solution.path.len().saturating_sub(1);

    println!("\nSolution path ({moves} moves)\n");
    let mut board = start.clone();
    for (idx, step) in solution.path.iter().enumerate() {
        if let Some(next) = board.apply_move(*step) {
            board = next;
        }
        println!(
            "Step {}/{} {} h(n): {}",
            idx,
            moves,
            step,
            goal.evaluate(heuristic, &board)
        );
        println!("{board}\n");
    }

    print_run_stats(&solution.stats);
}

/// Solve a single random puzzle board and display the solution steps
fn solve_random(
    size: usize,
    scramble_steps: usize,
    heuristic: &str,
    layout: Layout,
    timeout_ms: Option<u64>,
) {
    let heuristic = match heuristic.parse::<Heuristic>() {
        Ok(heuristic) => heuristic,
        Err(err) => fail(&err),
    };
    let goal = layout.build(size);
    let board = Board::scrambled_from(&goal, scramble_steps);
    println!(
        "Solving a random {size}x{size} board ({scramble_steps} scramble moves) using {}...",
        heuristic.name()
    );
    run_and_print(board, heuristic, layout, timeout_ms);
}

/// Benchmark every heuristic on the same set of random boards
fn benchmark(
    runs: usize,
    size: usize,
    scramble_steps: usize,
    layout: Layout,
    threads: Option<usize>,
) {
    if let Some(t) = threads {
        ThreadPoolBuilder::new()
            .num_threads(t)
            .build_global()
            .expect("Failed to build thread pool");
        println!("Using {t} threads for parallel execution.");
    }

    println!(
        "Generating {runs} random {size}x{size} boards with {scramble_steps} moves and comparing heuristics..."
    );

    let goal = layout.build(size);
    let boards: Vec<Board> = (0..runs)
        .progress()
        .map(|_| Board::scrambled_from(&goal, scramble_steps))
        .collect();

    let mut summaries: Vec<(&str, StatsSummary)> = Vec::new();
    for &heuristic in Heuristic::value_variants() {
        println!("Running {}...", heuristic.name());
        let solver = Solver::new(heuristic, layout);
        let stats: Vec<SearchStats> = boards
            .par_iter()
            .progress()
            .map(|b| {
                solver
                    .solve_board(b.clone())
                    .expect("scrambled boards are solvable")
                    .stats
            })
            .collect();
        summaries.push((heuristic.name(), stats.as_slice().into()));
    }

    print_comparison_table(&summaries);
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Main function that dispatches the chosen subcommand
fn main() {
    let Args { verbose, command } = Args::parse();
    init_tracing(verbose);

    match command {
        Commands::Solve {
            tiles,
            heuristic,
            layout,
            timeout_ms,
        } => solve_tiles(
            tiles,
            &heuristic,
            layout.unwrap_or_default(),
            timeout_ms,
        ),
        Commands::SolveRandom {
            size,
            scramble_steps,
            heuristic,
            layout,
            timeout_ms,
        } => solve_random(
            size,
            scramble_steps,
            &heuristic,
            layout.unwrap_or_default(),
            timeout_ms,
        ),
        Commands::Benchmark {
            runs,
            size,
            scramble_steps,
            layout,
            threads,
        } => benchmark(
            runs,
            size,
            scramble_steps,
            layout.unwrap_or_default(),
            threads,
        ),
    }
}
