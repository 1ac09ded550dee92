//! # Solver Module
//!
//! This module implements the A* search that solves the puzzle, together
//! with the parity oracle that rejects unreachable instances before any
//! search begins.
//!
//! The frontier is a binary heap ordered by `f = g + h`, ties broken by
//! lower `h` and then by insertion order, which makes the pop sequence
//! deterministic. The closed set is keyed on board contents alone, and
//! duplicates are dropped lazily when popped: with a unit step cost the
//! first pop of a board always carries its minimal `g`, so nothing ever
//! needs re-opening.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::hash::{Hash, Hasher};
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::time::Instant;

use tracing::debug;

use crate::board::{Board, DIRECTIONS, Move};
use crate::error::SolveError;
use crate::goal::Layout;
use crate::heuristic::{GoalMap, Heuristic};
use crate::stats::SearchStats;

/// Shared cancellation flag, checked once at the top of every search
/// iteration. Cloning hands out another handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    /// Asks any search holding this flag to stop.
    pub fn cancel(&self) {
        self.0.store(true, Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Relaxed)
    }
}

/// A successful solve: the move path and the statistics of the search that
/// produced it. The path always starts with [`Move::Root`]; the remaining
/// moves replay the solution from the start board.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub path: Vec<Move>,
    pub stats: SearchStats,
}

/// One node of the search tree. The parent link exists only for path
/// reconstruction; reference counting keeps the chain of the winning node
/// alive until its moves are copied out.
struct StateNode {
    board: Board,
    g: u32,
    h: u32,
    produced_by: Move,
    parent: Option<Rc<StateNode>>,
}

/// Frontier entry ordered by `(f, h, seq)`, where `seq` is the enqueue
/// counter.
struct OpenEntry {
    f: u32,
    h: u32,
    seq: u64,
    node: Rc<StateNode>,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.f, self.h, self.seq).cmp(&(other.f, other.h, other.seq))
    }
}

/// Closed-set member. Identity is the board contents alone: two nodes with
/// equal boards are the same member regardless of cost, move, or parent.
struct ClosedEntry(Rc<StateNode>);

impl PartialEq for ClosedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.board == other.0.board
    }
}

impl Eq for ClosedEntry {}

impl Hash for ClosedEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.board.hash(state);
    }
}

/// Number of out-of-order pairs among the numbered tiles.
fn inversions(tiles: &[u16]) -> usize {
    let mut count = 0;

    for i in 0..tiles.len() {
        if tiles[i] == 0 {
            continue;
        }
        for j in i + 1..tiles.len() {
            if tiles[j] != 0 && tiles[i] > tiles[j] {
                count += 1;
            }
        }
    }

    count
}

/// Permutation-parity class of a board. On even sides the row of the empty
/// cell joins the count, which keeps the class invariant under moves.
fn parity(board: &Board) -> usize {
    let mut class = inversions(board.tiles());
    if board.side() % 2 == 0 {
        class += board.empty_index() / board.side();
    }
    class % 2
}

/// Whether `start` can reach `goal` by sliding moves.
///
/// Every slide preserves the parity class, so the two boards are mutually
/// reachable exactly when their classes agree.
pub fn is_solvable(start: &Board, goal: &Board) -> bool {
    parity(start) == parity(goal)
}

/// N-puzzle solver configured with a heuristic and a goal layout
///
/// Each call to [`Solver::solve_board`] owns its open set, closed set, and
/// goal map exclusively and releases them on return, so one configured
/// solver can serve many boards in turn, including from parallel workers
/// handing it one board each.
#[derive(Clone, Debug, Default)]
pub struct Solver {
    heuristic: Heuristic,
    layout: Layout,
    cancel: Option<CancelFlag>,
}

impl Solver {
    /// Creates a solver for the given heuristic and goal layout.
    pub fn new(heuristic: Heuristic, layout: Layout) -> Solver {
        Solver {
            heuristic,
            layout,
            cancel: None,
        }
    }

    /// Attaches a cancellation flag. A search holding one stops with
    /// [`SolveError::Cancelled`] as soon as it sees the flag set.
    #[must_use]
    pub fn with_cancel(mut self, flag: CancelFlag) -> Solver {
        self.cancel = Some(flag);
        self
    }

    /// Solves an already validated board.
    ///
    /// # Errors
    ///
    /// `Unsolvable` when the board and the goal disagree in parity,
    /// `Cancelled` when the attached flag fires mid-search.
    pub fn solve_board(&self, start: Board) -> Result<Solution, SolveError> {
        let goal = GoalMap::new(self.layout.build(start.side()));
        if !is_solvable(&start, goal.board()) {
            return Err(SolveError::Unsolvable);
        }

        debug!(
            side = start.side(),
            heuristic = self.heuristic.name(),
            layout = ?self.layout,
            "starting search"
        );
        self.astar(start, &goal)
    }

    fn astar(&self, start: Board, goal: &GoalMap) -> Result<Solution, SolveError> {
        let started = Instant::now();
        let tile_bytes = start.len() * mem::size_of::<u16>();

        let mut open: BinaryHeap<Reverse<OpenEntry>> = BinaryHeap::new();
        let mut closed: HashSet<ClosedEntry> = HashSet::new();
        let mut seq: u64 = 0;
        let mut max_open = 0;
        let mut generated = 0;
        let mut pruned = 0;

        let h = goal.evaluate(self.heuristic, &start);
        open.push(Reverse(OpenEntry {
            f: h,
            h,
            seq,
            node: Rc::new(StateNode {
                board: start,
                g: 0,
                h,
                produced_by: Move::Root,
                parent: None,
            }),
        }));

        loop {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                debug!("search cancelled");
                return Err(SolveError::Cancelled);
            }

            let Some(Reverse(entry)) = open.pop() else {
                break;
            };
            let node = entry.node;

            if !closed.insert(ClosedEntry(Rc::clone(&node))) {
                // a cheaper copy of this board was expanded already
                pruned += 1;
                continue;
            }

            if node.h == 0 {
                let stats = SearchStats {
                    max_open,
                    closed_nodes: closed.len(),
                    approx_bytes: (open.len() + closed.len())
                        * (mem::size_of::<StateNode>() + tile_bytes),
                    generated_nodes: generated,
                    duplicates_pruned: pruned,
                    solution_moves: node.g as usize,
                    duration_ms: started.elapsed().as_millis(),
                };
                debug!(
                    moves = stats.solution_moves,
                    expanded = stats.closed_nodes,
                    ms = stats.duration_ms,
                    "solved"
                );
                return Ok(Solution {
                    path: rebuild_path(&node),
                    stats,
                });
            }

            for direction in DIRECTIONS {
                if let Some(next) = node.board.apply_move(direction) {
                    let h = goal.evaluate(self.heuristic, &next);
                    let g = node.g + 1;
                    seq += 1;
                    generated += 1;
                    open.push(Reverse(OpenEntry {
                        f: g + h,
                        h,
                        seq,
                        node: Rc::new(StateNode {
                            board: next,
                            g,
                            h,
                            produced_by: direction,
                            parent: Some(Rc::clone(&node)),
                        }),
                    }));
                }
            }

            max_open = max_open.max(open.len());
        }

        debug!("open set drained without reaching the goal");
        Err(SolveError::Internal(
            "open set drained after a passing solvability check",
        ))
    }
}

/// Validates a raw request and solves it
///
/// This is the external entry point: the heuristic arrives as a name, the
/// board as raw tiles. Checks run in a fixed order and the first failure
/// wins: grid shape, tile contents, heuristic name, solvability. Only a
/// request that passes all four enters the search.
///
/// # Errors
///
/// Any [`SolveError`] from validation or from the search itself.
pub fn solve(
    heuristic: &str,
    layout: Layout,
    tiles: Vec<u16>,
    cancel: Option<CancelFlag>,
) -> Result<Solution, SolveError> {
    let board = Board::from_tiles(tiles)?;
    let heuristic: Heuristic = heuristic.parse()?;

    let mut solver = Solver::new(heuristic, layout);
    if let Some(flag) = cancel {
        solver = solver.with_cancel(flag);
    }
    solver.solve_board(board)
}

/// Walks the parent chain from the winning node back to the root and
/// returns the move sequence in forward order, `Root` first.
fn rebuild_path(last: &StateNode) -> Vec<Move> {
    let mut path = Vec::with_capacity(last.g as usize + 1);
    let mut node = last;

    while node.produced_by != Move::Root {
        path.push(node.produced_by);
        match &node.parent {
            Some(parent) => node = parent,
            None => break,
        }
    }

    path.push(Move::Root);
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(tiles: &[u16]) -> Board {
        Board::from_tiles(tiles.to_vec()).expect("test board must be valid")
    }

    /// Applies the non-root moves of a path to a board.
    fn replay(start: &Board, path: &[Move]) -> Board {
        assert_eq!(path.first(), Some(&Move::Root));
        let mut board = start.clone();
        for &direction in &path[1..] {
            board = board
                .apply_move(direction)
                .expect("solution paths never leave the grid");
        }
        board
    }

    #[test]
    fn already_solved_board_yields_the_root_path() {
        let solution = solve("manhattan", Layout::Regular, vec![1, 2, 3, 4, 5, 6, 7, 8, 0], None)
            .expect("the goal itself is trivially solvable");
        assert_eq!(solution.path, vec![Move::Root]);
        assert_eq!(solution.stats.solution_moves, 0);
    }

    #[test]
    fn one_move_board_yields_a_single_slide() {
        let solution = solve("manhattan", Layout::Regular, vec![1, 2, 3, 4, 5, 6, 7, 0, 8], None)
            .expect("one slide from the goal");
        assert_eq!(solution.path, vec![Move::Root, Move::Right]);
    }

    #[test]
    fn two_move_board_is_solved_optimally() {
        let start = board(&[1, 2, 3, 4, 5, 6, 0, 7, 8]);
        let solution = Solver::new(Heuristic::Manhattan, Layout::Regular)
            .solve_board(start.clone())
            .expect("two slides from the goal");
        assert_eq!(solution.stats.solution_moves, 2);
        assert_eq!(solution.path.len(), 3);
        assert_eq!(
            replay(&start, &solution.path),
            Layout::Regular.build(3)
        );
    }

    #[test]
    fn swapped_tiles_are_unsolvable() {
        assert_eq!(
            solve("manhattan", Layout::Regular, vec![1, 2, 3, 4, 5, 6, 8, 7, 0], None),
            Err(SolveError::Unsolvable)
        );
    }

    #[test]
    fn snail_goal_is_reached_from_a_snail_neighbor() {
        let start = board(&[1, 2, 3, 8, 4, 0, 7, 6, 5]);
        let solution = Solver::new(Heuristic::Manhattan, Layout::Snail)
            .solve_board(start.clone())
            .expect("one slide from the snail goal");
        assert_eq!(solution.path, vec![Move::Root, Move::Left]);
        assert_eq!(replay(&start, &solution.path), Layout::Snail.build(3));
    }

    #[test]
    fn admissible_heuristics_agree_on_the_optimal_length() {
        // ten scramble moves from the goal, no immediate undos
        let start = board(&[4, 1, 3, 7, 2, 6, 0, 5, 8]);
        let goal = Layout::Regular.build(3);

        let reference = Solver::new(Heuristic::Manhattan, Layout::Regular)
            .solve_board(start.clone())
            .expect("scrambled from the goal");
        assert_eq!(replay(&start, &reference.path), goal);

        for heuristic in [Heuristic::MisplacedTiles, Heuristic::ManhattanLinearConflicts] {
            let solution = Solver::new(heuristic, Layout::Regular)
                .solve_board(start.clone())
                .expect("same board, same reachability");
            assert_eq!(
                solution.stats.solution_moves, reference.stats.solution_moves,
                "{heuristic:?}"
            );
            assert_eq!(replay(&start, &solution.path), goal);
        }
    }

    #[test]
    fn admissible_estimates_never_exceed_the_optimal_length() {
        let start = board(&[4, 1, 3, 7, 2, 6, 0, 5, 8]);
        let optimal = Solver::new(Heuristic::Manhattan, Layout::Regular)
            .solve_board(start.clone())
            .expect("scrambled from the goal")
            .stats
            .solution_moves as u32;

        let map = GoalMap::new(Layout::Regular.build(3));
        for heuristic in [
            Heuristic::MisplacedTiles,
            Heuristic::Manhattan,
            Heuristic::ManhattanLinearConflicts,
        ] {
            assert!(
                map.evaluate(heuristic, &start) <= optimal,
                "{heuristic:?} overestimates"
            );
        }
    }

    #[test]
    fn non_admissible_heuristic_still_reaches_the_goal() {
        let start = board(&[4, 1, 3, 7, 2, 6, 0, 5, 8]);
        let solution = Solver::new(Heuristic::NMaxSwap, Layout::Regular)
            .solve_board(start.clone())
            .expect("reachable board");
        assert_eq!(replay(&start, &solution.path), Layout::Regular.build(3));
    }

    #[test]
    fn four_by_four_scramble_solves_and_replays() {
        let goal = Layout::Regular.build(4);
        let scramble = [
            Move::Up,
            Move::Up,
            Move::Left,
            Move::Down,
            Move::Left,
            Move::Up,
            Move::Up,
            Move::Left,
            Move::Down,
            Move::Down,
            Move::Right,
            Move::Down,
        ];
        let mut start = goal.clone();
        for direction in scramble {
            start = start.apply_move(direction).expect("scramble stays on grid");
        }

        let solution = Solver::new(Heuristic::ManhattanLinearConflicts, Layout::Regular)
            .solve_board(start.clone())
            .expect("scrambled from the goal");
        assert!(solution.stats.solution_moves <= scramble.len());
        assert_eq!(replay(&start, &solution.path), goal);
    }

    // The classic hard instance from the upstream test set. Expensive:
    // run with `cargo test -- --ignored` when you have a few minutes.
    #[test]
    #[ignore = "expands millions of nodes"]
    fn hard_fifteen_puzzle_instance() {
        let start = board(&[11, 0, 9, 4, 2, 15, 7, 1, 13, 3, 12, 5, 8, 6, 10, 14]);
        let solution = Solver::new(Heuristic::ManhattanLinearConflicts, Layout::Regular)
            .solve_board(start.clone())
            .expect("known solvable instance");
        assert_eq!(replay(&start, &solution.path), Layout::Regular.build(4));
    }

    #[test]
    fn oracle_accepts_goals_and_rejects_parity_flips() {
        let goal = Layout::Regular.build(3);
        assert!(is_solvable(&goal, &goal));
        assert!(!is_solvable(&board(&[1, 2, 3, 4, 5, 6, 8, 7, 0]), &goal));

        // even side: swapping two tiles flips the class
        let goal4 = Layout::Regular.build(4);
        let flipped = board(&[2, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0]);
        assert!(!is_solvable(&flipped, &goal4));
        assert!(is_solvable(&Board::scrambled_from(&goal4, 40), &goal4));
    }

    #[test]
    fn oracle_relates_regular_and_snail_classes() {
        // for odd sides the two layouts disagree in parity, so a board one
        // slide from the snail goal must be rejected against the regular one
        let near_snail = board(&[1, 2, 3, 8, 4, 0, 7, 6, 5]);
        assert!(is_solvable(&near_snail, &Layout::Snail.build(3)));
        assert!(!is_solvable(&near_snail, &Layout::Regular.build(3)));
    }

    #[test]
    fn cancellation_wins_over_any_search_progress() {
        let flag = CancelFlag::new();
        flag.cancel();
        let result = solve(
            "manhattan",
            Layout::Regular,
            vec![1, 2, 3, 4, 5, 6, 7, 0, 8],
            Some(flag),
        );
        assert_eq!(result, Err(SolveError::Cancelled));
    }

    #[test]
    fn validation_order_is_size_map_heuristic_oracle() {
        // the size check beats everything, including a bad heuristic name
        assert_eq!(
            solve("bogus", Layout::Regular, vec![1, 2, 3], None),
            Err(SolveError::InvalidMapSize(3))
        );
        // the contents check beats the heuristic check
        assert_eq!(
            solve("bogus", Layout::Regular, vec![1, 1, 2, 3, 4, 5, 6, 7, 8], None),
            Err(SolveError::InvalidMap("duplicate tile value"))
        );
        // the heuristic check beats the oracle: this board is unsolvable
        assert_eq!(
            solve("bogus", Layout::Regular, vec![1, 2, 3, 4, 5, 6, 8, 7, 0], None),
            Err(SolveError::UnknownHeuristic("bogus".to_owned()))
        );
        // with everything else valid the oracle finally rejects
        assert_eq!(
            solve("manhattan", Layout::Regular, vec![1, 2, 3, 4, 5, 6, 8, 7, 0], None),
            Err(SolveError::Unsolvable)
        );
    }

    #[test]
    fn statistics_reflect_the_search() {
        let solution = solve("manhattan", Layout::Regular, vec![1, 2, 3, 4, 5, 6, 0, 7, 8], None)
            .expect("two slides from the goal");
        let stats = solution.stats;
        assert!(stats.max_open >= 1);
        assert!(stats.closed_nodes >= 3);
        assert!(stats.generated_nodes >= stats.closed_nodes - 1);
        assert!(stats.approx_bytes > 0);
    }
}
