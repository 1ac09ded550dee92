//! # Heuristic Module
//!
//! Estimators of the remaining move count from a board to a goal. Every
//! estimator scores only the numbered tiles; the empty cell never counts.
//! `NMaxSwap` is the one non-admissible member of the family: it counts
//! direct swaps rather than slides, so paths found with it are not
//! guaranteed shortest.
//!
//! Evaluation goes through a [`GoalMap`], which pairs the goal board with a
//! value-indexed table of goal coordinates. Against a snail goal the target
//! cell of a tile cannot be derived from its value, so the table is the
//! single source of truth for "where does this tile belong".

use std::str::FromStr;

use clap::ValueEnum;

use crate::board::Board;
use crate::error::SolveError;

/// Selects how the remaining distance to the goal is estimated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Heuristic {
    /// Number of numbered tiles not on their goal cell.
    MisplacedTiles,
    /// Sum over all tiles of the horizontal plus vertical distance to the
    /// goal cell.
    #[default]
    Manhattan,
    /// Manhattan plus two moves per same-line reversed pair.
    ManhattanLinearConflicts,
    /// Misplaced tiles plus two moves per same-line reversed pair.
    MisplacedLinearConflicts,
    /// Direct swaps of the empty cell with the tile that belongs on its
    /// cell. Not admissible: solutions found with it may be longer than
    /// optimal.
    NMaxSwap,
}

impl Heuristic {
    /// Kebab-case name, matching what the command line accepts.
    pub fn name(self) -> &'static str {
        match self {
            Heuristic::MisplacedTiles => "misplaced-tiles",
            Heuristic::Manhattan => "manhattan",
            Heuristic::ManhattanLinearConflicts => "manhattan-linear-conflicts",
            Heuristic::MisplacedLinearConflicts => "misplaced-linear-conflicts",
            Heuristic::NMaxSwap => "n-max-swap",
        }
    }
}

impl FromStr for Heuristic {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Heuristic as ValueEnum>::from_str(s, true)
            .map_err(|_| SolveError::UnknownHeuristic(s.to_owned()))
    }
}

/// A goal board together with a value-indexed map of goal coordinates
///
/// Built once per solve, immutable afterwards, and shared by every
/// heuristic evaluation of that solve.
#[derive(Clone, Debug)]
pub struct GoalMap {
    board: Board,
    xy: Box<[(usize, usize)]>,
}

impl GoalMap {
    pub fn new(board: Board) -> GoalMap {
        let side = board.side();
        let mut xy = vec![(0, 0); board.len()];
        for (i, &tile) in board.tiles().iter().enumerate() {
            xy[usize::from(tile)] = (i % side, i / side);
        }

        GoalMap {
            board,
            xy: xy.into_boxed_slice(),
        }
    }

    /// The goal board this map was built from.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Goal coordinates of a tile value.
    fn xy_of(&self, tile: u16) -> (usize, usize) {
        self.xy[usize::from(tile)]
    }

    /// Scores `board` against this goal with the selected heuristic.
    ///
    /// Zero if and only if the board matches the goal, for every heuristic
    /// in the family.
    pub fn evaluate(&self, heuristic: Heuristic, board: &Board) -> u32 {
        match heuristic {
            Heuristic::MisplacedTiles => self.misplaced(board),
            Heuristic::Manhattan => self.manhattan(board),
            Heuristic::ManhattanLinearConflicts => {
                self.manhattan(board) + 2 * self.linear_conflicts(board)
            }
            Heuristic::MisplacedLinearConflicts => {
                self.misplaced(board) + 2 * self.linear_conflicts(board)
            }
            Heuristic::NMaxSwap => self.n_max_swap(board),
        }
    }

    fn misplaced(&self, board: &Board) -> u32 {
        board
            .tiles()
            .iter()
            .zip(self.board.tiles())
            .filter(|&(&tile, &goal)| tile != 0 && tile != goal)
            .count() as u32
    }

    fn manhattan(&self, board: &Board) -> u32 {
        let side = board.side();
        let mut total = 0;

        for (i, &tile) in board.tiles().iter().enumerate() {
            if tile == 0 {
                continue;
            }
            let (gx, gy) = self.xy_of(tile);
            total += ((i % side).abs_diff(gx) + (i / side).abs_diff(gy)) as u32;
        }

        total
    }

    /// Counts same-line reversed pairs: two tiles whose goal cells lie in
    /// the line they currently occupy, ordered against the goal. Each pair
    /// forces at least two extra moves on top of Manhattan, which is why
    /// callers weight the count by two.
    fn linear_conflicts(&self, board: &Board) -> u32 {
        let side = board.side();
        let tiles = board.tiles();
        let mut conflicts = 0;

        for y in 0..side {
            let goal_columns = (0..side).filter_map(|x| {
                let tile = tiles[y * side + x];
                (tile != 0 && self.xy_of(tile).1 == y).then(|| self.xy_of(tile).0)
            });
            conflicts += reversed_pairs(goal_columns);
        }

        for x in 0..side {
            let goal_rows = (0..side).filter_map(|y| {
                let tile = tiles[y * side + x];
                (tile != 0 && self.xy_of(tile).0 == x).then(|| self.xy_of(tile).1)
            });
            conflicts += reversed_pairs(goal_rows);
        }

        conflicts
    }

    /// Swaps the empty cell with the tile that belongs on its cell until
    /// the board matches the goal; when the empty cell is already home, the
    /// first misplaced tile takes its place instead. The swap count is the
    /// estimate.
    fn n_max_swap(&self, board: &Board) -> u32 {
        let goal = self.board.tiles();
        let mut work: Vec<u16> = board.tiles().to_vec();
        let mut hole = board.empty_index();
        let mut swaps = 0;

        while work.as_slice() != goal {
            let from = match goal[hole] {
                0 => work.iter().zip(goal).position(|(tile, want)| tile != want),
                wanted => work.iter().position(|&tile| tile == wanted),
            };
            let Some(from) = from else { break };

            work.swap(hole, from);
            hole = from;
            swaps += 1;
        }

        swaps
    }
}

/// Number of pairs appearing in strictly decreasing order.
fn reversed_pairs(values: impl Iterator<Item = usize>) -> u32 {
    let values: Vec<usize> = values.collect();
    let mut count = 0;

    for i in 0..values.len() {
        for j in i + 1..values.len() {
            if values[i] > values[j] {
                count += 1;
            }
        }
    }

    count
}
