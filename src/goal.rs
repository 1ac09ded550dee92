//! # Goal Module
//!
//! Builds the target board for a chosen layout. `Regular` fills the grid
//! row-major with `1..N*N` and leaves the empty cell last; `Snail` lays the
//! same values along an inward clockwise spiral and leaves the empty cell on
//! the cell where the spiral ends.

use clap::ValueEnum;

use crate::board::Board;

/// Target arrangement the solver drives a board towards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Layout {
    /// `1, 2, .., N*N-1` in row-major order, empty cell in the last corner.
    #[default]
    Regular,
    /// `1, 2, .., N*N-1` along an inward spiral, empty cell at its end.
    Snail,
}

impl Layout {
    /// Builds the goal board of this layout for the given side length.
    pub fn build(self, side: usize) -> Board {
        match self {
            Layout::Regular => regular(side),
            Layout::Snail => snail(side),
        }
    }
}

fn regular(side: usize) -> Board {
    let len = side * side;
    let mut tiles: Vec<u16> = (1..len as u16).collect();
    tiles.push(0);
    Board::from_valid(tiles)
}

fn snail(side: usize) -> Board {
    let len = side * side;
    let order = spiral_order(side);

    let mut tiles = vec![0u16; len];
    for (step, &cell) in order.iter().take(len - 1).enumerate() {
        tiles[cell] = (step + 1) as u16;
    }
    // the last visited cell keeps the 0 it was initialized with
    Board::from_valid(tiles)
}

/// Cell indices visited by an inward clockwise spiral from the top-left:
/// right along the top edge, down the right edge, left along the bottom,
/// up the left edge, then again on the shrunken frontier.
fn spiral_order(side: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(side * side);
    let (mut x0, mut y0, mut x1, mut y1) = (0, 0, side - 1, side - 1);

    loop {
        for x in x0..=x1 {
            order.push(y0 * side + x);
        }
        y0 += 1;
        if y0 > y1 {
            break;
        }

        for y in y0..=y1 {
            order.push(y * side + x1);
        }
        if x1 == x0 {
            break;
        }
        x1 -= 1;

        for x in (x0..=x1).rev() {
            order.push(y1 * side + x);
        }
        if y1 == y0 {
            break;
        }
        y1 -= 1;

        for y in (y0..=y1).rev() {
            order.push(y * side + x0);
        }
        x0 += 1;
        if x0 > x1 {
            break;
        }
    }

    order
}
