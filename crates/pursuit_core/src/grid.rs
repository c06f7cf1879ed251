//! Grid model: cells, the shared move set, per-cell disturbance
//! distributions and the controlled transition graph.
//!
//! The disturbance distribution is the stochastic stand-in for the
//! opponent: uniform over the moves that stay on the board, zero mass on
//! moves that would leave it (3, 4 or 5 legal moves for corner, edge and
//! interior cells).

use std::fmt;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Board position. Immutable value key for every map in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    fn offset(self, delta: (i32, i32)) -> Cell {
        Cell::new(self.x + delta.0, self.y + delta.1)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Shared action set for both agents: four directions plus stay-in-place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Move {
    North,
    South,
    East,
    West,
    Stay,
}

impl Move {
    pub const ALL: [Move; 5] = [Move::North, Move::East, Move::South, Move::West, Move::Stay];

    /// Unit coordinate delta. North is +y.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Move::North => (0, 1),
            Move::South => (0, -1),
            Move::East => (1, 0),
            Move::West => (-1, 0),
            Move::Stay => (0, 0),
        }
    }

    /// Inverse of [`Move::delta`]; `None` when the delta is not a unit step.
    pub fn from_delta(delta: (i32, i32)) -> Option<Move> {
        Move::ALL.into_iter().find(|mv| mv.delta() == delta)
    }

    pub fn between(from: Cell, to: Cell) -> Option<Move> {
        Move::from_delta((to.x - from.x, to.y - from.y))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::North => "NORTH",
            Move::South => "SOUTH",
            Move::East => "EAST",
            Move::West => "WEST",
            Move::Stay => "STAY",
        };
        f.write_str(name)
    }
}

/// Rectangular board. Width and height are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(Error::InvalidGrid { width, height });
        }
        Ok(Grid { width, height })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    /// All cells in x-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Cell::new(x, y)))
    }

    /// Moves from `cell` that stay on the board. Always includes `Stay`.
    pub fn legal_moves(&self, cell: Cell) -> Vec<Move> {
        Move::ALL
            .into_iter()
            .filter(|mv| self.contains(cell.offset(mv.delta())))
            .collect()
    }

    /// Disturbance probability of the opponent at `cell` taking `mv`:
    /// zero when the move leaves the board, otherwise uniform over the
    /// legal moves there.
    pub fn disturbance_prob(&self, cell: Cell, mv: Move) -> f64 {
        if !self.contains(cell.offset(mv.delta())) {
            return 0.0;
        }
        1.0 / self.legal_moves(cell).len() as f64
    }

    /// Full disturbance vector at `cell`, aligned with [`Move::ALL`].
    pub fn disturbance(&self, cell: Cell) -> [f64; 5] {
        let mut probs = [0.0; 5];
        for (i, mv) in Move::ALL.into_iter().enumerate() {
            probs[i] = self.disturbance_prob(cell, mv);
        }
        probs
    }
}

/// Controlled transition graph: the deterministic per-agent move graph.
/// An edge a->b exists iff b-a equals a move delta and b is on the board;
/// every cell carries a `Stay` self-loop.
#[derive(Debug, Clone)]
pub struct MoveGraph {
    succ: FxHashMap<Cell, Vec<(Move, Cell)>>,
}

impl MoveGraph {
    pub fn build(grid: &Grid) -> Self {
        let mut succ = FxHashMap::default();
        for cell in grid.cells() {
            let edges: Vec<(Move, Cell)> = Move::ALL
                .into_iter()
                .filter_map(|mv| {
                    let dest = cell.offset(mv.delta());
                    grid.contains(dest).then_some((mv, dest))
                })
                .collect();
            succ.insert(cell, edges);
        }
        MoveGraph { succ }
    }

    pub fn successors(&self, cell: Cell) -> &[(Move, Cell)] {
        self.succ.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Destination of `mv` from `cell`, or `None` when the edge does not
    /// exist in the graph.
    pub fn apply(&self, cell: Cell, mv: Move) -> Option<Cell> {
        self.successors(cell)
            .iter()
            .find(|(m, _)| *m == mv)
            .map(|&(_, dest)| dest)
    }

    /// Human-readable edge listing for debugging.
    pub fn dump(&self) -> String {
        let mut cells: Vec<Cell> = self.succ.keys().copied().collect();
        cells.sort();
        let mut out = String::new();
        for cell in cells {
            out.push_str(&format!("{cell}:\n"));
            for (mv, dest) in self.successors(cell) {
                out.push_str(&format!("  --{mv}--> {dest}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn move_deltas_round_trip() {
        for mv in Move::ALL {
            assert_eq!(Move::from_delta(mv.delta()), Some(mv));
        }
        assert_eq!(Move::from_delta((1, 1)), None);
        assert_eq!(Move::from_delta((0, 2)), None);
    }

    #[test]
    fn grid_rejects_degenerate_dimensions() {
        assert!(matches!(Grid::new(0, 3), Err(Error::InvalidGrid { .. })));
        assert!(matches!(Grid::new(3, -1), Err(Error::InvalidGrid { .. })));
        assert!(Grid::new(1, 1).is_ok());
    }

    #[test]
    fn legal_move_counts_by_cell_kind() {
        let grid = Grid::new(3, 3).unwrap();
        // Corner, edge, interior.
        assert_eq!(grid.legal_moves(Cell::new(0, 0)).len(), 3);
        assert_eq!(grid.legal_moves(Cell::new(1, 0)).len(), 4);
        assert_eq!(grid.legal_moves(Cell::new(1, 1)).len(), 5);
    }

    #[test]
    fn disturbance_is_uniform_over_legal_moves() {
        let grid = Grid::new(3, 3).unwrap();
        let corner = grid.disturbance(Cell::new(0, 0));
        // SW corner blocks South and West.
        assert_eq!(grid.disturbance_prob(Cell::new(0, 0), Move::South), 0.0);
        assert_eq!(grid.disturbance_prob(Cell::new(0, 0), Move::West), 0.0);
        assert!((corner.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((grid.disturbance_prob(Cell::new(1, 1), Move::North) - 0.2).abs() < 1e-12);
        assert!((grid.disturbance_prob(Cell::new(1, 0), Move::East) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn every_cell_has_a_stay_self_loop() {
        let grid = Grid::new(4, 2).unwrap();
        let graph = MoveGraph::build(&grid);
        for cell in grid.cells() {
            assert_eq!(graph.apply(cell, Move::Stay), Some(cell));
        }
    }

    #[test]
    fn move_graph_edges_match_grid_bounds() {
        let grid = Grid::new(2, 2).unwrap();
        let graph = MoveGraph::build(&grid);
        assert_eq!(graph.apply(Cell::new(0, 0), Move::East), Some(Cell::new(1, 0)));
        assert_eq!(graph.apply(Cell::new(0, 0), Move::West), None);
        assert_eq!(graph.apply(Cell::new(1, 1), Move::North), None);
    }

    proptest! {
        #[test]
        fn disturbance_sums_to_one_with_zero_offgrid_mass(
            w in 1i32..8, h in 1i32..8, x in 0i32..8, y in 0i32..8,
        ) {
            prop_assume!(x < w && y < h);
            let grid = Grid::new(w, h).unwrap();
            let cell = Cell::new(x, y);
            let probs = grid.disturbance(cell);
            prop_assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            for (i, mv) in Move::ALL.into_iter().enumerate() {
                let dest = Cell::new(x + mv.delta().0, y + mv.delta().1);
                if !grid.contains(dest) {
                    prop_assert_eq!(probs[i], 0.0);
                } else {
                    prop_assert!(probs[i] > 0.0);
                }
            }
        }
    }
}
