use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Drainage};
use crate::error::{DivideError, Result};
use crate::grid::Grid;

/// Traversal strategy. Both compute the same drainage partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Flood strictly uphill from every boundary cell.
    Uphill,
    /// Resolve strictly downhill from the highest unresolved cell.
    Downhill,
}

/// Result of one step of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// One root's subtree was fully resolved.
    Resolved { root: (usize, usize), cells: usize },
    /// No roots left; every cell is visited.
    Finished,
}

#[derive(Clone, Debug)]
struct Run {
    mode: Mode,
    /// Uphill: boundary cells row-major. Downhill: all cells by descending
    /// height, row-major within equal heights.
    roots: Vec<usize>,
    cursor: usize,
    finished: bool,
}

impl Run {
    fn new(grid: &Grid<Cell>, mode: Mode) -> Self {
        let roots = match mode {
            Mode::Uphill => grid.boundary_indices(),
            Mode::Downhill => descending_order(grid),
        };
        Self {
            mode,
            roots,
            cursor: 0,
            finished: false,
        }
    }
}

/// Drives uphill / downhill runs over a grid, one root at a time or to
/// completion. Holds the run cursor between steps; the grid holds all flags.
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    run: Option<Run>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode of the run whose flags are currently on the grid.
    pub fn active(&self) -> Option<Mode> {
        self.run.as_ref().map(|r| r.mode)
    }

    pub fn is_finished(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.finished)
    }

    /// Forget the current run and clear every cell's flow flags.
    pub fn reset(&mut self, grid: &mut Grid<Cell>) {
        self.run = None;
        grid.reset_flow();
    }

    /// Resolve one root. Fails if the grid still carries flags from a run
    /// of the other mode, or from any run this classifier didn't start.
    /// Stepping a finished run is a no-op.
    pub fn step(&mut self, grid: &mut Grid<Cell>, mode: Mode) -> Result<Step> {
        if self.run.is_none() && grid.has_flow() {
            return Err(DivideError::StaleFlags { requested: mode });
        }
        let run = self.run.get_or_insert_with(|| Run::new(grid, mode));
        if run.mode != mode {
            return Err(DivideError::InconsistentState {
                requested: mode,
                active: run.mode,
            });
        }
        if run.finished {
            return Ok(Step::Finished);
        }

        let step = match mode {
            Mode::Uphill => step_uphill(grid, run),
            Mode::Downhill => step_downhill(grid, run),
        };
        match step {
            Step::Resolved { root, cells } => {
                tracing::debug!(?mode, x = root.0, y = root.1, cells, "divide.step");
            }
            Step::Finished => {
                run.finished = true;
                tracing::info!(?mode, scanned = run.cursor, size = grid.size, "divide.finished");
            }
        }
        Ok(step)
    }

    /// Clear the grid and run `mode` to completion. Returns the number of
    /// roots resolved.
    pub fn run(&mut self, grid: &mut Grid<Cell>, mode: Mode) -> Result<usize> {
        self.reset(grid);
        let mut roots = 0;
        loop {
            match self.step(grid, mode)? {
                Step::Resolved { .. } => roots += 1,
                Step::Finished => return Ok(roots),
            }
        }
    }
}

fn step_uphill(grid: &mut Grid<Cell>, run: &mut Run) -> Step {
    let Some(&root) = run.roots.get(run.cursor) else {
        finish_uphill(grid);
        return Step::Finished;
    };
    run.cursor += 1;
    let cells = flood_uphill(grid, root);
    Step::Resolved {
        root: grid.xy(root),
        cells,
    }
}

fn step_downhill(grid: &mut Grid<Cell>, run: &mut Run) -> Step {
    while let Some(&root) = run.roots.get(run.cursor) {
        run.cursor += 1;
        if grid.data[root].visited {
            continue;
        }
        let cells = descend(grid, root);
        return Step::Resolved {
            root: grid.xy(root),
            cells,
        };
    }
    Step::Finished
}

/// Cell indices sorted by descending height. The sort is stable, so equal
/// heights keep row-major order.
fn descending_order(grid: &Grid<Cell>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..grid.len()).collect();
    order.sort_by_key(|&i| Reverse(grid.data[i].height));
    order
}

/// Flood from boundary cell `root` to every cell reachable by a strictly
/// ascending path, OR-ing the root's edge drainage into each.
///
/// A cell is entered again only when the incoming drainage carries a
/// direction it lacks, and only those new directions are pushed further.
/// So each cell is expanded at most once per direction. Returns the number
/// of expansions.
fn flood_uphill(grid: &mut Grid<Cell>, root: usize) -> usize {
    let (x, y) = grid.xy(root);
    let seed = Drainage::at_edge(grid.size, x, y);
    let mut stack = vec![(root, seed)];
    let mut expanded = 0;

    while let Some((i, incoming)) = stack.pop() {
        let fresh = incoming.missing_from(grid.data[i].drainage());
        if fresh.is_empty() {
            continue;
        }
        let cell = &mut grid.data[i];
        cell.absorb(fresh);
        cell.visited = true;
        let h = cell.height;
        expanded += 1;

        for j in grid.neighbors4(i) {
            let n = &grid.data[j];
            if n.height > h && !fresh.missing_from(n.drainage()).is_empty() {
                stack.push((j, fresh));
            }
        }
    }
    expanded
}

/// Close an uphill run: anything no flood reached is a basin.
fn finish_uphill(grid: &mut Grid<Cell>) {
    for c in &mut grid.data {
        c.resolve();
    }
}

/// Resolve `root` and everything strictly below it, children before parents.
///
/// A cell's drainage is its own edge drainage merged with the drainage of
/// every strictly lower neighbor, read only after that neighbor is resolved.
/// Resolved cells are never re-entered. Returns the number of cells resolved.
fn descend(grid: &mut Grid<Cell>, root: usize) -> usize {
    let mut stack = vec![(root, false)];
    let mut resolved = 0;

    while let Some((i, children_done)) = stack.pop() {
        if grid.data[i].visited {
            continue;
        }
        let h = grid.data[i].height;

        if !children_done {
            stack.push((i, true));
            for j in grid.neighbors4(i) {
                let n = &grid.data[j];
                if n.height < h && !n.visited {
                    stack.push((j, false));
                }
            }
            continue;
        }

        let (x, y) = grid.xy(i);
        let mut d = Drainage::at_edge(grid.size, x, y);
        for j in grid.neighbors4(i) {
            let n = &grid.data[j];
            if n.height < h {
                debug_assert!(n.visited, "lower neighbor resolved before its parent");
                d = d.union(n.drainage());
            }
        }
        let cell = &mut grid.data[i];
        cell.absorb(d);
        cell.resolve();
        resolved += 1;
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Class;

    fn grid_of(size: usize, heights: &[u8]) -> Grid<Cell> {
        Grid::from_vec(size, heights.iter().copied().map(Cell::with_height).collect())
    }

    fn classes(grid: &Grid<Cell>) -> Vec<Option<Class>> {
        grid.data.iter().map(Cell::class).collect()
    }

    #[test]
    fn pit_is_a_basin_in_both_modes() {
        #[rustfmt::skip]
        let heights = [
            5, 5, 5,
            5, 0, 5,
            5, 5, 5,
        ];
        for mode in [Mode::Uphill, Mode::Downhill] {
            let mut grid = grid_of(3, &heights);
            Classifier::new().run(&mut grid, mode).unwrap();
            assert_eq!(grid.data[4].class(), Some(Class::Basin), "{mode:?}");
            assert!(grid.data[4].basin);
            assert_eq!(grid.data[0].class(), Some(Class::NorthWest));
            assert_eq!(grid.data[8].class(), Some(Class::SouthEast));
            assert_eq!(grid.data[2].class(), Some(Class::Divide));
        }
    }

    #[test]
    fn ridge_drains_both_ways() {
        // A north-south ridge down the middle column.
        #[rustfmt::skip]
        let heights = [
            1, 1, 9, 1, 1,
            1, 2, 9, 2, 1,
            1, 2, 9, 2, 1,
            1, 2, 9, 2, 1,
            1, 1, 9, 1, 1,
        ];
        let mut up = grid_of(5, &heights);
        let mut down = grid_of(5, &heights);
        Classifier::new().run(&mut up, Mode::Uphill).unwrap();
        Classifier::new().run(&mut down, Mode::Downhill).unwrap();
        assert_eq!(classes(&up), classes(&down));
        assert_eq!(up.data[up.idx(2, 2)].class(), Some(Class::Divide));
    }

    #[test]
    fn uphill_takes_one_step_per_boundary_cell() {
        let mut grid = grid_of(3, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let mut c = Classifier::new();
        let mut steps = 0;
        loop {
            match c.step(&mut grid, Mode::Uphill).unwrap() {
                Step::Resolved { .. } => steps += 1,
                Step::Finished => break,
            }
        }
        assert_eq!(steps, 8);
        assert!(c.is_finished());
        assert!(grid.data.iter().all(|c| c.visited));
    }

    #[test]
    fn downhill_roots_follow_height_then_row_major() {
        #[rustfmt::skip]
        let heights = [
            1, 7, 1,
            1, 1, 1,
            7, 1, 1,
        ];
        let mut grid = grid_of(3, &heights);
        let mut c = Classifier::new();
        assert!(matches!(
            c.step(&mut grid, Mode::Downhill).unwrap(),
            Step::Resolved { root: (1, 0), .. }
        ));
        assert!(matches!(
            c.step(&mut grid, Mode::Downhill).unwrap(),
            Step::Resolved { root: (0, 2), .. }
        ));
    }

    #[test]
    fn stepping_other_mode_over_stale_flags_fails() {
        let mut grid = grid_of(3, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let mut c = Classifier::new();
        c.step(&mut grid, Mode::Uphill).unwrap();
        let err = c.step(&mut grid, Mode::Downhill).unwrap_err();
        assert_eq!(
            err,
            DivideError::InconsistentState {
                requested: Mode::Downhill,
                active: Mode::Uphill,
            }
        );

        c.reset(&mut grid);
        assert!(c.step(&mut grid, Mode::Downhill).is_ok());
    }

    #[test]
    fn fresh_classifier_refuses_flags_it_did_not_set() {
        let mut grid = grid_of(5, &crate::ILLUSTRATIVE_MAP);
        let mut first = Classifier::new();
        first.step(&mut grid, Mode::Uphill).unwrap();
        let flagged = grid.data.clone();

        let mut second = Classifier::new();
        let err = second.step(&mut grid, Mode::Downhill).unwrap_err();
        assert_eq!(err, DivideError::StaleFlags { requested: Mode::Downhill });
        assert_eq!(second.active(), None);
        assert_eq!(grid.data, flagged);

        second.reset(&mut grid);
        while let Step::Resolved { .. } = second.step(&mut grid, Mode::Downhill).unwrap() {}
        assert_eq!(grid.data[grid.idx(1, 3)].class(), Some(Class::Divide));
    }

    #[test]
    fn run_clears_foreign_flags_first() {
        let mut grid = grid_of(5, &crate::ILLUSTRATIVE_MAP);
        Classifier::new().step(&mut grid, Mode::Uphill).unwrap();
        let mut c = Classifier::new();
        assert!(c.run(&mut grid, Mode::Downhill).unwrap() > 0);
        assert!(c.is_finished());
        assert_eq!(grid.data[grid.idx(1, 3)].class(), Some(Class::Divide));
    }

    #[test]
    fn finished_run_steps_are_noops() {
        let mut grid = grid_of(3, &[3, 1, 3, 1, 2, 1, 3, 1, 3]);
        let mut c = Classifier::new();
        assert_eq!(c.run(&mut grid, Mode::Downhill).unwrap(), 5);
        let before = grid.data.clone();
        assert_eq!(c.step(&mut grid, Mode::Downhill).unwrap(), Step::Finished);
        assert_eq!(grid.data, before);
    }

    #[test]
    fn flat_map_is_classified_by_position_only() {
        let mut grid = grid_of(3, &[4; 9]);
        assert_eq!(Classifier::new().run(&mut grid, Mode::Uphill).unwrap(), 8);
        assert_eq!(grid.data[4].class(), Some(Class::Basin));
        assert_eq!(grid.data[1].class(), Some(Class::NorthWest));
        assert_eq!(grid.data[7].class(), Some(Class::SouthEast));
        assert_eq!(grid.data[6].class(), Some(Class::Divide));
    }
}
