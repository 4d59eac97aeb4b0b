use crate::cell::Cell;
use crate::config::Params;
use crate::error::{DivideError, Result};
use crate::grid::Grid;
use crate::rng::Rng;

pub const MIN_DETAIL_LEVEL: u32 = 1;
pub const MAX_DETAIL_LEVEL: u32 = 12;

/// Corner heights are drawn from `[0, CORNER_HEIGHT_MAX)`.
const CORNER_HEIGHT_MAX: i32 = 255;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainStats {
    /// Square regions that computed a center and edge midpoints.
    pub regions: usize,
    /// Cells that received a height.
    pub assigned: usize,
}

/// Side length for a detail level: `2^detail + 1`.
pub fn side_for_detail(detail: u32) -> Result<usize> {
    if !(MIN_DETAIL_LEVEL..=MAX_DETAIL_LEVEL).contains(&detail) {
        return Err(DivideError::InvalidDetailLevel {
            level: detail,
            min: MIN_DETAIL_LEVEL,
            max: MAX_DETAIL_LEVEL,
        });
    }
    Ok((1usize << detail) + 1)
}

/// Fill `grid` with midpoint-displacement terrain.
///
/// The grid is replaced when its size doesn't match `detail`; otherwise every
/// cell is cleared (height and flags) before the fill. An invalid detail level
/// is rejected before anything is touched.
pub fn generate(
    grid: &mut Grid<Cell>,
    detail: u32,
    rng: &mut Rng,
    params: &Params,
) -> Result<TerrainStats> {
    let size = side_for_detail(detail)?;
    if grid.size != size {
        *grid = Grid::new(size);
    } else {
        grid.data.fill(Cell::default());
    }

    let mut d = Displacer {
        assigned: vec![false; grid.len()],
        grid,
        rng,
        params,
        stats: TerrainStats::default(),
    };

    // Corners first, before any subdivision draws from the stream.
    let last = size - 1;
    for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
        let h = d.rng.range_i32(0, CORNER_HEIGHT_MAX);
        d.set(x, y, h);
    }
    d.subdivide(0, 0, last, 0);

    let stats = d.stats;
    debug_assert_eq!(stats.assigned, size * size);
    tracing::info!(detail, size, regions = stats.regions, "terrain.generated");
    Ok(stats)
}

struct Displacer<'a> {
    grid: &'a mut Grid<Cell>,
    assigned: Vec<bool>,
    rng: &'a mut Rng,
    params: &'a Params,
    stats: TerrainStats,
}

impl Displacer<'_> {
    #[inline]
    fn height(&self, x: usize, y: usize) -> i32 {
        self.grid.data[self.grid.idx(x, y)].height as i32
    }

    /// First writer wins; heights clamp into the u8 range.
    fn set(&mut self, x: usize, y: usize, h: i32) {
        let i = self.grid.idx(x, y);
        if self.assigned[i] {
            return;
        }
        self.assigned[i] = true;
        self.grid.data[i].height = h.clamp(0, u8::MAX as i32) as u8;
        self.stats.assigned += 1;
    }

    fn amplitude(&self, base: f32, level: u32) -> i32 {
        (base * self.params.jitter_falloff.powi(level as i32)).round() as i32
    }

    /// Midpoint of the edge `(ax, ay)`-`(bx, by)`, unless a neighboring square set it already.
    fn edge(&mut self, (ax, ay): (usize, usize), (bx, by): (usize, usize), amp: i32) {
        let (mx, my) = ((ax + bx) / 2, (ay + by) / 2);
        if self.assigned[self.grid.idx(mx, my)] {
            return;
        }
        let avg = (self.height(ax, ay) + self.height(bx, by)) / 2;
        let h = avg + self.rng.jitter(amp);
        self.set(mx, my, h);
    }

    /// Square with top-left `(x0, y0)` and side `span` cells minus one.
    /// Spans below 2 have no interior midpoint and stop the recursion.
    fn subdivide(&mut self, x0: usize, y0: usize, span: usize, level: u32) {
        if span < 2 {
            return;
        }
        self.stats.regions += 1;
        let half = span / 2;
        let (x1, y1) = (x0 + span, y0 + span);
        let (tl, tr, bl, br) = ((x0, y0), (x1, y0), (x0, y1), (x1, y1));

        let amp_center = self.amplitude(self.params.center_jitter, level);
        let amp_edge = self.amplitude(self.params.edge_jitter, level);

        let sum = self.height(x0, y0) + self.height(x1, y0) + self.height(x0, y1) + self.height(x1, y1);
        let center = sum / 4 + self.rng.jitter(amp_center);
        self.set(x0 + half, y0 + half, center);

        self.edge(tl, tr, amp_edge);
        self.edge(bl, br, amp_edge);
        self.edge(tl, bl, amp_edge);
        self.edge(tr, br, amp_edge);

        self.subdivide(x0, y0, half, level + 1);
        self.subdivide(x0 + half, y0, half, level + 1);
        self.subdivide(x0, y0 + half, half, level + 1);
        self.subdivide(x0 + half, y0 + half, half, level + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(grid: &Grid<Cell>) -> Vec<u8> {
        grid.data.iter().map(|c| c.height).collect()
    }

    #[test]
    fn rejects_detail_zero_without_touching_grid() {
        let mut grid = Grid::from_vec(3, (0..9).map(Cell::with_height).collect());
        let before = heights(&grid);
        let err = generate(&mut grid, 0, &mut Rng::new(1), &Params::default()).unwrap_err();
        assert!(matches!(err, DivideError::InvalidDetailLevel { level: 0, .. }));
        assert_eq!(heights(&grid), before);

        assert!(side_for_detail(MAX_DETAIL_LEVEL + 1).is_err());
    }

    #[test]
    fn three_by_three_is_a_single_region() {
        let mut grid = Grid::new(3);
        let stats = generate(&mut grid, 1, &mut Rng::new(5), &Params::default()).unwrap();
        assert_eq!(stats, TerrainStats { regions: 1, assigned: 9 });
    }

    #[test]
    fn every_cell_assigned_once() {
        for detail in 1..=6u32 {
            let mut grid = Grid::new(1);
            let stats = generate(&mut grid, detail, &mut Rng::new(11), &Params::default()).unwrap();
            let size = (1usize << detail) + 1;
            assert_eq!(grid.size, size);
            assert_eq!(stats.assigned, size * size);
            assert_eq!(stats.regions, (4usize.pow(detail) - 1) / 3);
        }
    }

    #[test]
    fn same_seed_same_heights() {
        let params = Params::default();
        let mut a = Grid::new(1);
        let mut b = Grid::new(1);
        generate(&mut a, 5, &mut Rng::new(42), &params).unwrap();
        generate(&mut b, 5, &mut Rng::new(42), &params).unwrap();
        assert_eq!(heights(&a), heights(&b));

        let mut c = Grid::new(1);
        generate(&mut c, 5, &mut Rng::new(43), &params).unwrap();
        assert_ne!(heights(&a), heights(&c));
    }

    #[test]
    fn corners_come_from_the_first_draws() {
        let mut grid = Grid::new(1);
        generate(&mut grid, 4, &mut Rng::new(77), &Params::default()).unwrap();

        let mut rng = Rng::new(77);
        let last = grid.size - 1;
        for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
            let expected = rng.range_i32(0, CORNER_HEIGHT_MAX) as u8;
            assert_eq!(grid.data[grid.idx(x, y)].height, expected, "corner ({x}, {y})");
        }
    }

    #[test]
    fn zero_jitter_is_plain_averaging() {
        let params = Params {
            center_jitter: 0.0,
            edge_jitter: 0.0,
            ..Params::default()
        };
        let mut grid = Grid::new(3);
        generate(&mut grid, 1, &mut Rng::new(3), &params).unwrap();
        let h = |x: usize, y: usize| grid.data[grid.idx(x, y)].height as i32;
        assert_eq!(h(1, 1), (h(0, 0) + h(2, 0) + h(0, 2) + h(2, 2)) / 4);
        assert_eq!(h(1, 0), (h(0, 0) + h(2, 0)) / 2);
        assert_eq!(h(0, 1), (h(0, 0) + h(0, 2)) / 2);
        assert_eq!(h(2, 1), (h(2, 0) + h(2, 2)) / 2);
        assert_eq!(h(1, 2), (h(0, 2) + h(2, 2)) / 2);
    }
}
