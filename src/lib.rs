pub mod cell;
pub mod config;
pub mod divide;
pub mod error;
pub mod grid;
pub mod render;
pub mod rng;
pub mod terrain;

use std::time::Instant;

use serde::Serialize;

use cell::{Cell, Class};
use config::Params;
use divide::{Classifier, Mode, Step};
use error::Result;
use grid::Grid;
use rng::Rng;
use terrain::TerrainStats;

/// The fixed 5x5 illustrative map, row-major.
#[rustfmt::skip]
pub const ILLUSTRATIVE_MAP: [u8; 25] = [
    1, 2, 3, 4, 5,
    2, 3, 4, 5, 6,
    3, 4, 5, 3, 1,
    6, 7, 3, 4, 5,
    5, 1, 2, 3, 4,
];

/// A heightmap plus its drainage classification. Owns the random source, so
/// successive `generate_terrain` calls keep drawing from one seeded stream.
#[derive(Clone, Debug)]
pub struct ContinentMap {
    grid: Grid<Cell>,
    params: Params,
    seed: u64,
    rng: Rng,
    classifier: Classifier,
}

/// Per-class cell counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub north_west: usize,
    pub south_east: usize,
    pub divide: usize,
    pub basin: usize,
    pub unvisited: usize,
}

impl ContinentMap {
    /// Build a map and generate terrain at `params.detail`.
    pub fn new(params: Params) -> Result<Self> {
        let seed = params.seed.unwrap_or_else(rng::entropy_seed);
        let mut map = Self {
            grid: Grid::new(0),
            rng: Rng::new(seed),
            seed,
            params,
            classifier: Classifier::new(),
        };
        map.generate_terrain(map.params.detail)?;
        Ok(map)
    }

    /// The fixed 5x5 map. Calling `generate_terrain` on it replaces it.
    pub fn illustrative() -> Self {
        let cells = ILLUSTRATIVE_MAP.iter().copied().map(Cell::with_height).collect();
        let seed = rng::entropy_seed();
        Self {
            grid: Grid::from_vec(5, cells),
            params: Params::default(),
            seed,
            rng: Rng::new(seed),
            classifier: Classifier::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn size(&self) -> usize {
        self.grid.size
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    /// Mode of the run whose flags are on the grid, if any.
    pub fn active_mode(&self) -> Option<Mode> {
        self.classifier.active()
    }

    pub fn is_classified(&self) -> bool {
        self.classifier.is_finished()
    }

    /// Rebuild the terrain at `detail`. On error nothing changes.
    pub fn generate_terrain(&mut self, detail: u32) -> Result<TerrainStats> {
        let stats = terrain::generate(&mut self.grid, detail, &mut self.rng, &self.params)?;
        self.params.detail = detail;
        self.classifier = Classifier::new();
        Ok(stats)
    }

    pub fn reset_flow(&mut self) {
        self.classifier.reset(&mut self.grid);
    }

    pub fn run_uphill(&mut self, step_only: bool) -> Result<Step> {
        self.run(Mode::Uphill, step_only)
    }

    pub fn run_downhill(&mut self, step_only: bool) -> Result<Step> {
        self.run(Mode::Downhill, step_only)
    }

    /// One root when `step_only`, otherwise reset and run to completion.
    pub fn run(&mut self, mode: Mode, step_only: bool) -> Result<Step> {
        if step_only {
            return self.classifier.step(&mut self.grid, mode);
        }
        self.classifier.run(&mut self.grid, mode)?;
        Ok(Step::Finished)
    }

    /// Copy of the cell at `(x, y)`, or `None` off the map.
    pub fn cell_at(&self, x: i64, y: i64) -> Option<Cell> {
        self.grid.get(x, y).copied()
    }

    pub fn height_range(&self) -> (u8, u8) {
        self.grid.height_range()
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for c in &self.grid.data {
            match c.class() {
                Some(Class::NorthWest) => s.north_west += 1,
                Some(Class::SouthEast) => s.south_east += 1,
                Some(Class::Divide) => s.divide += 1,
                Some(Class::Basin) => s.basin += 1,
                None => s.unvisited += 1,
            }
        }
        s
    }
}

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Both classifications of one generated map.
pub struct Analysis {
    /// Map left holding the downhill classification.
    pub map: ContinentMap,
    pub uphill: Summary,
    pub downhill: Summary,
    /// Cells whose uphill and downhill classes differ.
    pub mismatches: usize,
}

/// Generate a map, classify it both ways and compare.
pub fn analyze(params: &Params) -> Result<(Analysis, Vec<Timing>)> {
    let mut timings = Vec::new();
    let total_start = Instant::now();

    let t = Instant::now();
    let mut map = ContinentMap::new(params.clone())?;
    timings.push(Timing {
        name: "terrain",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    map.run_uphill(false)?;
    timings.push(Timing {
        name: "uphill",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });
    let uphill = map.summary();
    let uphill_classes: Vec<Option<Class>> = map.grid.data.iter().map(Cell::class).collect();

    let t = Instant::now();
    map.run_downhill(false)?;
    timings.push(Timing {
        name: "downhill",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });
    let downhill = map.summary();

    let mismatches = map
        .grid
        .data
        .iter()
        .zip(&uphill_classes)
        .filter(|(c, up)| c.class() != **up)
        .count();
    if mismatches > 0 {
        tracing::warn!(mismatches, seed = map.seed, "divide.modes_disagree");
    }

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    Ok((
        Analysis {
            map,
            uphill,
            downhill,
            mismatches,
        },
        timings,
    ))
}
