use serde::Serialize;

use crate::grid::Grid;

/// Which map boundaries a cell's runoff reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Drainage {
    pub nw: bool,
    pub se: bool,
}

impl Drainage {
    pub const NONE: Drainage = Drainage { nw: false, se: false };
    pub const NW: Drainage = Drainage { nw: true, se: false };
    pub const SE: Drainage = Drainage { nw: false, se: true };
    pub const BOTH: Drainage = Drainage { nw: true, se: true };

    /// Drainage a cell gets just from sitting on the map edge.
    /// Top/left rows drain NW, bottom/right rows drain SE, corners may get both.
    #[inline]
    pub fn at_edge(size: usize, x: usize, y: usize) -> Drainage {
        let last = size - 1;
        Drainage {
            nw: x == 0 || y == 0,
            se: x == last || y == last,
        }
    }

    #[inline]
    pub fn union(self, other: Drainage) -> Drainage {
        Drainage {
            nw: self.nw || other.nw,
            se: self.se || other.se,
        }
    }

    /// Directions in `self` that `have` does not carry yet.
    #[inline]
    pub fn missing_from(self, have: Drainage) -> Drainage {
        Drainage {
            nw: self.nw && !have.nw,
            se: self.se && !have.se,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        !self.nw && !self.se
    }
}

/// Final classification of a resolved cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    NorthWest,
    SouthEast,
    Divide,
    Basin,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub height: u8,
    pub flows_nw: bool,
    pub flows_se: bool,
    pub basin: bool,
    pub visited: bool,
}

impl Cell {
    pub fn with_height(height: u8) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    #[inline]
    pub fn drainage(&self) -> Drainage {
        Drainage {
            nw: self.flows_nw,
            se: self.flows_se,
        }
    }

    /// OR `d` into the flow flags. Flags never go back to false here.
    #[inline]
    pub fn absorb(&mut self, d: Drainage) {
        self.flows_nw |= d.nw;
        self.flows_se |= d.se;
    }

    /// Mark the cell resolved; it's a basin iff no flow direction was found.
    #[inline]
    pub fn resolve(&mut self) {
        self.basin = !self.flows_nw && !self.flows_se;
        self.visited = true;
    }

    /// Drop classification state, keep height.
    #[inline]
    pub fn clear_flow(&mut self) {
        *self = Self::with_height(self.height);
    }

    /// Any traversal has touched this cell.
    #[inline]
    pub fn has_flow(&self) -> bool {
        self.visited || self.flows_nw || self.flows_se || self.basin
    }

    /// `None` until the cell has been visited.
    pub fn class(&self) -> Option<Class> {
        if !self.visited {
            return None;
        }
        Some(match (self.flows_nw, self.flows_se) {
            (true, true) => Class::Divide,
            (true, false) => Class::NorthWest,
            (false, true) => Class::SouthEast,
            (false, false) => Class::Basin,
        })
    }
}

impl Grid<Cell> {
    /// Clear flow flags on every cell, leaving heights alone.
    pub fn reset_flow(&mut self) {
        for c in &mut self.data {
            c.clear_flow();
        }
        tracing::debug!(size = self.size, "flow.reset");
    }

    /// Some cell still carries flags from an earlier traversal.
    pub fn has_flow(&self) -> bool {
        self.data.iter().any(Cell::has_flow)
    }

    /// `(min, max)` height over the grid.
    pub fn height_range(&self) -> (u8, u8) {
        self.data
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), c| (lo.min(c.height), hi.max(c.height)))
    }
}
