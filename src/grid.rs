use std::array;
use std::iter::Take;

/// Row-major flat square grid. Cells are addressed by index, never by handle.
/// No wrapping: stepping off any edge leaves the map.
#[derive(Clone, Debug)]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub size: usize,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![T::default(); size * size],
            size,
        }
    }
}

impl<T> Grid<T> {
    pub fn from_vec(size: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), size * size, "grid data must be size*size");
        Self { data, size }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size);
        y * self.size + x
    }

    #[inline]
    pub fn xy(&self, i: usize) -> (usize, usize) {
        (i % self.size, i / self.size)
    }

    /// Bounds-checked index for signed coordinates.
    #[inline]
    pub fn checked_idx(&self, x: i64, y: i64) -> Option<usize> {
        let n = self.size as i64;
        if x < 0 || y < 0 || x >= n || y >= n {
            return None;
        }
        Some(y as usize * self.size + x as usize)
    }

    /// `None` when `(x, y)` lies outside the map.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<&T> {
        self.checked_idx(x, y).map(|i| &self.data[i])
    }

    /// In-bounds 4-connected neighbors of cell `i` (W, E, N, S).
    pub fn neighbors4(&self, i: usize) -> Take<array::IntoIter<usize, 4>> {
        let (x, y) = self.xy(i);
        let offsets: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        let mut out = [0usize; 4];
        let mut n = 0;
        for (dx, dy) in offsets {
            if let Some(j) = self.checked_idx(x as i64 + dx, y as i64 + dy) {
                out[n] = j;
                n += 1;
            }
        }
        out.into_iter().take(n)
    }

    #[inline]
    pub fn is_boundary(&self, i: usize) -> bool {
        let (x, y) = self.xy(i);
        let last = self.size - 1;
        x == 0 || y == 0 || x == last || y == last
    }

    /// Boundary cell indices in row-major order.
    pub fn boundary_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_boundary(i)).collect()
    }
}
