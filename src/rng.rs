//! Deterministic RNG based on splitmix64. The only random source the terrain
//! generator draws from, so a fixed seed reproduces a map exactly.

#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Seed drawn from the wall clock, for callers that don't pin one.
pub fn entropy_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    splitmix64(nanos ^ std::process::id() as u64)
}

/// Simple sequential RNG.
#[derive(Clone, Debug)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = splitmix64(self.state);
        self.state
    }

    /// Uniform integer in `[lo, hi)`. Returns `lo` for an empty range.
    ///
    /// Widening-multiply reduction of the draw onto the span. Per-value bias
    /// stays below `span / 2^64`.
    pub fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi as i64 - lo as i64) as u64;
        let offset = ((self.next_u64() as u128 * span as u128) >> 64) as i64;
        (lo as i64 + offset) as i32
    }

    /// Uniform integer in `[-amp, amp]`.
    pub fn jitter(&mut self, amp: i32) -> i32 {
        if amp <= 0 {
            return 0;
        }
        self.range_i32(-amp, amp + 1)
    }
}
