use serde::Deserialize;

/// All tunable parameters. The HTTP layer deserializes partial overrides on
/// top of `Params::default()`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Random source seed. `None` draws one from the clock, so repeated runs
    /// produce different terrain.
    pub seed: Option<u64>,
    /// Side length is `2^detail + 1`.
    pub detail: u32,

    // Midpoint displacement
    pub center_jitter: f32,
    pub edge_jitter: f32,
    /// Amplitude multiplier applied per subdivision level. 1.0 keeps a fixed magnitude.
    pub jitter_falloff: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            seed: None,
            detail: 6,
            center_jitter: 48.0,
            edge_jitter: 24.0,
            jitter_falloff: 0.65,
        }
    }
}
