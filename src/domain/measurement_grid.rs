//! Noise × power grid the upstream chart is published on

use serde::Serialize;

/// Maximum noise bucket. Not a real dB figure; measured values live in
/// `noise_actual_min`/`noise_actual_max` for this bucket.
pub const NOISE_MAX: i64 = 100;

/// Noise buckets (dB) and the `dd` query code the chart page uses for them
pub const NOISE_LEVELS: [(i64, u8); 4] = [(35, 4), (40, 3), (45, 2), (NOISE_MAX, 1)];

/// CPU power buckets (W) and the `test` query code the chart page uses for them
pub const CPU_POWER: [(i64, u8); 4] = [(62, 1), (92, 2), (150, 3), (200, 4)];

/// One `(noise, power)` page of the upstream chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub noise: i64,
    pub power: i64,
    pub noise_code: u8,
    pub power_code: u8,
}

impl GridCell {
    pub fn is_noise_max(&self) -> bool {
        self.noise == NOISE_MAX
    }
}

/// Every grid cell that is measured upstream, outer noise / inner power.
///
/// Quiet buckets (≤ 40 dB) are never measured at 200 W.
pub fn grid_cells() -> Vec<GridCell> {
    NOISE_LEVELS
        .iter()
        .flat_map(|&(noise, noise_code)| {
            CPU_POWER.iter().map(move |&(power, power_code)| GridCell {
                noise,
                power,
                noise_code,
                power_code,
            })
        })
        .filter(|cell| !(cell.noise != NOISE_MAX && cell.noise <= 40 && cell.power >= 200))
        .collect()
}
