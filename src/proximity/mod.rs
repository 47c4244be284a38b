//! # Proximity
//!
//! Distance-to-nearest-target computation used by adjacency elements.
//! Mirrors the semantics of a GDAL-style proximity pass: distances are in
//! pixels, target cells sit at distance 0, cells farther than `max_distance`
//! become the destination no-data, and a fixed buffer value (when given)
//! replaces the distance for every in-radius cell.

use crate::raster::{check_shape, Raster};
use crate::{Error, Result};

/// Parameters of one proximity pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityOptions {
    /// Search radius in pixels.
    pub max_distance: f64,
    /// Source values that count as targets.
    pub target_values: Vec<i32>,
    /// Value written for every in-radius cell instead of its distance.
    pub fixed_buffer_value: Option<f64>,
    /// Source no-data cells are neither targets nor outputs.
    pub use_input_nodata: bool,
}

impl ProximityOptions {
    /// Targets `1..=100`, the full probability range, buffered at `ceiling`.
    pub fn probability_buffer(max_distance: f64, ceiling: f64) -> Self {
        Self {
            max_distance,
            target_values: (1..=100).collect(),
            fixed_buffer_value: Some(ceiling),
            use_input_nodata: true,
        }
    }

    fn is_target(&self, value: f64) -> bool {
        value.fract() == 0.0
            && value >= f64::from(i32::MIN)
            && value <= f64::from(i32::MAX)
            && self.target_values.contains(&(value as i32))
    }
}

/// Proximity primitive: fills `dest` from `source`.
pub trait Proximity {
    fn compute(&self, source: &Raster, dest: &mut Raster, options: &ProximityOptions) -> Result<()>;
}

/// Exact Euclidean proximity, stamping a disk of `max_distance` around each target.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanProximity;

impl Proximity for EuclideanProximity {
    fn compute(&self, source: &Raster, dest: &mut Raster, options: &ProximityOptions) -> Result<()> {
        check_shape(source.shape(), dest.shape())?;
        if !(options.max_distance >= 0.0) {
            return Err(Error::EvaluationError(format!(
                "proximity search radius must be non-negative, got {}",
                options.max_distance
            )));
        }

        let (nrows, ncols) = source.shape();
        let radius = options.max_distance.min(nrows.max(ncols) as f64).floor() as isize;
        let mut distance = vec![f64::INFINITY; nrows * ncols];

        for row in 0..nrows {
            for col in 0..ncols {
                let is_target = match source.get(row, col) {
                    Some(v) => options.is_target(v),
                    None if options.use_input_nodata => false,
                    None => options.is_target(source.data()[[row, col]]),
                };
                if !is_target {
                    continue;
                }
                for dr in -radius..=radius {
                    let r = row as isize + dr;
                    if r < 0 || r >= nrows as isize {
                        continue;
                    }
                    for dc in -radius..=radius {
                        let c = col as isize + dc;
                        if c < 0 || c >= ncols as isize {
                            continue;
                        }
                        let d = ((dr * dr + dc * dc) as f64).sqrt();
                        let cell = &mut distance[r as usize * ncols + c as usize];
                        if d <= options.max_distance && d < *cell {
                            *cell = d;
                        }
                    }
                }
            }
        }

        for row in 0..nrows {
            for col in 0..ncols {
                let d = distance[row * ncols + col];
                let value = if options.use_input_nodata && !source.is_valid(row, col) {
                    None
                } else if d.is_finite() {
                    Some(options.fixed_buffer_value.unwrap_or(d))
                } else {
                    None
                };
                dest.set(row, col, value);
            }
        }
        Ok(())
    }
}
