//! Probability algebra over masked rasters (0–100 scale).
//!
//! Binary operations keep a cell valid only where every input is valid.

use ndarray::Zip;

use super::{check_shape, Raster};
use crate::{Error, Result};

/// Canonical no-data value of every output grid.
pub const NODATA_INT16: i16 = i16::MIN;

const MAX_PROB: f64 = 100.0;

/// `min(a + b + ..., 100)`. A single raster is returned untouched.
pub fn union(rasters: Vec<Raster>) -> Result<Raster> {
    combine(rasters, "union", |v| v, |acc, v| acc + v, |v| v.min(MAX_PROB))
}

/// `(a/100) * (b/100) * ... * 100`, clamped to 100. A single raster is returned untouched.
pub fn intersection(rasters: Vec<Raster>) -> Result<Raster> {
    combine(
        rasters,
        "intersection",
        |v| v / MAX_PROB,
        |acc, v| acc * (v / MAX_PROB),
        |v| (v * MAX_PROB).min(MAX_PROB),
    )
}

fn combine(
    rasters: Vec<Raster>,
    name: &str,
    seed: impl Fn(f64) -> f64,
    op: impl Fn(f64, f64) -> f64,
    finish: impl Fn(f64) -> f64,
) -> Result<Raster> {
    let mut iter = rasters.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::EvaluationError(format!("{name} of no rasters")))?;
    let Some(second) = iter.next() else {
        return Ok(first);
    };

    let nodata = first.nodata;
    let mut data = first.data.mapv(&seed);
    let mut mask = first.mask.clone();

    for next in std::iter::once(second).chain(iter) {
        check_shape(data.dim(), next.shape())?;
        Zip::from(&mut data)
            .and(&mut mask)
            .and(&next.data)
            .and(&next.mask)
            .for_each(|acc, valid, &v, &next_valid| {
                *valid = *valid && next_valid;
                *acc = op(*acc, v);
            });
    }

    Zip::from(&mut data).and(&mask).for_each(|v, &valid| {
        *v = if valid { finish(*v) } else { nodata };
    });

    Ok(Raster::from_parts(data, mask, nodata, first.geotransform, first.projection))
}

/// Round half up to int16 values and remap no-data.
///
/// Invalid cells, and cells whose rounded value equals `source_nodata`, become
/// [`NODATA_INT16`]. The returned raster carries `NODATA_INT16` as its no-data.
pub fn round_int(raster: &Raster, source_nodata: f64) -> Raster {
    let sentinel = f64::from(NODATA_INT16);
    let mut data = raster.data.clone();
    let mut mask = raster.mask.clone();

    Zip::from(&mut data).and(&mut mask).for_each(|v, valid| {
        if !*valid || v.is_nan() {
            *v = sentinel;
            *valid = false;
            return;
        }
        let rounded = (*v + 0.5)
            .floor()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX));
        if rounded == source_nodata || rounded == sentinel {
            *v = sentinel;
            *valid = false;
        } else {
            *v = rounded;
        }
    });

    Raster::from_parts(data, mask, sentinel, raster.geotransform, raster.projection.clone())
}
