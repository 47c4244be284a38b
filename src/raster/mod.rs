//! # Masked Rasters
//!
//! A [`Raster`] is a 2-D grid of probability values with an explicit validity
//! mask, the no-data sentinel it was read with, and the spatial metadata of its
//! source. All rasters in one computation share shape and spatial reference;
//! the engine does not re-validate this beyond shape checks in [`algebra`].

pub mod algebra;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use algebra::{intersection, round_int, union, NODATA_INT16};

/// GDAL-style affine geotransform:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with square cells anchored at the top-left corner.
    pub fn north_up(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self([origin_x, cell_size, 0.0, origin_y, 0.0, -cell_size])
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// True for rotation-free grids with square cells.
    pub fn is_square_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0 && self.0[1] > 0.0 && self.0[5] == -self.0[1]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::north_up(0.0, 0.0, 1.0)
    }
}

/// A masked raster: values, validity (`true` = valid), no-data and georeference.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array2<f64>,
    mask: Array2<bool>,
    nodata: f64,
    geotransform: GeoTransform,
    projection: String,
}

impl Raster {
    /// Build from raw values; cells equal to `nodata` (or NaN) are invalid.
    pub fn new(data: Array2<f64>, nodata: f64) -> Self {
        let mask = data.mapv(|v| !is_nodata(v, nodata));
        Self {
            data,
            mask,
            nodata,
            geotransform: GeoTransform::default(),
            projection: String::new(),
        }
    }

    /// Build from values and an explicit validity mask.
    pub fn with_mask(data: Array2<f64>, mask: Array2<bool>, nodata: f64) -> Result<Self> {
        check_shape(data.dim(), mask.dim())?;
        Ok(Self {
            data,
            mask,
            nodata,
            geotransform: GeoTransform::default(),
            projection: String::new(),
        })
    }

    /// Every cell valid and set to `value`.
    pub fn filled(shape: (usize, usize), value: f64, nodata: f64) -> Self {
        Self::new(Array2::from_elem(shape, value), nodata)
    }

    /// Build from row slices, marking `nodata` cells invalid. Rows must be equal length.
    pub fn from_rows(rows: &[Vec<f64>], nodata: f64) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((nrows, ncols), flat)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        Ok(Self::new(data, nodata))
    }

    pub fn with_georeference(mut self, geotransform: GeoTransform, projection: impl Into<String>) -> Self {
        self.geotransform = geotransform;
        self.projection = projection.into();
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    pub fn geotransform(&self) -> GeoTransform {
        self.geotransform
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    /// Value at `(row, col)`, `None` when invalid or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        match self.mask.get((row, col)) {
            Some(true) => self.data.get((row, col)).copied(),
            _ => None,
        }
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask.get((row, col)).copied().unwrap_or(false)
    }

    /// Set a cell; `None` marks it invalid and stores the no-data value.
    pub fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        if let (Some(d), Some(m)) = (self.data.get_mut((row, col)), self.mask.get_mut((row, col))) {
            match value {
                Some(v) => {
                    *d = v;
                    *m = true;
                }
                None => {
                    *d = self.nodata;
                    *m = false;
                }
            }
        }
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Values with every invalid cell replaced by the no-data value.
    pub fn filled_data(&self) -> Array2<f64> {
        let mut out = self.data.clone();
        Zip::from(&mut out).and(&self.mask).for_each(|v, &valid| {
            if !valid {
                *v = self.nodata;
            }
        });
        out
    }

    /// Apply `f` to valid cells; invalid cells and metadata are carried over.
    pub fn map_valid(&self, f: impl Fn(f64) -> f64) -> Raster {
        let data = Zip::from(&self.data)
            .and(&self.mask)
            .map_collect(|&v, &valid| if valid { f(v) } else { v });
        Raster { data, ..self.clone() }
    }

    /// Replace the no-data value, rewriting invalid cells.
    pub fn with_nodata(&self, nodata: f64) -> Raster {
        let mut out = Raster { nodata, ..self.clone() };
        out.data = out.filled_data();
        out
    }

    pub(crate) fn from_parts(
        data: Array2<f64>,
        mask: Array2<bool>,
        nodata: f64,
        geotransform: GeoTransform,
        projection: String,
    ) -> Self {
        Self { data, mask, nodata, geotransform, projection }
    }
}

pub(crate) fn is_nodata(value: f64, nodata: f64) -> bool {
    value.is_nan() || value == nodata
}

pub(crate) fn check_shape(expected: (usize, usize), got: (usize, usize)) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(format!("expected {expected:?}, got {got:?}")))
    }
}
