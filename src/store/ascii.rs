//! ESRI ASCII grid store.
//!
//! ```text
//! ncols        4
//! nrows        3
//! xllcorner    500000
//! yllcorner    4400000
//! cellsize     30
//! NODATA_value -32768
//! 0 0 12 100
//! ...
//! ```
//!
//! The projection, when present, lives in a `.prj` sidecar next to the grid.
//! Only square, north-up grids can be written.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::raster::{GeoTransform, Raster};
use crate::{Error, Result};
use super::RasterStore;

/// No-data value assumed when a grid header omits `NODATA_value`.
pub const DEFAULT_NODATA: f64 = -9999.0;

/// Filesystem-backed store for `.asc` grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiGridStore;

impl AsciiGridStore {
    pub fn new() -> Self {
        Self
    }
}

fn prj_path(path: &Path) -> PathBuf {
    path.with_extension("prj")
}

fn format_error(path: &Path, message: impl Into<String>) -> Error {
    Error::Format { path: path.display().to_string(), message: message.into() }
}

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    centered: bool,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

fn parse_grid(path: &Path, text: &str) -> Result<Raster> {
    let mut header = Header::default();
    let mut lines = text.lines().peekable();

    while let Some(&line) = lines.peek() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            lines.next();
            continue;
        };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            break;
        }
        let value = parts
            .next()
            .ok_or_else(|| format_error(path, format!("header '{key}' has no value")))?;
        let number = value
            .parse::<f64>()
            .map_err(|_| format_error(path, format!("header '{key}' is not a number: {value}")))?;
        match key.to_ascii_lowercase().as_str() {
            "ncols" => header.ncols = Some(dimension(path, key, number)?),
            "nrows" => header.nrows = Some(dimension(path, key, number)?),
            "xllcorner" => header.xll = Some(number),
            "yllcorner" => header.yll = Some(number),
            "xllcenter" => {
                header.xll = Some(number);
                header.centered = true;
            }
            "yllcenter" => {
                header.yll = Some(number);
                header.centered = true;
            }
            "cellsize" => header.cellsize = Some(number),
            "nodata_value" => header.nodata = Some(number),
            other => return Err(format_error(path, format!("unknown header '{other}'"))),
        }
        lines.next();
    }

    let missing = |name: &str| format_error(path, format!("missing header '{name}'"));
    let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;
    let mut xll = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let mut yll = header.yll.ok_or_else(|| missing("yllcorner"))?;
    if header.centered {
        xll -= cellsize / 2.0;
        yll -= cellsize / 2.0;
    }
    let nodata = header.nodata.unwrap_or(DEFAULT_NODATA);

    let cells = nrows
        .checked_mul(ncols)
        .ok_or_else(|| format_error(path, format!("grid of {nrows} x {ncols} cells is too large")))?;

    let values = lines
        .flat_map(str::split_whitespace)
        .map(|v| v.parse::<f64>().map_err(|_| format_error(path, format!("invalid cell value '{v}'"))))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != cells {
        return Err(format_error(path, format!("expected {cells} cell values, found {}", values.len())));
    }
    let data = Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| format_error(path, e.to_string()))?;

    let origin_y = yll + nrows as f64 * cellsize;
    Ok(Raster::new(data, nodata).with_georeference(GeoTransform::north_up(xll, origin_y, cellsize), ""))
}

/// `ncols`/`nrows` must be non-negative integers.
fn dimension(path: &Path, key: &str, number: f64) -> Result<usize> {
    if number < 0.0 || number.fract() != 0.0 || number > u32::MAX as f64 {
        return Err(format_error(path, format!("header '{key}' is not a valid dimension: {number}")));
    }
    Ok(number as usize)
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

impl RasterStore for AsciiGridStore {
    fn read(&self, path: &Path) -> Result<Raster> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let raster = parse_grid(path, &text)?;
        let projection = match fs::read_to_string(prj_path(path)) {
            Ok(p) => p.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let geotransform = raster.geotransform();
        Ok(raster.with_georeference(geotransform, projection))
    }

    fn write(&self, path: &Path, raster: &Raster) -> Result<()> {
        let gt = raster.geotransform();
        if !gt.is_square_north_up() {
            return Err(format_error(path, "ASCII grids need square, north-up cells"));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let (nrows, ncols) = raster.shape();
        let cellsize = gt.pixel_width();
        let (origin_x, origin_y) = gt.origin();

        let mut out = BufWriter::new(fs::File::create(path)?);
        writeln!(out, "ncols        {ncols}")?;
        writeln!(out, "nrows        {nrows}")?;
        writeln!(out, "xllcorner    {origin_x}")?;
        writeln!(out, "yllcorner    {}", origin_y - nrows as f64 * cellsize)?;
        writeln!(out, "cellsize     {cellsize}")?;
        writeln!(out, "NODATA_value {}", format_value(raster.nodata()))?;
        for row in raster.filled_data().rows() {
            let line: Vec<String> = row.iter().map(|&v| format_value(v)).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        out.flush()?;

        let prj = prj_path(path);
        if raster.projection().is_empty() {
            if prj.exists() {
                fs::remove_file(prj)?;
            }
        } else {
            fs::write(prj, raster.projection())?;
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        match fs::remove_file(prj_path(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_header_and_values() {
        let text = "ncols 3\nnrows 2\nxllcorner 100\nyllcorner 200\ncellsize 10\nNODATA_value -9999\n1 2 3\n4 -9999 6\n";
        let r = parse_grid(Path::new("t.asc"), text).unwrap();
        assert_eq!(r.shape(), (2, 3));
        assert_eq!(r.get(1, 1), None);
        assert_eq!(r.get(1, 2), Some(6.0));
        assert_eq!(r.geotransform(), GeoTransform::north_up(100.0, 220.0, 10.0));
    }

    #[test]
    fn test_parse_center_registration_and_default_nodata() {
        let text = "NCOLS 1\nNROWS 1\nXLLCENTER 5\nYLLCENTER 5\nCELLSIZE 10\n-9999\n";
        let r = parse_grid(Path::new("t.asc"), text).unwrap();
        assert_eq!(r.nodata(), DEFAULT_NODATA);
        assert_eq!(r.valid_count(), 0);
        assert_eq!(r.geotransform().origin(), (0.0, 10.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_grid(Path::new("t.asc"), "ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n").is_err());
        assert!(parse_grid(Path::new("t.asc"), "ncols 1\nnrows 1\ncellsize 1\n1\n").is_err());
        assert!(parse_grid(Path::new("t.asc"), "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nabc\n").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_dimensions() {
        let grid = |ncols: &str, nrows: &str| {
            format!("ncols {ncols}\nnrows {nrows}\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n")
        };
        for (ncols, nrows) in [("-1", "1"), ("1.5", "1"), ("1", "-3"), ("1", "nan")] {
            let err = parse_grid(Path::new("t.asc"), &grid(ncols, nrows)).unwrap_err();
            assert!(matches!(err, Error::Format { .. }), "{ncols} x {nrows}: {err}");
        }
        // huge but integral headers fail on the cell count, not by overflowing
        let err = parse_grid(Path::new("t.asc"), &grid("4000000000", "4000000000")).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("31_00.asc");
        let store = AsciiGridStore::new();
        let raster = Raster::new(array![[0.0, 12.0], [-32768.0, 100.0]], -32768.0)
            .with_georeference(GeoTransform::north_up(500.0, 1060.0, 30.0), "EPSG:26918");

        store.write(&path, &raster).unwrap();
        assert!(store.exists(&path));
        let back = store.read(&path).unwrap();
        assert_eq!(back, raster);

        store.remove(&path).unwrap();
        assert!(!store.exists(&path));
        assert!(!prj_path(&path).exists());
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = AsciiGridStore.read(&dir.path().join("missing.asc"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rotated_grid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster::filled((1, 1), 1.0, -1.0)
            .with_georeference(GeoTransform([0.0, 30.0, 1.0, 0.0, 0.0, -30.0]), "");
        let result = AsciiGridStore.write(&dir.path().join("x.asc"), &raster);
        assert!(matches!(result, Err(Error::Format { .. })));
    }
}
