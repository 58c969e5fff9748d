//! Land mask from the bathymetry sentinel and the fill policy for exported fields.
use crate::error::{Error, Result};
use crate::grid::Grid;

/// Bathymetry value marking a dry (land) cell.
pub const LAND_SENTINEL: f64 = -10.0;
/// Value written for land and missing cells in exported files.
pub const FILL_VALUE: f64 = -999.0;

/// Per-cell land flag with the grid's shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LandMask {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<bool>,
}

impl LandMask {
    /// Flag cells whose bathymetry equals `sentinel` exactly.
    pub fn from_grid(grid: &Grid, sentinel: f64) -> Self {
        Self {
            rows: grid.rows,
            cols: grid.cols,
            cells: grid.bathymetry.iter().map(|&b| b == sentinel).collect(),
        }
    }

    #[inline]
    pub fn is_land(&self, i: usize) -> bool {
        self.cells[i]
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn land_count(&self) -> usize {
        self.cells.iter().filter(|&&l| l).count()
    }

    pub fn sea_count(&self) -> usize {
        self.cells.len() - self.land_count()
    }

    fn check(&self, len: usize) -> Result<()> {
        if len != self.cells.len() {
            return Err(Error::ShapeMismatch {
                what: "land mask".to_string(),
                expected: self.cells.len(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Set land cells to NaN in place.
    pub fn apply_nan(&self, field: &mut [f64]) -> Result<()> {
        self.check(field.len())?;
        for (v, &land) in field.iter_mut().zip(&self.cells) {
            if land {
                *v = f64::NAN;
            }
        }
        Ok(())
    }

    /// Copy of `field` with land and NaN cells replaced by `fill`.
    pub fn apply_fill(&self, field: &[f64], fill: f64) -> Result<Vec<f64>> {
        self.check(field.len())?;
        Ok(field
            .iter()
            .zip(&self.cells)
            .map(|(&v, &land)| if land || v.is_nan() { fill } else { v })
            .collect())
    }
}
