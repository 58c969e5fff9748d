//! Single-band GeoTIFF of mud fraction, sampled at grid cell centres.
//!
//! Georeferencing comes from the `ModelPixelScale` and `ModelTiepoint` tags
//! (north-up rasters only); `GDAL_NODATA` marks missing pixels. The raster's
//! coordinate system is not read from the GeoKey directory and must be given.
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::{debug, info};

use crate::coords::{Point2D, UtmProjection};
use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::interpolate::map_points;

/// Coordinate system of a raster's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RasterCrs {
    /// WGS84 longitude/latitude (EPSG:4326).
    #[default]
    Geographic,
    Utm { zone: u8, north: bool },
}

impl RasterCrs {
    /// Position of (lon, lat) in this CRS.
    pub fn project(&self, lon: f64, lat: f64) -> Result<Point2D> {
        match *self {
            RasterCrs::Geographic => Ok(Point2D::new(lon, lat)),
            RasterCrs::Utm { zone, north } => UtmProjection::new(zone, north)?.forward(lon, lat),
        }
    }
}

impl fmt::Display for RasterCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterCrs::Geographic => f.write_str("geographic"),
            RasterCrs::Utm { zone, north } => write!(f, "utm:{zone}{}", if *north { 'N' } else { 'S' }),
        }
    }
}

impl FromStr for RasterCrs {
    type Err = Error;

    /// Accepts `geographic`, `wgs84`, `epsg:4326`, `utm:31N`, `utm:31s`,
    /// `epsg:326zz` and `epsg:327zz`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let bad = || Error::InvalidConfig(format!("unrecognised raster CRS '{s}'"));
        match lower.as_str() {
            "geographic" | "wgs84" | "epsg:4326" => return Ok(RasterCrs::Geographic),
            _ => {}
        }
        if let Some(rest) = lower.strip_prefix("utm:").filter(|r| r.is_ascii()) {
            let (digits, hemi) = rest.split_at(rest.len().saturating_sub(1));
            let north = match hemi {
                "n" => true,
                "s" => false,
                _ => return Err(bad()),
            };
            let zone: u8 = digits.parse().map_err(|_| bad())?;
            UtmProjection::new(zone, north)?;
            return Ok(RasterCrs::Utm { zone, north });
        }
        if let Some(code) = lower.strip_prefix("epsg:") {
            let code: u32 = code.parse().map_err(|_| bad())?;
            let (north, zone) = match code {
                32601..=32660 => (true, code - 32600),
                32701..=32760 => (false, code - 32700),
                _ => return Err(bad()),
            };
            return Ok(RasterCrs::Utm { zone: zone as u8, north });
        }
        Err(bad())
    }
}

/// North-up affine georeference: pixel (row, col) has its top-left corner at
/// (origin_x + col·pixel_width, origin_y − row·pixel_height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Pixel containing `p`, as fractional (row, col) floors; may be out of range.
    pub fn pixel_of(&self, p: Point2D) -> (f64, f64) {
        let col = ((p.x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - p.y) / self.pixel_height).floor();
        (row, col)
    }

    /// Centre of pixel (row, col).
    pub fn centre_of(&self, row: usize, col: usize) -> Point2D {
        Point2D::new(
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    /// Row-major, row 0 at the top.
    pub data: Vec<f64>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    pub crs: RasterCrs,
}

impl Raster {
    pub fn new(width: usize, height: usize, data: Vec<f64>, transform: GeoTransform, crs: RasterCrs) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::ShapeMismatch {
                what: "raster data".into(),
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            nodata: None,
            crs,
        })
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Read a single-band GeoTIFF.
    pub fn open(path: &Path, crs: RasterCrs) -> Result<Self> {
        let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
        let (w, h) = decoder.dimensions()?;
        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(Error::Unsupported(format!("raster colour type {other:?} (expected one band)")));
            }
        }

        let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag)?;
        let tie = decoder.get_tag_f64_vec(Tag::ModelTiepointTag)?;
        if scale.len() < 2 || tie.len() < 6 {
            return Err(Error::Unsupported("raster lacks a usable pixel scale / tiepoint".into()));
        }
        // Tiepoint (I, J, K, X, Y, Z): raster point (I, J) sits at model (X, Y).
        let transform = GeoTransform {
            origin_x: tie[3] - tie[0] * scale[0],
            origin_y: tie[4] + tie[1] * scale[1],
            pixel_width: scale[0],
            pixel_height: scale[1],
        };

        let nodata = match decoder.find_tag(Tag::GdalNodata)? {
            Some(v) => v
                .into_string()
                .ok()
                .and_then(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse::<f64>().ok()),
            None => None,
        };

        let data: Vec<f64> = match decoder.read_image()? {
            DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F64(v) => v,
            DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
            _ => return Err(Error::Unsupported("64-bit integer raster samples".into())),
        };

        let mut raster = Self::new(w as usize, h as usize, data, transform, crs)?;
        raster.nodata = nodata;
        info!(
            width = raster.width,
            height = raster.height,
            crs = %crs,
            path = %path.display(),
            "loaded raster"
        );
        debug!(?transform, ?nodata, "raster georeference");
        Ok(raster)
    }

    /// Write as a single-band f32 GeoTIFF carrying pixel scale, tiepoint and nodata.
    pub fn write_geotiff(&self, path: &Path) -> Result<()> {
        let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
        let mut image = encoder.new_image::<colortype::Gray32Float>(self.width as u32, self.height as u32)?;
        let t = &self.transform;
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[t.pixel_width, t.pixel_height, 0.0][..])?;
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0][..])?;
        if let Some(nd) = self.nodata {
            image.encoder().write_tag(Tag::GdalNodata, nd.to_string().as_str())?;
        }
        let pixels: Vec<f32> = self.data.iter().map(|&v| v as f32).collect();
        image.write_data(&pixels)?;
        Ok(())
    }

    #[inline]
    fn is_missing(&self, v: f64) -> bool {
        !v.is_finite() || self.nodata.is_some_and(|nd| v == nd || (v as f32) == (nd as f32))
    }

    /// Nearest-pixel value at (lon, lat); NaN outside the raster, at nodata,
    /// or where the point cannot be projected into the raster CRS.
    pub fn sample_at(&self, lon: f64, lat: f64) -> f64 {
        let Ok(p) = self.crs.project(lon, lat) else {
            return f64::NAN;
        };
        let (row, col) = self.transform.pixel_of(p);
        if !(row >= 0.0 && col >= 0.0 && row < self.height as f64 && col < self.width as f64) {
            return f64::NAN;
        }
        let v = self.data[row as usize * self.width + col as usize];
        if self.is_missing(v) {
            f64::NAN
        } else {
            v
        }
    }

    /// Sample every grid cell centre.
    pub fn sample_grid(&self, grid: &Grid) -> Vec<f64> {
        let centres: Vec<Point2D> = grid.centres().map(|(lon, lat)| Point2D::new(lon, lat)).collect();
        let out = map_points(&centres, |p| self.sample_at(p.x, p.y));
        debug!(
            sampled = out.iter().filter(|v| v.is_finite()).count(),
            cells = out.len(),
            "raster sampled at cell centres"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geographic() -> Raster {
        // 3 x 2 pixels of 0.1°, top-left corner at (4.0 E, 53.2 N)
        let t = GeoTransform {
            origin_x: 4.0,
            origin_y: 53.2,
            pixel_width: 0.1,
            pixel_height: 0.1,
        };
        Raster::new(3, 2, vec![10.0, 20.0, 30.0, 40.0, -9999.0, 60.0], t, RasterCrs::Geographic)
            .unwrap()
            .with_nodata(-9999.0)
    }

    #[test]
    fn nearest_pixel_lookup() {
        let r = geographic();
        assert_eq!(r.sample_at(4.05, 53.15), 10.0);
        assert_eq!(r.sample_at(4.25, 53.15), 30.0);
        assert_eq!(r.sample_at(4.05, 53.05), 40.0);
        assert_eq!(r.sample_at(4.29, 53.01), 60.0);
    }

    #[test]
    fn outside_and_nodata_are_nan() {
        let r = geographic();
        assert!(r.sample_at(3.99, 53.1).is_nan());
        assert!(r.sample_at(4.05, 53.25).is_nan());
        assert!(r.sample_at(4.35, 53.1).is_nan());
        assert!(r.sample_at(4.15, 53.05).is_nan());
    }

    #[test]
    fn sample_grid_follows_cells() {
        let r = geographic();
        let g = Grid::regular(2, 2, 4.05, 53.05, 0.2, 0.1, 5.0);
        let v = r.sample_grid(&g);
        assert_eq!(v[0], 40.0);
        assert_eq!(v[1], 60.0);
        assert_eq!(v[2], 10.0);
        assert_eq!(v[3], 30.0);
    }

    #[test]
    fn utm_raster_is_sampled_through_projection() {
        let proj = UtmProjection::new(31, true).unwrap();
        let c = proj.forward(4.5, 53.3).unwrap();
        let t = GeoTransform {
            origin_x: c.x - 500.0,
            origin_y: c.y + 500.0,
            pixel_width: 500.0,
            pixel_height: 500.0,
        };
        let r = Raster::new(2, 2, vec![1.0, 2.0, 3.0, 4.0], t, RasterCrs::Utm { zone: 31, north: true }).unwrap();
        let centre = t.centre_of(1, 1);
        assert!((centre.x - (c.x + 250.0)).abs() < 1e-9);
        let back = proj.inverse(centre.x, centre.y);
        assert_eq!(r.sample_at(back.lon, back.lat), 4.0);
        assert!(r.sample_at(4.5, 54.0).is_nan());
    }

    #[test]
    fn crs_parsing() {
        assert_eq!("geographic".parse::<RasterCrs>().unwrap(), RasterCrs::Geographic);
        assert_eq!("EPSG:4326".parse::<RasterCrs>().unwrap(), RasterCrs::Geographic);
        assert_eq!("utm:31N".parse::<RasterCrs>().unwrap(), RasterCrs::Utm { zone: 31, north: true });
        assert_eq!("epsg:32732".parse::<RasterCrs>().unwrap(), RasterCrs::Utm { zone: 32, north: false });
        assert!("utm:99N".parse::<RasterCrs>().is_err());
        assert!("lambert".parse::<RasterCrs>().is_err());
        assert_eq!(RasterCrs::Utm { zone: 31, north: true }.to_string(), "utm:31N");
    }

    #[test]
    fn geotiff_roundtrip_keeps_georeference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mud.tif");
        let r = geographic();
        r.write_geotiff(&path).unwrap();
        let back = Raster::open(&path, RasterCrs::Geographic).unwrap();
        assert_eq!((back.width, back.height), (3, 2));
        assert_eq!(back.nodata, Some(-9999.0));
        assert!((back.transform.origin_x - 4.0).abs() < 1e-12);
        assert!((back.transform.origin_y - 53.2).abs() < 1e-12);
        assert_eq!(back.sample_at(4.25, 53.15), 30.0);
        assert!(back.sample_at(4.15, 53.05).is_nan());
    }
}
