/// Geographic and projected coordinate types.
/// All coordinate math uses f64 for precision.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point on the ellipsoid in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Convert to radians.
    pub fn to_radians(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lon.to_radians())
    }
}

/// A point in a planar metric frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        self.distance2_to(other).sqrt()
    }

    #[inline]
    pub fn distance2_to(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Shift by a constant offset.
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}

// ── UTM ───────────────────────────────────────────────────────────────────────

/// WGS84 semi-major axis (m).
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central scale factor.
pub const UTM_K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// UTM zone (1–60) containing longitude `lon`.
pub fn auto_utm_zone(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// Central meridian (degrees) of a UTM zone.
pub fn utm_central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

/// Transverse Mercator projection on WGS84 in a fixed UTM zone.
///
/// Uses the Snyder (1987, USGS PP 1395, §8) series, accurate to well below a
/// metre within the zone, which is ample for radius searches of kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmProjection {
    pub zone: u8,
    pub north: bool,
}

impl UtmProjection {
    pub fn new(zone: u8, north: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(Error::Projection(format!("UTM zone {zone} out of range (1-60)")));
        }
        Ok(Self { zone, north })
    }

    /// Zone and hemisphere of the given point.
    pub fn for_point(ll: LatLon) -> Self {
        Self {
            zone: auto_utm_zone(ll.lon),
            north: ll.lat >= 0.0,
        }
    }

    pub fn central_meridian(&self) -> f64 {
        utm_central_meridian(self.zone)
    }

    /// EPSG code of this zone on WGS84 (326xx north, 327xx south).
    pub fn epsg(&self) -> u32 {
        (if self.north { 32600 } else { 32700 }) + u32::from(self.zone)
    }

    /// Geographic → (easting, northing) in metres.
    ///
    /// Errors when the latitude is outside the UTM domain (−80°, 84°).
    pub fn forward(&self, lon: f64, lat: f64) -> Result<Point2D> {
        if !(-80.0..=84.0).contains(&lat) || !lon.is_finite() {
            return Err(Error::Projection(format!(
                "({lon}, {lat}) outside UTM domain (latitude -80..84)"
            )));
        }
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let dlam = (lon - self.central_meridian()).to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = sin_phi / cos_phi;

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = dlam * cos_phi;
        let m = meridian_arc(phi, e2);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = UTM_K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);
        let y = UTM_K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        let northing = if self.north { y } else { y + FALSE_NORTHING_SOUTH };
        Ok(Point2D::new(x + FALSE_EASTING, northing))
    }

    /// (easting, northing) in metres → geographic (lon, lat) in degrees.
    pub fn inverse(&self, easting: f64, northing: f64) -> LatLon {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);
        let x = easting - FALSE_EASTING;
        let y = if self.north { northing } else { northing - FALSE_NORTHING_SOUTH };

        let m = y / UTM_K0;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sq = (1.0 - e2).sqrt();
        let e1 = (1.0 - sq) / (1.0 + sq);

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = sin1 / cos1;
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = WGS84_A / w.sqrt();
        let r1 = WGS84_A * (1.0 - e2) / w.powf(1.5);
        let d = x / (n1 * UTM_K0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d6
                        / 720.0);
        let dlam = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5 / 120.0)
            / cos1;

        LatLon::new(phi.to_degrees(), self.central_meridian() + dlam.to_degrees())
    }

    /// Project a batch of (lon, lat) pairs.
    pub fn forward_all(&self, lonlat: &[(f64, f64)]) -> Result<Vec<Point2D>> {
        lonlat.iter().map(|&(lon, lat)| self.forward(lon, lat)).collect()
    }
}

/// Meridian arc length from the equator to latitude `phi` (radians).
fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_for_wadden_sea() {
        assert_eq!(auto_utm_zone(4.8), 31);
        assert_eq!(auto_utm_zone(6.1), 32);
        assert_eq!(utm_central_meridian(31), 3.0);
        assert_eq!(auto_utm_zone(-180.0), 1);
        assert_eq!(auto_utm_zone(180.0), 60);
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let utm = UtmProjection::new(31, true).unwrap();
        let p = utm.forward(3.0, 0.0).unwrap();
        assert!((p.x - 500_000.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);

        let p = utm.forward(3.0, 53.0).unwrap();
        assert!((p.x - 500_000.0).abs() < 1e-6);
        // Meridian arc to 53°N ≈ 5 873 km, scaled by k0.
        assert!(p.y > 5_860_000.0 && p.y < 5_880_000.0, "northing {}", p.y);
    }

    #[test]
    fn eastings_symmetric_about_central_meridian() {
        let utm = UtmProjection::new(31, true).unwrap();
        let e = utm.forward(4.5, 53.2).unwrap();
        let w = utm.forward(1.5, 53.2).unwrap();
        assert!(((e.x - 500_000.0) + (w.x - 500_000.0)).abs() < 1e-6);
        assert!((e.y - w.y).abs() < 1e-6);
    }

    #[test]
    fn roundtrip_within_tolerance() {
        let utm = UtmProjection::new(31, true).unwrap();
        let mut rng_state: u64 = 7;
        for _ in 0..500 {
            // LCG for deterministic pseudo-random
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let lat = 50.0 + (rng_state as f64 / u64::MAX as f64) * 6.0;
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let lon = 0.5 + (rng_state as f64 / u64::MAX as f64) * 5.0;

            let p = utm.forward(lon, lat).unwrap();
            let back = utm.inverse(p.x, p.y);
            assert!((back.lat - lat).abs() < 1e-6, "lat {lat} -> {}", back.lat);
            assert!((back.lon - lon).abs() < 1e-6, "lon {lon} -> {}", back.lon);
        }
    }

    #[test]
    fn metric_distance_is_plausible() {
        // 0.01° of latitude is ~1.11 km.
        let utm = UtmProjection::new(31, true).unwrap();
        let a = utm.forward(4.0, 53.00).unwrap();
        let b = utm.forward(4.0, 53.01).unwrap();
        let d = a.distance_to(&b);
        assert!((d - 1112.0).abs() < 10.0, "d = {d}");
    }

    #[test]
    fn southern_hemisphere_adds_false_northing() {
        let utm = UtmProjection::new(56, false).unwrap();
        let p = utm.forward(151.0, -33.9).unwrap();
        assert!(p.y > 6_000_000.0);
        let back = utm.inverse(p.x, p.y);
        assert!((back.lat + 33.9).abs() < 1e-6);
        assert_eq!(utm.epsg(), 32756);
    }

    #[test]
    fn out_of_domain_is_error() {
        let utm = UtmProjection::new(31, true).unwrap();
        assert!(utm.forward(3.0, 85.0).is_err());
        assert!(UtmProjection::new(0, true).is_err());
        assert!(UtmProjection::new(61, true).is_err());
    }
}
