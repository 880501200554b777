//! Spherical web-mercator helpers.
//!
//! World pixel coordinates grow east (x) and south (y); the world is
//! `TILE_SIZE * 2^zoom` pixels wide at a given zoom.

use crate::geo::LatLng;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

/// Tile edge length used for world pixel scaling.
pub const TILE_SIZE: f64 = 512.0;

/// Latitude limit of the square mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Projects a geographic position to world pixels at `zoom`.
pub fn project(p: LatLng, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = p.latitude.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (p.longitude + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) * 0.5 * size;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lon)
}

/// Ground resolution at `latitude` for `zoom`.
pub fn meters_per_pixel(latitude: f64, zoom: f64) -> f64 {
    let circumference = 2.0 * std::f64::consts::PI * WGS84_A;
    latitude.to_radians().cos() * circumference / world_size(zoom)
}
