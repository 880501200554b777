/// A geographic position in degrees.
///
/// Field order is `(latitude, longitude)`. Conversions from GeoJSON-style
/// `[lon, lat]` pairs must go through [`LatLng::from_lon_lat`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn from_lon_lat(longitude: f64, latitude: f64) -> Self {
        Self::new(latitude, longitude)
    }

    /// Component-wise difference `self - origin`, as `(delta_lat, delta_lng)`.
    pub fn delta_from(self, origin: LatLng) -> (f64, f64) {
        (
            self.latitude - origin.latitude,
            self.longitude - origin.longitude,
        )
    }
}

/// Axis-aligned geographic bounds.
///
/// Always normalized so that `south <= north` and `west <= east`; bounds that
/// cross the antimeridian are not represented.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Builds bounds from any two opposite corners.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.latitude.min(b.latitude), a.longitude.min(b.longitude)),
            north_east: LatLng::new(a.latitude.max(b.latitude), a.longitude.max(b.longitude)),
        }
    }

    pub fn south(&self) -> f64 {
        self.south_west.latitude
    }

    pub fn west(&self) -> f64 {
        self.south_west.longitude
    }

    pub fn north(&self) -> f64 {
        self.north_east.latitude
    }

    pub fn east(&self) -> f64 {
        self.north_east.longitude
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south() + self.north()) * 0.5,
            (self.west() + self.east()) * 0.5,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.latitude >= self.south()
            && p.latitude <= self.north()
            && p.longitude >= self.west()
            && p.longitude <= self.east()
    }

    /// Clamps `p` into the bounds.
    pub fn clamp(&self, p: LatLng) -> LatLng {
        LatLng::new(
            p.latitude.clamp(self.south(), self.north()),
            p.longitude.clamp(self.west(), self.east()),
        )
    }
}

/// Four corners of a geo-referenced quad, in top-left, top-right,
/// bottom-right, bottom-left order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLngQuad {
    pub corners: [LatLng; 4],
}

#[cfg(test)]
mod tests {
    use super::{LatLng, LatLngBounds};

    #[test]
    fn bounds_normalize_any_corner_order() {
        let b = LatLngBounds::from_corners(LatLng::new(10.0, 20.0), LatLng::new(-5.0, -30.0));
        assert_eq!(b.south_west, LatLng::new(-5.0, -30.0));
        assert_eq!(b.north_east, LatLng::new(10.0, 20.0));
        assert_eq!(b.center(), LatLng::new(2.5, -5.0));
    }

    #[test]
    fn clamp_keeps_points_inside() {
        let b = LatLngBounds::from_corners(LatLng::new(0.0, 0.0), LatLng::new(10.0, 10.0));
        assert!(b.contains(LatLng::new(5.0, 5.0)));
        assert_eq!(b.clamp(LatLng::new(20.0, -3.0)), LatLng::new(10.0, 0.0));
    }

    #[test]
    fn lon_lat_constructor_swaps_into_lat_lng_order() {
        let p = LatLng::from_lon_lat(13.4, 52.5);
        assert_eq!(p.latitude, 52.5);
        assert_eq!(p.longitude, 13.4);
    }
}
