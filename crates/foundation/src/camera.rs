use crate::geo::LatLng;

/// A complete camera pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPosition {
    pub target: LatLng,
    pub zoom: f64,
    /// Degrees clockwise from north.
    pub bearing: f64,
    /// Degrees away from nadir.
    pub tilt: f64,
}

impl Default for CameraPosition {
    fn default() -> Self {
        Self {
            target: LatLng::new(0.0, 0.0),
            zoom: 0.0,
            bearing: 0.0,
            tilt: 0.0,
        }
    }
}

/// A partial camera pose. Unset fields keep their current value when applied.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CameraSpec {
    pub target: Option<LatLng>,
    pub zoom: Option<f64>,
    pub bearing: Option<f64>,
    pub tilt: Option<f64>,
}

impl CameraSpec {
    pub fn apply_to(&self, current: CameraPosition) -> CameraPosition {
        CameraPosition {
            target: self.target.unwrap_or(current.target),
            zoom: self.zoom.unwrap_or(current.zoom),
            bearing: self.bearing.unwrap_or(current.bearing),
            tilt: self.tilt.unwrap_or(current.tilt),
        }
    }
}
