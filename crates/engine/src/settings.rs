use foundation::{EdgeInsets, LatLng};

/// Corner an ornament (compass, attribution button) is pinned to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Gravity {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Gravity {
    /// Host wire code; unknown codes fall back to top-right.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::TopLeft,
            1 => Self::TopRight,
            2 => Self::BottomLeft,
            3 => Self::BottomRight,
            _ => Self::TopRight,
        }
    }

    /// Maps an `(x, y)` margin onto the two edges adjacent to this corner.
    pub fn margins(self, x: i32, y: i32) -> EdgeInsets {
        match self {
            Self::TopLeft => EdgeInsets::new(x, y, 0, 0),
            Self::TopRight => EdgeInsets::new(0, y, x, 0),
            Self::BottomLeft => EdgeInsets::new(x, 0, 0, y),
            Self::BottomRight => EdgeInsets::new(0, 0, x, y),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureKind {
    Rotate,
    Scroll,
    Tilt,
    Zoom,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UiSetting {
    CompassEnabled(bool),
    CompassGravity(Gravity),
    CompassMargins(EdgeInsets),
    LogoMargins(EdgeInsets),
    AttributionGravity(Gravity),
    AttributionMargins(EdgeInsets),
    Gesture(GestureKind, bool),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TrackingMode {
    #[default]
    None,
    Tracking,
    TrackingCompass,
    TrackingGps,
}

impl TrackingMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Tracking),
            2 => Some(Self::TrackingCompass),
            3 => Some(Self::TrackingGps),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Tracking => 1,
            Self::TrackingCompass => 2,
            Self::TrackingGps => 3,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Normal,
    Compass,
    Gps,
}

impl RenderMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Compass),
            2 => Some(Self::Gps),
            _ => None,
        }
    }
}

/// A device location fix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Location {
    pub position: LatLng,
    pub altitude: f64,
    pub speed: f64,
    pub bearing: f64,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::{Gravity, TrackingMode};
    use foundation::EdgeInsets;

    #[test]
    fn margins_follow_gravity_corner() {
        assert_eq!(Gravity::TopLeft.margins(4, 8), EdgeInsets::new(4, 8, 0, 0));
        assert_eq!(Gravity::BottomRight.margins(4, 8), EdgeInsets::new(0, 0, 4, 8));
        assert_eq!(Gravity::from_code(42), Gravity::TopRight);
    }

    #[test]
    fn tracking_mode_codes_round_trip() {
        for code in 0..4 {
            assert_eq!(TrackingMode::from_code(code).map(TrackingMode::code), Some(code));
        }
        assert_eq!(TrackingMode::from_code(4), None);
    }
}
