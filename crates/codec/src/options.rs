use engine::{Gravity, RenderMode, TrackingMode};
use foundation::LatLngBounds;
use serde_json::Value;

use crate::error::CodecError;
use crate::geo::{bounds, pixels};
use crate::value::{as_array, as_f64, opt_bool, opt_i64, opt_str, optional};

/// A partial map configuration. Each field is `None` when the bag did not
/// mention it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapOptions {
    /// `Some(None)` clears previously set bounds.
    pub camera_target_bounds: Option<Option<LatLngBounds>>,
    pub compass_enabled: Option<bool>,
    pub style_string: Option<String>,
    pub min_max_zoom: Option<(Option<f64>, Option<f64>)>,
    pub rotate_gestures: Option<bool>,
    pub scroll_gestures: Option<bool>,
    pub tilt_gestures: Option<bool>,
    pub zoom_gestures: Option<bool>,
    pub track_camera_position: Option<bool>,
    pub my_location_enabled: Option<bool>,
    pub my_location_tracking_mode: Option<TrackingMode>,
    pub my_location_render_mode: Option<RenderMode>,
    /// Device pixels.
    pub logo_margins: Option<(i32, i32)>,
    pub compass_gravity: Option<Gravity>,
    pub compass_margins: Option<(i32, i32)>,
    pub attribution_gravity: Option<Gravity>,
    pub attribution_margins: Option<(i32, i32)>,
}

impl MapOptions {
    pub fn parse(v: &Value, density: f64) -> Result<Self, CodecError> {
        if !v.is_object() {
            return Err(CodecError::wrong_type("options", "a map"));
        }
        let camera_target_bounds = optional(v, "cameraTargetBounds")
            .map(|tb| {
                let items = as_array(tb, "cameraTargetBounds")?;
                match items.first().filter(|b| !b.is_null()) {
                    Some(b) => bounds(b, "cameraTargetBounds").map(Some),
                    None => Ok(None),
                }
            })
            .transpose()?;

        let min_max_zoom = optional(v, "minMaxZoomPreference")
            .map(|z| {
                let items = as_array(z, "minMaxZoomPreference")?;
                let at = |i: usize| {
                    items
                        .get(i)
                        .filter(|x| !x.is_null())
                        .map(|x| as_f64(x, "minMaxZoomPreference"))
                        .transpose()
                };
                Ok::<_, CodecError>((at(0)?, at(1)?))
            })
            .transpose()?;

        let my_location_tracking_mode = opt_i64(v, "myLocationTrackingMode")?
            .map(|code| {
                TrackingMode::from_code(code).ok_or_else(|| {
                    CodecError::out_of_range("myLocationTrackingMode", format!("{code} not in 0..=3"))
                })
            })
            .transpose()?;
        let my_location_render_mode = opt_i64(v, "myLocationRenderMode")?
            .map(|code| {
                RenderMode::from_code(code).ok_or_else(|| {
                    CodecError::out_of_range("myLocationRenderMode", format!("{code} not in 0..=2"))
                })
            })
            .transpose()?;

        Ok(Self {
            camera_target_bounds,
            compass_enabled: opt_bool(v, "compassEnabled")?,
            style_string: opt_str(v, "styleString")?.map(str::to_string),
            min_max_zoom,
            rotate_gestures: opt_bool(v, "rotateGesturesEnabled")?,
            scroll_gestures: opt_bool(v, "scrollGesturesEnabled")?,
            tilt_gestures: opt_bool(v, "tiltGesturesEnabled")?,
            zoom_gestures: opt_bool(v, "zoomGesturesEnabled")?,
            track_camera_position: opt_bool(v, "trackCameraPosition")?,
            my_location_enabled: opt_bool(v, "myLocationEnabled")?,
            my_location_tracking_mode,
            my_location_render_mode,
            logo_margins: margins(v, "logoViewMargins", density)?,
            compass_gravity: opt_i64(v, "compassViewPosition")?.map(Gravity::from_code),
            compass_margins: margins(v, "compassViewMargins", density)?,
            attribution_gravity: opt_i64(v, "attributionButtonPosition")?.map(Gravity::from_code),
            attribution_margins: margins(v, "attributionButtonMargins", density)?,
        })
    }

    /// Overlays the fields set in `newer`.
    pub fn merge(&mut self, newer: MapOptions) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if newer.$field.is_some() {
                    self.$field = newer.$field;
                })*
            };
        }
        overlay!(
            camera_target_bounds,
            compass_enabled,
            style_string,
            min_max_zoom,
            rotate_gestures,
            scroll_gestures,
            tilt_gestures,
            zoom_gestures,
            track_camera_position,
            my_location_enabled,
            my_location_tracking_mode,
            my_location_render_mode,
            logo_margins,
            compass_gravity,
            compass_margins,
            attribution_gravity,
            attribution_margins,
        );
    }
}

fn margins(v: &Value, field: &str, density: f64) -> Result<Option<(i32, i32)>, CodecError> {
    let Some(m) = optional(v, field) else {
        return Ok(None);
    };
    match as_array(m, field)? {
        [x, y, ..] => Ok(Some((pixels(x, field, density)?, pixels(y, field, density)?))),
        _ => Err(CodecError::wrong_type(field, "an [x, y] pair")),
    }
}
