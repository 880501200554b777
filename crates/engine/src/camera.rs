use foundation::{CameraSpec, EdgeInsets, LatLng, LatLngBounds, ScreenPoint};

/// A camera change understood by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraUpdate {
    NewCameraPosition(CameraSpec),
    NewLatLng(LatLng),
    NewLatLngZoom { target: LatLng, zoom: f64 },
    /// Fit `bounds` into the viewport while keeping clear of the four insets.
    NewLatLngBounds { bounds: LatLngBounds, padding: EdgeInsets },
    ZoomBy { amount: f64, focus: Option<ScreenPoint> },
    ZoomIn,
    ZoomOut,
    ZoomTo(f64),
    BearingTo(f64),
    TiltTo(f64),
    PaddingTo(EdgeInsets),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Finished,
    Cancelled,
}

type Settle = Box<dyn FnOnce(TransitionOutcome) + Send>;

/// Completion handle for one submitted camera transition.
///
/// Exactly one outcome is delivered: `finish` and `cancel` consume the handle,
/// and a handle dropped without either counts as cancelled.
pub struct TransitionCallback {
    settle: Option<Settle>,
}

impl TransitionCallback {
    pub fn new(settle: impl FnOnce(TransitionOutcome) + Send + 'static) -> Self {
        Self {
            settle: Some(Box::new(settle)),
        }
    }

    pub fn finish(mut self) {
        self.fire(TransitionOutcome::Finished);
    }

    pub fn cancel(mut self) {
        self.fire(TransitionOutcome::Cancelled);
    }

    fn fire(&mut self, outcome: TransitionOutcome) {
        if let Some(settle) = self.settle.take() {
            settle(outcome);
        }
    }
}

impl Drop for TransitionCallback {
    fn drop(&mut self) {
        self.fire(TransitionOutcome::Cancelled);
    }
}

impl std::fmt::Debug for TransitionCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionCallback")
            .field("pending", &self.settle.is_some())
            .finish()
    }
}
