use crate::models::error::CaptureError;
use crate::models::state::EngineState;

/// Event observer for capture engine notifications.
///
/// Methods are called from the acquisition thread (and from the owner's
/// thread for `start`/`stop` transitions). Keep them short: a slow observer
/// delays the next hardware read.
pub trait EngineObserver: Send + Sync {
    /// Called when the engine state changes.
    fn on_state_changed(&self, state: &EngineState);

    /// Called once when acquisition ends with an unrecoverable fault.
    fn on_fault(&self, error: &CaptureError);
}
