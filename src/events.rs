//! Events from the controller to the display layer.

use listcore::LoadPhase;

/// Notifications emitted by the controller task. A thin adapter owned by the
/// display layer translates these into whatever its list widget expects;
/// range indices are valid at the moment each event is emitted, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    RangeInserted {
        start: usize,
        count: usize,
    },
    RangeRemoved {
        start: usize,
        count: usize,
    },
    RangeMoved {
        from: usize,
        to: usize,
        count: usize,
    },
    /// The whole list was rebuilt; re-render from scratch.
    FullReplace,
    /// The list became empty.
    Cleared,
    /// Fetch phase changed (spinner / end-of-list affordance).
    LoadingChanged(LoadPhase),
    /// A fetch failed. `notice` is a one-line user-visible message, not a
    /// blocking dialog; the phase has already reverted so retry works.
    LoadFailed {
        notice: String,
    },
    /// A search completed (including its bounded auto-retries) with nothing
    /// to show; display an explicit no-results indicator.
    NoResults,
}

impl From<listcore::ListChange> for ControllerEvent {
    fn from(change: listcore::ListChange) -> Self {
        use listcore::ListChange::*;
        match change {
            RangeInserted { start, count } => ControllerEvent::RangeInserted { start, count },
            RangeRemoved { start, count } => ControllerEvent::RangeRemoved { start, count },
            RangeMoved { from, to, count } => ControllerEvent::RangeMoved { from, to, count },
            FullReplace => ControllerEvent::FullReplace,
            Cleared => ControllerEvent::Cleared,
        }
    }
}
