//! Screen fetch lifecycle.

/// Fetch phase of one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Loading,
    Refreshing,
    Ready,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Refreshing => "refreshing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// Whether a fetch is in flight.
    pub fn is_fetching(self) -> bool {
        matches!(self, Self::Loading | Self::Refreshing)
    }
}

/// Event that may start a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Mount,
    PullToRefresh,
    FocusRegained,
    Retry,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::PullToRefresh => "pull_to_refresh",
            Self::FocusRegained => "focus_regained",
            Self::Retry => "retry",
        }
    }
}

/// Phase entered when `trigger` fires in `phase`; `None` means ignored.
///
/// | from  | trigger                        | to         |
/// |-------|--------------------------------|------------|
/// | Idle  | Mount                          | Loading    |
/// | Ready | PullToRefresh, FocusRegained   | Refreshing |
/// | Error | Retry, PullToRefresh           | Loading    |
pub fn next_phase(phase: Phase, trigger: Trigger) -> Option<Phase> {
    match (phase, trigger) {
        (Phase::Idle, Trigger::Mount) => Some(Phase::Loading),
        (Phase::Ready, Trigger::PullToRefresh | Trigger::FocusRegained) => {
            Some(Phase::Refreshing)
        }
        (Phase::Error, Trigger::Retry | Trigger::PullToRefresh) => Some(Phase::Loading),
        _ => None,
    }
}
