//! Per-lane state machine.
//!
//! [`LaneState`] is the phase of one lane's current unit of work.
//! [`LaneStatus`] stores it in an atomic so the frame producer can check
//! "is this lane busy?" without taking a lock, while worker tasks move the
//! lane through its phases.

use std::sync::atomic::{AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// Lane
// ---------------------------------------------------------------------------

/// An independent processing track.  Lanes share the translation service but
/// nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Text recognition → translate the recognized text.
    Text,
    /// Object detection → translate the top detection's label.
    Object,
}

impl Lane {
    pub fn label(&self) -> &'static str {
        match self {
            Lane::Text => "text",
            Lane::Object => "object",
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// LaneState
// ---------------------------------------------------------------------------

/// Phases of one lane.
///
/// ```text
/// Idle ──frame admitted──▶ Recognizing
///                          ──nothing recognized──▶ Idle
///                          ──text / label found──▶ Translating
///                                                  ──done or failed──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneState {
    /// Waiting for the sampler to admit a frame.
    #[default]
    Idle,
    /// A recognition model is running on the admitted frame.
    Recognizing,
    /// Waiting on the translation service.
    Translating,
}

impl LaneState {
    /// `true` while a unit of work is outstanding.  This is the lane's
    /// in-flight flag.
    ///
    /// ```
    /// use scan_translate::pipeline::LaneState;
    ///
    /// assert!(!LaneState::Idle.is_busy());
    /// assert!(LaneState::Recognizing.is_busy());
    /// assert!(LaneState::Translating.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, LaneState::Idle)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LaneState::Idle => "Idle",
            LaneState::Recognizing => "Recognizing",
            LaneState::Translating => "Translating",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            LaneState::Idle => 0,
            LaneState::Recognizing => 1,
            LaneState::Translating => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => LaneState::Recognizing,
            2 => LaneState::Translating,
            _ => LaneState::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// LaneStatus
// ---------------------------------------------------------------------------

/// Lock-free holder of a [`LaneState`].  All accesses are `SeqCst`.
#[derive(Debug, Default)]
pub struct LaneStatus {
    state: AtomicU8,
}

impl LaneStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> LaneState {
        LaneState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: LaneState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }

    pub fn is_in_flight(&self) -> bool {
        self.get().is_busy()
    }

    /// Move `Idle → Recognizing`.  Returns `false` (and changes nothing) if
    /// the lane was already busy.
    pub fn try_begin(&self) -> bool {
        self.advance(LaneState::Idle, LaneState::Recognizing)
    }

    /// Move `from → to` only if the lane is currently in `from`.
    pub fn advance(&self, from: LaneState, to: LaneState) -> bool {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(LaneState::default(), LaneState::Idle);
        assert_eq!(LaneStatus::new().get(), LaneState::Idle);
    }

    #[test]
    fn labels() {
        assert_eq!(LaneState::Recognizing.label(), "Recognizing");
        assert_eq!(Lane::Object.to_string(), "object");
    }

    #[test]
    fn status_round_trips_every_state() {
        let status = LaneStatus::new();
        for state in [LaneState::Recognizing, LaneState::Translating, LaneState::Idle] {
            status.set(state);
            assert_eq!(status.get(), state);
        }
    }

    #[test]
    fn try_begin_only_from_idle() {
        let status = LaneStatus::new();

        assert!(status.try_begin());
        assert_eq!(status.get(), LaneState::Recognizing);
        assert!(!status.try_begin());

        status.set(LaneState::Translating);
        assert!(!status.try_begin());
        assert!(status.is_in_flight());

        status.set(LaneState::Idle);
        assert!(status.try_begin());
    }

    #[test]
    fn advance_requires_expected_state() {
        let status = LaneStatus::new();

        // A lane reset to Idle underneath a running unit must stay Idle.
        assert!(!status.advance(LaneState::Recognizing, LaneState::Translating));
        assert_eq!(status.get(), LaneState::Idle);

        assert!(status.try_begin());
        assert!(status.advance(LaneState::Recognizing, LaneState::Translating));
        assert_eq!(status.get(), LaneState::Translating);
    }

    #[test]
    fn lane_status_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LaneStatus>();
    }
}
