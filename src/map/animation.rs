use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::data::RecordId;

/// Length of the hover enlarge/shrink transition
pub const HOVER_DURATION: Duration = Duration::from_millis(200);

/// Cubic ease-in-out over t in [0, 1]
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Interpolation of a hover amount between two values
#[derive(Clone, Copy, Debug)]
pub struct Transition {
    from: f64,
    to: f64,
    started: Instant,
}

impl Transition {
    pub fn new(from: f64, to: f64, started: Instant) -> Self {
        Self { from, to, started }
    }

    fn progress(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started);
        elapsed.as_secs_f64() / HOVER_DURATION.as_secs_f64()
    }

    pub fn amount(&self, now: Instant) -> f64 {
        self.from + (self.to - self.from) * ease_cubic_in_out(self.progress(now))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Which marker the pointer is over, plus the transitions still running for
/// markers it has entered or left. Keyed by record so one handler serves
/// every marker.
#[derive(Debug, Default)]
pub struct HoverState {
    current: Option<RecordId>,
    transitions: HashMap<RecordId, Transition>,
}

impl HoverState {
    pub fn hovered(&self) -> Option<RecordId> {
        self.current
    }

    /// Move the hover to `id` (or to nothing). The previous marker animates
    /// back, the new one animates up, each from wherever it currently is.
    pub fn set_hovered(&mut self, id: Option<RecordId>, now: Instant) {
        if id == self.current {
            return;
        }
        if let Some(old) = self.current {
            self.start(old, 0.0, now);
        }
        if let Some(new) = id {
            self.start(new, 1.0, now);
        }
        self.current = id;
    }

    fn start(&mut self, id: RecordId, to: f64, now: Instant) {
        let from = self.amount(id, now);
        self.transitions.insert(id, Transition::new(from, to, now));
    }

    /// Hover amount in [0, 1] for a marker
    pub fn amount(&self, id: RecordId, now: Instant) -> f64 {
        self.transitions.get(&id).map_or(0.0, |t| t.amount(now))
    }

    /// Drop transitions that have settled back to rest
    pub fn tick(&mut self, now: Instant) {
        self.transitions
            .retain(|_, t| !(t.is_finished(now) && t.to == 0.0));
    }

    /// True while any transition is still moving
    pub fn is_animating(&self, now: Instant) -> bool {
        self.transitions.values().any(|t| !t.is_finished(now))
    }
}
