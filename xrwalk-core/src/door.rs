/// Time-based sliding door animation
use nalgebra::Point3;
use tracing::debug;

/// Length of every transition, in seconds
pub const DOOR_DURATION: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Debug, Clone)]
pub struct DoorAnimator {
    state: DoorState,
    closed_position: Point3<f32>,
    open_position: Point3<f32>,
    position: Point3<f32>,
    start_time: f64,
    start_position: Point3<f32>,
}

impl DoorAnimator {
    pub fn new(closed_position: Point3<f32>, open_position: Point3<f32>) -> Self {
        Self {
            state: DoorState::Closed,
            closed_position,
            open_position,
            position: closed_position,
            start_time: 0.0,
            start_position: closed_position,
        }
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, DoorState::Opening | DoorState::Closing)
    }

    /// Start opening or closing. Ignored while a transition is running;
    /// returns whether a transition started.
    pub fn trigger(&mut self, now: f64) -> bool {
        let next = match self.state {
            DoorState::Closed => DoorState::Opening,
            DoorState::Open => DoorState::Closing,
            DoorState::Opening | DoorState::Closing => return false,
        };
        debug!(from = ?self.state, to = ?next, "door triggered");
        self.state = next;
        self.start_time = now;
        self.start_position = self.position;
        true
    }

    /// Advance the animation to `now` and return the door position
    pub fn update(&mut self, now: f64) -> Point3<f32> {
        let (target, terminal) = match self.state {
            DoorState::Opening => (self.open_position, DoorState::Open),
            DoorState::Closing => (self.closed_position, DoorState::Closed),
            DoorState::Closed | DoorState::Open => return self.position,
        };

        let progress = ((now - self.start_time) / DOOR_DURATION).clamp(0.0, 1.0);
        if progress >= 1.0 {
            // Land exactly on the target so repeated cycles never drift
            self.position = target;
            self.state = terminal;
            debug!(state = ?terminal, "door settled");
        } else {
            let eased = ease_out_cubic(progress) as f32;
            self.position = self.start_position + (target - self.start_position) * eased;
        }
        self.position
    }
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}
