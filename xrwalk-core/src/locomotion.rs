/// Player state and the per-tick locomotion step
use nalgebra::{Point3, Vector3};

use crate::config::WalkConfig;
use crate::input::InputIntent;
use crate::orientation::Orientation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocomotionMode {
    #[default]
    DesktopPointerLock,
    Touch,
    VrController,
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub position: Point3<f32>,
    pub orientation: Orientation,
    /// x is strafe, z is forward; decays by friction each tick
    pub velocity: Vector3<f32>,
    pub sprinting: bool,
    pub mode: LocomotionMode,
}

impl PlayerState {
    pub fn new(position: Point3<f32>, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
            velocity: Vector3::zeros(),
            sprinting: false,
            mode: LocomotionMode::default(),
        }
    }
}

/// Fixed per-tick constants for [`integrate`]
#[derive(Debug, Clone, Copy)]
pub struct StepTuning {
    pub friction: f32,
    pub step_scale: f32,
}

impl From<&WalkConfig> for StepTuning {
    fn from(config: &WalkConfig) -> Self {
        Self {
            friction: config.friction,
            step_scale: config.step_scale,
        }
    }
}

impl Default for StepTuning {
    fn default() -> Self {
        Self::from(&WalkConfig::default())
    }
}

/// Propose a new position and return the velocity for the next tick.
///
/// An axis with input sets its velocity component directly (it is not
/// accumulated); an axis without input keeps last tick's decayed velocity,
/// which gives a short glide after releasing a key. Friction is applied
/// after the move, so it only affects the next tick. This is a deliberate
/// simplification, not physical integration.
///
/// The step is a fixed amount per tick, independent of frame time, so one
/// tick never moves further than `speed * step_scale`.
#[allow(clippy::too_many_arguments)]
pub fn integrate(
    intent: &InputIntent,
    position: Point3<f32>,
    orientation: &Orientation,
    velocity: Vector3<f32>,
    base_speed: f32,
    sprint_multiplier: f32,
    tuning: &StepTuning,
) -> (Point3<f32>, Vector3<f32>) {
    let speed = if intent.sprint {
        base_speed * sprint_multiplier
    } else {
        base_speed
    };

    let mut velocity = velocity;
    if intent.strafe != 0.0 {
        velocity.x = intent.strafe * speed;
    }
    if intent.forward != 0.0 {
        velocity.z = intent.forward * speed;
    }

    let scale = tuning.step_scale;

    let proposed = position
        + orientation.right() * (velocity.x * scale)
        + orientation.forward() * (velocity.z * scale);

    (proposed, velocity * tuning.friction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(forward: f32, strafe: f32, sprint: bool) -> InputIntent {
        InputIntent {
            forward,
            strafe,
            sprint,
            ..InputIntent::default()
        }
    }

    fn step(intent: &InputIntent, velocity: Vector3<f32>) -> (Point3<f32>, Vector3<f32>) {
        integrate(
            intent,
            Point3::origin(),
            &Orientation::zero(),
            velocity,
            1.5,
            1.5,
            &StepTuning::default(),
        )
    }

    #[test]
    fn test_forward_moves_along_negative_z() {
        let (proposed, velocity) = step(&intent(1.0, 0.0, false), Vector3::zeros());
        assert!((proposed.z + 0.15).abs() < 1e-5);
        assert!(proposed.x.abs() < 1e-6);
        // Friction is applied after the move
        assert!((velocity.z - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_sprint_multiplies_speed() {
        let (walk, _) = step(&intent(1.0, 0.0, false), Vector3::zeros());
        let (run, _) = step(&intent(1.0, 0.0, true), Vector3::zeros());
        assert!((run.z / walk.z - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_diagonal_never_faster_than_single_axis() {
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let (straight, _) = step(&intent(1.0, 0.0, true), Vector3::zeros());
        let (diagonal, v) = step(&intent(s, s, true), Vector3::zeros());
        let straight_len = straight.coords.norm();
        assert!(diagonal.coords.norm() <= straight_len + 1e-5);
        // Velocity magnitude bounded by base * sprint (before friction)
        assert!(v.norm() / 0.8 <= 1.5 * 1.5 + 1e-4);
    }

    #[test]
    fn test_released_axis_glides_and_decays() {
        let (_, v1) = step(&intent(1.0, 0.0, false), Vector3::zeros());
        let (p2, v2) = step(&InputIntent::default(), v1);
        assert!(p2.z < 0.0);
        assert!((v2.z - v1.z * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_step_length_is_bounded_per_tick() {
        let tuning = StepTuning::default();
        let (proposed, _) = integrate(
            &intent(0.0, 1.0, true),
            Point3::origin(),
            &Orientation::zero(),
            Vector3::zeros(),
            4.0,
            1.5,
            &tuning,
        );
        // Top slider speed while sprinting: 4 * 1.5 * 0.1
        assert!((proposed.x - 0.6).abs() < 1e-5);
    }
}
