/// First-person look orientation
use nalgebra::{Matrix4, Vector3};

/// Keeps the view from flipping over the vertical
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Yaw/pitch orientation (in radians). Yaw 0 looks down -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Orientation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    pub fn zero() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Apply a mouse or touch-drag delta. Positive dx turns right, positive
    /// dy looks down, matching screen coordinates.
    pub fn look(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.yaw -= dx * sensitivity;
        self.pitch = (self.pitch - dy * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Horizontal forward vector, ignoring pitch
    pub fn forward(&self) -> Vector3<f32> {
        Vector3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Horizontal right vector
    pub fn right(&self) -> Vector3<f32> {
        Vector3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    /// Full gaze direction including pitch
    pub fn view_direction(&self) -> Vector3<f32> {
        let cos_pitch = self.pitch.cos();
        Vector3::new(
            -self.yaw.sin() * cos_pitch,
            self.pitch.sin(),
            -self.yaw.cos() * cos_pitch,
        )
    }

    /// Rotation matrix: yaw about Y, then pitch about the local X axis
    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        let ry = Matrix4::new_rotation(Vector3::new(0.0, self.yaw, 0.0));
        let rx = Matrix4::new_rotation(Vector3::new(self.pitch, 0.0, 0.0));
        ry * rx
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::zero()
    }
}
