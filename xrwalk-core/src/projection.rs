/// Perspective camera and picking-ray utilities
use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::Ray;
use crate::locomotion::PlayerState;

/// Camera configuration used to turn screen positions into picking rays
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 3.0, 18.0),
            target: Point3::new(0.0, 1.7, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: 75f32.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// First-person camera at the player's eye
    pub fn from_player(player: &PlayerState, aspect: f32) -> Self {
        let position = player.position;
        Self {
            position,
            target: position + player.orientation.view_direction(),
            aspect,
            ..Self::new(1, 1)
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Picking ray from the eye through normalized device coordinates
    /// (-1..1, y up). Returns `None` if the camera matrices are degenerate.
    pub fn ray_from_ndc(&self, ndc_x: f32, ndc_y: f32) -> Option<Ray> {
        let inverse = (self.projection_matrix() * self.view_matrix()).try_inverse()?;
        let near = inverse.transform_point(&Point3::new(ndc_x, ndc_y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc_x, ndc_y, 1.0));
        let direction = far - near;
        if direction.norm_squared() < 1e-12 {
            return None;
        }
        Some(Ray::new(self.position, direction))
    }

    /// Convert a pixel position to normalized device coordinates
    pub fn screen_to_ndc(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
        ((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
