/// Whole-step collision against the room's walls
use nalgebra::Point3;
use tracing::trace;

use crate::geometry::Rect;

/// Static walkable bounds of the room, centred on the origin. The front
/// wall sits at `z = +half_depth` and has an entrance gap around `x = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomBounds {
    pub half_width: f32,
    pub half_depth: f32,
    pub wall_thickness: f32,
    pub player_radius: f32,
    pub entrance_half_width: f32,
    /// How far past the front wall the player may walk through the gap.
    /// Zero keeps the room closed.
    pub doorstep_depth: f32,
    /// Interior wall footprints, grown by the padding when tested
    pub interior: Vec<Rect>,
}

impl RoomBounds {
    pub fn new(width: f32, depth: f32, wall_thickness: f32) -> Self {
        Self {
            half_width: width / 2.0,
            half_depth: depth / 2.0,
            wall_thickness,
            player_radius: 0.3,
            entrance_half_width: width / 6.0,
            doorstep_depth: 0.0,
            interior: Vec::new(),
        }
    }

    pub fn padding(&self) -> f32 {
        self.player_radius + self.wall_thickness / 2.0
    }

    /// True when a player centred at (x, z) overlaps no wall
    pub fn is_walkable(&self, x: f32, z: f32) -> bool {
        let pad = self.padding();

        if x.abs() > self.half_width - pad {
            return false;
        }
        if z < -self.half_depth + pad || z > self.half_depth + self.doorstep_depth - pad {
            return false;
        }
        if (z - self.half_depth).abs() < pad && x.abs() > self.entrance_half_width {
            return false;
        }
        !self.interior.iter().any(|rect| rect.grow(pad).contains(x, z))
    }
}

/// Accept the proposed position, or snap back to the previous one if any
/// part of it collides. There is no sliding along walls.
pub fn resolve(
    previous: Point3<f32>,
    proposed: Point3<f32>,
    bounds: &RoomBounds,
) -> Point3<f32> {
    if bounds.is_walkable(proposed.x, proposed.z) {
        proposed
    } else {
        trace!(x = proposed.x, z = proposed.z, "move rejected");
        previous
    }
}
