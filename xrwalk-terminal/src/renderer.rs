/// Top-down character map of the room
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use xrwalk_core::{HandlerTag, PlayerState, RoomBounds, Walkthrough};

const WALL: char = '#';
const OBSTACLE: char = '%';
const DOOR: char = 'D';
const PLAYER: char = '@';

/// Renders the XZ plane: -Z (the back wall) at the top, +X to the right
pub struct MapRenderer {
    width: usize,
    height: usize,
    char_buffer: Vec<char>,
    /// World extents shown on screen: (min_x, min_z, max_x, max_z)
    view: (f32, f32, f32, f32),
}

impl MapRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            char_buffer: vec![' '; size],
            view: (-1.0, -1.0, 1.0, 1.0),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.char_buffer.fill(' ');
    }

    pub fn cell(&self, col: usize, row: usize) -> char {
        self.char_buffer[row * self.width + col]
    }

    /// Fit the view to the room, including the doorstep outside the entrance
    pub fn fit(&mut self, bounds: &RoomBounds) {
        self.view = (
            -bounds.half_width,
            -bounds.half_depth,
            bounds.half_width,
            bounds.half_depth + bounds.doorstep_depth,
        );
    }

    /// Map a world position to a screen cell, if it is on screen
    pub fn world_to_cell(&self, x: f32, z: f32) -> Option<(usize, usize)> {
        let (min_x, min_z, max_x, max_z) = self.view;
        if self.width == 0 || self.height == 0 || max_x <= min_x || max_z <= min_z {
            return None;
        }
        let u = (x - min_x) / (max_x - min_x);
        let v = (z - min_z) / (max_z - min_z);
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        let col = (u * (self.width - 1) as f32).round() as usize;
        let row = (v * (self.height - 1) as f32).round() as usize;
        Some((col, row))
    }

    fn plot(&mut self, x: f32, z: f32, c: char) {
        if let Some((col, row)) = self.world_to_cell(x, z) {
            self.char_buffer[row * self.width + col] = c;
        }
    }

    /// Fill every cell whose centre lies in the rectangle, or at least the
    /// nearest cell for rectangles thinner than one cell
    fn fill_rect(&mut self, min_x: f32, min_z: f32, max_x: f32, max_z: f32, c: char) {
        let (Some((c0, r0)), Some((c1, r1))) = (
            self.world_to_cell(min_x.max(self.view.0), min_z.max(self.view.1)),
            self.world_to_cell(max_x.min(self.view.2), max_z.min(self.view.3)),
        ) else {
            return;
        };
        for row in r0.min(r1)..=r0.max(r1) {
            for col in c0.min(c1)..=c0.max(c1) {
                self.char_buffer[row * self.width + col] = c;
            }
        }
    }

    pub fn draw_room(&mut self, bounds: &RoomBounds) {
        self.fit(bounds);
        let (hw, hd) = (bounds.half_width, bounds.half_depth);

        self.fill_rect(-hw, -hd, hw, -hd, WALL);
        self.fill_rect(-hw, -hd, -hw, hd, WALL);
        self.fill_rect(hw, -hd, hw, hd, WALL);
        // Front wall, leaving the entrance gap open
        self.fill_rect(-hw, hd, -bounds.entrance_half_width, hd, WALL);
        self.fill_rect(bounds.entrance_half_width, hd, hw, hd, WALL);

        for rect in &bounds.interior {
            self.fill_rect(rect.min_x, rect.min_z, rect.max_x, rect.max_z, OBSTACLE);
        }
    }

    pub fn draw_player(&mut self, player: &PlayerState) {
        let ahead = player.position + player.orientation.forward() * self.cell_size();
        self.plot(ahead.x, ahead.z, facing_glyph(player.orientation.yaw));
        self.plot(player.position.x, player.position.z, PLAYER);
    }

    fn cell_size(&self) -> f32 {
        let (min_x, _, max_x, _) = self.view;
        (max_x - min_x) / self.width.max(1) as f32 * 1.5
    }

    /// Draw walls, interactive surfaces, doors and the player
    pub fn draw_scene(&mut self, walk: &Walkthrough) {
        self.draw_room(walk.bounds());

        let registry = walk.registry();
        for id in registry.ids() {
            let Some(owner) = registry.owner_of(id) else {
                continue;
            };
            let (Some(bounds), Some(tag)) = (registry.node(id).bounds, registry.handler(owner))
            else {
                continue;
            };
            let glyph = match tag {
                HandlerTag::OpenPanel => 'P',
                HandlerTag::ToggleVideo => 'V',
                HandlerTag::OpenLink(_) => 'L',
                // Doors are drawn at their animated position below
                HandlerTag::AnimateDoor => continue,
            };
            self.fill_rect(bounds.min.x, bounds.min.z, bounds.max.x, bounds.max.z, glyph);
        }

        for (name, position) in walk.door_positions() {
            let half = registry
                .find(name)
                .and_then(|id| registry.node(id).bounds)
                .map_or(0.5, |b| (b.max.x - b.min.x) / 2.0);
            self.fill_rect(
                position.x - half,
                position.z,
                position.x + half,
                position.z,
                DOOR,
            );
        }

        self.draw_player(walk.player());
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.char_buffer[y * self.width + x];

                let color = match c {
                    WALL => Color::DarkGrey,
                    OBSTACLE => Color::Grey,
                    DOOR => Color::DarkYellow,
                    PLAYER => Color::Cyan,
                    'P' | 'V' | 'L' => Color::Green,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Arrow for the facing direction; yaw 0 faces up the screen (-Z)
fn facing_glyph(yaw: f32) -> char {
    let turns = (yaw / std::f32::consts::FRAC_PI_2).round() as i32;
    match turns.rem_euclid(4) {
        0 => '^',
        1 => '<',
        2 => 'v',
        _ => '>',
    }
}
