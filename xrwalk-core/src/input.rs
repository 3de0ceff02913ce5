//! Input state for keyboard, touch joystick and XR controllers.
//!
//! Front ends write raw device state as events arrive; the frame loop calls
//! [`InputState::sample`] once per tick to get a modality-agnostic
//! [`InputIntent`].

use crate::locomotion::LocomotionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Backward,
    Left,
    Right,
    Sprint,
    MediaToggle,
}

const KEY_COUNT: usize = 6;

impl Key {
    /// Map a DOM `KeyboardEvent.code` string
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "KeyW" | "ArrowUp" => Some(Key::Forward),
            "KeyS" | "ArrowDown" => Some(Key::Backward),
            "KeyA" | "ArrowLeft" => Some(Key::Left),
            "KeyD" | "ArrowRight" => Some(Key::Right),
            "ShiftLeft" | "ShiftRight" => Some(Key::Sprint),
            "KeyX" => Some(Key::MediaToggle),
            _ => None,
        }
    }

    const fn index(self) -> usize {
        match self {
            Key::Forward => 0,
            Key::Backward => 1,
            Key::Left => 2,
            Key::Right => 3,
            Key::Sprint => 4,
            Key::MediaToggle => 5,
        }
    }
}

/// Normalized movement intent for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputIntent {
    /// Positive is forward
    pub forward: f32,
    /// Positive is right
    pub strafe: f32,
    pub sprint: bool,
    /// True for exactly one sample after a click, tap or trigger press
    pub interact: bool,
    /// True for exactly one sample after the media key is pressed
    pub media_toggle: bool,
}

impl InputIntent {
    pub fn magnitude(&self) -> f32 {
        (self.forward * self.forward + self.strafe * self.strafe).sqrt()
    }

    pub fn is_moving(&self) -> bool {
        self.forward != 0.0 || self.strafe != 0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Joystick {
    dx: f32,
    dy: f32,
    max_throw: f32,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: [bool; KEY_COUNT],
    joystick: Option<Joystick>,
    xr_grip: bool,
    xr_trigger: bool,
    xr_trigger_was_down: bool,
    pointer_locked: bool,
    interact_pending: bool,
    media_pending: bool,
    dead_zone: f32,
}

impl InputState {
    pub fn new(dead_zone: f32) -> Self {
        Self {
            dead_zone,
            ..Self::default()
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if key == Key::MediaToggle && !self.keys[key.index()] {
            self.media_pending = true;
        }
        self.keys[key.index()] = true;
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys[key.index()] = false;
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys[key.index()]
    }

    /// For front ends that only report presses
    pub fn release_keys(&mut self) {
        self.keys = [false; KEY_COUNT];
    }

    /// Joystick displacement from its centre, in screen pixels (y down)
    pub fn set_joystick(&mut self, dx: f32, dy: f32, max_throw: f32) {
        self.joystick = Some(Joystick { dx, dy, max_throw });
    }

    pub fn release_joystick(&mut self) {
        self.joystick = None;
    }

    /// Polled XR controller buttons for this frame
    pub fn set_xr_buttons(&mut self, grip: bool, trigger: bool) {
        self.xr_grip = grip;
        self.xr_trigger = trigger;
    }

    pub fn set_pointer_locked(&mut self, locked: bool) {
        self.pointer_locked = locked;
    }

    pub fn pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    /// A click or tap; consumed by the next sample
    pub fn press_interact(&mut self) {
        self.interact_pending = true;
    }

    pub fn sample(&mut self, mode: LocomotionMode) -> InputIntent {
        let mut forward = 0.0f32;
        let mut strafe = 0.0f32;
        let mut sprint = false;

        let interact_requested = std::mem::take(&mut self.interact_pending);
        let media_requested = std::mem::take(&mut self.media_pending);
        let trigger_edge = self.xr_trigger && !self.xr_trigger_was_down;
        self.xr_trigger_was_down = self.xr_trigger;

        let keyboard_active = match mode {
            LocomotionMode::DesktopPointerLock => self.pointer_locked,
            LocomotionMode::Touch => false,
            LocomotionMode::VrController => true,
        };

        if keyboard_active {
            forward += axis(self.is_down(Key::Forward), self.is_down(Key::Backward));
            strafe += axis(self.is_down(Key::Right), self.is_down(Key::Left));
            sprint = self.is_down(Key::Sprint);
        }

        if mode == LocomotionMode::Touch {
            if let Some(stick) = self.joystick {
                let (f, s) = stick_axes(stick, self.dead_zone);
                forward += f;
                strafe += s;
            }
        }

        if mode == LocomotionMode::VrController && self.xr_grip {
            forward += 1.0;
        }

        let interact = match mode {
            LocomotionMode::DesktopPointerLock => interact_requested && self.pointer_locked,
            LocomotionMode::Touch => interact_requested,
            LocomotionMode::VrController => interact_requested || trigger_edge,
        };

        let (forward, strafe) = normalize_axes(forward, strafe);
        InputIntent {
            forward,
            strafe,
            sprint,
            interact,
            media_toggle: media_requested && keyboard_active,
        }
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

fn stick_axes(stick: Joystick, dead_zone: f32) -> (f32, f32) {
    if stick.max_throw <= 0.0 {
        return (0.0, 0.0);
    }
    let x = stick.dx / stick.max_throw;
    let y = -stick.dy / stick.max_throw;
    let len = (x * x + y * y).sqrt();
    if len <= dead_zone {
        return (0.0, 0.0);
    }
    let scale = if len > 1.0 { len.recip() } else { 1.0 };
    (y * scale, x * scale)
}

fn normalize_axes(forward: f32, strafe: f32) -> (f32, f32) {
    let forward = forward.clamp(-1.0, 1.0);
    let strafe = strafe.clamp(-1.0, 1.0);
    if forward != 0.0 && strafe != 0.0 {
        let len = (forward * forward + strafe * strafe).sqrt();
        if len > 1.0 {
            return (forward / len, strafe / len);
        }
    }
    (forward, strafe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked() -> InputState {
        let mut input = InputState::new(0.3);
        input.set_pointer_locked(true);
        input
    }

    #[test]
    fn test_diagonal_is_normalized() {
        let mut input = locked();
        input.key_down(Key::Forward);
        input.key_down(Key::Right);
        let intent = input.sample(LocomotionMode::DesktopPointerLock);
        assert!((intent.magnitude() - 1.0).abs() < 1e-6);
        assert!(intent.forward > 0.0 && intent.strafe > 0.0);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut input = locked();
        input.key_down(Key::Left);
        input.key_down(Key::Right);
        let intent = input.sample(LocomotionMode::DesktopPointerLock);
        assert!(!intent.is_moving());
    }

    #[test]
    fn test_keyboard_ignored_without_pointer_lock() {
        let mut input = InputState::new(0.3);
        input.key_down(Key::Forward);
        input.press_interact();
        let intent = input.sample(LocomotionMode::DesktopPointerLock);
        assert!(!intent.is_moving());
        assert!(!intent.interact);

        // The click is dropped, not deferred until lock
        input.set_pointer_locked(true);
        assert!(!input.sample(LocomotionMode::DesktopPointerLock).interact);
    }

    #[test]
    fn test_interact_fires_exactly_once() {
        let mut input = locked();
        input.press_interact();
        assert!(input.sample(LocomotionMode::DesktopPointerLock).interact);
        assert!(!input.sample(LocomotionMode::DesktopPointerLock).interact);
    }

    #[test]
    fn test_media_toggle_edge_ignores_held_repeat() {
        let mut input = locked();
        input.key_down(Key::MediaToggle);
        input.key_down(Key::MediaToggle);
        assert!(input.sample(LocomotionMode::DesktopPointerLock).media_toggle);
        assert!(!input.sample(LocomotionMode::DesktopPointerLock).media_toggle);
    }

    #[test]
    fn test_joystick_dead_zone() {
        let mut input = InputState::new(0.3);
        input.set_joystick(10.0, -20.0, 100.0);
        assert!(!input.sample(LocomotionMode::Touch).is_moving());

        input.set_joystick(0.0, -60.0, 100.0);
        let intent = input.sample(LocomotionMode::Touch);
        assert!((intent.forward - 0.6).abs() < 1e-6);
        assert_eq!(intent.strafe, 0.0);
    }

    #[test]
    fn test_joystick_clamped_to_unit_circle() {
        let mut input = InputState::new(0.3);
        input.set_joystick(300.0, 300.0, 100.0);
        let intent = input.sample(LocomotionMode::Touch);
        assert!(intent.magnitude() <= 1.0 + 1e-6);
        assert!(intent.forward < 0.0 && intent.strafe > 0.0);
    }

    #[test]
    fn test_joystick_only_in_touch_mode() {
        let mut input = locked();
        input.set_joystick(0.0, -100.0, 100.0);
        assert!(!input.sample(LocomotionMode::DesktopPointerLock).is_moving());
    }

    #[test]
    fn test_xr_grip_walks_and_trigger_is_edge() {
        let mut input = InputState::new(0.3);
        input.set_xr_buttons(true, true);
        let first = input.sample(LocomotionMode::VrController);
        assert_eq!(first.forward, 1.0);
        assert!(first.interact);

        input.set_xr_buttons(true, true);
        assert!(!input.sample(LocomotionMode::VrController).interact);

        input.set_xr_buttons(false, false);
        input.sample(LocomotionMode::VrController);
        input.set_xr_buttons(false, true);
        assert!(input.sample(LocomotionMode::VrController).interact);
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_code("ArrowUp"), Some(Key::Forward));
        assert_eq!(Key::from_code("ShiftRight"), Some(Key::Sprint));
        assert_eq!(Key::from_code("KeyQ"), None);
    }
}
