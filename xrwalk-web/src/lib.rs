/// xrwalk Web - WASM bridge between the browser scene and the walkthrough loop
///
/// The page owns rendering, WebXR and DOM panels. It forwards input events
/// here, calls `tick` from its animation loop, and applies the returned
/// player position, door positions and handler tags to the scene.

use nalgebra::{Point3, Vector3};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use xrwalk_core::{
    parse_scene, Camera, FrameReport, HandlerTag, Key, LocomotionMode, Ray, WalkConfig,
    Walkthrough, DEFAULT_SCENE,
};

#[wasm_bindgen]
pub struct WebWalkthrough {
    walk: Walkthrough,
    /// Picking ray for the next tick, if the last click was not at the centre
    pending_ray: Option<Ray>,
    last_report: Option<FrameReport>,
}

#[wasm_bindgen]
impl WebWalkthrough {
    /// Build from a scene layout and a JSON config; empty strings select the
    /// built-in café and default tuning
    #[wasm_bindgen(constructor)]
    pub fn new(scene: &str, config_json: &str) -> Result<WebWalkthrough, JsValue> {
        let scene = if scene.trim().is_empty() { DEFAULT_SCENE } else { scene };
        let layout = parse_scene(scene).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let config = if config_json.trim().is_empty() {
            WalkConfig::default()
        } else {
            WalkConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };

        Ok(WebWalkthrough {
            walk: Walkthrough::new(layout, config),
            pending_ray: None,
            last_report: None,
        })
    }

    /// `KeyboardEvent.code` of a keydown
    pub fn key_down(&mut self, code: &str) {
        if let Some(key) = Key::from_code(code) {
            self.walk.input_mut().key_down(key);
        }
    }

    pub fn key_up(&mut self, code: &str) {
        if let Some(key) = Key::from_code(code) {
            self.walk.input_mut().key_up(key);
        }
    }

    pub fn set_pointer_locked(&mut self, locked: bool) {
        self.walk.input_mut().set_pointer_locked(locked);
    }

    /// 0 = desktop pointer lock, 1 = touch, 2 = VR controller
    pub fn set_mode(&mut self, mode: u8) {
        self.walk.set_mode(mode_from_index(mode));
    }

    pub fn set_base_speed(&mut self, speed: f32) -> f32 {
        self.walk.set_base_speed(speed)
    }

    /// Mouse movement or touch drag, in pixels
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.walk.look(dx, dy);
    }

    pub fn set_joystick(&mut self, dx: f32, dy: f32, max_throw: f32) {
        self.walk.input_mut().set_joystick(dx, dy, max_throw);
    }

    pub fn release_joystick(&mut self) {
        self.walk.input_mut().release_joystick();
    }

    /// Polled gamepad buttons of the active XR controller
    pub fn set_xr_buttons(&mut self, grip: bool, trigger: bool) {
        self.walk.input_mut().set_xr_buttons(grip, trigger);
    }

    /// Click or tap at a screen position. Ignored while the pointer is
    /// unlocked on desktop.
    pub fn click(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        if self.walk.player().mode == LocomotionMode::DesktopPointerLock
            && !self.walk.input_mut().pointer_locked()
            && !pointer_lock_active()
        {
            info!("pointer is not locked, click ignored");
            return;
        }
        let (ndc_x, ndc_y) = Camera::screen_to_ndc(x, y, width, height);
        let camera = Camera::from_player(self.walk.player(), width / height);
        self.pending_ray = camera.ray_from_ndc(ndc_x, ndc_y);
        self.walk.input_mut().press_interact();
    }

    /// Controller pose for picking on the next trigger edge
    pub fn set_controller_ray(&mut self, ox: f32, oy: f32, oz: f32, dx: f32, dy: f32, dz: f32) {
        let direction = Vector3::new(dx, dy, dz);
        if direction.norm_squared() > 0.0 {
            self.pending_ray = Some(Ray::new(Point3::new(ox, oy, oz), direction));
        }
    }

    /// Advance one frame. Returns the handler tag to perform, if any; links
    /// are opened here directly.
    pub fn tick(&mut self, now_seconds: f64) -> Option<String> {
        let ray = match self.walk.player().mode {
            // Controller rays stay valid until the next pose update
            LocomotionMode::VrController => self.pending_ray,
            _ => self.pending_ray.take(),
        };
        let report = self.walk.tick(now_seconds, ray);
        let result = report.interaction.as_ref().map(|interaction| {
            if let HandlerTag::OpenLink(url) = &interaction.tag {
                open_link(url);
            }
            format!("{}|{}", interaction.surface, interaction.tag)
        });
        self.last_report = Some(report);
        result
    }

    /// Player eye position as [x, y, z]
    pub fn position(&self) -> Vec<f32> {
        let p = self.walk.player().position;
        vec![p.x, p.y, p.z]
    }

    /// Yaw and pitch in radians
    pub fn orientation(&self) -> Vec<f32> {
        let o = self.walk.player().orientation;
        vec![o.yaw, o.pitch]
    }

    /// Names of doors that moved in the last tick, comma separated
    pub fn moved_doors(&self) -> String {
        self.last_report
            .as_ref()
            .map(|report| {
                report
                    .doors
                    .iter()
                    .map(|door| door.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    }

    /// Current position of a door as [x, y, z], empty if unknown
    pub fn door_position(&self, name: &str) -> Vec<f32> {
        self.walk
            .door_positions()
            .find(|(door, _)| *door == name)
            .map(|(_, p)| vec![p.x, p.y, p.z])
            .unwrap_or_default()
    }

    /// Whether the video controls should be shown
    pub fn near_media(&self) -> bool {
        self.last_report
            .as_ref()
            .is_some_and(|report| !report.nearby_media.is_empty())
    }
}

fn mode_from_index(mode: u8) -> LocomotionMode {
    match mode {
        1 => LocomotionMode::Touch,
        2 => LocomotionMode::VrController,
        _ => LocomotionMode::DesktopPointerLock,
    }
}

#[cfg(target_arch = "wasm32")]
fn pointer_lock_active() -> bool {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.pointer_lock_element())
        .is_some()
}

#[cfg(not(target_arch = "wasm32"))]
fn pointer_lock_active() -> bool {
    false
}

#[cfg(target_arch = "wasm32")]
fn open_link(url: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.open_with_url_and_target(url, "_blank") {
        warn!(url, error = ?e, "failed to open link");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_link(url: &str) {
    warn!(url, "links can only be opened in a browser");
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str("xrwalk web module loaded"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walkthrough() -> WebWalkthrough {
        match WebWalkthrough::new("", "") {
            Ok(walk) => walk,
            Err(_) => panic!("default scene should load"),
        }
    }

    #[test]
    fn test_mode_indices() {
        assert_eq!(mode_from_index(0), LocomotionMode::DesktopPointerLock);
        assert_eq!(mode_from_index(1), LocomotionMode::Touch);
        assert_eq!(mode_from_index(2), LocomotionMode::VrController);
        assert_eq!(mode_from_index(9), LocomotionMode::DesktopPointerLock);
    }

    #[test]
    fn test_keys_move_after_lock() {
        let mut web = walkthrough();
        let start = web.position();
        web.key_down("KeyW");
        web.tick(0.0);
        assert_eq!(web.position(), start);

        web.set_pointer_locked(true);
        web.tick(0.1);
        assert!(web.position()[2] < start[2]);
    }

    #[test]
    fn test_centre_click_reaches_door_behind() {
        let mut web = walkthrough();
        web.set_pointer_locked(true);
        // Turn around to face the entrance door
        web.look(std::f32::consts::PI / 0.002, 0.0);
        web.click(400.0, 300.0, 800.0, 600.0);
        let tag = web.tick(1.0);
        assert_eq!(tag.as_deref(), Some("entrance_door|animate-door"));
        assert_eq!(web.moved_doors(), "entrance_door");
    }

    #[test]
    fn test_unknown_door_position_is_empty() {
        let web = walkthrough();
        assert!(web.door_position("nope").is_empty());
        assert_eq!(web.door_position("entrance_door"), vec![0.0, 3.0, 20.0]);
    }
}
