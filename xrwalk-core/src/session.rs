//! The per-frame walkthrough loop.
//!
//! One [`Walkthrough::tick`] runs, in order: input sampling, locomotion,
//! collision, interaction dispatch (only on an interact edge), the media
//! key, and door animation. Nothing here blocks or performs I/O.

use std::collections::BTreeMap;

use nalgebra::{distance, Point3};
use tracing::{debug, info};

use crate::collision::{resolve, RoomBounds};
use crate::config::{snap_base_speed, WalkConfig};
use crate::door::DoorAnimator;
use crate::geometry::Ray;
use crate::input::InputState;
use crate::interaction::{pick, HandlerTag, InteractableRegistry, NodeId};
use crate::locomotion::{integrate, LocomotionMode, PlayerState, StepTuning};
use crate::orientation::Orientation;
use crate::scene::{DoorSpec, MediaSpot, SceneLayout};

/// A resolved interaction the caller must act on
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Name of the registered surface that owns the handler
    pub surface: String,
    pub tag: HandlerTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoorUpdate {
    pub name: String,
    pub position: Point3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub position: Point3<f32>,
    /// The proposed move collided and was discarded
    pub blocked: bool,
    pub interaction: Option<Interaction>,
    /// Media spots within viewing distance, nearest first
    pub nearby_media: Vec<String>,
    /// Doors that moved this frame
    pub doors: Vec<DoorUpdate>,
}

pub struct Walkthrough {
    config: WalkConfig,
    tuning: StepTuning,
    player: PlayerState,
    input: InputState,
    bounds: RoomBounds,
    registry: InteractableRegistry,
    /// Keyed by node so doors are always reported in registry order
    door_specs: BTreeMap<NodeId, DoorSpec>,
    /// Created on a door's first trigger
    animators: BTreeMap<NodeId, DoorAnimator>,
    media: Vec<MediaSpot>,
}

impl Walkthrough {
    pub fn new(layout: SceneLayout, config: WalkConfig) -> Self {
        let SceneLayout {
            bounds,
            registry,
            doors,
            media,
            spawn,
            spawn_yaw,
        } = layout;

        let door_specs = doors
            .into_iter()
            .filter_map(|spec| registry.find(&spec.name).map(|id| (id, spec)))
            .collect();

        info!(
            surfaces = registry.len(),
            obstacles = bounds.interior.len(),
            media = media.len(),
            "walkthrough ready"
        );

        Self {
            tuning: StepTuning::from(&config),
            input: InputState::new(config.joystick_dead_zone),
            player: PlayerState::new(spawn, Orientation::new(spawn_yaw, 0.0)),
            config,
            bounds,
            registry,
            door_specs,
            animators: BTreeMap::new(),
            media,
        }
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn bounds(&self) -> &RoomBounds {
        &self.bounds
    }

    pub fn registry(&self) -> &InteractableRegistry {
        &self.registry
    }

    pub fn media(&self) -> &[MediaSpot] {
        &self.media
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Current position of every door, animated or not
    pub fn door_positions(&self) -> impl Iterator<Item = (&str, Point3<f32>)> + '_ {
        self.door_specs.iter().map(|(id, spec)| {
            let position = self
                .animators
                .get(id)
                .map_or(spec.closed, DoorAnimator::position);
            (spec.name.as_str(), position)
        })
    }

    pub fn set_mode(&mut self, mode: LocomotionMode) {
        if self.player.mode != mode {
            info!(from = ?self.player.mode, to = ?mode, "locomotion mode changed");
            self.player.mode = mode;
        }
    }

    /// Returns the speed actually applied after clamping and snapping
    pub fn set_base_speed(&mut self, speed: f32) -> f32 {
        self.config.base_speed = snap_base_speed(speed);
        info!(speed = self.config.base_speed, "base speed changed");
        self.config.base_speed
    }

    /// Mouse or touch-drag look delta, in pixels
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.player
            .orientation
            .look(dx, dy, self.config.look_sensitivity);
    }

    /// Ray from the player's eye along the view direction
    pub fn gaze_ray(&self) -> Ray {
        Ray::new(self.player.position, self.player.orientation.view_direction())
    }

    /// Advance one frame. Movement is a fixed step per call; `now` only
    /// drives door animation. `pointer` is the mouse-projected or controller
    /// ray for this frame; the gaze ray is used when it is absent.
    pub fn tick(&mut self, now: f64, pointer: Option<Ray>) -> FrameReport {
        let intent = self.input.sample(self.player.mode);
        self.player.sprinting = intent.sprint;

        let previous = self.player.position;
        let (proposed, velocity) = integrate(
            &intent,
            previous,
            &self.player.orientation,
            self.player.velocity,
            self.config.base_speed,
            self.config.sprint_multiplier,
            &self.tuning,
        );
        self.player.velocity = velocity;
        self.player.position = resolve(previous, proposed, &self.bounds);
        let blocked = self.player.position != proposed;

        let mut interaction = None;
        if intent.interact {
            let ray = pointer.unwrap_or_else(|| self.gaze_ray());
            interaction = self.interact(&ray, now);
        }

        let nearby_media = self.nearby_media();
        if intent.media_toggle && interaction.is_none() {
            if let Some(name) = nearby_media.first() {
                debug!(media = %name, "media toggled by key");
                interaction = Some(Interaction {
                    surface: name.clone(),
                    tag: HandlerTag::ToggleVideo,
                });
            }
        }

        let mut doors = Vec::new();
        for (id, animator) in self.animators.iter_mut() {
            if !animator.is_animating() {
                continue;
            }
            let position = animator.update(now);
            if let Some(spec) = self.door_specs.get(id) {
                doors.push(DoorUpdate {
                    name: spec.name.clone(),
                    position,
                });
            }
        }

        FrameReport {
            position: self.player.position,
            blocked,
            interaction,
            nearby_media,
            doors,
        }
    }

    /// Resolve a ray against the registry. Door handlers are run here; any
    /// other handler is returned for the caller to perform.
    fn interact(&mut self, ray: &Ray, now: f64) -> Option<Interaction> {
        let hit = pick(ray, &self.registry, self.config.pick_distance)?;
        let owner = hit.owner;
        let tag = hit.tag.clone();
        let surface = self.registry.node(owner).name.clone();

        if tag == HandlerTag::AnimateDoor {
            if let Some(spec) = self.door_specs.get(&owner) {
                let animator = self
                    .animators
                    .entry(owner)
                    .or_insert_with(|| DoorAnimator::new(spec.closed, spec.open));
                animator.trigger(now);
            }
        }

        Some(Interaction { surface, tag })
    }

    fn nearby_media(&self) -> Vec<String> {
        let mut near: Vec<(f32, &MediaSpot)> = self
            .media
            .iter()
            .map(|spot| (distance(&self.player.position, &spot.position), spot))
            .filter(|(d, _)| *d < self.config.viewing_distance)
            .collect();
        near.sort_by(|a, b| a.0.total_cmp(&b.0));
        near.into_iter().map(|(_, spot)| spot.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::DOOR_DURATION;
    use crate::input::Key;
    use crate::scene::parse_scene;
    use nalgebra::Vector3;

    const TICK: f64 = 1.0 / 60.0;

    fn walkthrough() -> Walkthrough {
        let layout = parse_scene(
            "room width=40 depth=40 wall=0.4 radius=0.3 entrance=13.34 doorstep=3\n\
             spawn 0,3,0\n\
             obstacle -5,-2 -5,2\n\
             surface panel min=-2,0,-10.2 max=2,6,-9.8 handler=open-panel\n\
             door front min=-3,0,19.8 max=3,6,20.2 open=8,3,20\n\
             media tv at=0,3,-4\n",
        )
        .unwrap();
        let mut walk = Walkthrough::new(layout, WalkConfig::default());
        walk.input_mut().set_pointer_locked(true);
        walk
    }

    #[test]
    fn test_forward_key_moves_player() {
        let mut walk = walkthrough();
        walk.input_mut().key_down(Key::Forward);
        let report = walk.tick(0.0, None);
        assert!(report.position.z < 0.0);
        assert!(!report.blocked);
    }

    #[test]
    fn test_wall_blocks_whole_step() {
        let mut walk = walkthrough();
        walk.input_mut().key_down(Key::Right);
        walk.input_mut().key_down(Key::Sprint);
        let mut last = walk.player().position;
        for frame in 0..2000 {
            let report = walk.tick(frame as f64 * TICK, None);
            if report.blocked {
                assert_eq!(report.position, last);
                assert!(report.position.x <= 19.5);
                return;
            }
            last = report.position;
        }
        panic!("never reached the wall");
    }

    #[test]
    fn test_click_on_panel_returns_handler() {
        let mut walk = walkthrough();
        walk.input_mut().press_interact();
        let report = walk.tick(0.0, None);
        assert_eq!(
            report.interaction,
            Some(Interaction {
                surface: "panel".into(),
                tag: HandlerTag::OpenPanel,
            })
        );
        // Edge-triggered: nothing on the next frame
        assert_eq!(walk.tick(TICK, None).interaction, None);
    }

    #[test]
    fn test_pointer_ray_overrides_gaze() {
        let mut walk = walkthrough();
        walk.input_mut().press_interact();
        let away = Ray::new(Point3::new(0.0, 3.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(walk.tick(0.0, Some(away)).interaction, None);
    }

    #[test]
    fn test_door_animates_once_per_trigger() {
        let mut walk = walkthrough();
        let toward_door = Ray::new(Point3::new(0.0, 3.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

        walk.input_mut().press_interact();
        let report = walk.tick(1.0, Some(toward_door));
        assert_eq!(report.interaction.unwrap().tag, HandlerTag::AnimateDoor);

        // Second click mid-transition does not restart it
        walk.input_mut().press_interact();
        walk.tick(1.5, Some(toward_door));

        let report = walk.tick(1.0 + DOOR_DURATION, None);
        assert_eq!(
            report.doors,
            vec![DoorUpdate {
                name: "front".into(),
                position: Point3::new(8.0, 3.0, 20.0),
            }]
        );
        // Settled doors are not reported again
        assert!(walk.tick(3.0, None).doors.is_empty());
        let (_, position) = walk.door_positions().next().unwrap();
        assert_eq!(position, Point3::new(8.0, 3.0, 20.0));
    }

    #[test]
    fn test_media_key_toggles_nearest_spot() {
        let mut walk = walkthrough();
        let report = walk.tick(0.0, None);
        assert_eq!(report.nearby_media, vec!["tv".to_string()]);

        walk.input_mut().key_down(Key::MediaToggle);
        let report = walk.tick(0.1, None);
        assert_eq!(
            report.interaction,
            Some(Interaction {
                surface: "tv".into(),
                tag: HandlerTag::ToggleVideo,
            })
        );
    }

    #[test]
    fn test_base_speed_is_snapped() {
        let mut walk = walkthrough();
        assert_eq!(walk.set_base_speed(10.0), 4.0);
        assert_eq!(walk.config().base_speed, 4.0);
    }

    #[test]
    fn test_touch_mode_ignores_keyboard() {
        let mut walk = walkthrough();
        walk.set_mode(LocomotionMode::Touch);
        walk.input_mut().key_down(Key::Forward);
        let report = walk.tick(0.0, None);
        assert_eq!(report.position, Point3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_top_speed_sprint_cannot_cross_interior_wall() {
        let mut walk = walkthrough();
        walk.set_base_speed(4.0);
        walk.input_mut().key_down(Key::Left);
        walk.input_mut().key_down(Key::Sprint);
        let mut blocked = false;
        for frame in 0..200 {
            let report = walk.tick(frame as f64 * TICK, None);
            // Padded wall face is at x = -4.5
            assert!(report.position.x > -4.5, "crossed at {:?}", report.position);
            blocked |= report.blocked;
        }
        assert!(blocked);
    }

    #[test]
    fn test_vr_grip_walks_into_wall_and_stops() {
        let mut walk = walkthrough();
        walk.set_mode(LocomotionMode::VrController);
        // Quarter turn to face +X
        walk.look(std::f32::consts::FRAC_PI_2 / walk.config().look_sensitivity, 0.0);
        walk.input_mut().set_xr_buttons(true, false);

        let mut last = walk.player().position;
        for frame in 0..2000 {
            let report = walk.tick(frame as f64 * TICK, None);
            if report.blocked {
                assert_eq!(report.position, last);
                assert!(report.position.x > 0.0 && report.position.x <= 19.5);
                return;
            }
            last = report.position;
        }
        panic!("grip never reached the wall");
    }

    #[test]
    fn test_vr_trigger_edge_dispatches_controller_ray() {
        let mut walk = walkthrough();
        walk.set_mode(LocomotionMode::VrController);
        let controller = Ray::new(Point3::new(0.5, 2.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

        walk.input_mut().set_xr_buttons(false, true);
        let report = walk.tick(1.0, Some(controller));
        assert_eq!(
            report.interaction,
            Some(Interaction {
                surface: "front".into(),
                tag: HandlerTag::AnimateDoor,
            })
        );

        // Holding the trigger does not fire again
        walk.input_mut().set_xr_buttons(false, true);
        assert_eq!(walk.tick(1.1, Some(controller)).interaction, None);
    }

    #[test]
    fn test_moving_doors_reported_in_registry_order() {
        let layout = parse_scene(
            "room width=40 depth=40\n\
             spawn 0,3,0\n\
             door west min=-10,0,-1 max=-9,6,1 open=-10,3,4\n\
             door east min=9,0,-1 max=10,6,1 open=10,3,4\n",
        )
        .unwrap();
        let mut walk = Walkthrough::new(layout, WalkConfig::default());
        walk.input_mut().set_pointer_locked(true);

        let east = Ray::new(Point3::new(0.0, 3.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let west = Ray::new(Point3::new(0.0, 3.0, 0.0), Vector3::new(-1.0, 0.0, 0.0));
        walk.input_mut().press_interact();
        walk.tick(0.0, Some(east));
        walk.input_mut().press_interact();
        let report = walk.tick(0.1, Some(west));

        let names: Vec<_> = report.doors.iter().map(|door| door.name.as_str()).collect();
        assert_eq!(names, ["west", "east"]);
    }
}
