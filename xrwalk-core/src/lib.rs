//! xrwalk core library - first-person walkthrough loop
//!
//! Input sampling, locomotion, collision against the room walls, ray-based
//! interaction dispatch and door animation. Front ends feed device events
//! in and read positions and handler tags back out once per frame.

pub mod collision;
pub mod config;
pub mod door;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod locomotion;
pub mod orientation;
pub mod projection;
pub mod scene;
pub mod session;

// Re-export commonly used types
pub use collision::{resolve, RoomBounds};
pub use config::{ConfigError, WalkConfig};
pub use door::{DoorAnimator, DoorState};
pub use geometry::{Aabb, Ray, Rect};
pub use input::{InputIntent, InputState, Key};
pub use interaction::{dispatch, pick, HandlerTag, InteractableRegistry, RegistryBuilder};
pub use locomotion::{integrate, LocomotionMode, PlayerState};
pub use orientation::Orientation;
pub use projection::Camera;
pub use scene::{parse_scene, SceneError, SceneLayout, DEFAULT_SCENE};
pub use session::{FrameReport, Interaction, Walkthrough};
