//! Interactive surfaces and ray-based dispatch.
//!
//! Surfaces live in an arena with parent back-references so that grouped
//! models (a cup inside a café model, say) resolve to the registered owner.
//! The owner of every node is computed once when the registry is built, so
//! dispatch never walks the parent chain.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{Aabb, Ray};

/// What the caller should do when a surface is picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerTag {
    OpenPanel,
    ToggleVideo,
    AnimateDoor,
    OpenLink(String),
}

impl fmt::Display for HandlerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerTag::OpenPanel => f.write_str("open-panel"),
            HandlerTag::ToggleVideo => f.write_str("toggle-video"),
            HandlerTag::AnimateDoor => f.write_str("animate-door"),
            HandlerTag::OpenLink(url) => write!(f, "open-link:{url}"),
        }
    }
}

impl FromStr for HandlerTag {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open-panel" => Ok(HandlerTag::OpenPanel),
            "toggle-video" => Ok(HandlerTag::ToggleVideo),
            "animate-door" => Ok(HandlerTag::AnimateDoor),
            _ => match s.strip_prefix("open-link:") {
                Some(url) if !url.is_empty() => Ok(HandlerTag::OpenLink(url.to_string())),
                _ => Err(RegistryError::UnknownHandler(s.to_string())),
            },
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("surface '{0}' is already registered")]
    DuplicateSurface(String),
    #[error("surface '{0}' already has a handler")]
    DuplicateHandler(String),
    #[error("unknown parent surface '{0}'")]
    UnknownParent(String),
    #[error("unknown handler tag '{0}'")]
    UnknownHandler(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceNode {
    pub name: String,
    /// Group nodes may have no geometry of their own
    pub bounds: Option<Aabb>,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    nodes: Vec<SurfaceNode>,
    by_name: HashMap<String, NodeId>,
    handlers: HashMap<NodeId, HandlerTag>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_surface(
        &mut self,
        name: &str,
        bounds: Option<Aabb>,
        parent: Option<&str>,
    ) -> Result<NodeId, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateSurface(name.to_string()));
        }
        let parent = parent
            .map(|parent| {
                self.by_name
                    .get(parent)
                    .copied()
                    .ok_or_else(|| RegistryError::UnknownParent(parent.to_string()))
            })
            .transpose()?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(SurfaceNode {
            name: name.to_string(),
            bounds,
            parent,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn set_handler(&mut self, node: NodeId, tag: HandlerTag) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&node) {
            return Err(RegistryError::DuplicateHandler(self.nodes[node.0].name.clone()));
        }
        self.handlers.insert(node, tag);
        Ok(())
    }

    pub fn finish(self) -> InteractableRegistry {
        // Parents always precede children in the arena, so one forward pass
        // resolves every owner.
        let mut owner: Vec<Option<NodeId>> = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index);
            let resolved = if self.handlers.contains_key(&id) {
                Some(id)
            } else {
                node.parent.and_then(|parent| owner[parent.0])
            };
            owner.push(resolved);
        }

        InteractableRegistry {
            nodes: self.nodes,
            by_name: self.by_name,
            handlers: self.handlers,
            owner,
        }
    }
}

/// Read-only mapping from surfaces to handlers
#[derive(Debug, Default)]
pub struct InteractableRegistry {
    nodes: Vec<SurfaceNode>,
    by_name: HashMap<String, NodeId>,
    handlers: HashMap<NodeId, HandlerTag>,
    owner: Vec<Option<NodeId>>,
}

impl InteractableRegistry {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in registration order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &SurfaceNode {
        &self.nodes[id.0]
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn handler(&self, id: NodeId) -> Option<&HandlerTag> {
        self.handlers.get(&id)
    }

    /// Nearest registered ancestor of `id`, or `id` itself
    pub fn owner_of(&self, id: NodeId) -> Option<NodeId> {
        self.owner.get(id.0).copied().flatten()
    }

    fn pickable(&self) -> impl Iterator<Item = (NodeId, Aabb, NodeId)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(index, node)| {
            let owner = self.owner[index]?;
            Some((NodeId(index), node.bounds?, owner))
        })
    }
}

/// Result of a successful pick
#[derive(Debug, Clone, PartialEq)]
pub struct Pick<'a> {
    pub surface: NodeId,
    pub owner: NodeId,
    pub distance: f32,
    pub tag: &'a HandlerTag,
}

/// Nearest interactive surface along the ray. Ties keep the surface that
/// was registered first; callers should not depend on that order.
pub fn pick<'a>(
    ray: &Ray,
    registry: &'a InteractableRegistry,
    max_distance: Option<f32>,
) -> Option<Pick<'a>> {
    let limit = max_distance.unwrap_or(f32::INFINITY);
    let mut nearest: Option<(NodeId, NodeId, f32)> = None;

    for (surface, bounds, owner) in registry.pickable() {
        let Some(distance) = bounds.intersect_ray(ray) else {
            continue;
        };
        if distance > limit {
            continue;
        }
        if nearest.map_or(true, |(_, _, best)| distance < best) {
            nearest = Some((surface, owner, distance));
        }
    }

    let (surface, owner, distance) = nearest?;
    let tag = registry.handler(owner)?;
    debug!(
        surface = %registry.node(surface).name,
        owner = %registry.node(owner).name,
        distance,
        %tag,
        "surface picked"
    );
    Some(Pick {
        surface,
        owner,
        distance,
        tag,
    })
}

/// Resolve the handler for a view ray. Mouse-projected and controller rays
/// both go through here.
pub fn dispatch<'a>(
    view_origin: Point3<f32>,
    view_direction: Vector3<f32>,
    registry: &'a InteractableRegistry,
) -> Option<&'a HandlerTag> {
    if view_direction.norm_squared() == 0.0 {
        return None;
    }
    pick(&Ray::new(view_origin, view_direction), registry, None).map(|hit| hit.tag)
}
