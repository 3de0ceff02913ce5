//! Scene layout parser.
//!
//! The layout is line oriented; each non-empty, non-comment line is one
//! statement:
//!
//! ```text
//! room width=60 depth=40 wall=0.5 radius=0.3 entrance=20 doorstep=3 eye=3
//! spawn 0,3,18 yaw=0
//! obstacle -15,-12 -15,-2
//! surface screen4 min=-5,1,-19.9 max=5,7,-19.6 handler=open-panel
//! surface cup min=-3,1,-3 max=-2,2,-2 parent=cafe_model
//! door entrance_door min=-2,0,19.8 max=2,5,20.2 open=5.5,2.5,20
//! media frame1 at=-29,4,0
//! ```

use nalgebra::Point3;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{char, space0, space1},
    combinator::{all_consuming, map},
    multi::separated_list0,
    number::complete::float,
    sequence::{preceded, separated_pair, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::collision::RoomBounds;
use crate::geometry::{Aabb, Rect};
use crate::interaction::{HandlerTag, InteractableRegistry, RegistryBuilder, RegistryError};

/// The bundled café layout
pub const DEFAULT_SCENE: &str = include_str!("../scenes/cafe.scene");

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {source}")]
    Registry {
        line: usize,
        #[source]
        source: RegistryError,
    },
    #[error("scene has no 'room' statement")]
    MissingRoom,
}

/// A door and the two positions it slides between
#[derive(Debug, Clone, PartialEq)]
pub struct DoorSpec {
    pub name: String,
    pub closed: Point3<f32>,
    pub open: Point3<f32>,
}

/// A video frame the media key can toggle when the player is close enough
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSpot {
    pub name: String,
    pub position: Point3<f32>,
}

#[derive(Debug)]
pub struct SceneLayout {
    pub bounds: RoomBounds,
    pub registry: InteractableRegistry,
    pub doors: Vec<DoorSpec>,
    pub media: Vec<MediaSpot>,
    pub spawn: Point3<f32>,
    pub spawn_yaw: f32,
}

enum Statement<'a> {
    Room(Vec<(&'a str, f32)>),
    Spawn(Point3<f32>, Vec<(&'a str, &'a str)>),
    Obstacle((f32, f32), (f32, f32)),
    Surface(&'a str, Vec<(&'a str, &'a str)>),
    Door(&'a str, Vec<(&'a str, &'a str)>),
    Media(&'a str, Vec<(&'a str, &'a str)>),
}

pub fn parse_scene(input: &str) -> Result<SceneLayout, SceneError> {
    let mut bounds: Option<RoomBounds> = None;
    let mut eye_height = 3.0f32;
    let mut spawn: Option<(Point3<f32>, f32)> = None;
    let mut interior = Vec::new();
    let mut builder = RegistryBuilder::new();
    let mut doors = Vec::new();
    let mut media = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        // Comments start a line or follow whitespace, so URLs may keep '#'
        let text = if raw.trim_start().starts_with('#') {
            ""
        } else {
            raw.split(" #").next().unwrap_or("").trim()
        };
        if text.is_empty() {
            continue;
        }

        let statement = match all_consuming(parse_statement)(text) {
            Ok((_, statement)) => statement,
            Err(e) => {
                return Err(SceneError::Syntax {
                    line,
                    message: format!("could not parse '{text}': {e:?}"),
                })
            }
        };
        let syntax = |message: String| SceneError::Syntax { line, message };
        let registry = |source: RegistryError| SceneError::Registry { line, source };

        match statement {
            Statement::Room(params) => {
                let mut room = RoomBounds::new(60.0, 40.0, 0.5);
                let mut entrance = None;
                for (key, value) in params {
                    match key {
                        "width" => room.half_width = value / 2.0,
                        "depth" => room.half_depth = value / 2.0,
                        "wall" => room.wall_thickness = value,
                        "radius" => room.player_radius = value,
                        "entrance" => entrance = Some(value / 2.0),
                        "doorstep" => room.doorstep_depth = value,
                        "eye" => eye_height = value,
                        other => return Err(syntax(format!("unknown room key '{other}'"))),
                    }
                }
                room.entrance_half_width = entrance.unwrap_or(room.half_width / 3.0);
                bounds = Some(room);
            }
            Statement::Spawn(position, params) => {
                let yaw = match lookup(&params, "yaw") {
                    Some(value) => parse_number(value).map_err(syntax)?.to_radians(),
                    None => 0.0,
                };
                spawn = Some((position, yaw));
            }
            Statement::Obstacle(a, b) => interior.push(Rect::from_corners(a, b)),
            Statement::Surface(name, params) => {
                let aabb = parse_box(&params).map_err(syntax)?;
                let id = builder
                    .add_surface(name, aabb, lookup(&params, "parent"))
                    .map_err(registry)?;
                if let Some(handler) = lookup(&params, "handler") {
                    let tag: HandlerTag = handler.parse().map_err(registry)?;
                    builder.set_handler(id, tag).map_err(registry)?;
                }
            }
            Statement::Door(name, params) => {
                let aabb = parse_box(&params)
                    .map_err(syntax)?
                    .ok_or_else(|| syntax(format!("door '{name}' needs min= and max=")))?;
                let open = lookup(&params, "open")
                    .ok_or_else(|| syntax(format!("door '{name}' needs open=")))
                    .and_then(|value| parse_point(value).map_err(syntax))?;
                let id = builder
                    .add_surface(name, Some(aabb), lookup(&params, "parent"))
                    .map_err(registry)?;
                builder
                    .set_handler(id, HandlerTag::AnimateDoor)
                    .map_err(registry)?;
                doors.push(DoorSpec {
                    name: name.to_string(),
                    closed: aabb.center(),
                    open,
                });
            }
            Statement::Media(name, params) => {
                let position = lookup(&params, "at")
                    .ok_or_else(|| syntax(format!("media '{name}' needs at=")))
                    .and_then(|value| parse_point(value).map_err(syntax))?;
                media.push(MediaSpot {
                    name: name.to_string(),
                    position,
                });
            }
        }
    }

    let mut bounds = bounds.ok_or(SceneError::MissingRoom)?;
    bounds.interior = interior;
    let (spawn, spawn_yaw) = spawn.unwrap_or_else(|| {
        // Just inside the entrance, facing the room
        (
            Point3::new(0.0, eye_height, bounds.half_depth - 2.0),
            0.0,
        )
    });

    Ok(SceneLayout {
        bounds,
        registry: builder.finish(),
        doors,
        media,
        spawn,
        spawn_yaw,
    })
}

fn parse_statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((
        map(
            preceded(tag("room"), params(number)),
            Statement::Room,
        ),
        map(
            preceded(terminated(tag("spawn"), space1), tuple((point3, params(value)))),
            |(position, params)| Statement::Spawn(position, params),
        ),
        map(
            preceded(
                terminated(tag("obstacle"), space1),
                separated_pair(point2, space1, point2),
            ),
            |(a, b)| Statement::Obstacle(a, b),
        ),
        map(named("surface"), |(name, params)| Statement::Surface(name, params)),
        map(named("door"), |(name, params)| Statement::Door(name, params)),
        map(named("media"), |(name, params)| Statement::Media(name, params)),
    ))(input)
}

fn named<'a>(
    keyword: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, (&'a str, Vec<(&'a str, &'a str)>)> {
    preceded(terminated(tag(keyword), space1), tuple((identifier, params(value))))
}

/// Zero or more space-separated `key=value` pairs
fn params<'a, O, F>(value: F) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<(&'a str, O)>>
where
    F: FnMut(&'a str) -> IResult<&'a str, O> + Copy,
{
    move |input: &'a str| {
        let (input, _) = space0(input)?;
        separated_list0(space1, separated_pair(identifier, char('='), value))(input)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

fn value(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn number(input: &str) -> IResult<&str, f32> {
    float(input)
}

fn point2(input: &str) -> IResult<&str, (f32, f32)> {
    separated_pair(number, char(','), number)(input)
}

fn point3(input: &str) -> IResult<&str, Point3<f32>> {
    map(
        tuple((number, preceded(char(','), number), preceded(char(','), number))),
        |(x, y, z)| Point3::new(x, y, z),
    )(input)
}

fn lookup<'a>(params: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn parse_point(value: &str) -> Result<Point3<f32>, String> {
    all_consuming(point3)(value)
        .map(|(_, point)| point)
        .map_err(|_| format!("expected x,y,z but found '{value}'"))
}

fn parse_number(value: &str) -> Result<f32, String> {
    all_consuming(number)(value)
        .map(|(_, number)| number)
        .map_err(|_| format!("expected a number but found '{value}'"))
}

fn parse_box(params: &[(&str, &str)]) -> Result<Option<Aabb>, String> {
    match (lookup(params, "min"), lookup(params, "max")) {
        (Some(min), Some(max)) => Ok(Some(Aabb::new(parse_point(min)?, parse_point(max)?))),
        (None, None) => Ok(None),
        _ => Err("min= and max= must be given together".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_parses() {
        let layout = parse_scene(DEFAULT_SCENE).unwrap();
        assert!((layout.bounds.half_width - 30.0).abs() < 1e-6);
        assert!(!layout.bounds.interior.is_empty());
        assert!(!layout.doors.is_empty());
        assert!(!layout.media.is_empty());
        assert!(layout.bounds.is_walkable(layout.spawn.x, layout.spawn.z));
    }

    #[test]
    fn test_default_scene_front_is_closed() {
        let layout = parse_scene(DEFAULT_SCENE).unwrap();
        assert_eq!(layout.bounds.doorstep_depth, 0.0);
        assert!(!layout.bounds.is_walkable(15.0, 20.6));
        assert!(!layout.bounds.is_walkable(0.0, 20.6));
        assert!(layout.bounds.is_walkable(0.0, 19.0));
    }

    #[test]
    fn test_room_and_surfaces() {
        let layout = parse_scene(
            "# tiny\n\
             room width=40 depth=20 wall=0.4 entrance=8 doorstep=2\n\
             obstacle 1,1 3,1\n\
             surface group handler=open-link:https://example.com\n\
             surface leaf min=0,0,-5 max=1,1,-4 parent=group\n\
             door d min=-1,0,9.5 max=1,3,10.5 open=3,1.5,10\n\
             media tv at=0,2,-9\n",
        )
        .unwrap();

        assert!((layout.bounds.entrance_half_width - 4.0).abs() < 1e-6);
        assert_eq!(layout.bounds.doorstep_depth, 2.0);
        assert_eq!(layout.bounds.interior.len(), 1);

        let leaf = layout.registry.find("leaf").unwrap();
        let group = layout.registry.find("group").unwrap();
        assert_eq!(layout.registry.owner_of(leaf), Some(group));

        assert_eq!(layout.doors[0].closed, Point3::new(0.0, 1.5, 10.0));
        assert_eq!(layout.doors[0].open, Point3::new(3.0, 1.5, 10.0));
        assert_eq!(layout.media[0].name, "tv");
        assert_eq!(layout.spawn, Point3::new(0.0, 3.0, 8.0));
    }

    #[test]
    fn test_spawn_yaw_in_degrees() {
        let layout = parse_scene("room width=10 depth=10\nspawn 1,3,2 yaw=90\n").unwrap();
        assert_eq!(layout.spawn, Point3::new(1.0, 3.0, 2.0));
        assert!((layout.spawn_yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse_scene("room width=10 depth=10\n\nobstacle 1,1\n").unwrap_err();
        assert!(matches!(err, SceneError::Syntax { line: 3, .. }));
    }

    #[test]
    fn test_unknown_parent_reports_line() {
        let err = parse_scene("room\nsurface cup min=0,0,0 max=1,1,1 parent=nope\n").unwrap_err();
        assert_eq!(
            err,
            SceneError::Registry {
                line: 2,
                source: RegistryError::UnknownParent("nope".into()),
            }
        );
    }

    #[test]
    fn test_bad_spawn_yaw_is_a_syntax_error() {
        let err = parse_scene("room\nspawn 0,3,0 yaw=north\n").unwrap_err();
        assert!(matches!(err, SceneError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_missing_room() {
        assert_eq!(parse_scene("media tv at=0,0,0").unwrap_err(), SceneError::MissingRoom);
    }

    #[test]
    fn test_half_box_is_rejected() {
        let err = parse_scene("room\nsurface s min=0,0,0 handler=open-panel\n").unwrap_err();
        assert!(matches!(err, SceneError::Syntax { line: 2, .. }));
    }
}
