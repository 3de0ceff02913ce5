/// Example: Parse a scene file and print what the walkthrough will load
///
/// Usage: cargo run --example check_scene -- path/to/room.scene

use std::env;
use std::path::PathBuf;
use std::io;
use xrwalk_terminal::load_layout;

fn main() -> io::Result<()> {
    let path = env::args().nth(1).map(PathBuf::from);

    if path.is_none() {
        eprintln!("No scene file provided, checking the built-in cafe...");
    }

    let layout = load_layout(path.as_deref())?;
    let bounds = &layout.bounds;

    println!(
        "Room {:.1} x {:.1}, entrance {:.1} wide, padding {:.2}",
        bounds.half_width * 2.0,
        bounds.half_depth * 2.0,
        bounds.entrance_half_width * 2.0,
        bounds.padding()
    );
    println!("{} interior obstacles", bounds.interior.len());

    let registry = &layout.registry;
    for id in registry.ids() {
        let node = registry.node(id);
        match registry.owner_of(id) {
            Some(owner) if owner == id => {
                let tag = registry.handler(owner).map(ToString::to_string).unwrap_or_default();
                println!("  {} -> {}", node.name, tag);
            }
            Some(owner) => println!("  {} (part of {})", node.name, registry.node(owner).name),
            None => println!("  {} (not interactive)", node.name),
        }
    }

    for door in &layout.doors {
        println!("door {} slides {:?} -> {:?}", door.name, door.closed, door.open);
    }
    for spot in &layout.media {
        println!("media {} at {:?}", spot.name, spot.position);
    }
    if !bounds.is_walkable(layout.spawn.x, layout.spawn.z) {
        eprintln!("warning: spawn point collides with a wall");
    }
    Ok(())
}
