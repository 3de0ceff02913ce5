/// xrwalk terminal demo - walk the café from a top-down map
///
/// Controls:
///   - WASD / Arrow Keys: Walk (hold Shift or use capitals to sprint)
///   - J/L: Turn, I/K: Look up and down
///   - Space / Enter: Interact with what you are facing
///   - X: Toggle a nearby video
///   - +/-: Walking speed
///   - Q/ESC: Quit
///
/// The scene file is taken from the first argument or `XRWALK_SCENE`, the
/// JSON config from `XRWALK_CONFIG`. Logs go to `XRWALK_LOG` (default
/// `xrwalk-terminal.log`) filtered by `RUST_LOG`.

use std::env;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xrwalk_terminal::{load_config, load_layout, TerminalApp};

const SCENE_ENV_VAR: &str = "XRWALK_SCENE";
const CONFIG_ENV_VAR: &str = "XRWALK_CONFIG";
const LOG_ENV_VAR: &str = "XRWALK_LOG";
const DEFAULT_LOG_FILE: &str = "xrwalk-terminal.log";

fn main() -> io::Result<()> {
    init_tracing()?;
    info!("=== xrwalk terminal startup ===");
    println!("xrwalk terminal - Loading...");

    let scene_path = env::args()
        .nth(1)
        .or_else(|| env::var(SCENE_ENV_VAR).ok())
        .map(PathBuf::from);
    let config_path = env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);

    let layout = load_layout(scene_path.as_deref())?;
    let config = load_config(config_path.as_deref())?;
    info!(
        scene = %scene_path.as_deref().map_or("<built-in cafe>".into(), |p| p.display().to_string()),
        "scene loaded"
    );

    println!("Starting walkthrough (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    // Run the terminal app
    let mut app = TerminalApp::new(layout, config)?;
    app.run()?;

    println!("Thanks for visiting!");
    Ok(())
}

/// Log to a file: the alternate screen owns stdout while running
fn init_tracing() -> io::Result<()> {
    let path = env::var(LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}
