/// Terminal walkthrough: a top-down map of the room driven by the keyboard
use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use std::fs;
use std::io::{self, stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use xrwalk_core::{
    parse_scene, FrameReport, HandlerTag, Key, SceneLayout, WalkConfig, Walkthrough,
    DEFAULT_SCENE,
};

pub mod renderer;

pub use renderer::MapRenderer;

/// Pixels of simulated mouse travel per look key press
const LOOK_STEP: f32 = 40.0;
const STATUS_LINES: usize = 2;

/// Read a scene file, or the bundled café when no path is given
pub fn load_layout(path: Option<&Path>) -> io::Result<SceneLayout> {
    let text = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to read scene {}: {e}", path.display()),
            )
        })?,
        None => DEFAULT_SCENE.to_string(),
    };
    parse_scene(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

/// Read a JSON config file, or the defaults when no path is given
pub fn load_config(path: Option<&Path>) -> io::Result<WalkConfig> {
    let Some(path) = path else {
        return Ok(WalkConfig::default());
    };
    let text = fs::read_to_string(path)?;
    WalkConfig::from_json(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

/// Map a terminal key to a walkthrough key
fn walk_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Char('w' | 'W') | KeyCode::Up => Some(Key::Forward),
        KeyCode::Char('s' | 'S') | KeyCode::Down => Some(Key::Backward),
        KeyCode::Char('a' | 'A') | KeyCode::Left => Some(Key::Left),
        KeyCode::Char('d' | 'D') | KeyCode::Right => Some(Key::Right),
        KeyCode::Char('x' | 'X') => Some(Key::MediaToggle),
        _ => None,
    }
}

fn is_shifted(event: &KeyEvent) -> bool {
    event.modifiers.contains(KeyModifiers::SHIFT)
        || matches!(event.code, KeyCode::Char(c) if c.is_ascii_uppercase())
}

/// Main application struct for the terminal walkthrough
pub struct TerminalApp {
    walk: Walkthrough,
    renderer: MapRenderer,
    running: bool,
    /// Set when the terminal cannot report key releases
    release_after_tick: bool,
    status: String,
    started: Instant,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(layout: SceneLayout, config: WalkConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let mut walk = Walkthrough::new(layout, config);
        // The terminal owns the keyboard for the whole session
        walk.input_mut().set_pointer_locked(true);
        let now = Instant::now();

        Ok(Self {
            walk,
            renderer: MapRenderer::new(
                width as usize,
                (height as usize).saturating_sub(STATUS_LINES).max(1),
            ),
            running: true,
            release_after_tick: true,
            status: String::from("Walk with WASD, look with J/L/I/K, interact with Space"),
            started: now,
            last_frame: now,
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        self.release_after_tick = !enhanced;
        info!(key_release_events = enhanced, "terminal session started");

        let result = self.main_loop();

        // Cleanup
        if enhanced {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Drain every pending event before the tick
            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            let report = self.update();
            self.render(&report)?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(width, height) => {
                self.renderer = MapRenderer::new(
                    width as usize,
                    (height as usize).saturating_sub(STATUS_LINES).max(1),
                );
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let input = self.walk.input_mut();
        if key.kind == KeyEventKind::Release {
            if let Some(walk_key) = walk_key(key.code) {
                input.key_up(walk_key);
            }
            if matches!(key.code, KeyCode::Modifier(_)) || !is_shifted(&key) {
                input.key_up(Key::Sprint);
            }
            return;
        }

        if let Some(walk_key) = walk_key(key.code) {
            if is_shifted(&key) {
                input.key_down(Key::Sprint);
            }
            input.key_down(walk_key);
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.running = false;
            }
            KeyCode::Char(' ') | KeyCode::Enter => input.press_interact(),
            KeyCode::Char('j') => self.walk.look(-LOOK_STEP, 0.0),
            KeyCode::Char('l') => self.walk.look(LOOK_STEP, 0.0),
            KeyCode::Char('i') => self.walk.look(0.0, -LOOK_STEP),
            KeyCode::Char('k') => self.walk.look(0.0, LOOK_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => self.change_speed(0.25),
            KeyCode::Char('-') => self.change_speed(-0.25),
            _ => {}
        }
    }

    fn change_speed(&mut self, delta: f32) {
        let speed = self.walk.set_base_speed(self.walk.config().base_speed + delta);
        self.status = format!("Walking speed {speed:.2}");
    }

    fn update(&mut self) -> FrameReport {
        let report = self.walk.tick(self.started.elapsed().as_secs_f64(), None);
        if self.release_after_tick {
            self.walk.input_mut().release_keys();
        }

        if let Some(interaction) = &report.interaction {
            self.status = describe(&interaction.tag, &interaction.surface);
            info!(surface = %interaction.surface, tag = %interaction.tag, "interaction");
        } else if report.blocked {
            self.status = String::from("Blocked by a wall");
        }
        report
    }

    fn render(&mut self, report: &FrameReport) -> io::Result<()> {
        self.renderer.clear();
        self.renderer.draw_scene(&self.walk);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        let player = self.walk.player();
        let media_hint = match report.nearby_media.first() {
            Some(name) => format!(" | X: toggle {name}"),
            None => String::new(),
        };
        let row = self.renderer.height() as u16;
        queue!(
            stdout,
            cursor::MoveTo(0, row),
            terminal::Clear(terminal::ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "xrwalk | FPS: {:.1} | pos {:.1},{:.1} | speed {:.2}{}{}",
                self.fps,
                player.position.x,
                player.position.z,
                self.walk.config().base_speed,
                if player.sprinting { " (sprint)" } else { "" },
                media_hint,
            )),
            cursor::MoveTo(0, row + 1),
            terminal::Clear(terminal::ClearType::CurrentLine),
            SetForegroundColor(Color::White),
            Print(&self.status),
            ResetColor
        )?;

        if let Err(e) = stdout.flush() {
            warn!(error = %e, "failed to flush terminal");
            return Err(e);
        }
        Ok(())
    }
}

/// What the browser front end would do for this handler, as text
fn describe(tag: &HandlerTag, surface: &str) -> String {
    match tag {
        HandlerTag::OpenPanel => format!("Opened panel '{surface}'"),
        HandlerTag::ToggleVideo => format!("Toggled video '{surface}'"),
        HandlerTag::AnimateDoor => format!("Door '{surface}' moving"),
        HandlerTag::OpenLink(url) => format!("Link: {url}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_keys() {
        assert_eq!(walk_key(KeyCode::Char('W')), Some(Key::Forward));
        assert_eq!(walk_key(KeyCode::Left), Some(Key::Left));
        assert_eq!(walk_key(KeyCode::Char('q')), None);
    }

    #[test]
    fn test_uppercase_counts_as_shift() {
        let event = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::NONE);
        assert!(is_shifted(&event));
        let event = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::NONE);
        assert!(!is_shifted(&event));
    }

    #[test]
    fn test_default_layout_loads() {
        let layout = load_layout(None).unwrap();
        assert!(!layout.registry.is_empty());
        assert_eq!(load_config(None).unwrap(), WalkConfig::default());
    }

    #[test]
    fn test_describe_link() {
        let tag = HandlerTag::OpenLink("https://example.com".into());
        assert_eq!(describe(&tag, "website"), "Link: https://example.com");
    }
}
