//! Frame loops: the winit window driving the wgpu renderer, and the
//! headless runner used for scripted checks.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::WindowSettings;
use crate::error::ConfigError;
use crate::input::{InputProvider, InputState, KeyCode, NamedKey};
use crate::light::LightBehavior;
use crate::render::{record_frame, BindingAudit, FrameCommands, Renderer, Viewport};
use crate::scene::Scene;
use crate::timing::{FpsCounter, FrameClock, SystemClock};
use crate::update::SceneUpdate;

/// Scene plus the state needed to advance it: the update rules and the
/// keyboard snapshot fed by whichever loop is running.
#[derive(Debug)]
pub struct Simulation {
    scene: Scene,
    update: SceneUpdate,
    input: InputState,
    quit_key: KeyCode,
    frames: u64,
}

impl Simulation {
    pub fn new(scene: Scene, update: SceneUpdate, quit_key: KeyCode) -> Self {
        Self {
            scene,
            update,
            input: InputState::new(),
            quit_key,
            frames: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// True when the quit key went down since the last step.
    pub fn quit_requested(&self) -> bool {
        self.input.was_key_pressed(self.quit_key)
    }

    /// Updates the scene by `dt` and records the frame that shows the result.
    pub fn step(&mut self, dt: f32, viewport: Viewport) -> FrameCommands {
        let events = self.update.update(&mut self.scene, dt, &self.input);
        if events.any() {
            let effects = &self.scene.effects;
            debug!(
                "toggled {events:?}: parallax={} spin={} wiggle={}",
                effects.parallax, effects.spin, effects.wiggle
            );
        }
        self.input.end_frame();
        self.frames += 1;
        record_frame(&self.scene, viewport)
    }
}

#[derive(Debug, Error)]
#[error("failed to initialize {stage}: {message}")]
pub struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    fn new(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// Opens a window and runs update, record and render until the window is
/// closed or the quit key is pressed.
///
/// Returns a [`WindowInitError`] (inside the `anyhow` chain) when no window
/// could be created, so callers can fall back to a headless run.
pub fn run_windowed(simulation: Simulation, window: &WindowSettings) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| WindowInitError::new("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        simulation,
        settings: window.clone(),
        renderer: None,
        clock: SystemClock::new(),
        fps: FpsCounter::default(),
        error: None,
    };
    event_loop.run_app(&mut app).context("event loop terminated abnormally")?;

    info!("exiting after {} frames", app.simulation.frames());
    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    simulation: Simulation,
    settings: WindowSettings,
    renderer: Option<Renderer>,
    clock: SystemClock,
    fps: FpsCounter,
    error: Option<anyhow::Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn create_renderer(&mut self, event_loop: &ActiveEventLoop) -> Result<Renderer> {
        let attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(LogicalSize::new(self.settings.width, self.settings.height));
        let window = event_loop
            .create_window(attributes)
            .map_err(|err| WindowInitError::new("window", err))?;
        let renderer = pollster::block_on(Renderer::new(Arc::new(window), self.simulation.scene()))
            .context("failed to initialize renderer")?;
        let size = renderer.surface_size();
        self.simulation
            .scene_mut()
            .camera_mut()
            .set_aspect(size.width as f32 / size.height.max(1) as f32);
        Ok(renderer)
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        let input = self.simulation.input_mut();
        match event.state {
            ElementState::Pressed if !event.repeat => input.set_key_down(key),
            ElementState::Pressed => {}
            ElementState::Released => input.set_key_up(key),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.simulation.quit_requested() {
            event_loop.exit();
            return;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let dt = self.clock.tick();
        if let Some(stats) = self.fps.record(dt) {
            debug!("{:.2}ms/frame, {} fps", stats.frame_time * 1000.0, stats.fps());
            renderer.window().set_title(&stats.window_title(&self.settings.title));
        }

        let size = renderer.surface_size();
        let frame = self.simulation.step(dt, Viewport::new(size.width, size.height));
        match renderer.render(&frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost; reconfiguring");
                renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("GPU is out of memory"));
            }
            Err(err) => warn!("{err}; retrying next frame"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match self.create_renderer(event_loop) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.renderer.as_ref().map(Renderer::window_id) != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                if size.width > 0 && size.height > 0 {
                    self.simulation
                        .scene_mut()
                        .camera_mut()
                        .set_aspect(size.width as f32 / size.height as f32);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Enter => KeyCode::Named(NamedKey::Enter),
        WinitKey::Tab => KeyCode::Named(NamedKey::Tab),
        WinitKey::ArrowLeft => KeyCode::Named(NamedKey::Left),
        WinitKey::ArrowRight => KeyCode::Named(NamedKey::Right),
        WinitKey::ArrowUp => KeyCode::Named(NamedKey::Up),
        WinitKey::ArrowDown => KeyCode::Named(NamedKey::Down),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::Backspace => KeyCode::Named(NamedKey::Backspace),
        WinitKey::Period => KeyCode::Named(NamedKey::Period),
        WinitKey::Comma => KeyCode::Named(NamedKey::Comma),
        WinitKey::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        WinitKey::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        WinitKey::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        WinitKey::ControlRight => KeyCode::Named(NamedKey::RightCtrl),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyB => KeyCode::Character('B'),
        WinitKey::KeyC => KeyCode::Character('C'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyE => KeyCode::Character('E'),
        WinitKey::KeyF => KeyCode::Character('F'),
        WinitKey::KeyG => KeyCode::Character('G'),
        WinitKey::KeyH => KeyCode::Character('H'),
        WinitKey::KeyI => KeyCode::Character('I'),
        WinitKey::KeyJ => KeyCode::Character('J'),
        WinitKey::KeyK => KeyCode::Character('K'),
        WinitKey::KeyL => KeyCode::Character('L'),
        WinitKey::KeyM => KeyCode::Character('M'),
        WinitKey::KeyN => KeyCode::Character('N'),
        WinitKey::KeyO => KeyCode::Character('O'),
        WinitKey::KeyP => KeyCode::Character('P'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyR => KeyCode::Character('R'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyT => KeyCode::Character('T'),
        WinitKey::KeyU => KeyCode::Character('U'),
        WinitKey::KeyV => KeyCode::Character('V'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyX => KeyCode::Character('X'),
        WinitKey::KeyY => KeyCode::Character('Y'),
        WinitKey::KeyZ => KeyCode::Character('Z'),
        WinitKey::F1 => KeyCode::Function(1),
        WinitKey::F2 => KeyCode::Function(2),
        WinitKey::F3 => KeyCode::Function(3),
        WinitKey::F4 => KeyCode::Function(4),
        WinitKey::F5 => KeyCode::Function(5),
        WinitKey::F6 => KeyCode::Function(6),
        WinitKey::F7 => KeyCode::Function(7),
        WinitKey::F8 => KeyCode::Function(8),
        WinitKey::F9 => KeyCode::Function(9),
        WinitKey::F10 => KeyCode::Function(10),
        WinitKey::F11 => KeyCode::Function(11),
        WinitKey::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

/// A key tapped at the start of a given headless frame (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedPress {
    pub frame: u32,
    pub key: KeyCode,
}

impl ScriptedPress {
    /// Parses `FRAME:KEY`, e.g. `10:4` or `0:Escape`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::ScriptedPress(text.to_string());
        let (frame, key) = text.split_once(':').ok_or_else(invalid)?;
        let frame = frame.trim().parse().map_err(|_| invalid())?;
        let key = KeyCode::from_name(key.trim()).ok_or_else(invalid)?;
        Ok(Self { frame, key })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlessReport {
    pub frames: u64,
    pub simulated_seconds: f32,
    pub hazards: usize,
    pub draws_last_frame: usize,
    pub effects: EffectsReport,
    pub lights: Vec<LightReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectsReport {
    pub parallax: bool,
    pub spin: bool,
    pub wiggle: bool,
    pub wiggle_phase: f32,
    pub parallax_depth: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightReport {
    pub behavior: &'static str,
    pub strength: f32,
    pub color: [f32; 3],
    pub position: [f32; 3],
}

impl HeadlessReport {
    fn capture(scene: &Scene, frames: u64, simulated_seconds: f32, hazards: usize, draws: usize) -> Self {
        let params = scene.lighting_params();
        Self {
            frames,
            simulated_seconds,
            hazards,
            draws_last_frame: draws,
            effects: EffectsReport {
                parallax: scene.effects.parallax,
                spin: scene.effects.spin,
                wiggle: scene.effects.wiggle,
                wiggle_phase: scene.effects.wiggle_phase,
                parallax_depth: params.parallax_depth,
            },
            lights: scene
                .lights()
                .iter()
                .map(|light| LightReport {
                    behavior: match light.behavior {
                        LightBehavior::Orbiting(_) => "orbiting",
                        LightBehavior::Pulsing(_) => "pulsing",
                        LightBehavior::Static => "static",
                    },
                    strength: light.strength(),
                    color: light.color().to_array(),
                    position: light.entity().position().to_array(),
                })
                .collect(),
        }
    }
}

/// Runs `frames` updates without a window, recording and auditing every
/// frame. Stops early when a scripted press hits the quit key.
pub fn run_headless(
    simulation: &mut Simulation,
    frames: u32,
    clock: &mut dyn FrameClock,
    presses: &[ScriptedPress],
    viewport: Viewport,
) -> HeadlessReport {
    let mut audit = BindingAudit::new(simulation.scene().lights().len());
    let mut hazards = 0;
    let mut draws = 0;
    let mut elapsed = 0.0;
    let start = simulation.frames();

    for index in 0..frames {
        for press in presses.iter().filter(|press| press.frame == index) {
            simulation.input_mut().tap(press.key);
        }
        if simulation.quit_requested() {
            info!("quit key pressed at frame {index}");
            break;
        }
        let dt = clock.tick();
        elapsed += dt;
        let frame = simulation.step(dt, viewport);
        draws = frame.draw_count();
        for hazard in audit.audit_frame(&frame) {
            warn!("frame {index}: {hazard}");
            hazards += 1;
        }
    }

    HeadlessReport::capture(
        simulation.scene(),
        simulation.frames() - start,
        elapsed,
        hazards,
        draws,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::mesh::ProceduralMeshes;
    use crate::texture::ProceduralTextures;
    use crate::timing::FixedClock;

    fn simulation() -> Simulation {
        let settings = Settings::default();
        let scene = Scene::demo(&settings, &ProceduralMeshes, &ProceduralTextures { size: 4 }).unwrap();
        let update = SceneUpdate::new(settings.keys.controls().unwrap(), settings.update_settings());
        Simulation::new(scene, update, settings.keys.quit_key().unwrap())
    }

    #[test]
    fn parses_scripted_presses() {
        assert_eq!(
            ScriptedPress::parse("12:4").unwrap(),
            ScriptedPress {
                frame: 12,
                key: KeyCode::Digit(4)
            }
        );
        assert_eq!(
            ScriptedPress::parse("0:Escape").unwrap().key,
            KeyCode::Named(NamedKey::Escape)
        );
        for bad in ["4", "x:4", "3:NotAKey"] {
            assert!(matches!(
                ScriptedPress::parse(bad),
                Err(ConfigError::ScriptedPress(_))
            ));
        }
    }

    #[test]
    fn headless_run_is_hazard_free() {
        let mut simulation = simulation();
        let report = run_headless(
            &mut simulation,
            30,
            &mut FixedClock { step: 1.0 / 60.0 },
            &[],
            Viewport::new(320, 240),
        );
        assert_eq!(report.frames, 30);
        assert_eq!(report.hazards, 0);
        assert_eq!(report.draws_last_frame, 7 * 2 + 7 + 2);
        assert_eq!(report.lights.len(), 2);
        assert_eq!(report.lights[0].behavior, "orbiting");
    }

    #[test]
    fn scripted_presses_toggle_effects_and_quit() {
        let mut simulation = simulation();
        let presses = [
            ScriptedPress::parse("2:4").unwrap(),
            ScriptedPress::parse("5:Escape").unwrap(),
        ];
        let report = run_headless(
            &mut simulation,
            100,
            &mut FixedClock { step: 0.25 },
            &presses,
            Viewport::new(320, 240),
        );
        assert_eq!(report.frames, 5);
        assert!(!report.effects.wiggle);
        assert_eq!(report.effects.wiggle_phase, 0.0);
    }

    #[test]
    fn winit_digits_and_letters_map_to_key_codes() {
        assert_eq!(map_keycode(WinitKey::Digit3), Some(KeyCode::Digit(3)));
        assert_eq!(map_keycode(WinitKey::KeyW), Some(KeyCode::Character('W')));
        assert_eq!(map_keycode(WinitKey::Period), Some(KeyCode::Named(NamedKey::Period)));
        assert_eq!(map_keycode(WinitKey::NumLock), None);
    }
}
