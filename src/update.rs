//! Per-frame scene update: toggles, control, and light/object animation.

use glam::Vec3;

use crate::input::{InputProvider, KeyCode};
use crate::light::{LightBehavior, REFERENCE_FRAME_RATE};
use crate::scene::Scene;
use crate::transform::ControlKeys;

/// Edge-triggered keys that flip the scene's effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleKeys {
    pub parallax: KeyCode,
    pub spin: KeyCode,
    pub orbit: KeyCode,
    pub wiggle: KeyCode,
}

impl Default for ToggleKeys {
    fn default() -> Self {
        Self {
            parallax: KeyCode::Digit(1),
            spin: KeyCode::Digit(2),
            orbit: KeyCode::Digit(3),
            wiggle: KeyCode::Digit(4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub toggles: ToggleKeys,
    pub character: ControlKeys,
    pub camera: ControlKeys,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            toggles: ToggleKeys::default(),
            character: ControlKeys::character(),
            camera: ControlKeys::camera(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateSettings {
    /// Wiggle phase gained per second.
    pub wiggle_rate: f32,
    /// Spinner yaw, radians per second.
    pub spin_speed: f32,
    pub parallax_depth: f32,
    pub spin_parallax_depth: f32,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            wiggle_rate: 2.0,
            spin_speed: 2.0,
            parallax_depth: 0.08,
            spin_parallax_depth: 0.9,
        }
    }
}

/// Which toggles fired during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleEvents {
    pub parallax: bool,
    pub spin: bool,
    pub orbit: bool,
    pub wiggle: bool,
}

impl ToggleEvents {
    pub fn any(&self) -> bool {
        self.parallax || self.spin || self.orbit || self.wiggle
    }
}

/// Drives a [`Scene`] forward one frame at a time.
#[derive(Debug, Clone, Default)]
pub struct SceneUpdate {
    controls: Controls,
    settings: UpdateSettings,
}

impl SceneUpdate {
    pub fn new(controls: Controls, settings: UpdateSettings) -> Self {
        Self { controls, settings }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Advances the scene by `dt` seconds. Toggle keys are handled first so
    /// their effect is visible in this very update.
    ///
    /// Negative or non-finite steps are treated as zero.
    pub fn update(&self, scene: &mut Scene, dt: f32, input: &dyn InputProvider) -> ToggleEvents {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let events = self.apply_toggles(scene, input);

        scene
            .character_mut()
            .entity
            .control(dt, &self.controls.character, input);

        if scene.effects.wiggle {
            scene.effects.wiggle_phase += self.settings.wiggle_rate * dt;
        } else {
            scene.effects.wiggle_phase = 0.0;
        }

        let frames = dt * REFERENCE_FRAME_RATE;
        let center = scene.character_position();
        for light in scene.lights_mut() {
            light.animate(dt, frames, center);
        }

        if scene.effects.spin {
            scene.lighting.parallax_depth = self.settings.spin_parallax_depth;
            let spinner = &mut scene.spinner_mut().entity;
            let yaw = spinner.rotation().y + self.settings.spin_speed * dt;
            spinner.set_rotation(Vec3::new(0.0, yaw, 0.0));
        } else {
            scene.lighting.parallax_depth = self.settings.parallax_depth;
        }

        scene.camera_mut().control(dt, &self.controls.camera, input);
        events
    }

    fn apply_toggles(&self, scene: &mut Scene, input: &dyn InputProvider) -> ToggleEvents {
        let keys = &self.controls.toggles;
        let events = ToggleEvents {
            parallax: input.was_key_pressed(keys.parallax),
            spin: input.was_key_pressed(keys.spin),
            orbit: input.was_key_pressed(keys.orbit),
            wiggle: input.was_key_pressed(keys.wiggle),
        };
        let effects = &mut scene.effects;
        effects.parallax ^= events.parallax;
        effects.spin ^= events.spin;
        effects.wiggle ^= events.wiggle;
        if events.orbit {
            for light in scene.lights_mut() {
                if let LightBehavior::Orbiting(orbit) = &mut light.behavior {
                    orbit.active = !orbit.active;
                }
            }
        }
        if events.any() {
            log::debug!("toggles fired: {events:?}");
        }
        events
    }
}
