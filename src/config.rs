//! User settings: defaults, optional TOML file and validation.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Command-line overrides are applied by the binary after loading.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::input::KeyCode;
use crate::light::{ColorCycle, ConeAngle, Orbit, Pulse};
use crate::transform::ControlKeys;
use crate::update::{Controls, ToggleKeys, UpdateSettings};

pub const MIN_SHADOW_MAP_SIZE: u32 = 16;
pub const MAX_SHADOW_MAP_SIZE: u32 = 16384;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub rendering: RenderSettings,
    pub assets: AssetSettings,
    pub animation: AnimationSettings,
    pub keys: KeyBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Shadow Lab".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Width and height of each light's shadow map, in texels.
    pub shadow_map_size: u32,
    /// Full spotlight cone angle in degrees, shared by all lights.
    pub cone_angle: f32,
    pub ambient_color: [f32; 3],
    pub specular_power: f32,
    pub background_color: [f32; 4],
    pub parallax_depth: f32,
    /// Parallax depth forced while the spin effect is on.
    pub spin_parallax_depth: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: 2048,
            cone_angle: 90.0,
            ambient_color: [0.2, 0.2, 0.3],
            specular_power: 256.0,
            background_color: [0.2, 0.2, 0.3, 1.0],
            parallax_depth: 0.08,
            spin_parallax_depth: 0.9,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory holding texture images. Built-in procedural textures are
    /// used when unset.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub orbit_radius: f32,
    pub orbit_height: f32,
    /// Radians per second.
    pub orbit_speed: f32,
    pub pulse_max_strength: f32,
    /// Per reference frame.
    pub pulse_strength_decay: f32,
    pub pulse_initial_scale: f32,
    pub pulse_max_scale: f32,
    /// Per reference frame.
    pub pulse_scale_decay: f32,
    /// Per reference frame.
    pub color_cycle_rate: f32,
    /// Radians per second.
    pub spin_speed: f32,
    /// Wiggle phase gained per second.
    pub wiggle_rate: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            orbit_radius: 20.0,
            orbit_height: 10.0,
            orbit_speed: 0.7,
            pulse_max_strength: 90.0,
            pulse_strength_decay: 0.005,
            pulse_initial_scale: 10.0,
            pulse_max_scale: 15.0,
            pulse_scale_decay: 0.001,
            color_cycle_rate: 0.000_05,
            spin_speed: 2.0,
            wiggle_rate: 2.0,
        }
    }
}

impl AnimationSettings {
    pub fn orbit(&self) -> Orbit {
        Orbit::new(self.orbit_radius, self.orbit_height, self.orbit_speed)
    }

    pub fn pulse(&self) -> Pulse {
        Pulse {
            max_strength: self.pulse_max_strength,
            strength_decay: self.pulse_strength_decay,
            scale: self.pulse_initial_scale,
            max_scale: self.pulse_max_scale,
            scale_decay: self.pulse_scale_decay,
        }
    }

    pub fn color_cycle(&self) -> ColorCycle {
        ColorCycle::new(self.color_cycle_rate)
    }
}

/// Key names as accepted by [`KeyCode::from_name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub toggle_parallax: String,
    pub toggle_spin: String,
    pub toggle_orbit: String,
    pub toggle_wiggle: String,
    pub quit: String,
    pub character: ControlBindings,
    pub camera: ControlBindings,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle_parallax: "1".to_string(),
            toggle_spin: "2".to_string(),
            toggle_orbit: "3".to_string(),
            toggle_wiggle: "4".to_string(),
            quit: "Escape".to_string(),
            character: ControlBindings::character(),
            camera: ControlBindings::camera(),
        }
    }
}

/// Per-action key names for [`ControlKeys`]. Missing entries are unbound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBindings {
    pub turn_up: Option<String>,
    pub turn_down: Option<String>,
    pub turn_left: Option<String>,
    pub turn_right: Option<String>,
    pub turn_cw: Option<String>,
    pub turn_ccw: Option<String>,
    pub move_forward: Option<String>,
    pub move_backward: Option<String>,
    pub move_left: Option<String>,
    pub move_right: Option<String>,
    pub move_up: Option<String>,
    pub move_down: Option<String>,
}

fn name(key: &str) -> Option<String> {
    Some(key.to_string())
}

impl ControlBindings {
    pub fn character() -> Self {
        Self {
            turn_up: name("I"),
            turn_down: name("K"),
            turn_left: name("J"),
            turn_right: name("L"),
            turn_cw: name("U"),
            turn_ccw: name("O"),
            move_forward: name("."),
            move_backward: name(","),
            ..Self::default()
        }
    }

    pub fn camera() -> Self {
        Self {
            turn_up: name("Up"),
            turn_down: name("Down"),
            turn_left: name("Left"),
            turn_right: name("Right"),
            move_forward: name("W"),
            move_backward: name("S"),
            move_left: name("A"),
            move_right: name("D"),
            ..Self::default()
        }
    }

    pub fn resolve(&self) -> Result<ControlKeys, ConfigError> {
        Ok(ControlKeys {
            turn_up: optional_key("turn_up", &self.turn_up)?,
            turn_down: optional_key("turn_down", &self.turn_down)?,
            turn_left: optional_key("turn_left", &self.turn_left)?,
            turn_right: optional_key("turn_right", &self.turn_right)?,
            turn_cw: optional_key("turn_cw", &self.turn_cw)?,
            turn_ccw: optional_key("turn_ccw", &self.turn_ccw)?,
            move_forward: optional_key("move_forward", &self.move_forward)?,
            move_backward: optional_key("move_backward", &self.move_backward)?,
            move_left: optional_key("move_left", &self.move_left)?,
            move_right: optional_key("move_right", &self.move_right)?,
            move_up: optional_key("move_up", &self.move_up)?,
            move_down: optional_key("move_down", &self.move_down)?,
        })
    }
}

fn key(action: &'static str, name: &str) -> Result<KeyCode, ConfigError> {
    KeyCode::from_name(name).ok_or_else(|| ConfigError::UnknownKey {
        action,
        name: name.to_string(),
    })
}

fn optional_key(action: &'static str, name: &Option<String>) -> Result<Option<KeyCode>, ConfigError> {
    name.as_deref().map(|name| key(action, name)).transpose()
}

impl KeyBindings {
    pub fn controls(&self) -> Result<Controls, ConfigError> {
        Ok(Controls {
            toggles: ToggleKeys {
                parallax: key("toggle_parallax", &self.toggle_parallax)?,
                spin: key("toggle_spin", &self.toggle_spin)?,
                orbit: key("toggle_orbit", &self.toggle_orbit)?,
                wiggle: key("toggle_wiggle", &self.toggle_wiggle)?,
            },
            character: self.character.resolve()?,
            camera: self.camera.resolve()?,
        })
    }

    pub fn quit_key(&self) -> Result<KeyCode, ConfigError> {
        key("quit", &self.quit)
    }
}

impl Settings {
    /// Reads and validates a TOML settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.rendering.shadow_map_size;
        if !(MIN_SHADOW_MAP_SIZE..=MAX_SHADOW_MAP_SIZE).contains(&size) {
            return Err(ConfigError::ShadowMapSize {
                value: size,
                min: MIN_SHADOW_MAP_SIZE,
                max: MAX_SHADOW_MAP_SIZE,
            });
        }
        self.cone_angle()?;
        self.keys.controls()?;
        self.keys.quit_key()?;
        Ok(())
    }

    pub fn cone_angle(&self) -> Result<ConeAngle, ConfigError> {
        ConeAngle::new(self.rendering.cone_angle)
    }

    pub fn ambient_color(&self) -> Vec3 {
        Vec3::from_array(self.rendering.ambient_color)
    }

    pub fn update_settings(&self) -> UpdateSettings {
        UpdateSettings {
            wiggle_rate: self.animation.wiggle_rate,
            spin_speed: self.animation.spin_speed,
            parallax_depth: self.rendering.parallax_depth,
            spin_parallax_depth: self.rendering.spin_parallax_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::input::NamedKey;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.rendering.shadow_map_size, 2048);
        assert_eq!(settings.cone_angle().unwrap().degrees(), 90.0);
        let controls = settings.keys.controls().unwrap();
        assert_eq!(controls.toggles.wiggle, KeyCode::Digit(4));
        assert_eq!(
            controls.character.move_forward,
            Some(KeyCode::Named(NamedKey::Period))
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[rendering]\nshadow_map_size = 512\ncone_angle = 60.0\n\n[keys]\ntoggle_spin = \"Space\"\n"
        )
        .unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.rendering.shadow_map_size, 512);
        assert_eq!(settings.rendering.specular_power, 256.0);
        assert_eq!(
            settings.keys.controls().unwrap().toggles.spin,
            KeyCode::Named(NamedKey::Space)
        );
        assert_eq!(settings.keys.toggle_orbit, "3");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut settings = Settings::default();
        settings.rendering.shadow_map_size = 8;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ShadowMapSize { value: 8, .. })
        ));

        let mut settings = Settings::default();
        settings.rendering.cone_angle = 180.0;
        assert!(matches!(settings.validate(), Err(ConfigError::ConeAngle(_))));
    }

    #[test]
    fn rejects_unknown_key_names() {
        let mut settings = Settings::default();
        settings.keys.camera.move_up = Some("Hyper".to_string());
        match settings.validate() {
            Err(ConfigError::UnknownKey { action, name }) => {
                assert_eq!(action, "move_up");
                assert_eq!(name, "Hyper");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rendering]\nshadow_map_size = \"big\"").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn animation_settings_build_behaviours() {
        let animation = AnimationSettings::default();
        assert_eq!(animation.pulse(), Pulse::default());
        assert_eq!(animation.orbit().radius, 20.0);
        assert_eq!(animation.color_cycle().color(), Vec3::Z);
    }
}
