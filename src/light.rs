//! Spotlights and their per-frame animation behaviours.

use glam::{Mat4, Vec3};

use crate::assets::MeshId;
use crate::error::ConfigError;
use crate::transform::{inverse_affine, Entity};

/// Number of spotlights the frame constants and shaders carry.
pub const NUM_LIGHTS: usize = 2;

/// Frame rate at which the per-frame animation rates were tuned. Rates are
/// scaled by `dt * REFERENCE_FRAME_RATE` so they run at the same wall-clock
/// speed on any machine.
pub const REFERENCE_FRAME_RATE: f32 = 60.0;

const LIGHT_NEAR: f32 = 1.0;
const LIGHT_FAR: f32 = 1000.0;

/// Visual size of a light marker for a given strength.
pub fn marker_scale(strength: f32) -> f32 {
    strength.max(0.0).powf(0.7)
}

/// Full spotlight cone angle, in degrees, shared by every light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeAngle(f32);

impl ConeAngle {
    pub const MIN_DEGREES: f32 = 0.5;
    pub const MAX_DEGREES: f32 = 179.5;

    /// Validates a user supplied angle; it must lie strictly inside
    /// (0°, 180°).
    pub fn new(degrees: f32) -> Result<Self, ConfigError> {
        if degrees.is_finite() && degrees > 0.0 && degrees < 180.0 {
            Ok(Self(degrees.clamp(Self::MIN_DEGREES, Self::MAX_DEGREES)))
        } else {
            Err(ConfigError::ConeAngle(degrees))
        }
    }

    /// Runtime adjustment: out-of-range requests are clamped, never rejected.
    pub fn clamped(degrees: f32) -> Self {
        if degrees.is_nan() {
            return Self::default();
        }
        Self(degrees.clamp(Self::MIN_DEGREES, Self::MAX_DEGREES))
    }

    pub fn degrees(self) -> f32 {
        self.0
    }

    pub fn radians(self) -> f32 {
        self.0.to_radians()
    }

    pub fn cos_half_angle(self) -> f32 {
        (self.radians() * 0.5).cos()
    }
}

impl Default for ConeAngle {
    fn default() -> Self {
        Self(90.0)
    }
}

/// Animation attached to a light, dispatched by the scene update.
#[derive(Debug, Clone, PartialEq)]
pub enum LightBehavior {
    /// Circles a target model and keeps facing it.
    Orbiting(Orbit),
    /// Strength and marker size fall linearly, then snap back to maximum.
    Pulsing(Pulse),
    Static,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    /// Radians per second.
    pub speed: f32,
    pub active: bool,
}

impl Orbit {
    pub fn new(radius: f32, height: f32, speed: f32) -> Self {
        Self {
            angle: 0.0,
            radius,
            height,
            speed,
            active: true,
        }
    }

    /// Offset from the orbit centre at the current angle.
    pub fn offset(&self) -> Vec3 {
        Vec3::new(
            self.angle.cos() * self.radius,
            self.height,
            self.angle.sin() * self.radius,
        )
    }

    pub fn advance(&mut self, dt: f32) {
        if self.active {
            self.angle -= self.speed * dt;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    pub max_strength: f32,
    /// Strength lost per reference frame.
    pub strength_decay: f32,
    pub scale: f32,
    pub max_scale: f32,
    /// Marker scale lost per reference frame.
    pub scale_decay: f32,
}

impl Default for Pulse {
    fn default() -> Self {
        Self {
            max_strength: 90.0,
            strength_decay: 0.005,
            scale: 10.0,
            max_scale: 15.0,
            scale_decay: 0.001,
        }
    }
}

impl Pulse {
    /// Advances the sawtooth by `frames` reference frames and returns the new
    /// strength. Strength is clamped at zero; the step after it reaches zero
    /// resets strength and scale to their maxima.
    pub fn step(&mut self, strength: f32, frames: f32) -> f32 {
        if strength > 0.0 {
            self.scale = (self.scale - self.scale_decay * frames).max(0.0);
            (strength - self.strength_decay * frames).max(0.0)
        } else {
            self.scale = self.max_scale;
            self.max_strength
        }
    }
}

/// Continuous hue rotation around the RGB triangle: the active channel rises
/// while the one before it falls by the same amount, so the channel sum is
/// preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCycle {
    rgb: [f32; 3],
    active: usize,
    /// Amount moved between channels per reference frame.
    pub rate: f32,
}

impl ColorCycle {
    /// Starts on pure blue with red rising.
    pub fn new(rate: f32) -> Self {
        Self {
            rgb: [0.0, 0.0, 1.0],
            active: 0,
            rate,
        }
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.rgb)
    }

    pub fn active_channel(&self) -> usize {
        self.active
    }

    pub fn advance(&mut self, frames: f32) {
        let amount = self.rate * frames;
        let previous = (self.active + 2) % 3;
        self.rgb[self.active] += amount;
        self.rgb[previous] -= amount;
        if self.rgb[self.active] >= 1.0 {
            self.rgb[self.active] = 1.0;
            self.rgb[previous] = 0.0;
            self.active = (self.active + 1) % 3;
        }
    }
}

/// A spotlight fixture. Its entity doubles as the "camera" the shadow map is
/// rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    entity: Entity,
    color: Vec3,
    strength: f32,
    pub behavior: LightBehavior,
    pub color_cycle: Option<ColorCycle>,
}

impl Light {
    pub fn new(marker: MeshId, color: Vec3, strength: f32) -> Self {
        let mut entity = Entity::with_mesh(marker);
        let strength = strength.max(0.0);
        entity.set_scale(marker_scale(strength));
        Self {
            entity,
            color,
            strength,
            behavior: LightBehavior::Static,
            color_cycle: None,
        }
    }

    pub fn with_behavior(mut self, behavior: LightBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_color_cycle(mut self, cycle: ColorCycle) -> Self {
        self.color = cycle.color();
        self.color_cycle = Some(cycle);
        self
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Color scaled by strength, as the shaders consume it.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.strength
    }

    /// Advances this light's behaviour and colour cycle by one update.
    /// `dt` is in seconds, `frames` in reference frames; `orbit_center` is
    /// the position an orbiting light circles and faces.
    pub fn animate(&mut self, dt: f32, frames: f32, orbit_center: Vec3) {
        match &mut self.behavior {
            LightBehavior::Orbiting(orbit) => {
                self.entity.set_position(orbit_center + orbit.offset());
                self.entity.face_target(orbit_center);
                orbit.advance(dt);
            }
            LightBehavior::Pulsing(pulse) => {
                self.strength = pulse.step(self.strength, frames);
                self.entity.set_scale(pulse.scale);
            }
            LightBehavior::Static => {}
        }
        if let Some(cycle) = &mut self.color_cycle {
            cycle.advance(frames);
            self.color = cycle.color();
        }
    }

    /// View matrix treating the light as a camera.
    pub fn view_matrix(&self) -> Mat4 {
        inverse_affine(self.entity.world_matrix())
    }

    /// Square perspective projection covering the spotlight cone.
    pub fn projection_matrix(&self, cone: ConeAngle) -> Mat4 {
        Mat4::perspective_lh(cone.radians(), 1.0, LIGHT_NEAR, LIGHT_FAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> Light {
        Light::new(MeshId::new(0), Vec3::ONE, 40.0)
    }

    #[test]
    fn light_view_composed_with_world_is_identity() {
        let mut light = light();
        light.entity_mut().set_position(Vec3::new(-20.0, 30.0, 20.0));
        light.entity_mut().face_target(Vec3::ZERO);
        let product = light.view_matrix() * light.entity().world_matrix();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn projection_follows_shared_cone_angle() {
        let light = light();
        let narrow = light.projection_matrix(ConeAngle::clamped(30.0));
        let wide = light.projection_matrix(ConeAngle::clamped(120.0));
        // A narrower cone magnifies more.
        assert!(narrow.x_axis.x > wide.x_axis.x);
        // Square aspect.
        assert!((narrow.x_axis.x - narrow.y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn marker_scale_tracks_strength() {
        let light = light();
        assert!((light.entity().scale().x - 40f32.powf(0.7)).abs() < 1e-4);
    }

    #[test]
    fn cone_angle_validation_and_clamping() {
        assert!(ConeAngle::new(0.0).is_err());
        assert!(ConeAngle::new(180.0).is_err());
        assert!(ConeAngle::new(f32::NAN).is_err());
        assert_eq!(ConeAngle::new(90.0).unwrap().degrees(), 90.0);
        assert_eq!(ConeAngle::clamped(400.0).degrees(), ConeAngle::MAX_DEGREES);
        assert_eq!(ConeAngle::clamped(-5.0).degrees(), ConeAngle::MIN_DEGREES);
        assert!((ConeAngle::default().cos_half_angle() - 45f32.to_radians().cos()).abs() < 1e-6);
    }

    #[test]
    fn pulse_never_goes_negative_and_resets() {
        let mut pulse = Pulse::default();
        let mut strength = 0.007;
        strength = pulse.step(strength, 1.0);
        assert!((strength - 0.002).abs() < 1e-6);
        strength = pulse.step(strength, 1.0);
        assert_eq!(strength, 0.0);
        strength = pulse.step(strength, 1.0);
        assert_eq!(strength, pulse.max_strength);
        assert_eq!(pulse.scale, pulse.max_scale);
    }

    #[test]
    fn color_cycle_advances_channels_in_order() {
        let mut cycle = ColorCycle::new(0.25);
        for _ in 0..4 {
            cycle.advance(1.0);
        }
        assert_eq!(cycle.color(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(cycle.active_channel(), 1);
        cycle.advance(1.0);
        assert_eq!(cycle.color(), Vec3::new(0.75, 0.25, 0.0));
    }

    #[test]
    fn orbiting_light_circles_and_faces_center() {
        let center = Vec3::new(15.0, 0.0, 0.0);
        let mut light = light().with_behavior(LightBehavior::Orbiting(Orbit::new(20.0, 10.0, 0.7)));
        light.animate(0.5, 30.0, center);
        assert!((light.entity().position() - Vec3::new(35.0, 10.0, 0.0)).length() < 1e-4);
        let expected = (center - light.entity().position()).normalize();
        assert!((light.entity().facing() - expected).length() < 1e-4);
        match &light.behavior {
            LightBehavior::Orbiting(orbit) => assert!((orbit.angle + 0.35).abs() < 1e-6),
            other => panic!("unexpected behaviour {other:?}"),
        }
    }

    #[test]
    fn pulsing_light_resizes_marker() {
        let mut light = light().with_behavior(LightBehavior::Pulsing(Pulse::default()));
        light.animate(1.0 / 60.0, 1.0, Vec3::ZERO);
        assert!((light.strength() - 39.995).abs() < 1e-4);
        assert!((light.entity().scale().x - 9.999).abs() < 1e-5);
    }

    #[test]
    fn orbit_only_moves_when_active() {
        let mut orbit = Orbit::new(20.0, 10.0, 0.7);
        orbit.advance(1.0);
        assert!((orbit.angle + 0.7).abs() < 1e-6);
        orbit.active = false;
        orbit.advance(1.0);
        assert!((orbit.angle + 0.7).abs() < 1e-6);
        assert!((orbit.offset().length() - (20f32.powi(2) + 10f32.powi(2)).sqrt()).abs() < 1e-3);
    }
}
