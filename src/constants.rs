//! GPU constant blocks and the composer that fills them from scene state.
//!
//! Layouts follow WGSL uniform rules: every `vec3` is padded out to 16 bytes
//! by the scalar that follows it.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::light::{ConeAngle, Light, NUM_LIGHTS};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Colour pre-multiplied by strength.
    pub color: [f32; 3],
    pub cos_half_angle: f32,
    pub position: [f32; 3],
    pub _pad0: f32,
    pub facing: [f32; 3],
    pub _pad1: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerFrameConstants {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    pub lights: [LightConstants; NUM_LIGHTS],
    pub ambient_color: [f32; 3],
    pub specular_power: f32,
    pub camera_position: [f32; 3],
    pub parallax_depth: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerObjectConstants {
    pub world: [[f32; 4]; 4],
    /// Light colour for markers, blend factor for the lerp technique.
    pub color: [f32; 3],
    pub wiggle: f32,
}

impl PerObjectConstants {
    pub fn new(world: Mat4, color: Vec3, wiggle: f32) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            color: color.into(),
            wiggle,
        }
    }
}

/// Scene-wide shading parameters read by the composer every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingParams {
    pub ambient_color: Vec3,
    pub specular_power: f32,
    pub cone_angle: ConeAngle,
    /// Already zeroed when parallax mapping is switched off.
    pub parallax_depth: f32,
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            ambient_color: Vec3::new(0.2, 0.2, 0.3),
            specular_power: 256.0,
            cone_angle: ConeAngle::default(),
            parallax_depth: 0.08,
        }
    }
}

/// The eye a pass renders from: the camera, or a light acting as one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPoint {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl ViewPoint {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            position: camera.position(),
        }
    }

    pub fn from_light(light: &Light, cone: ConeAngle) -> Self {
        Self {
            view: light.view_matrix(),
            projection: light.projection_matrix(cone),
            position: light.entity().position(),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

pub fn compose_light(light: &Light, cone: ConeAngle) -> LightConstants {
    LightConstants {
        view: light.view_matrix().to_cols_array_2d(),
        projection: light.projection_matrix(cone).to_cols_array_2d(),
        color: light.radiance().into(),
        cos_half_angle: cone.cos_half_angle(),
        position: light.entity().position().into(),
        _pad0: 0.0,
        facing: light.entity().facing().into(),
        _pad1: 0.0,
    }
}

/// Builds the per-frame block for one pass. Light slots without a light are
/// left zeroed, which the shaders treat as black.
pub fn compose_frame(viewpoint: &ViewPoint, lights: &[Light], params: &LightingParams) -> PerFrameConstants {
    let mut light_blocks = [LightConstants::zeroed(); NUM_LIGHTS];
    for (block, light) in light_blocks.iter_mut().zip(lights) {
        *block = compose_light(light, params.cone_angle);
    }
    PerFrameConstants {
        view: viewpoint.view.to_cols_array_2d(),
        projection: viewpoint.projection.to_cols_array_2d(),
        view_projection: viewpoint.view_projection().to_cols_array_2d(),
        lights: light_blocks,
        ambient_color: params.ambient_color.into(),
        specular_power: params.specular_power,
        camera_position: viewpoint.position.into(),
        parallax_depth: params.parallax_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MeshId;

    #[test]
    fn block_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<LightConstants>(), 176);
        assert_eq!(std::mem::size_of::<PerObjectConstants>(), 80);
        assert_eq!(std::mem::size_of::<PerFrameConstants>(), 192 + 2 * 176 + 32);
        assert_eq!(std::mem::size_of::<PerFrameConstants>() % 16, 0);
    }

    #[test]
    fn light_block_carries_radiance_and_facing() {
        let mut light = Light::new(MeshId::new(0), Vec3::new(1.0, 0.8, 0.2), 40.0);
        light.entity_mut().set_position(Vec3::new(-20.0, 30.0, 20.0));
        light.entity_mut().face_target(Vec3::ZERO);
        let block = compose_light(&light, ConeAngle::default());

        assert_eq!(block.color, [40.0, 32.0, 8.0]);
        let facing = Vec3::from_array(block.facing);
        let expected = Vec3::new(20.0, -30.0, -20.0).normalize();
        assert!((facing - expected).length() < 1e-4);
        assert!((block.cos_half_angle - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn frame_block_zeroes_missing_lights() {
        let light = Light::new(MeshId::new(0), Vec3::ONE, 10.0);
        let camera = Camera::new();
        let frame = compose_frame(
            &ViewPoint::from_camera(&camera),
            std::slice::from_ref(&light),
            &LightingParams::default(),
        );
        assert_eq!(frame.lights[0].color, [10.0, 10.0, 10.0]);
        assert_eq!(frame.lights[1], LightConstants::zeroed());
        assert_eq!(frame.specular_power, 256.0);
    }

    #[test]
    fn light_viewpoint_uses_light_matrices() {
        let mut light = Light::new(MeshId::new(0), Vec3::ONE, 90.0);
        light.entity_mut().set_position(Vec3::new(30.0, 20.0, 0.0));
        light.entity_mut().face_target(Vec3::new(15.0, 0.0, 0.0));
        let cone = ConeAngle::default();
        let viewpoint = ViewPoint::from_light(&light, cone);
        assert_eq!(viewpoint.view, light.view_matrix());
        assert_eq!(viewpoint.projection, light.projection_matrix(cone));
        assert_eq!(viewpoint.position, Vec3::new(30.0, 20.0, 0.0));
    }
}
