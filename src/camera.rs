use glam::{Mat4, Vec3};

use crate::input::InputProvider;
use crate::transform::{inverse_affine, ControlKeys, Entity};

/// Perspective camera placed like any other entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    entity: Entity,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            entity: Entity::new(),
            fov: std::f32::consts::FRAC_PI_3,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    pub fn position(&self) -> Vec3 {
        self.entity.position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.entity.set_position(position);
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.entity.set_rotation(rotation);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(0.01);
    }

    pub fn view_matrix(&self) -> Mat4 {
        inverse_affine(self.entity.world_matrix())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov, self.aspect, self.near, self.far)
    }

    /// Projection applied after the view transform.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn control(&mut self, dt: f32, keys: &ControlKeys, input: &dyn InputProvider) {
        self.entity.control(dt, keys, input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_matrix_inverts_world() {
        let mut camera = Camera::new();
        camera.set_position(Vec3::new(15.0, 30.0, -70.0));
        camera.set_rotation(Vec3::new(13f32.to_radians(), 0.0, 0.0));
        let product = camera.view_matrix() * camera.entity().world_matrix();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn point_in_front_lands_inside_clip_volume() {
        let camera = Camera::new();
        let clip = camera.view_projection_matrix() * Vec3::new(0.0, 0.0, 50.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn aspect_is_kept_positive() {
        let mut camera = Camera::new();
        camera.set_aspect(0.0);
        assert!(camera.projection_matrix().is_finite());
    }
}
