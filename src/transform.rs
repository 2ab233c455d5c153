//! Position/rotation/scale state shared by models, lights and the camera.
//!
//! Rotations are Euler angles in radians. The world matrix applies scale,
//! then rotation about X, then Y, then Z, then translation, in a left-handed
//! space where +Z is forward and +Y is up.

use glam::{Affine3A, Mat4, Vec3};

use crate::assets::MeshId;
use crate::input::{InputProvider, KeyCode, NamedKey};

/// Radians per second applied while a turn key is held.
pub const ROTATION_SPEED: f32 = 2.0;
/// Units per second applied while a movement key is held.
pub const MOVEMENT_SPEED: f32 = 50.0;

/// A placed object: camera, light fixture or renderable model.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    mesh: Option<MeshId>,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            mesh: None,
        }
    }
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entity drawn with the given shared mesh.
    pub fn with_mesh(mesh: MeshId) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
    }

    /// Uniform scale.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = Vec3::splat(scale);
    }

    /// Current world matrix. Derived from the transform fields on every call,
    /// so it can never be stale.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_scale(self.scale)
    }

    /// Unit forward (+Z) axis of the world matrix.
    pub fn facing(&self) -> Vec3 {
        self.world_matrix().z_axis.truncate().normalize_or_zero()
    }

    /// Turns the entity so its forward axis points at `target`. Roll is
    /// reset to zero. Leaves the rotation untouched when the target sits on
    /// the entity's own position.
    pub fn face_target(&mut self, target: Vec3) {
        let offset = target - self.position;
        if offset.length_squared() <= f32::EPSILON {
            return;
        }
        let direction = offset.normalize();
        let pitch = (-direction.y).clamp(-1.0, 1.0).asin();
        let yaw = direction.x.atan2(direction.z);
        self.rotation = Vec3::new(pitch, yaw, 0.0);
    }

    /// Applies held-key turning and movement for `dt` seconds. Movement runs
    /// along the entity's local axes, so "forward" is wherever it faces.
    pub fn control(&mut self, dt: f32, keys: &ControlKeys, input: &dyn InputProvider) {
        let held = |key: Option<KeyCode>| key.is_some_and(|key| input.is_key_held(key));
        let turn = ROTATION_SPEED * dt;

        if held(keys.turn_down) {
            self.rotation.x += turn;
        }
        if held(keys.turn_up) {
            self.rotation.x -= turn;
        }
        if held(keys.turn_right) {
            self.rotation.y += turn;
        }
        if held(keys.turn_left) {
            self.rotation.y -= turn;
        }
        if held(keys.turn_cw) {
            self.rotation.z += turn;
        }
        if held(keys.turn_ccw) {
            self.rotation.z -= turn;
        }

        let world = self.world_matrix();
        let right = world.x_axis.truncate().normalize_or_zero();
        let up = world.y_axis.truncate().normalize_or_zero();
        let forward = world.z_axis.truncate().normalize_or_zero();
        let step = MOVEMENT_SPEED * dt;

        let mut delta = Vec3::ZERO;
        if held(keys.move_forward) {
            delta += forward;
        }
        if held(keys.move_backward) {
            delta -= forward;
        }
        if held(keys.move_right) {
            delta += right;
        }
        if held(keys.move_left) {
            delta -= right;
        }
        if held(keys.move_up) {
            delta += up;
        }
        if held(keys.move_down) {
            delta -= up;
        }
        self.position += delta * step;
    }
}

/// Inverse of a rotation + translation (+ scale) transform. Turns a
/// camera-like world placement into a view matrix.
pub fn inverse_affine(matrix: Mat4) -> Mat4 {
    Mat4::from(Affine3A::from_mat4(matrix).inverse())
}

/// Keys driving [`Entity::control`]. Unbound actions are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlKeys {
    pub turn_up: Option<KeyCode>,
    pub turn_down: Option<KeyCode>,
    pub turn_left: Option<KeyCode>,
    pub turn_right: Option<KeyCode>,
    pub turn_cw: Option<KeyCode>,
    pub turn_ccw: Option<KeyCode>,
    pub move_forward: Option<KeyCode>,
    pub move_backward: Option<KeyCode>,
    pub move_left: Option<KeyCode>,
    pub move_right: Option<KeyCode>,
    pub move_up: Option<KeyCode>,
    pub move_down: Option<KeyCode>,
}

impl ControlKeys {
    /// I/K pitch, J/L yaw, U/O roll, `.`/`,` forward and back.
    pub fn character() -> Self {
        Self {
            turn_up: Some(KeyCode::Character('I')),
            turn_down: Some(KeyCode::Character('K')),
            turn_left: Some(KeyCode::Character('J')),
            turn_right: Some(KeyCode::Character('L')),
            turn_cw: Some(KeyCode::Character('U')),
            turn_ccw: Some(KeyCode::Character('O')),
            move_forward: Some(KeyCode::Named(NamedKey::Period)),
            move_backward: Some(KeyCode::Named(NamedKey::Comma)),
            ..Self::default()
        }
    }

    /// Arrow keys turn, W/S/A/D move.
    pub fn camera() -> Self {
        Self {
            turn_up: Some(KeyCode::Named(NamedKey::Up)),
            turn_down: Some(KeyCode::Named(NamedKey::Down)),
            turn_left: Some(KeyCode::Named(NamedKey::Left)),
            turn_right: Some(KeyCode::Named(NamedKey::Right)),
            move_forward: Some(KeyCode::Character('W')),
            move_backward: Some(KeyCode::Character('S')),
            move_left: Some(KeyCode::Character('A')),
            move_right: Some(KeyCode::Character('D')),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn position_only_is_pure_translation() {
        let mut entity = Entity::new();
        entity.set_position(Vec3::new(3.0, -2.0, 7.5));
        let expected = Mat4::from_translation(Vec3::new(3.0, -2.0, 7.5));
        assert!(entity.world_matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn inverse_affine_undoes_world_matrix() {
        let mut entity = Entity::new();
        entity.set_position(Vec3::new(-20.0, 30.0, 20.0));
        entity.set_rotation(Vec3::new(0.4, -1.2, 0.3));
        entity.set_scale(4.0);
        let world = entity.world_matrix();
        let product = inverse_affine(world) * world;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn face_target_points_forward_axis_at_target() {
        let mut entity = Entity::new();
        entity.set_position(Vec3::new(30.0, 20.0, 0.0));
        entity.set_scale(23.0);
        let target = Vec3::new(15.0, 0.0, 0.0);
        entity.face_target(target);
        let expected = (target - entity.position()).normalize();
        assert_vec_close(entity.facing(), expected);
    }

    #[test]
    fn face_target_straight_down() {
        let mut entity = Entity::new();
        entity.set_position(Vec3::new(0.0, 10.0, 0.0));
        entity.face_target(Vec3::ZERO);
        assert_vec_close(entity.facing(), Vec3::NEG_Y);
    }

    #[test]
    fn face_target_on_self_keeps_rotation() {
        let mut entity = Entity::new();
        entity.set_position(Vec3::new(1.0, 2.0, 3.0));
        entity.set_rotation(Vec3::new(0.1, 0.2, 0.3));
        entity.face_target(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(entity.rotation(), Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn control_with_zero_time_changes_nothing() {
        let mut input = InputState::new();
        for key in ['W', 'A', 'S', 'D'] {
            input.set_key_down(KeyCode::Character(key));
        }
        input.set_key_down(KeyCode::Named(NamedKey::Up));
        input.set_key_down(KeyCode::Named(NamedKey::Left));

        let mut entity = Entity::new();
        entity.set_position(Vec3::new(15.0, 30.0, -70.0));
        entity.set_rotation(Vec3::new(0.2, 0.0, 0.0));
        let before = entity.clone();
        entity.control(0.0, &ControlKeys::camera(), &input);
        assert_eq!(entity, before);
    }

    #[test]
    fn control_moves_along_local_forward() {
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('W'));

        let mut entity = Entity::new();
        entity.set_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        entity.control(0.5, &ControlKeys::camera(), &input);
        // Yawed a quarter turn: local forward is world +X.
        assert_vec_close(entity.position(), Vec3::new(MOVEMENT_SPEED * 0.5, 0.0, 0.0));
    }

    #[test]
    fn control_turns_at_rotation_speed() {
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('L'));
        input.set_key_down(KeyCode::Character('U'));

        let mut entity = Entity::new();
        entity.control(0.25, &ControlKeys::character(), &input);
        assert_vec_close(
            entity.rotation(),
            Vec3::new(0.0, ROTATION_SPEED * 0.25, ROTATION_SPEED * 0.25),
        );
    }
}
