//! Camera pass: every model with its own technique, then additive light
//! markers. Shadow maps are bound at the start of the pass and unbound at
//! the end so the next frame's shadow passes can write them again.

use crate::constants::{compose_frame, PerObjectConstants, ViewPoint};
use crate::material::{Material, Technique, TextureSet};
use crate::scene::Scene;

use super::commands::{FrameCommands, PassTarget, RenderCommand, Viewport};

/// Tracks what the pass has already bound so redundant rebinds are skipped.
#[derive(Default)]
struct BoundState {
    technique: Option<Technique>,
    textures: Option<TextureSet>,
}

impl BoundState {
    fn apply(&mut self, material: Material, frame: &mut FrameCommands) {
        if self.technique != Some(material.technique) {
            frame.record(RenderCommand::SetTechnique(material.technique));
            self.technique = Some(material.technique);
        }
        if material.technique.texture_slots() > 0 && self.textures != Some(material.textures) {
            frame.record(RenderCommand::BindMaterial(material.textures));
            self.textures = Some(material.textures);
        }
    }
}

pub fn record_main_pass(scene: &Scene, viewport: Viewport, frame: &mut FrameCommands) {
    frame.begin_pass(
        "main",
        PassTarget::BackBuffer,
        Some(scene.background.to_array()),
        viewport,
    );

    let viewpoint = ViewPoint::from_camera(scene.camera());
    let params = scene.lighting_params();
    let slot = frame.upload_frame_constants(compose_frame(&viewpoint, scene.lights(), &params));
    frame.record(RenderCommand::SetFrameConstants(slot));
    frame.record(RenderCommand::BindShadowMaps);

    // Group draws by technique; the sort is stable so scene order is kept
    // within a group.
    let mut order: Vec<usize> = (0..scene.models().len()).collect();
    order.sort_by_key(|&index| scene.models()[index].material.technique);

    let mut bound = BoundState::default();
    let tint = scene.object_tint();
    let wiggle = scene.effects.wiggle_phase;
    for index in order {
        let model = &scene.models()[index];
        let Some(mesh) = model.entity.mesh() else {
            continue;
        };
        bound.apply(model.material, frame);
        let object = frame.upload_object_constants(PerObjectConstants::new(
            model.entity.world_matrix(),
            tint,
            wiggle,
        ));
        frame.record(RenderCommand::Draw { mesh, object });
    }

    bound.apply(scene.marker_material(), frame);
    for light in scene.lights() {
        let Some(mesh) = light.entity().mesh() else {
            continue;
        };
        let object = frame.upload_object_constants(PerObjectConstants::new(
            light.entity().world_matrix(),
            light.color(),
            wiggle,
        ));
        frame.record(RenderCommand::Draw { mesh, object });
    }

    frame.record(RenderCommand::UnbindShadowMaps);
}
