//! Depth-only passes rendering the scene from each light into its shadow map.

use crate::constants::{compose_frame, PerObjectConstants, ViewPoint};
use crate::material::Technique;
use crate::scene::Scene;

use super::commands::{FrameCommands, PassTarget, RenderCommand, Viewport};

/// Records one shadow pass per light, in light order. Passes run one after
/// another because they share the single depth-output binding.
pub fn record_shadow_passes(scene: &Scene, frame: &mut FrameCommands) {
    for index in 0..scene.lights().len() {
        record_shadow_pass(scene, index, frame);
    }
}

/// Renders every model's depth from the light at `light_index`. Every model
/// casts a shadow; nothing is culled.
pub fn record_shadow_pass(scene: &Scene, light_index: usize, frame: &mut FrameCommands) {
    let Some(light) = scene.lights().get(light_index) else {
        return;
    };
    let params = scene.lighting_params();

    frame.begin_pass(
        format!("shadow-map-{light_index}"),
        PassTarget::ShadowMap(light_index),
        None,
        Viewport::square(scene.shadow_map_size()),
    );

    let viewpoint = ViewPoint::from_light(light, params.cone_angle);
    let slot = frame.upload_frame_constants(compose_frame(&viewpoint, scene.lights(), &params));
    frame.record(RenderCommand::SetFrameConstants(slot));
    frame.record(RenderCommand::SetTechnique(Technique::DepthOnly));

    let tint = scene.object_tint();
    for model in scene.models() {
        let Some(mesh) = model.entity.mesh() else {
            continue;
        };
        let object = frame.upload_object_constants(PerObjectConstants::new(
            model.entity.world_matrix(),
            tint,
            scene.effects.wiggle_phase,
        ));
        frame.record(RenderCommand::Draw { mesh, object });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::mesh::ProceduralMeshes;
    use crate::texture::ProceduralTextures;

    fn demo() -> Scene {
        Scene::demo(
            &Settings::default(),
            &ProceduralMeshes,
            &ProceduralTextures { size: 4 },
        )
        .unwrap()
    }

    #[test]
    fn one_depth_only_pass_per_light() {
        let scene = demo();
        let mut frame = FrameCommands::new();
        record_shadow_passes(&scene, &mut frame);

        assert_eq!(frame.passes.len(), 2);
        for (index, pass) in frame.passes.iter().enumerate() {
            assert_eq!(pass.target, PassTarget::ShadowMap(index));
            assert_eq!(pass.clear_color, None);
            assert_eq!(pass.clear_depth, 1.0);
            assert_eq!(pass.viewport, Viewport::square(2048));
            assert_eq!(pass.commands[1], RenderCommand::SetTechnique(Technique::DepthOnly));
            assert_eq!(pass.draw_count(), scene.models().len());
        }
    }

    #[test]
    fn frame_constants_use_the_lights_matrices() {
        let scene = demo();
        let mut frame = FrameCommands::new();
        record_shadow_pass(&scene, 1, &mut frame);

        let light = &scene.lights()[1];
        let constants = &frame.frame_constants[0];
        assert_eq!(constants.view, light.view_matrix().to_cols_array_2d());
        assert_eq!(
            constants.projection,
            light
                .projection_matrix(scene.lighting.cone_angle)
                .to_cols_array_2d()
        );
    }

    #[test]
    fn missing_light_records_nothing() {
        let scene = demo();
        let mut frame = FrameCommands::new();
        record_shadow_pass(&scene, 5, &mut frame);
        assert!(frame.passes.is_empty());
    }
}
