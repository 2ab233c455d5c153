pub mod audit;
pub mod commands;
pub mod gpu;
pub mod main_pass;
pub mod shaders;
pub mod shadow_pass;

pub use audit::{BindingAudit, BindingHazard};
pub use commands::{FrameCommands, PassRecord, PassTarget, RenderCommand, Viewport};
pub use gpu::Renderer;
pub use main_pass::record_main_pass;
pub use shadow_pass::{record_shadow_pass, record_shadow_passes};

use crate::scene::Scene;

/// Records one complete frame: every light's shadow pass, then the camera
/// pass that samples them.
pub fn record_frame(scene: &Scene, viewport: Viewport) -> FrameCommands {
    let mut frame = FrameCommands::new();
    record_shadow_passes(scene, &mut frame);
    record_main_pass(scene, viewport, &mut frame);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::mesh::ProceduralMeshes;
    use crate::texture::ProceduralTextures;

    #[test]
    fn shadow_passes_precede_the_main_pass() {
        let scene = Scene::demo(
            &Settings::default(),
            &ProceduralMeshes,
            &ProceduralTextures { size: 4 },
        )
        .unwrap();
        let frame = record_frame(&scene, Viewport::new(640, 480));
        let targets: Vec<PassTarget> = frame.passes.iter().map(|pass| pass.target).collect();
        assert_eq!(
            targets,
            vec![
                PassTarget::ShadowMap(0),
                PassTarget::ShadowMap(1),
                PassTarget::BackBuffer
            ]
        );
        assert_eq!(frame.frame_constants.len(), 3);
        assert!(BindingAudit::new(2).audit_frame(&frame).is_empty());
    }
}
