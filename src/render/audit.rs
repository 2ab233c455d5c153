//! Replays recorded frames against a persistent binding model.
//!
//! Shader-resource bindings survive across passes and frames until they are
//! explicitly unbound, the way immediate-mode GPU APIs behave. Technique,
//! frame constants and material are scoped to the pass that sets them.

use thiserror::Error;

use crate::material::{Material, Technique, TextureSet};

use super::commands::{FrameCommands, PassTarget, RenderCommand};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingHazard {
    #[error("pass {pass} writes shadow map {shadow_map} while it is still bound as a shader input")]
    DepthTargetStillBound { pass: String, shadow_map: usize },

    #[error("pass {pass} binds the shadow maps while writing shadow map {shadow_map}")]
    ShadowMapReadWhileWritten { pass: String, shadow_map: usize },

    #[error("pass {pass} targets shadow map {shadow_map} but only {available} exist")]
    ShadowMapOutOfRange {
        pass: String,
        shadow_map: usize,
        available: usize,
    },

    #[error("pass {pass} draws before selecting a technique")]
    DrawWithoutTechnique { pass: String },

    #[error("pass {pass} draws before binding frame constants")]
    DrawWithoutFrameConstants { pass: String },

    #[error("pass {pass} draws with {technique:?} but its textures are not bound")]
    IncompleteMaterial { pass: String, technique: Technique },

    #[error("pass {pass} references frame constant slot {slot} of {available}")]
    FrameSlotOutOfRange {
        pass: String,
        slot: usize,
        available: usize,
    },

    #[error("pass {pass} references object constant slot {slot} of {available}")]
    ObjectSlotOutOfRange {
        pass: String,
        slot: usize,
        available: usize,
    },
}

/// Binding state carried from one audited frame to the next.
#[derive(Debug, Clone)]
pub struct BindingAudit {
    shadow_map_count: usize,
    shadow_maps_bound: bool,
    frames_audited: usize,
}

impl BindingAudit {
    pub fn new(shadow_map_count: usize) -> Self {
        Self {
            shadow_map_count,
            shadow_maps_bound: false,
            frames_audited: 0,
        }
    }

    /// True when shadow maps are still exposed to shaders after the last
    /// audited command.
    pub fn shadow_maps_bound(&self) -> bool {
        self.shadow_maps_bound
    }

    pub fn frames_audited(&self) -> usize {
        self.frames_audited
    }

    /// Replays one frame and returns every hazard found, in command order.
    pub fn audit_frame(&mut self, frame: &FrameCommands) -> Vec<BindingHazard> {
        let mut hazards = Vec::new();
        for pass in &frame.passes {
            let writing = match pass.target {
                PassTarget::ShadowMap(index) if index >= self.shadow_map_count => {
                    hazards.push(BindingHazard::ShadowMapOutOfRange {
                        pass: pass.label.clone(),
                        shadow_map: index,
                        available: self.shadow_map_count,
                    });
                    None
                }
                PassTarget::ShadowMap(index) => Some(index),
                PassTarget::BackBuffer => None,
            };
            if let (Some(index), true) = (writing, self.shadow_maps_bound) {
                hazards.push(BindingHazard::DepthTargetStillBound {
                    pass: pass.label.clone(),
                    shadow_map: index,
                });
            }

            let mut technique = None;
            let mut frame_constants = false;
            let mut textures = TextureSet::default();
            for command in &pass.commands {
                match *command {
                    RenderCommand::SetFrameConstants(slot) => {
                        if slot >= frame.frame_constants.len() {
                            hazards.push(BindingHazard::FrameSlotOutOfRange {
                                pass: pass.label.clone(),
                                slot,
                                available: frame.frame_constants.len(),
                            });
                        } else {
                            frame_constants = true;
                        }
                    }
                    RenderCommand::SetTechnique(next) => technique = Some(next),
                    RenderCommand::BindMaterial(next) => textures = next,
                    RenderCommand::BindShadowMaps => {
                        if let Some(index) = writing {
                            hazards.push(BindingHazard::ShadowMapReadWhileWritten {
                                pass: pass.label.clone(),
                                shadow_map: index,
                            });
                        }
                        self.shadow_maps_bound = true;
                    }
                    RenderCommand::UnbindShadowMaps => self.shadow_maps_bound = false,
                    RenderCommand::Draw { object, .. } => {
                        if object >= frame.object_constants.len() {
                            hazards.push(BindingHazard::ObjectSlotOutOfRange {
                                pass: pass.label.clone(),
                                slot: object,
                                available: frame.object_constants.len(),
                            });
                        }
                        if !frame_constants {
                            hazards.push(BindingHazard::DrawWithoutFrameConstants {
                                pass: pass.label.clone(),
                            });
                        }
                        match technique {
                            None => hazards.push(BindingHazard::DrawWithoutTechnique {
                                pass: pass.label.clone(),
                            }),
                            Some(technique) if !Material::new(technique, textures).is_complete() => {
                                hazards.push(BindingHazard::IncompleteMaterial {
                                    pass: pass.label.clone(),
                                    technique,
                                });
                            }
                            Some(_) => {}
                        }
                    }
                }
            }
        }
        self.frames_audited += 1;
        hazards
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;
    use crate::assets::{MeshId, TextureId};
    use crate::constants::{PerFrameConstants, PerObjectConstants};
    use crate::render::commands::Viewport;

    fn shadow_then_main(unbind: bool) -> FrameCommands {
        let mut frame = FrameCommands::new();
        let slot = frame.upload_frame_constants(PerFrameConstants::zeroed());
        let object = frame.upload_object_constants(PerObjectConstants::zeroed());
        let draw = RenderCommand::Draw {
            mesh: MeshId::new(0),
            object,
        };

        frame.begin_pass("shadow", PassTarget::ShadowMap(0), None, Viewport::square(16));
        frame.record(RenderCommand::SetFrameConstants(slot));
        frame.record(RenderCommand::SetTechnique(Technique::DepthOnly));
        frame.record(draw);

        frame.begin_pass("main", PassTarget::BackBuffer, Some([0.0; 4]), Viewport::new(4, 4));
        frame.record(RenderCommand::SetFrameConstants(slot));
        frame.record(RenderCommand::BindShadowMaps);
        frame.record(RenderCommand::SetTechnique(Technique::PixelLighting));
        frame.record(RenderCommand::BindMaterial(TextureSet::single(TextureId::new(0))));
        frame.record(draw);
        if unbind {
            frame.record(RenderCommand::UnbindShadowMaps);
        }
        frame
    }

    #[test]
    fn clean_frames_stay_clean() {
        let mut audit = BindingAudit::new(2);
        for _ in 0..3 {
            assert_eq!(audit.audit_frame(&shadow_then_main(true)), vec![]);
        }
        assert!(!audit.shadow_maps_bound());
        assert_eq!(audit.frames_audited(), 3);
    }

    #[test]
    fn forgotten_unbind_is_caught_next_frame() {
        let mut audit = BindingAudit::new(2);
        assert!(audit.audit_frame(&shadow_then_main(false)).is_empty());
        assert!(audit.shadow_maps_bound());

        let hazards = audit.audit_frame(&shadow_then_main(false));
        assert_eq!(
            hazards,
            vec![BindingHazard::DepthTargetStillBound {
                pass: "shadow".to_string(),
                shadow_map: 0,
            }]
        );
    }

    #[test]
    fn reading_shadow_maps_inside_shadow_pass_is_a_hazard() {
        let mut frame = FrameCommands::new();
        frame.begin_pass("shadow", PassTarget::ShadowMap(1), None, Viewport::square(16));
        frame.record(RenderCommand::BindShadowMaps);
        let hazards = BindingAudit::new(2).audit_frame(&frame);
        assert!(matches!(
            hazards.as_slice(),
            [BindingHazard::ShadowMapReadWhileWritten { shadow_map: 1, .. }]
        ));
    }

    #[test]
    fn draws_need_technique_constants_and_textures() {
        let mut frame = FrameCommands::new();
        frame.upload_object_constants(PerObjectConstants::zeroed());
        frame.begin_pass("main", PassTarget::BackBuffer, None, Viewport::new(4, 4));
        let draw = RenderCommand::Draw {
            mesh: MeshId::new(0),
            object: 0,
        };
        frame.record(draw);
        frame.record(RenderCommand::SetTechnique(Technique::Lerp));
        frame.record(RenderCommand::SetFrameConstants(3));
        frame.record(draw);

        let hazards = BindingAudit::new(2).audit_frame(&frame);
        assert_eq!(hazards.len(), 5);
        assert!(matches!(hazards[0], BindingHazard::DrawWithoutFrameConstants { .. }));
        assert!(matches!(hazards[1], BindingHazard::DrawWithoutTechnique { .. }));
        assert!(matches!(hazards[2], BindingHazard::FrameSlotOutOfRange { slot: 3, .. }));
        assert!(matches!(hazards[3], BindingHazard::DrawWithoutFrameConstants { .. }));
        assert!(matches!(
            hazards[4],
            BindingHazard::IncompleteMaterial {
                technique: Technique::Lerp,
                ..
            }
        ));
    }

    #[test]
    fn unknown_shadow_map_is_reported() {
        let mut frame = FrameCommands::new();
        frame.begin_pass("shadow", PassTarget::ShadowMap(2), None, Viewport::square(16));
        let hazards = BindingAudit::new(2).audit_frame(&frame);
        assert_eq!(hazards[0].to_string(), "pass shadow targets shadow map 2 but only 2 exist");
    }
}
