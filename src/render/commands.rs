//! Recorded frame: constant uploads plus an ordered list of passes.
//!
//! Pass drivers only ever append to a [`FrameCommands`]; the GPU backend
//! and the binding audit consume it. Constant blocks are stored in upload
//! order and draws refer to them by slot, so every upload visibly precedes
//! the draws that read it.

use crate::assets::MeshId;
use crate::constants::{PerFrameConstants, PerObjectConstants};
use crate::material::{Technique, TextureSet};

/// Where a pass renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassTarget {
    /// Depth-only rendering into the shadow map of the light at this index.
    ShadowMap(usize),
    /// Swap-chain colour image plus the main depth buffer.
    BackBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCommand {
    /// Bind the per-frame block uploaded at this slot.
    SetFrameConstants(usize),
    SetTechnique(Technique),
    BindMaterial(TextureSet),
    /// Expose every light's shadow map to the pixel stage.
    BindShadowMaps,
    UnbindShadowMaps,
    Draw { mesh: MeshId, object: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub label: String,
    pub target: PassTarget,
    /// `None` for passes without a colour target.
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: f32,
    pub viewport: Viewport,
    pub commands: Vec<RenderCommand>,
}

impl PassRecord {
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::Draw { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCommands {
    pub frame_constants: Vec<PerFrameConstants>,
    pub object_constants: Vec<PerObjectConstants>,
    pub passes: Vec<PassRecord>,
}

impl FrameCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an upload and returns the slot draws should reference.
    pub fn upload_frame_constants(&mut self, constants: PerFrameConstants) -> usize {
        self.frame_constants.push(constants);
        self.frame_constants.len() - 1
    }

    pub fn upload_object_constants(&mut self, constants: PerObjectConstants) -> usize {
        self.object_constants.push(constants);
        self.object_constants.len() - 1
    }

    /// Opens a new pass; subsequent commands go to [`Self::record`].
    pub fn begin_pass(
        &mut self,
        label: impl Into<String>,
        target: PassTarget,
        clear_color: Option<[f32; 4]>,
        viewport: Viewport,
    ) {
        self.passes.push(PassRecord {
            label: label.into(),
            target,
            clear_color,
            clear_depth: 1.0,
            viewport,
            commands: Vec::new(),
        });
    }

    /// Appends to the most recently opened pass. Commands recorded before
    /// any pass is open are dropped.
    pub fn record(&mut self, command: RenderCommand) {
        if let Some(pass) = self.passes.last_mut() {
            pass.commands.push(command);
        } else {
            log::warn!("dropping {command:?} recorded outside a pass");
        }
    }

    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(PassRecord::draw_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    #[test]
    fn uploads_return_sequential_slots() {
        let mut frame = FrameCommands::new();
        assert_eq!(frame.upload_frame_constants(PerFrameConstants::zeroed()), 0);
        assert_eq!(frame.upload_frame_constants(PerFrameConstants::zeroed()), 1);
        assert_eq!(frame.upload_object_constants(PerObjectConstants::zeroed()), 0);
    }

    #[test]
    fn commands_land_in_latest_pass() {
        let mut frame = FrameCommands::new();
        frame.record(RenderCommand::BindShadowMaps);
        frame.begin_pass("shadow", PassTarget::ShadowMap(0), None, Viewport::square(64));
        frame.record(RenderCommand::Draw {
            mesh: MeshId::new(0),
            object: 0,
        });
        frame.begin_pass("main", PassTarget::BackBuffer, Some([0.0; 4]), Viewport::new(8, 4));
        frame.record(RenderCommand::UnbindShadowMaps);

        assert_eq!(frame.passes[0].commands.len(), 1);
        assert_eq!(frame.passes[1].commands, vec![RenderCommand::UnbindShadowMaps]);
        assert_eq!(frame.draw_count(), 1);
        assert_eq!(frame.passes[1].viewport.aspect(), 2.0);
    }
}
