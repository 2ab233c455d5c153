//! Shading techniques and the per-object material records that select them.

use crate::assets::TextureId;

/// Vertex programs shared between techniques.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStage {
    /// Position only, for depth passes and light markers.
    BasicTransform,
    /// World position, normal and uv for per-pixel lighting.
    PixelLighting,
    /// Adds the tangent frame needed by normal and parallax mapping.
    NormalMapping,
    /// Pixel lighting with a time-driven displacement along the normal.
    Wiggle,
}

impl VertexStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::BasicTransform => "vs_basic_transform",
            Self::PixelLighting => "vs_pixel_lighting",
            Self::NormalMapping => "vs_normal_mapping",
            Self::Wiggle => "vs_wiggle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Opaque,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthMode {
    ReadWrite,
    /// Depth test against the buffer but never write it.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    Back,
    None,
}

/// Fixed-function state a technique is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub blend: BlendMode,
    pub depth: DepthMode,
    pub cull: CullMode,
    /// False for depth-only rendering into a shadow map.
    pub color_output: bool,
}

impl RenderState {
    pub const OPAQUE: Self = Self {
        blend: BlendMode::Opaque,
        depth: DepthMode::ReadWrite,
        cull: CullMode::Back,
        color_output: true,
    };
}

/// The fixed set of shading techniques the renderer can draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technique {
    DepthOnly,
    /// Diffuse + specular with shadows from both lights.
    PixelLighting,
    NormalMapping,
    ParallaxMapping,
    Wiggle,
    /// Two diffuse maps blended by the object tint.
    Lerp,
    LightMarker,
}

impl Technique {
    pub const ALL: [Technique; 7] = [
        Technique::DepthOnly,
        Technique::PixelLighting,
        Technique::NormalMapping,
        Technique::ParallaxMapping,
        Technique::Wiggle,
        Technique::Lerp,
        Technique::LightMarker,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::DepthOnly => "depth-only",
            Self::PixelLighting => "pixel-lighting",
            Self::NormalMapping => "normal-mapping",
            Self::ParallaxMapping => "parallax-mapping",
            Self::Wiggle => "wiggle",
            Self::Lerp => "lerp",
            Self::LightMarker => "light-marker",
        }
    }

    pub fn vertex_stage(self) -> VertexStage {
        match self {
            Self::DepthOnly | Self::LightMarker => VertexStage::BasicTransform,
            Self::PixelLighting => VertexStage::PixelLighting,
            Self::NormalMapping | Self::ParallaxMapping => VertexStage::NormalMapping,
            Self::Wiggle | Self::Lerp => VertexStage::Wiggle,
        }
    }

    /// Fragment entry point, `None` when no colour is produced.
    pub fn pixel_entry_point(self) -> Option<&'static str> {
        match self {
            Self::DepthOnly => None,
            Self::PixelLighting => Some("fs_pixel_lighting"),
            Self::NormalMapping => Some("fs_normal_mapping"),
            Self::ParallaxMapping => Some("fs_parallax_mapping"),
            Self::Wiggle => Some("fs_wiggle"),
            Self::Lerp => Some("fs_lerp"),
            Self::LightMarker => Some("fs_light_model"),
        }
    }

    pub fn render_state(self) -> RenderState {
        match self {
            Self::DepthOnly => RenderState {
                color_output: false,
                ..RenderState::OPAQUE
            },
            Self::LightMarker => RenderState {
                blend: BlendMode::Additive,
                depth: DepthMode::ReadOnly,
                cull: CullMode::None,
                color_output: true,
            },
            _ => RenderState::OPAQUE,
        }
    }

    /// Number of material texture slots the pixel stage reads.
    pub fn texture_slots(self) -> usize {
        match self {
            Self::DepthOnly => 0,
            Self::PixelLighting | Self::Wiggle | Self::LightMarker => 1,
            Self::NormalMapping | Self::ParallaxMapping | Self::Lerp => 2,
        }
    }

    /// True for techniques whose pixel stage samples the shadow maps.
    pub fn reads_shadow_maps(self) -> bool {
        !matches!(self, Self::DepthOnly | Self::LightMarker)
    }
}

/// Textures bound to material slots 0 and 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextureSet {
    pub diffuse: Option<TextureId>,
    pub secondary: Option<TextureId>,
}

impl TextureSet {
    pub fn single(diffuse: TextureId) -> Self {
        Self {
            diffuse: Some(diffuse),
            secondary: None,
        }
    }

    pub fn pair(diffuse: TextureId, secondary: TextureId) -> Self {
        Self {
            diffuse: Some(diffuse),
            secondary: Some(secondary),
        }
    }

    pub fn bound_slots(&self) -> usize {
        usize::from(self.diffuse.is_some()) + usize::from(self.secondary.is_some())
    }
}

/// How one object is shaded in the main pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Material {
    pub technique: Technique,
    pub textures: TextureSet,
}

impl Material {
    pub fn new(technique: Technique, textures: TextureSet) -> Self {
        Self {
            technique,
            textures,
        }
    }

    /// True when every texture slot the technique reads is filled.
    pub fn is_complete(&self) -> bool {
        self.textures.bound_slots() >= self.technique.texture_slots()
            && (self.technique.texture_slots() == 0 || self.textures.diffuse.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_marker_state_is_additive_read_only_unculled() {
        let state = Technique::LightMarker.render_state();
        assert_eq!(state.blend, BlendMode::Additive);
        assert_eq!(state.depth, DepthMode::ReadOnly);
        assert_eq!(state.cull, CullMode::None);
    }

    #[test]
    fn depth_only_writes_no_color() {
        let state = Technique::DepthOnly.render_state();
        assert!(!state.color_output);
        assert_eq!(state.depth, DepthMode::ReadWrite);
        assert_eq!(Technique::DepthOnly.pixel_entry_point(), None);
    }

    #[test]
    fn lerp_reuses_wiggle_vertex_stage() {
        assert_eq!(Technique::Lerp.vertex_stage(), VertexStage::Wiggle);
        assert_eq!(Technique::ParallaxMapping.vertex_stage(), VertexStage::NormalMapping);
    }

    #[test]
    fn material_completeness_follows_technique_slots() {
        let texture = TextureId::new(0);
        assert!(Material::new(Technique::PixelLighting, TextureSet::single(texture)).is_complete());
        assert!(!Material::new(Technique::NormalMapping, TextureSet::single(texture)).is_complete());
        assert!(Material::new(Technique::Lerp, TextureSet::pair(texture, texture)).is_complete());
        assert!(Material::new(Technique::DepthOnly, TextureSet::default()).is_complete());
    }
}
