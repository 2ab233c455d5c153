//! The owned scene aggregate and the demo layout it is normally built with.

use glam::{Vec3, Vec4};
use log::info;

use crate::assets::{AssetCatalog, MeshId};
use crate::camera::Camera;
use crate::config::Settings;
use crate::constants::LightingParams;
use crate::error::InitError;
use crate::light::{ConeAngle, Light, LightBehavior};
use crate::material::{Material, Technique, TextureSet};
use crate::mesh::MeshProvider;
use crate::texture::{TextureKind, TextureProvider};
use crate::transform::Entity;

/// Index of a model within its [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

impl ModelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A renderable, shadow-casting object.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub entity: Entity,
    pub material: Material,
}

impl Model {
    pub fn new(name: impl Into<String>, mesh: MeshId, material: Material) -> Self {
        Self {
            name: name.into(),
            entity: Entity::with_mesh(mesh),
            material,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.entity.set_position(position);
        self
    }

    pub fn rotated(mut self, rotation: Vec3) -> Self {
        self.entity.set_rotation(rotation);
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.entity.set_scale(scale);
        self
    }
}

/// Runtime switches flipped by the toggle keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effects {
    pub parallax: bool,
    pub spin: bool,
    pub wiggle: bool,
    /// Accumulated wiggle phase; zero whenever wiggle is off.
    pub wiggle_phase: f32,
}

impl Default for Effects {
    fn default() -> Self {
        Self {
            parallax: true,
            spin: true,
            wiggle: true,
            wiggle_phase: 0.0,
        }
    }
}

/// Owns every entity, light, the camera and the CPU-side assets they
/// reference. GPU copies of those assets live in the renderer.
#[derive(Debug)]
pub struct Scene {
    assets: AssetCatalog,
    models: Vec<Model>,
    lights: Vec<Light>,
    camera: Camera,
    character: ModelId,
    spinner: ModelId,
    marker_material: Material,
    pub lighting: LightingParams,
    pub effects: Effects,
    pub background: Vec4,
    shadow_map_size: u32,
}

impl Scene {
    /// Starts an empty scene around its two key models. `character` is what
    /// orbiting lights circle and the character keys drive; `spinner` is
    /// turned by the spin effect.
    pub fn new(
        assets: AssetCatalog,
        character: Model,
        spinner: Model,
        marker_material: Material,
        shadow_map_size: u32,
    ) -> Self {
        Self {
            assets,
            models: vec![character, spinner],
            lights: Vec::new(),
            camera: Camera::new(),
            character: ModelId(0),
            spinner: ModelId(1),
            marker_material,
            lighting: LightingParams::default(),
            effects: Effects::default(),
            background: Vec4::new(0.2, 0.2, 0.3, 1.0),
            shadow_map_size,
        }
    }

    pub fn add_model(&mut self, model: Model) -> ModelId {
        self.models.push(model);
        ModelId(self.models.len() - 1)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn assets(&self) -> &AssetCatalog {
        &self.assets
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.0)
    }

    pub fn character(&self) -> ModelId {
        self.character
    }

    pub fn spinner(&self) -> ModelId {
        self.spinner
    }

    pub fn character_mut(&mut self) -> &mut Model {
        &mut self.models[self.character.0]
    }

    pub fn spinner_mut(&mut self) -> &mut Model {
        &mut self.models[self.spinner.0]
    }

    pub fn character_position(&self) -> Vec3 {
        self.models[self.character.0].entity.position()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn marker_material(&self) -> Material {
        self.marker_material
    }

    pub fn shadow_map_size(&self) -> u32 {
        self.shadow_map_size
    }

    /// Parameters as the composer should see them this frame: the parallax
    /// depth reads as zero while parallax mapping is switched off.
    pub fn lighting_params(&self) -> LightingParams {
        LightingParams {
            parallax_depth: if self.effects.parallax {
                self.lighting.parallax_depth
            } else {
                0.0
            },
            ..self.lighting
        }
    }

    /// Colour written into every non-marker object's constants: the colour
    /// of the first colour-cycling light, or white without one.
    pub fn object_tint(&self) -> Vec3 {
        self.lights
            .iter()
            .find(|light| light.color_cycle.is_some())
            .map(Light::color)
            .unwrap_or(Vec3::ONE)
    }

    /// Builds the demo scene: seven textured models, an orbiting colour
    /// cycling light and a pulsing light.
    pub fn demo(
        settings: &Settings,
        meshes: &dyn MeshProvider,
        textures: &dyn TextureProvider,
    ) -> Result<Self, InitError> {
        let mut assets = AssetCatalog::new();

        let character_mesh = assets.mesh(meshes, "teapot")?;
        let crate_mesh = assets.mesh(meshes, "crate")?;
        let ground_mesh = assets.mesh(meshes, "ground")?;
        let light_mesh = assets.mesh(meshes, "light")?;
        let sphere_mesh = assets.mesh(meshes, "sphere")?;
        let cube_mesh = assets.mesh(meshes, "cube")?;

        let mut texture = |name: &str, kind: TextureKind| assets.texture(textures, name, kind);
        let pattern = texture("PatternDiffuseSpecular.png", TextureKind::Color)?;
        let pattern_normal = texture("PatternNormal.png", TextureKind::Linear)?;
        let tech = texture("TechDiffuseSpecular.png", TextureKind::Color)?;
        let tech_normal_height = texture("TechNormalHeight.png", TextureKind::Linear)?;
        let lines = texture("Lines.png", TextureKind::Color)?;
        let cargo = texture("CargoA.png", TextureKind::Color)?;
        let grass = texture("GrassDiffuseSpecular.png", TextureKind::Color)?;
        let flare = texture("Flare.jpg", TextureKind::Color)?;
        let stone = texture("StoneDiffuseSpecular.png", TextureKind::Color)?;
        let wood = texture("wood2.jpg", TextureKind::Color)?;

        let character = Model::new(
            "character",
            character_mesh,
            Material::new(Technique::NormalMapping, TextureSet::pair(pattern, pattern_normal)),
        )
        .at(Vec3::new(15.0, 0.0, 0.0))
        .rotated(Vec3::new(0.0, 215f32.to_radians(), 0.0));
        let spinner = Model::new(
            "parallax cube",
            cube_mesh,
            Material::new(
                Technique::ParallaxMapping,
                TextureSet::pair(tech, tech_normal_height),
            ),
        )
        .at(Vec3::new(-20.0, 10.0, -3.0));

        let rendering = &settings.rendering;
        let mut scene = Scene::new(
            assets,
            character,
            spinner,
            Material::new(Technique::LightMarker, TextureSet::single(flare)),
            rendering.shadow_map_size,
        );
        scene.lighting = LightingParams {
            ambient_color: settings.ambient_color(),
            specular_power: rendering.specular_power,
            cone_angle: ConeAngle::clamped(rendering.cone_angle),
            parallax_depth: rendering.parallax_depth,
        };
        scene.background = Vec4::from_array(rendering.background_color);

        scene.add_model(Model::new(
            "ground",
            ground_mesh,
            Material::new(Technique::PixelLighting, TextureSet::single(grass)),
        ));
        scene.add_model(
            Model::new(
                "crate",
                crate_mesh,
                Material::new(Technique::PixelLighting, TextureSet::single(cargo)),
            )
            .at(Vec3::new(0.0, 0.0, 80.0))
            .rotated(Vec3::new(0.0, (-20f32).to_radians(), 0.0))
            .scaled(6.0),
        );
        scene.add_model(
            Model::new(
                "stone cube",
                cube_mesh,
                Material::new(Technique::PixelLighting, TextureSet::single(stone)),
            )
            .at(Vec3::new(20.0, 10.0, 40.0)),
        );
        scene.add_model(
            Model::new(
                "wiggle sphere",
                sphere_mesh,
                Material::new(Technique::Wiggle, TextureSet::single(lines)),
            )
            .at(Vec3::new(50.0, 0.0, -20.0)),
        );
        scene.add_model(
            Model::new(
                "lerp cube",
                cube_mesh,
                Material::new(Technique::Lerp, TextureSet::pair(wood, stone)),
            )
            .at(Vec3::new(40.0, 10.0, 10.0)),
        );

        let animation = &settings.animation;
        let character_position = scene.character_position();

        let mut orbiting = Light::new(light_mesh, Vec3::new(0.8, 0.8, 1.0), 90.0)
            .with_behavior(LightBehavior::Orbiting(animation.orbit()))
            .with_color_cycle(animation.color_cycle());
        orbiting.entity_mut().set_position(Vec3::new(30.0, 20.0, 0.0));
        orbiting.entity_mut().face_target(character_position);
        scene.add_light(orbiting);

        let mut pulsing = Light::new(light_mesh, Vec3::new(1.0, 0.8, 0.2), 40.0)
            .with_behavior(LightBehavior::Pulsing(animation.pulse()));
        pulsing.entity_mut().set_position(Vec3::new(-20.0, 30.0, 20.0));
        pulsing.entity_mut().face_target(Vec3::ZERO);
        scene.add_light(pulsing);

        let window = &settings.window;
        let camera = scene.camera_mut();
        camera.set_position(Vec3::new(15.0, 30.0, -70.0));
        camera.set_rotation(Vec3::new(13f32.to_radians(), 0.0, 0.0));
        camera.set_aspect(window.width.max(1) as f32 / window.height.max(1) as f32);

        info!(
            "scene ready: {} models, {} lights, {} meshes, {} textures",
            scene.models.len(),
            scene.lights.len(),
            scene.assets.mesh_count(),
            scene.assets.texture_count()
        );
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::ProceduralMeshes;
    use crate::texture::ProceduralTextures;

    fn demo() -> Scene {
        Scene::demo(
            &Settings::default(),
            &ProceduralMeshes,
            &ProceduralTextures { size: 8 },
        )
        .unwrap()
    }

    #[test]
    fn demo_layout_matches_expected_objects() {
        let scene = demo();
        assert_eq!(scene.models().len(), 7);
        assert_eq!(scene.lights().len(), 2);
        assert_eq!(scene.character_position(), Vec3::new(15.0, 0.0, 0.0));
        let spinner = scene.model(scene.spinner()).unwrap();
        assert_eq!(spinner.material.technique, Technique::ParallaxMapping);
        assert!(scene.models().iter().all(|model| model.material.is_complete()));
        assert!(scene.marker_material().is_complete());
    }

    #[test]
    fn meshes_are_shared_between_models() {
        let scene = demo();
        let cubes: Vec<_> = scene
            .models()
            .iter()
            .filter(|model| model.name.ends_with("cube"))
            .map(|model| model.entity.mesh())
            .collect();
        assert_eq!(cubes.len(), 3);
        assert!(cubes.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(scene.assets().mesh_count(), 6);
    }

    #[test]
    fn lights_start_with_expected_strengths_and_roles() {
        let scene = demo();
        let [orbiting, pulsing] = scene.lights() else {
            panic!("expected two lights");
        };
        assert_eq!(orbiting.strength(), 90.0);
        assert_eq!(pulsing.strength(), 40.0);
        assert!(matches!(orbiting.behavior, LightBehavior::Orbiting(_)));
        assert!(matches!(pulsing.behavior, LightBehavior::Pulsing(_)));
        assert_eq!(scene.object_tint(), orbiting.color());
    }

    #[test]
    fn parallax_depth_reads_zero_when_disabled() {
        let mut scene = demo();
        assert_eq!(scene.lighting_params().parallax_depth, 0.08);
        scene.effects.parallax = false;
        assert_eq!(scene.lighting_params().parallax_depth, 0.0);
    }

    #[test]
    fn missing_texture_aborts_initialisation() {
        struct NoTextures;
        impl TextureProvider for NoTextures {
            fn load(&self, name: &str, _kind: TextureKind) -> Result<crate::texture::TextureData, InitError> {
                Err(InitError::texture(name, "not found"))
            }
        }
        let err = Scene::demo(&Settings::default(), &ProceduralMeshes, &NoTextures).unwrap_err();
        assert!(err.to_string().contains("PatternDiffuseSpecular.png"));
    }
}
