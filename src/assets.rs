//! Name-deduplicated store of meshes and textures, addressed by copyable ids.

use std::collections::HashMap;

use log::info;

use crate::error::InitError;
use crate::mesh::{MeshData, MeshProvider};
use crate::texture::{TextureData, TextureKind, TextureProvider};

/// Handle to a mesh owned by an [`AssetCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

impl MeshId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a texture owned by an [`AssetCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(usize);

impl TextureId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Loaded geometry and images. Entities only ever hold ids into it, so one
/// mesh can back many entities and outlives all of them.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    meshes: Vec<(String, MeshData)>,
    textures: Vec<(String, TextureData)>,
    mesh_lookup: HashMap<String, MeshId>,
    texture_lookup: HashMap<(String, TextureKind), TextureId>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, loading it through `provider` the first
    /// time it is requested.
    pub fn mesh(&mut self, provider: &dyn MeshProvider, name: &str) -> Result<MeshId, InitError> {
        if let Some(id) = self.mesh_lookup.get(name) {
            return Ok(*id);
        }
        let data = provider.load(name)?;
        info!(
            "loaded mesh {name} ({} vertices, {} triangles)",
            data.vertices.len(),
            data.triangle_count()
        );
        let id = MeshId::new(self.meshes.len());
        self.meshes.push((name.to_string(), data));
        self.mesh_lookup.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn texture(
        &mut self,
        provider: &dyn TextureProvider,
        name: &str,
        kind: TextureKind,
    ) -> Result<TextureId, InitError> {
        let key = (name.to_string(), kind);
        if let Some(id) = self.texture_lookup.get(&key) {
            return Ok(*id);
        }
        let data = provider.load(name, kind)?;
        info!("loaded texture {name} ({}x{})", data.width, data.height);
        let id = TextureId::new(self.textures.len());
        self.textures.push((name.to_string(), data));
        self.texture_lookup.insert(key, id);
        Ok(id)
    }

    pub fn texture_data(&self, id: TextureId) -> Option<&TextureData> {
        self.textures.get(id.index()).map(|(_, data)| data)
    }

    pub fn mesh_name(&self, id: MeshId) -> Option<&str> {
        self.meshes.get(id.index()).map(|(name, _)| name.as_str())
    }

    /// Meshes in id order.
    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &str, &MeshData)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(index, (name, data))| (MeshId::new(index), name.as_str(), data))
    }

    /// Textures in id order.
    pub fn textures(&self) -> impl Iterator<Item = (TextureId, &str, &TextureData)> {
        self.textures
            .iter()
            .enumerate()
            .map(|(index, (name, data))| (TextureId::new(index), name.as_str(), data))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::mesh::ProceduralMeshes;
    use crate::texture::ProceduralTextures;

    struct CountingMeshes(Cell<usize>);

    impl MeshProvider for CountingMeshes {
        fn load(&self, name: &str) -> Result<MeshData, InitError> {
            self.0.set(self.0.get() + 1);
            ProceduralMeshes.load(name)
        }
    }

    #[test]
    fn meshes_are_shared_by_name() {
        let provider = CountingMeshes(Cell::new(0));
        let mut catalog = AssetCatalog::new();
        let first = catalog.mesh(&provider, "cube").unwrap();
        let second = catalog.mesh(&provider, "cube").unwrap();
        let sphere = catalog.mesh(&provider, "sphere").unwrap();
        assert_eq!(first, second);
        assert_ne!(first, sphere);
        assert_eq!(provider.0.get(), 2);
        assert_eq!(catalog.mesh_name(sphere), Some("sphere"));
    }

    #[test]
    fn texture_kind_is_part_of_the_key() {
        let provider = ProceduralTextures { size: 4 };
        let mut catalog = AssetCatalog::new();
        let color = catalog.texture(&provider, "Lines.png", TextureKind::Color).unwrap();
        let linear = catalog.texture(&provider, "Lines.png", TextureKind::Linear).unwrap();
        assert_ne!(color, linear);
        assert_eq!(catalog.texture_count(), 2);
        assert_eq!(catalog.texture_data(linear).unwrap().kind, TextureKind::Linear);
    }

    #[test]
    fn provider_failure_propagates() {
        let mut catalog = AssetCatalog::new();
        assert!(catalog.mesh(&ProceduralMeshes, "missing").is_err());
        assert_eq!(catalog.mesh_count(), 0);
    }
}
