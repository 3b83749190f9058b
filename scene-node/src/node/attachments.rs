//! Render pair table

use super::Node;
use crate::error::RenderError;
use crate::render::{Material, Mesh, RenderPair, Texture};
use crate::types::BlendMode;
use std::sync::Arc;

impl Node {
    /// Append a pair drawn at LOD level 0
    pub fn add_render_pair(&self, material: Arc<Material>, mesh: Arc<Mesh>) {
        self.render_pairs.lock().push(RenderPair {
            material,
            mesh,
            lod: 0,
        });
    }

    /// Snapshot of the render pairs
    pub fn render_pairs(&self) -> Vec<RenderPair> {
        self.render_pairs.lock().clone()
    }

    /// Number of render pairs
    pub fn render_pair_count(&self) -> usize {
        self.render_pairs.lock().len()
    }

    fn with_pair<T>(
        &self,
        op: &str,
        index: usize,
        f: impl FnOnce(&mut RenderPair) -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        let mut pairs = self.render_pairs.lock();
        let len = pairs.len();
        let result = match pairs.get_mut(index) {
            Some(pair) => f(pair),
            None => Err(RenderError::IndexOutOfRange { index, len }),
        };
        drop(pairs);

        if let Err(err) = &result {
            log::warn!("{} {:?}: {}: {}", self.class_name(), self.id(), op, err);
        }
        result
    }

    /// Material of the pair at `index`
    pub fn material(&self, index: usize) -> Result<Arc<Material>, RenderError> {
        self.with_pair("material", index, |pair| Ok(Arc::clone(&pair.material)))
    }

    /// Mesh of the pair at `index`
    pub fn mesh(&self, index: usize) -> Result<Arc<Mesh>, RenderError> {
        self.with_pair("mesh", index, |pair| Ok(Arc::clone(&pair.mesh)))
    }

    /// Swap the material of one pair, releasing the old one
    pub fn replace_material(&self, material: Arc<Material>, index: usize) -> Result<(), RenderError> {
        let old = self.with_pair("replace_material", index, |pair| {
            Ok(std::mem::replace(&mut pair.material, material))
        })?;
        drop(old);
        Ok(())
    }

    /// Swap the mesh of one pair, releasing the old one
    pub fn replace_mesh(&self, mesh: Arc<Mesh>, index: usize) -> Result<(), RenderError> {
        let old = self.with_pair("replace_mesh", index, |pair| {
            Ok(std::mem::replace(&mut pair.mesh, mesh))
        })?;
        drop(old);
        Ok(())
    }

    /// LOD level the pair at `index` draws with
    pub fn lod_level(&self, index: usize) -> Result<usize, RenderError> {
        self.with_pair("lod_level", index, |pair| Ok(pair.lod))
    }

    /// Draw one pair at another LOD level, which its mesh must provide
    pub fn set_lod_level(&self, level: usize, index: usize) -> Result<(), RenderError> {
        self.with_pair("set_lod_level", index, |pair| {
            let levels = pair.mesh.lod_level_count();
            if levels == 0 {
                return Err(RenderError::NoLodData);
            }
            if level >= levels {
                return Err(RenderError::InvalidLodLevel { level, levels });
            }
            pair.lod = level;
            Ok(())
        })
    }

    /// Remove every pair `select` picks, returning how many went
    pub fn remove_render_pairs<F>(&self, mut select: F) -> usize
    where
        F: FnMut(&Material, &Mesh) -> bool,
    {
        let removed: Vec<RenderPair> = {
            let mut pairs = self.render_pairs.lock();
            let (gone, kept) = pairs
                .drain(..)
                .partition(|pair| select(&pair.material, &pair.mesh));
            *pairs = kept;
            gone
        };
        removed.len()
    }

    /// Remove every pair whose mesh carries `tag`
    pub fn remove_render_pairs_by_tag(&self, tag: i32) -> usize {
        self.remove_render_pairs(|_, mesh| mesh.tag() == tag)
    }

    /// First mesh carrying `tag`
    pub fn mesh_by_tag(&self, tag: i32) -> Option<Arc<Mesh>> {
        self.render_pairs
            .lock()
            .iter()
            .find(|pair| pair.mesh.tag() == tag)
            .map(|pair| Arc::clone(&pair.mesh))
    }

    /// Remove every render pair
    pub fn clear_render_pairs(&self) {
        let pairs = std::mem::take(&mut *self.render_pairs.lock());
        drop(pairs);
    }

    /// Texture of the material at `index`, if it has one
    pub fn texture(&self, index: usize) -> Option<Arc<Texture>> {
        self.material(index).ok()?.texture()
    }

    /// Set the texture of the material at `index` and flag the mesh for rebuild
    pub fn set_texture(&self, texture: Option<Arc<Texture>>, index: usize) -> Result<(), RenderError> {
        self.material(index)?.set_texture(texture);
        self.set_need_update_mesh(true);
        Ok(())
    }

    /// Dither flag of the first pair's material, false without pairs
    pub fn is_dither(&self) -> bool {
        self.first_material()
            .is_some_and(|m| m.render_state().dither)
    }

    /// Applied to every pair's material
    pub fn set_dither(&self, dither: bool) {
        for pair in self.render_pairs() {
            pair.material.set_dither(dither);
        }
    }

    /// Blend mode of the first pair's material, `None` without pairs
    pub fn blend_mode(&self) -> BlendMode {
        self.first_material()
            .map_or(BlendMode::None, |m| m.render_state().blend_mode)
    }

    /// Applied to every pair's material
    pub fn set_blend_mode(&self, mode: BlendMode) {
        for pair in self.render_pairs() {
            pair.material.set_blend_mode(mode);
        }
    }

    fn first_material(&self) -> Option<Arc<Material>> {
        self.render_pairs
            .lock()
            .first()
            .map(|pair| Arc::clone(&pair.material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recording_context;

    #[test]
    fn test_pairs_share_ownership() {
        let (ctx, _) = recording_context();
        let a = Node::new(&ctx);
        let b = Node::new(&ctx);
        let material = Material::new("shared");
        let mesh = Mesh::new(1, 0);

        a.add_render_pair(Arc::clone(&material), Arc::clone(&mesh));
        b.add_render_pair(Arc::clone(&material), Arc::clone(&mesh));
        assert_eq!(Arc::strong_count(&material), 3);

        a.clear_render_pairs();
        assert_eq!(Arc::strong_count(&material), 2);

        drop(b);
        assert_eq!(Arc::strong_count(&material), 1);
        assert_eq!(Arc::strong_count(&mesh), 1);
    }

    #[test]
    fn test_index_out_of_range() {
        let (ctx, _) = recording_context();
        let node = Node::new(&ctx);
        node.add_render_pair(Material::new("m"), Mesh::new(0, 0));

        assert_eq!(
            node.material(1).unwrap_err(),
            RenderError::IndexOutOfRange { index: 1, len: 1 }
        );
        assert!(node.mesh(5).is_err());
        assert!(node.replace_mesh(Mesh::new(9, 0), 1).is_err());
        assert_eq!(node.mesh(0).unwrap().tag(), 0);
        assert!(node.texture(3).is_none());
    }

    #[test]
    fn test_replace_releases_previous() {
        let (ctx, _) = recording_context();
        let node = Node::new(&ctx);
        let old = Material::new("old");
        node.add_render_pair(Arc::clone(&old), Mesh::new(0, 0));

        node.replace_material(Material::new("new"), 0).unwrap();
        assert_eq!(Arc::strong_count(&old), 1);
        assert_eq!(node.material(0).unwrap().name(), "new");

        node.replace_mesh(Mesh::new(4, 0), 0).unwrap();
        assert_eq!(node.mesh(0).unwrap().tag(), 4);
    }

    #[test]
    fn test_lod_level_validation() {
        let (ctx, _) = recording_context();
        let node = Node::new(&ctx);
        node.add_render_pair(Material::new("flat"), Mesh::new(0, 0));
        node.add_render_pair(Material::new("lod"), Mesh::new(1, 3));

        assert_eq!(node.set_lod_level(1, 0), Err(RenderError::NoLodData));
        assert_eq!(
            node.set_lod_level(3, 1),
            Err(RenderError::InvalidLodLevel { level: 3, levels: 3 })
        );
        assert_eq!(node.lod_level(1), Ok(0));

        node.set_lod_level(2, 1).unwrap();
        assert_eq!(node.lod_level(1), Ok(2));
    }

    #[test]
    fn test_remove_by_tag_and_predicate() {
        let (ctx, _) = recording_context();
        let node = Node::new(&ctx);
        let mesh = Mesh::new(7, 0);
        node.add_render_pair(Material::new("a"), Arc::clone(&mesh));
        node.add_render_pair(Material::new("b"), Mesh::new(8, 0));
        node.add_render_pair(Material::new("c"), Arc::clone(&mesh));

        assert!(Arc::ptr_eq(&node.mesh_by_tag(7).unwrap(), &mesh));
        assert_eq!(node.remove_render_pairs_by_tag(7), 2);
        assert_eq!(Arc::strong_count(&mesh), 1);
        assert!(node.mesh_by_tag(7).is_none());

        assert_eq!(node.remove_render_pairs(|m, _| m.name() == "b"), 1);
        assert_eq!(node.render_pair_count(), 0);
    }

    #[test]
    fn test_texture_and_render_state() {
        let (ctx, _) = recording_context();
        let node = Node::new(&ctx);
        assert!(!node.is_dither());
        assert_eq!(node.blend_mode(), BlendMode::None);

        let first = Material::new("first");
        let second = Material::new("second");
        node.add_render_pair(Arc::clone(&first), Mesh::new(0, 0));
        node.add_render_pair(Arc::clone(&second), Mesh::new(1, 0));

        node.set_dither(true);
        node.set_blend_mode(BlendMode::Additive);
        assert!(node.is_dither());
        assert_eq!(second.render_state().blend_mode, BlendMode::Additive);

        let texture = Texture::new(11, 64, 64);
        node.set_texture(Some(Arc::clone(&texture)), 1).unwrap();
        assert!(node.need_update_mesh());
        assert_eq!(node.texture(1), Some(texture));
        assert!(node.texture(0).is_none());
        assert!(node.set_texture(None, 2).is_err());
    }
}
