//! Voxel dictionary: the fixed, ordered registry of voxel kinds
//!
//! Chunks store `VoxelId`s that index into a dictionary. Lookups never fail:
//! unknown names and out-of-range ids resolve to the Error kind, so callers
//! never need to handle a missing material.

use std::sync::{Arc, LazyLock};

use super::voxel::{MaterialClass, VoxelId, VoxelKind};

/// Ordered, immutable list of voxel kinds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelDictionary {
    kinds: Vec<VoxelKind>,
}

static ERROR_DICTIONARY: LazyLock<VoxelDictionary> = LazyLock::new(|| VoxelDictionary {
    kinds: vec![VoxelKind::new(
        VoxelKind::ERROR_NAME,
        MaterialClass::Opaque,
        [64, 96, 96, 128],
    )],
});

static DEFAULT_DICTIONARY: LazyLock<Arc<VoxelDictionary>> = LazyLock::new(|| {
    use MaterialClass::*;

    Arc::new(VoxelDictionary::new(vec![
        VoxelKind::new("Air", Transparent, [96, 96, 128, 128]),
        VoxelKind::new("Grass", Opaque, [32, 0, 64, 32]),
        VoxelKind::new("Water", Transparent, [64, 0, 96, 32]),
        VoxelKind::new("Sand", Opaque, [0, 0, 32, 32]),
        VoxelKind::new("Stone", Opaque, [96, 0, 128, 32]),
        VoxelKind::new("Dirt", Opaque, [0, 32, 32, 64]),
        VoxelKind::new("Wood", Opaque, [32, 32, 64, 64]),
        VoxelKind::new("Leaves", Opaque, [64, 32, 96, 64]),
        VoxelKind::new("Flower", TransparentNoCulling, [96, 32, 128, 64]),
        VoxelKind::new("Tall_Grass", TransparentNoCulling, [0, 64, 32, 96]),
        VoxelKind::new("Snowy_Grass", Opaque, [32, 64, 64, 96]),
        VoxelKind::new("Snowy_Leaves", Opaque, [64, 64, 96, 96]),
        VoxelKind::new("Snowy_Flower", TransparentNoCulling, [96, 64, 128, 96]),
        VoxelKind::new("Snowy_Tall_Grass", TransparentNoCulling, [0, 96, 32, 128]),
    ]))
});

impl VoxelDictionary {
    /// Build a dictionary from an ordered list of kinds
    ///
    /// The list must stay below `u16::MAX` entries so the Error sentinel id
    /// can never collide with a real index.
    pub fn new(kinds: Vec<VoxelKind>) -> Self {
        debug_assert!(kinds.len() < VoxelId::ERROR.index());
        Self { kinds }
    }

    /// The dictionary used for generation and for decoding saved chunks
    pub fn default_dictionary() -> Arc<VoxelDictionary> {
        DEFAULT_DICTIONARY.clone()
    }

    /// The single-entry dictionary holding only the Error kind
    pub fn error_dictionary() -> &'static VoxelDictionary {
        &ERROR_DICTIONARY
    }

    /// The Error kind
    pub fn error_kind() -> &'static VoxelKind {
        &ERROR_DICTIONARY.kinds[0]
    }

    /// Id of the kind with this name, or `VoxelId::ERROR` if absent
    pub fn pointer_to(&self, name: &str) -> VoxelId {
        self.kinds
            .iter()
            .position(|kind| kind.name == name)
            .map(|index| VoxelId(index as u16))
            .unwrap_or(VoxelId::ERROR)
    }

    /// The kind with this name, if the dictionary has one
    pub fn kind_named(&self, name: &str) -> Option<&VoxelKind> {
        self.kinds.iter().find(|kind| kind.name == name)
    }

    /// Resolve an id, falling back to the Error kind
    pub fn kind(&self, id: VoxelId) -> &VoxelKind {
        self.kinds
            .get(id.index())
            .unwrap_or(Self::error_kind())
    }

    /// Names of Transparent kinds followed by TransparentNoCulling kinds
    pub fn transparent_names(&self) -> Vec<&str> {
        let of_class = |class: MaterialClass| {
            self.kinds
                .iter()
                .filter(move |kind| kind.class == class)
                .map(|kind| kind.name.as_str())
        };

        of_class(MaterialClass::Transparent)
            .chain(of_class(MaterialClass::TransparentNoCulling))
            .collect()
    }

    /// Names of kinds in the given class, in dictionary order
    pub fn names_in_class(&self, class: MaterialClass) -> Vec<&str> {
        self.kinds
            .iter()
            .filter(|kind| kind.class == class)
            .map(|kind| kind.name.as_str())
            .collect()
    }

    /// Iterate over all kinds with their ids
    pub fn iter(&self) -> impl Iterator<Item = (VoxelId, &VoxelKind)> {
        self.kinds
            .iter()
            .enumerate()
            .map(|(index, kind)| (VoxelId(index as u16), kind))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let dict = VoxelDictionary::default_dictionary();
        assert_eq!(dict.pointer_to("Air"), VoxelId(0));
        assert_eq!(dict.pointer_to("Water"), VoxelId(2));
        assert_eq!(dict.pointer_to("Sand"), VoxelId(3));
        assert_eq!(dict.pointer_to("Stone"), VoxelId(4));
    }

    #[test]
    fn test_pointer_to_missing_is_error() {
        let dict = VoxelDictionary::default_dictionary();
        let id = dict.pointer_to("Obsidian");
        assert_eq!(id, VoxelId::ERROR);
        assert!(dict.kind(id).is_error());
    }

    #[test]
    fn test_kind_named() {
        let dict = VoxelDictionary::default_dictionary();
        assert_eq!(dict.kind_named("Wood").unwrap().class, MaterialClass::Opaque);
        assert!(dict.kind_named("").is_none());
        assert!(dict.kind_named("Obsidian").is_none());
    }

    #[test]
    fn test_kind_out_of_range() {
        let dict = VoxelDictionary::new(vec![VoxelKind::new(
            "Air",
            MaterialClass::Transparent,
            [0; 4],
        )]);
        assert_eq!(dict.kind(VoxelId(0)).name, "Air");
        assert!(dict.kind(VoxelId(1)).is_error());
        assert!(dict.kind(VoxelId(500)).is_error());
    }

    #[test]
    fn test_transparent_names() {
        let dict = VoxelDictionary::default_dictionary();
        let names = dict.transparent_names();
        assert_eq!(
            names,
            vec!["Air", "Water", "Flower", "Tall_Grass", "Snowy_Flower", "Snowy_Tall_Grass"]
        );
        assert!(!names.contains(&"Stone"));
    }

    #[test]
    fn test_error_dictionary() {
        let errors = VoxelDictionary::error_dictionary();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.kind(VoxelId(0)).name, "Error");
        assert_eq!(errors.kind(VoxelId(0)).class, MaterialClass::Opaque);
    }

    #[test]
    fn test_unique_names() {
        let dict = VoxelDictionary::default_dictionary();
        for (id, kind) in dict.iter() {
            assert_eq!(dict.pointer_to(&kind.name), id, "duplicate name {}", kind.name);
        }
    }
}
