//! Asset loading.
//!
//! Each asset is resolved by an ordered chain of [`AssetLoader`] strategies.
//! The first strategy that succeeds wins; if all fail the asset is
//! [`VisualAsset::Unavailable`], which only disables the matching
//! presentation calls and never affects the simulation.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Sound,
}

/// Primitive shapes a renderer can always draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Box,
    Capsule,
    Plane,
}

/// What to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub file: String,
    pub kind: AssetKind,
    /// Shape to stand in for the model when no file is available.
    pub fallback: Option<Primitive>,
}

impl AssetRequest {
    pub fn model(file: &str, fallback: Option<Primitive>) -> Self {
        Self {
            file: file.to_string(),
            kind: AssetKind::Model,
            fallback,
        }
    }

    pub fn sound(file: &str) -> Self {
        Self {
            file: file.to_string(),
            kind: AssetKind::Sound,
            fallback: None,
        }
    }
}

/// Where a loaded asset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    File(PathBuf),
    Builtin(Primitive),
}

/// Opaque handle to a loaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    pub id: u64,
    pub source: AssetSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualAsset {
    Loaded(AssetHandle),
    Unavailable,
}

impl VisualAsset {
    pub fn is_loaded(&self) -> bool {
        matches!(self, VisualAsset::Loaded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    NotFound(String),
    Unsupported(&'static str),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(what) => write!(f, "asset not found: {what}"),
            AssetError::Unsupported(why) => write!(f, "unsupported: {why}"),
        }
    }
}

impl std::error::Error for AssetError {}

/// One loading strategy.
pub trait AssetLoader: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&self, req: &AssetRequest) -> Result<AssetSource, AssetError>;
}

/// Looks for the file under a root directory.
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    root: PathBuf,
}

impl FileAssetLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl AssetLoader for FileAssetLoader {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self, req: &AssetRequest) -> Result<AssetSource, AssetError> {
        let path = self.root.join(&req.file);
        if path.is_file() {
            Ok(AssetSource::File(path))
        } else {
            Err(AssetError::NotFound(path.display().to_string()))
        }
    }
}

/// Substitutes a primitive shape for models that declare one.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinShapeLoader;

impl AssetLoader for BuiltinShapeLoader {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn load(&self, req: &AssetRequest) -> Result<AssetSource, AssetError> {
        match (req.kind, req.fallback) {
            (AssetKind::Model, Some(shape)) => Ok(AssetSource::Builtin(shape)),
            (AssetKind::Model, None) => Err(AssetError::Unsupported("no fallback shape")),
            (AssetKind::Sound, _) => Err(AssetError::Unsupported("sounds have no builtin")),
        }
    }
}

/// Ordered list of loader strategies.
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<Box<dyn AssetLoader>>,
    next_id: u64,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<L: AssetLoader + 'static>(mut self, loader: L) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// File lookup under `root`, then primitive fallbacks.
    pub fn standard<P: AsRef<Path>>(root: P) -> Self {
        Self::new()
            .with(FileAssetLoader::new(root))
            .with(BuiltinShapeLoader)
    }

    /// Tries each strategy in order.
    pub fn load(&mut self, req: &AssetRequest) -> VisualAsset {
        for loader in &self.loaders {
            match loader.load(req) {
                Ok(source) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    debug!(file = %req.file, loader = loader.name(), ?source, "Asset loaded");
                    return VisualAsset::Loaded(AssetHandle { id, source });
                }
                Err(e) => {
                    debug!(file = %req.file, loader = loader.name(), error = %e, "Loader declined");
                }
            }
        }
        warn!(file = %req.file, "No loader could provide asset");
        VisualAsset::Unavailable
    }
}

/// Every asset the duel presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCatalog {
    pub warehouse: VisualAsset,
    pub avatar: VisualAsset,
    pub gun: VisualAsset,
    pub shot_sound: VisualAsset,
}

impl AssetCatalog {
    pub fn load(chain: &mut LoaderChain) -> Self {
        let catalog = Self {
            warehouse: chain.load(&AssetRequest::model("warehouse.osgb", Some(Primitive::Plane))),
            avatar: chain.load(&AssetRequest::model("avatar.osgb", Some(Primitive::Capsule))),
            gun: chain.load(&AssetRequest::model("sniper-rifle.osgb", Some(Primitive::Box))),
            shot_sound: chain.load(&AssetRequest::sound("shoot.mp3")),
        };
        info!(
            warehouse = catalog.warehouse.is_loaded(),
            avatar = catalog.avatar.is_loaded(),
            gun = catalog.gun.is_loaded(),
            shot_sound = catalog.shot_sound.is_loaded(),
            "Assets resolved"
        );
        catalog
    }

    /// Nothing loaded; everything is presented as absent.
    pub fn unavailable() -> Self {
        Self {
            warehouse: VisualAsset::Unavailable,
            avatar: VisualAsset::Unavailable,
            gun: VisualAsset::Unavailable,
            shot_sound: VisualAsset::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("duel-assets-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_wins_over_builtin() {
        let dir = scratch_dir("file");
        std::fs::write(dir.join("avatar.osgb"), b"mesh").unwrap();

        let mut chain = LoaderChain::standard(&dir);
        let asset = chain.load(&AssetRequest::model("avatar.osgb", Some(Primitive::Capsule)));
        match asset {
            VisualAsset::Loaded(h) => assert_eq!(h.source, AssetSource::File(dir.join("avatar.osgb"))),
            other => panic!("unexpected {other:?}"),
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_model_falls_back_to_primitive() {
        let mut chain = LoaderChain::standard(scratch_dir("fallback"));
        let asset = chain.load(&AssetRequest::model("nope.osgb", Some(Primitive::Box)));
        assert!(matches!(
            asset,
            VisualAsset::Loaded(AssetHandle {
                source: AssetSource::Builtin(Primitive::Box),
                ..
            })
        ));
    }

    #[test]
    fn exhausted_chain_is_unavailable() {
        let mut chain = LoaderChain::standard(scratch_dir("none"));
        assert_eq!(chain.load(&AssetRequest::sound("shoot.mp3")), VisualAsset::Unavailable);
        assert_eq!(LoaderChain::new().load(&AssetRequest::model("x", None)), VisualAsset::Unavailable);
    }

    #[test]
    fn handles_are_unique() {
        let mut chain = LoaderChain::new().with(BuiltinShapeLoader);
        let a = chain.load(&AssetRequest::model("a", Some(Primitive::Box)));
        let b = chain.load(&AssetRequest::model("b", Some(Primitive::Box)));
        assert_ne!(a, b);
    }

    #[test]
    fn catalog_without_files_still_has_shapes() {
        let mut chain = LoaderChain::standard(scratch_dir("catalog"));
        let catalog = AssetCatalog::load(&mut chain);
        assert!(catalog.avatar.is_loaded());
        assert!(catalog.gun.is_loaded());
        assert!(!catalog.shot_sound.is_loaded());
    }
}
