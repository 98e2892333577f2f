//! Accessory resolution with a path-keyed decode cache.
//!
//! Path references are decoded once and shared read-only behind an `Arc`.
//! Anything that cannot be resolved becomes a fixed placeholder so a bad
//! accessory never stops a try-on.

use crate::placement::AccessoryCategory;
use crate::raster::{RasterError, RasterImage};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

// --- Placeholder geometry ---
const PLACEHOLDER_SIZE: u32 = 100;
const PLACEHOLDER_INSET: u32 = 10;
const PLACEHOLDER_BORDER: u32 = 2;
const PLACEHOLDER_FILL: [u8; 4] = [255, 0, 255, 128];
const PLACEHOLDER_EDGE: [u8; 4] = [255, 255, 255, 200];

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("accessory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: RasterError,
    },
    #[error("accessory reference has neither a path nor an image")]
    Empty,
}

/// Byte source for accessory art.
pub trait AccessoryStore: Send + Sync {
    /// Cache key for `path`. Two spellings of the same file should agree.
    fn canonical_key(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads accessory files from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl AccessoryStore for FsStore {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Catalog entry for one accessory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryDescriptor {
    pub id: String,
    pub name: String,
    pub category: AccessoryCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Art supplied inline. Used when there is no path or the path fails.
    #[serde(skip)]
    pub image: Option<Arc<RasterImage>>,
}

/// Anything the resolver can turn into accessory pixels.
#[derive(Debug, Clone)]
pub enum AccessoryRef {
    /// Already decoded art.
    Image(Arc<RasterImage>),
    /// A file, resolved through the cache.
    Path(PathBuf),
    Descriptor(AccessoryDescriptor),
}

impl From<RasterImage> for AccessoryRef {
    fn from(image: RasterImage) -> Self {
        Self::Image(Arc::new(image))
    }
}

impl From<PathBuf> for AccessoryRef {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<AccessoryDescriptor> for AccessoryRef {
    fn from(descriptor: AccessoryDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// Resolves accessory references, memoizing decoded files by canonical path.
///
/// Share one resolver across requests behind an `Arc`. Reads take a shared
/// lock; a miss decodes outside the lock, so two callers racing on the same
/// uncached path may both decode it, but the first insert wins and both get
/// the same `Arc`.
pub struct AccessoryResolver {
    store: Box<dyn AccessoryStore>,
    cache: RwLock<HashMap<PathBuf, Arc<RasterImage>>>,
    placeholder: Arc<RasterImage>,
}

impl Default for AccessoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessoryResolver {
    /// Resolver backed by the local filesystem.
    pub fn new() -> Self {
        Self::with_store(FsStore)
    }

    pub fn with_store(store: impl AccessoryStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cache: RwLock::new(HashMap::new()),
            placeholder: Arc::new(placeholder_accessory()),
        }
    }

    /// Resolve `accessory`, substituting the placeholder on any failure.
    pub fn resolve(&self, accessory: &AccessoryRef) -> Arc<RasterImage> {
        match self.try_resolve(accessory) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(error = %err, "unresolvable accessory, using placeholder");
                Arc::clone(&self.placeholder)
            }
        }
    }

    /// Resolve `accessory`, reporting why it could not be resolved.
    pub fn try_resolve(&self, accessory: &AccessoryRef) -> Result<Arc<RasterImage>, ResolveError> {
        match accessory {
            AccessoryRef::Image(image) => Ok(Arc::clone(image)),
            AccessoryRef::Path(path) => self.load_path(path),
            AccessoryRef::Descriptor(descriptor) => match (&descriptor.path, &descriptor.image) {
                (Some(path), fallback) => match self.load_path(path) {
                    Ok(image) => Ok(image),
                    Err(err) => match fallback {
                        Some(image) => {
                            tracing::debug!(id = %descriptor.id, error = %err, "path failed, using inline image");
                            Ok(Arc::clone(image))
                        }
                        None => Err(err),
                    },
                },
                (None, Some(image)) => Ok(Arc::clone(image)),
                (None, None) => Err(ResolveError::Empty),
            },
        }
    }

    /// Number of decoded accessories currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Drop every cached accessory. Outstanding `Arc`s stay valid.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn placeholder(&self) -> Arc<RasterImage> {
        Arc::clone(&self.placeholder)
    }

    fn load_path(&self, path: &Path) -> Result<Arc<RasterImage>, ResolveError> {
        let key = self.store.canonical_key(path);
        if let Some(hit) = self.cache.read().get(&key) {
            tracing::debug!(path = %key.display(), "accessory cache hit");
            return Ok(Arc::clone(hit));
        }

        let bytes = self.store.read(&key).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ResolveError::NotFound(key.clone())
            } else {
                ResolveError::Io { path: key.clone(), source }
            }
        })?;
        let decoded = RasterImage::decode(&bytes)
            .map_err(|source| ResolveError::Decode { path: key.clone(), source })?;

        tracing::info!(
            path = %key.display(),
            width = decoded.width(),
            height = decoded.height(),
            "decoded accessory"
        );

        let mut cache = self.cache.write();
        let entry = cache.entry(key).or_insert_with(|| Arc::new(decoded));
        Ok(Arc::clone(entry))
    }
}

/// The stand-in drawn for accessories that cannot be resolved.
///
/// A 100×100 transparent canvas holding a semi-transparent magenta square
/// covering `[10, 90]` on both axes, outlined by a 2 px near-opaque white
/// border. The border is drawn inside the square, so nothing outside
/// `[10, 90]` is ever painted.
pub fn placeholder_accessory() -> RasterImage {
    let mut img = RasterImage::transparent(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE);
    let lo = PLACEHOLDER_INSET;
    let hi = PLACEHOLDER_SIZE - PLACEHOLDER_INSET;

    for y in lo..=hi {
        for x in lo..=hi {
            let on_edge = x < lo + PLACEHOLDER_BORDER
                || x > hi - PLACEHOLDER_BORDER
                || y < lo + PLACEHOLDER_BORDER
                || y > hi - PLACEHOLDER_BORDER;
            img.put_pixel(x, y, if on_edge { PLACEHOLDER_EDGE } else { PLACEHOLDER_FILL });
        }
    }

    img
}
