//! On-disk accessory library: `<root>/<category>/<id>.<ext>`.

use crate::config::FitterConfig;
use crate::placement::AccessoryCategory;
use crate::resolver::{AccessoryDescriptor, AccessoryRef};
use std::path::{Path, PathBuf};

pub struct AccessoryLibrary {
    root: PathBuf,
    ext: String,
}

impl AccessoryLibrary {
    pub fn new(root: impl Into<PathBuf>, ext: impl Into<String>) -> Self {
        Self { root: root.into(), ext: ext.into() }
    }

    pub fn from_config(config: &FitterConfig) -> Self {
        Self::new(config.accessories_dir.clone(), config.accessory_ext.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and one directory per category.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for category in AccessoryCategory::ALL {
            std::fs::create_dir_all(self.root.join(category.as_str()))?;
        }
        Ok(())
    }

    /// Where the accessory `id` of `category` lives. The file need not exist.
    pub fn path_for(&self, category: AccessoryCategory, id: &str) -> PathBuf {
        self.root
            .join(category.as_str())
            .join(format!("{id}.{}", self.ext))
    }

    /// Descriptor for `id`, resolving through the library path.
    pub fn descriptor(&self, category: AccessoryCategory, id: &str) -> AccessoryDescriptor {
        AccessoryDescriptor {
            id: id.to_string(),
            name: display_name(category, id),
            category,
            path: Some(self.path_for(category, id)),
            image: None,
        }
    }

    pub fn reference(&self, category: AccessoryCategory, id: &str) -> AccessoryRef {
        AccessoryRef::Descriptor(self.descriptor(category, id))
    }

    /// Accessories present on disk for `category`, sorted by id.
    ///
    /// A missing category directory lists as empty.
    pub fn list(&self, category: AccessoryCategory) -> std::io::Result<Vec<AccessoryDescriptor>> {
        let dir = self.root.join(category.as_str());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.ext));
            let stem = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);
            if let (true, Some(id)) = (matches_ext, stem) {
                found.push((id, path));
            }
        }
        found.sort();

        Ok(found
            .into_iter()
            .map(|(id, path)| AccessoryDescriptor {
                path: Some(path),
                ..self.descriptor(category, &id)
            })
            .collect())
    }

    /// Every accessory on disk, grouped in category order.
    pub fn list_all(&self) -> std::io::Result<Vec<AccessoryDescriptor>> {
        let mut all = Vec::new();
        for category in AccessoryCategory::ALL {
            all.extend(self.list(category)?);
        }
        Ok(all)
    }
}

/// "clothing", "shirt_blue" → "Clothing shirt_blue".
fn display_name(category: AccessoryCategory, id: &str) -> String {
    let mut chars = category.as_str().chars();
    let title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{title} {id}")
}
