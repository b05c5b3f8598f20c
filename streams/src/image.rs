use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("cannot write image file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image store lock is poisoned")]
    Poisoned,
}

/// An image that has been completely uploaded and written out
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub laptop_id: String,
    pub image_type: String,
    pub path: PathBuf,
    pub size: usize,
}

pub trait ImageStore: Send + Sync {
    /// Persists `data` under a freshly generated image ID
    fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> Result<ImageRecord, ImageStoreError>;

    fn find(&self, id: &str) -> Result<Option<ImageRecord>, ImageStoreError>;
}

/// Writes each image as `{id}.{ext}` in a single flat folder
#[derive(Debug)]
pub struct DiskImageStore {
    folder: PathBuf,
    images: RwLock<HashMap<String, ImageRecord>>,
}

impl DiskImageStore {
    pub fn new(folder: impl Into<PathBuf>) -> DiskImageStore {
        DiskImageStore {
            folder: folder.into(),
            images: RwLock::new(HashMap::new()),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl ImageStore for DiskImageStore {
    fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> Result<ImageRecord, ImageStoreError> {
        let id = Uuid::new_v4().to_string();
        let ext = extension(image_type);
        let file_name = if ext.is_empty() {
            id.clone()
        } else {
            format!("{}.{}", id, ext)
        };
        let path = self.folder.join(file_name);

        if let Err(source) = fs::create_dir_all(&self.folder).and_then(|_| fs::write(&path, data)) {
            let _ = fs::remove_file(&path);
            return Err(ImageStoreError::Write { path, source });
        }

        let record = ImageRecord {
            id: id.clone(),
            laptop_id: laptop_id.to_string(),
            image_type: image_type.to_string(),
            path,
            size: data.len(),
        };
        let mut images = self.images.write().map_err(|_| ImageStoreError::Poisoned)?;
        images.insert(id, record.clone());
        info!("wrote image {} ({} bytes) to {}", record.id, record.size, record.path.display());
        Ok(record)
    }

    fn find(&self, id: &str) -> Result<Option<ImageRecord>, ImageStoreError> {
        let images = self.images.read().map_err(|_| ImageStoreError::Poisoned)?;
        Ok(images.get(id).cloned())
    }
}

/// Derives a file extension from either an extension (`.png`) or a MIME type
/// (`image/png`). Only ASCII alphanumerics survive, so the result can never
/// name a path outside the store folder.
pub fn extension(image_type: &str) -> String {
    let image_type = image_type.trim();
    let raw = if let Some(ext) = image_type.strip_prefix('.') {
        ext
    } else if let Some((_, subtype)) = image_type.split_once('/') {
        subtype.split('+').next().unwrap_or(subtype)
    } else {
        image_type
    };

    let ext: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" => "jpg".to_string(),
        _ => ext,
    }
}
