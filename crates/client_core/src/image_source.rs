//! Selected input image and the lifecycle of its single preview handle.

use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result};
use shared::domain::{ImageId, PreviewHandleId};
use tracing::{debug, warn};

use crate::error::ValidationError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its mime type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Type is checked before size, so an oversized file of the wrong type
/// reports the type problem.
pub fn validate(file: &ImageFile) -> Result<(), ValidationError> {
    let mime_type = file.mime_type.to_ascii_lowercase();
    if !ACCEPTED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(ValidationError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size_bytes: file.size(),
            max_bytes: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Creates and releases previewable handles for a selected image.
///
/// Every handle returned by `create` is passed to `release` exactly once.
pub trait PreviewHandleProvider: Send + Sync {
    fn create(&self, file: &ImageFile) -> PreviewHandleId;
    fn release(&self, handle: PreviewHandleId);
}

/// Scoped ownership of one preview handle; released on drop.
pub struct PreviewLease {
    provider: Arc<dyn PreviewHandleProvider>,
    handle: PreviewHandleId,
}

impl PreviewLease {
    pub fn acquire(provider: Arc<dyn PreviewHandleProvider>, file: &ImageFile) -> Self {
        let handle = provider.create(file);
        Self { provider, handle }
    }

    pub fn handle(&self) -> PreviewHandleId {
        self.handle
    }
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        self.provider.release(self.handle);
    }
}

impl fmt::Debug for PreviewLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewLease").field(&self.handle).finish()
    }
}

#[derive(Debug)]
pub struct ImageSource {
    id: ImageId,
    file: Arc<ImageFile>,
    preview: PreviewLease,
}

impl ImageSource {
    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn file(&self) -> &Arc<ImageFile> {
        &self.file
    }

    pub fn preview_handle(&self) -> PreviewHandleId {
        self.preview.handle()
    }
}

/// Single-writer owner of the current image. At most one preview handle is
/// alive at any time.
pub struct ImageSourceManager {
    previews: Arc<dyn PreviewHandleProvider>,
    current: Option<ImageSource>,
}

impl ImageSourceManager {
    pub fn new(previews: Arc<dyn PreviewHandleProvider>) -> Self {
        Self {
            previews,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&ImageSource> {
        self.current.as_ref()
    }

    /// On validation failure the previous source stays in place untouched.
    pub fn select(&mut self, file: ImageFile) -> Result<ImageId, ValidationError> {
        if let Err(err) = validate(&file) {
            debug!(name = %file.name, mime_type = %file.mime_type, size = file.size(), %err, "rejected image");
            return Err(err);
        }

        // Release the old handle before the new one is created.
        self.current = None;

        let preview = PreviewLease::acquire(Arc::clone(&self.previews), &file);
        let id = ImageId::new();
        debug!(name = %file.name, handle = preview.handle().0, "selected image");
        self.current = Some(ImageSource {
            id,
            file: Arc::new(file),
            preview,
        });
        Ok(id)
    }

    /// Only the first dropped file is considered; an empty drop does nothing.
    pub fn drop_files(
        &mut self,
        files: Vec<ImageFile>,
    ) -> Option<Result<ImageId, ValidationError>> {
        let first = files.into_iter().next()?;
        Some(self.select(first))
    }

    /// Returns whether an image was present.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }
}

#[derive(Debug, Clone)]
struct PreviewEntry {
    mime_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    live: HashMap<PreviewHandleId, PreviewEntry>,
    created: usize,
    released: usize,
}

/// Process-local preview store; handles resolve to a copy of the image bytes.
#[derive(Default)]
pub struct InMemoryPreviewRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn live_handles(&self) -> Vec<PreviewHandleId> {
        let mut handles: Vec<_> = self.state().live.keys().copied().collect();
        handles.sort_by_key(|handle| handle.0);
        handles
    }

    pub fn created(&self) -> usize {
        self.state().created
    }

    pub fn released(&self) -> usize {
        self.state().released
    }

    pub fn preview(&self, handle: PreviewHandleId) -> Option<(String, Vec<u8>)> {
        self.state()
            .live
            .get(&handle)
            .map(|entry| (entry.mime_type.clone(), entry.bytes.clone()))
    }
}

impl PreviewHandleProvider for InMemoryPreviewRegistry {
    fn create(&self, file: &ImageFile) -> PreviewHandleId {
        let mut state = self.state();
        state.next_id += 1;
        let handle = PreviewHandleId(state.next_id);
        state.live.insert(
            handle,
            PreviewEntry {
                mime_type: file.mime_type.clone(),
                bytes: file.bytes.clone(),
            },
        );
        state.created += 1;
        handle
    }

    fn release(&self, handle: PreviewHandleId) {
        let mut state = self.state();
        if state.live.remove(&handle).is_some() {
            state.released += 1;
        } else {
            warn!(handle = handle.0, "release of unknown preview handle");
        }
    }
}

#[cfg(test)]
#[path = "tests/image_source_tests.rs"]
mod tests;
