//! Client-side orchestration for the white-balance explorer: owns the
//! selected image and settings, fans batches out to the processing service
//! and reconciles their results into one view state.

pub mod dispatch;
pub mod error;
pub mod explorer;
pub mod image_source;
pub mod processing;
pub mod reconciler;
pub mod settings;

pub use dispatch::{DispatchPhase, Trigger};
pub use error::{ExplorerError, ProcessingError, ValidationError};
pub use explorer::{Explorer, ExplorerEvent, ExplorerState, ImageSummary};
pub use image_source::{
    ImageFile, ImageSource, ImageSourceManager, InMemoryPreviewRegistry, PreviewHandleProvider,
    PreviewLease, MAX_UPLOAD_BYTES,
};
pub use processing::{
    HttpProcessingClient, MissingProcessingClient, ProcessedImage, ProcessingClient,
    ProcessingRequest, DEFAULT_API_BASE_URL,
};
pub use settings::Settings;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
