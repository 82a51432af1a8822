//! Aggregate view model. Every intent mutates under one lock, then runs the
//! change-detection predicate; batches run on spawned tasks and write back
//! only if their generation is still current.

use std::sync::Arc;

use serde::Serialize;
use shared::domain::{Algorithm, ColorSpace, ColorSpaceMode, ImageId, PreviewHandleId};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    dispatch::{
        plan_batch, run_batch, BatchResult, DispatchGuard, DispatchKey, DispatchPhase, Trigger,
        TriggerDecision,
    },
    error::{ExplorerError, ValidationError},
    image_source::{ImageFile, ImageSourceManager, PreviewHandleProvider},
    processing::{ProcessedImage, ProcessingClient},
    reconciler::{reconcile, Reconciled, ResultView},
    settings::Settings,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub id: ImageId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub preview: PreviewHandleId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerState {
    pub selected_algorithms: Vec<Algorithm>,
    pub split_view_algorithm: Option<Algorithm>,
    pub color_space_mode: ColorSpaceMode,
    pub input_color_space: ColorSpace,
    pub processing_space: ColorSpace,
    pub image: Option<ImageSummary>,
    pub processed_images: Vec<ProcessedImage>,
    pub is_processing: bool,
    pub error: Option<ExplorerError>,
}

impl ExplorerState {
    pub fn split_view_image(&self) -> Option<&ProcessedImage> {
        let algorithm = self.split_view_algorithm?;
        self.processed_images
            .iter()
            .find(|image| image.algorithm == algorithm)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerEvent {
    StateChanged,
    BatchDispatched {
        generation: u64,
        algorithms: Vec<Algorithm>,
    },
    TriggerDropped {
        generation_in_flight: u64,
    },
    BatchCommitted {
        generation: u64,
    },
    BatchFailed {
        generation: u64,
        algorithm: Algorithm,
        message: String,
    },
    BatchCancelled {
        generation: u64,
    },
}

struct ExplorerInner {
    images: ImageSourceManager,
    settings: Settings,
    guard: DispatchGuard,
    processed_images: Vec<ProcessedImage>,
    error: Option<ExplorerError>,
}

impl ExplorerInner {
    fn dispatch_key(&self) -> Option<DispatchKey> {
        if self.settings.selected_algorithms().is_empty() {
            return None;
        }
        self.images
            .current()
            .map(|source| DispatchKey::capture(&self.settings, source.id()))
    }

    fn snapshot(&self) -> ExplorerState {
        ExplorerState {
            selected_algorithms: self.settings.selected_algorithms().to_vec(),
            split_view_algorithm: self.settings.split_view_algorithm(),
            color_space_mode: self.settings.color_space_mode(),
            input_color_space: self.settings.input_color_space(),
            processing_space: self.settings.processing_space(),
            image: self.images.current().map(|source| ImageSummary {
                id: source.id(),
                name: source.file().name.clone(),
                mime_type: source.file().mime_type.clone(),
                size_bytes: source.file().size(),
                preview: source.preview_handle(),
            }),
            processed_images: self.processed_images.clone(),
            is_processing: self.guard.phase().is_dispatching(),
            error: self.error.clone(),
        }
    }
}

pub struct Explorer {
    processor: Arc<dyn ProcessingClient>,
    inner: Mutex<ExplorerInner>,
    phase: watch::Sender<DispatchPhase>,
    events: broadcast::Sender<ExplorerEvent>,
}

impl Explorer {
    pub fn new(
        processor: Arc<dyn ProcessingClient>,
        previews: Arc<dyn PreviewHandleProvider>,
    ) -> Arc<Self> {
        Self::with_settings(processor, previews, Settings::default())
    }

    pub fn with_settings(
        processor: Arc<dyn ProcessingClient>,
        previews: Arc<dyn PreviewHandleProvider>,
        settings: Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (phase, _) = watch::channel(DispatchPhase::Idle);
        Arc::new(Self {
            processor,
            inner: Mutex::new(ExplorerInner {
                images: ImageSourceManager::new(previews),
                settings,
                guard: DispatchGuard::default(),
                processed_images: Vec::new(),
                error: None,
            }),
            phase,
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ExplorerState {
        self.inner.lock().await.snapshot()
    }

    pub async fn effective_color_spaces(&self) -> (ColorSpace, ColorSpace) {
        self.inner.lock().await.settings.effective_color_spaces()
    }

    pub fn phase(&self) -> DispatchPhase {
        *self.phase.borrow()
    }

    /// Resolves once no batch is in flight.
    pub async fn settled(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|phase| !phase.is_dispatching()).await;
    }

    /// A rejected file records the validation error and leaves the current
    /// image in place.
    pub async fn select_image(self: &Arc<Self>, file: ImageFile) -> Result<ImageId, ValidationError> {
        let mut inner = self.inner.lock().await;
        let result = inner.images.select(file);
        self.selected(&mut inner, result)
    }

    /// An empty drop changes nothing and returns `None`.
    pub async fn drop_files(
        self: &Arc<Self>,
        files: Vec<ImageFile>,
    ) -> Option<Result<ImageId, ValidationError>> {
        let mut inner = self.inner.lock().await;
        let result = inner.images.drop_files(files)?;
        Some(self.selected(&mut inner, result))
    }

    /// Releases the image, cancels any batch in flight and resets results.
    pub async fn clear_image(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner);
        inner.processed_images.clear();
        inner.error = None;
        self.emit(ExplorerEvent::StateChanged);
    }

    /// Session end: cancels any batch in flight and releases the preview
    /// handle. Settings and the last committed results stay readable.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner);
        self.emit(ExplorerEvent::StateChanged);
    }

    pub async fn toggle_algorithm(self: &Arc<Self>, algorithm: Algorithm) {
        let mut inner = self.inner.lock().await;
        if !inner.settings.toggle_algorithm(algorithm) {
            debug!(%algorithm, "refusing to deselect the last algorithm");
            return;
        }
        self.evaluate(&mut inner, Trigger::Change);
        self.emit(ExplorerEvent::StateChanged);
    }

    /// Returns `false` when the list is empty and was rejected.
    pub async fn set_algorithms(self: &Arc<Self>, algorithms: &[Algorithm]) -> bool {
        if algorithms.is_empty() {
            debug!("ignoring empty algorithm selection");
            return false;
        }
        let mut inner = self.inner.lock().await;
        inner.settings.set_algorithms(algorithms);
        self.evaluate(&mut inner, Trigger::Change);
        self.emit(ExplorerEvent::StateChanged);
        true
    }

    /// Points the split view at a committed result, or clears it.
    pub async fn set_split_view_algorithm(&self, algorithm: Option<Algorithm>) -> bool {
        let mut inner = self.inner.lock().await;
        if let Some(algorithm) = algorithm {
            if !inner
                .processed_images
                .iter()
                .any(|image| image.algorithm == algorithm)
            {
                debug!(%algorithm, "split view target has no committed result");
                return false;
            }
        }
        inner.settings.set_split_view_algorithm(algorithm);
        self.emit(ExplorerEvent::StateChanged);
        true
    }

    pub async fn set_color_space_mode(self: &Arc<Self>, mode: ColorSpaceMode) {
        let mut inner = self.inner.lock().await;
        inner.settings.set_color_space_mode(mode);
        self.evaluate(&mut inner, Trigger::Change);
        self.emit(ExplorerEvent::StateChanged);
    }

    pub async fn set_input_color_space(self: &Arc<Self>, space: ColorSpace) {
        let mut inner = self.inner.lock().await;
        inner.settings.set_input_color_space(space);
        self.evaluate(&mut inner, Trigger::Change);
        self.emit(ExplorerEvent::StateChanged);
    }

    pub async fn set_processing_space(self: &Arc<Self>, space: ColorSpace) {
        let mut inner = self.inner.lock().await;
        inner.settings.set_processing_space(space);
        self.evaluate(&mut inner, Trigger::Change);
        self.emit(ExplorerEvent::StateChanged);
    }

    /// Returns the generation of the started batch, or `None` when nothing
    /// was dispatched (no image, or a batch is already in flight).
    pub async fn reprocess(self: &Arc<Self>) -> Option<u64> {
        let mut inner = self.inner.lock().await;
        self.evaluate(&mut inner, Trigger::Reprocess)
    }

    fn selected(
        self: &Arc<Self>,
        inner: &mut ExplorerInner,
        result: Result<ImageId, ValidationError>,
    ) -> Result<ImageId, ValidationError> {
        match &result {
            Ok(id) => {
                inner.error = None;
                info!(image = %id.0, "image selected");
                self.evaluate(inner, Trigger::Change);
            }
            Err(err) => {
                inner.error = Some(err.clone().into());
            }
        }
        self.emit(ExplorerEvent::StateChanged);
        result
    }

    fn evaluate(self: &Arc<Self>, inner: &mut ExplorerInner, trigger: Trigger) -> Option<u64> {
        let key = inner.dispatch_key();
        match inner.guard.evaluate(key, trigger) {
            TriggerDecision::Dispatch { generation } => {
                self.dispatch(inner, generation);
                Some(generation)
            }
            TriggerDecision::Dropped {
                generation_in_flight,
            } => {
                debug!(
                    generation_in_flight,
                    ?trigger,
                    "batch in flight; dropping trigger"
                );
                self.emit(ExplorerEvent::TriggerDropped {
                    generation_in_flight,
                });
                None
            }
            TriggerDecision::Unchanged | TriggerDecision::NoImage => None,
        }
    }

    fn dispatch(self: &Arc<Self>, inner: &mut ExplorerInner, generation: u64) {
        let Some(source) = inner.images.current() else {
            return;
        };
        let requests = plan_batch(&inner.settings, source.file());
        let algorithms: Vec<Algorithm> = requests.iter().map(|r| r.algorithm).collect();
        let (input_color_space, processing_space) = inner.settings.effective_color_spaces();

        if inner.error.as_ref().is_some_and(ExplorerError::is_processing) {
            inner.error = None;
        }
        self.phase.send_replace(inner.guard.phase());
        info!(
            generation,
            ?algorithms,
            %input_color_space,
            %processing_space,
            "dispatching processing batch"
        );
        self.emit(ExplorerEvent::BatchDispatched {
            generation,
            algorithms,
        });

        let explorer = Arc::clone(self);
        tokio::spawn(async move {
            let result = run_batch(explorer.processor.as_ref(), requests).await;
            explorer.complete_batch(generation, result).await;
        });
    }

    async fn complete_batch(&self, generation: u64, result: BatchResult) {
        let mut inner = self.inner.lock().await;
        if !inner.guard.settle(generation) {
            debug!(generation, "discarding results of cancelled batch");
            self.emit(ExplorerEvent::BatchCancelled { generation });
            return;
        }
        self.phase.send_replace(inner.guard.phase());

        let inner = &mut *inner;
        let reconciled = reconcile(
            result,
            ResultView {
                processed_images: &mut inner.processed_images,
                settings: &mut inner.settings,
                error: &mut inner.error,
            },
        );
        match reconciled {
            Reconciled::Committed {
                results,
                split_view_algorithm,
            } => {
                info!(generation, results, ?split_view_algorithm, "batch committed");
                self.emit(ExplorerEvent::BatchCommitted { generation });
            }
            Reconciled::Failed(ExplorerError::Processing { algorithm, message }) => {
                warn!(generation, %algorithm, %message, "batch failed");
                self.emit(ExplorerEvent::BatchFailed {
                    generation,
                    algorithm,
                    message,
                });
            }
            Reconciled::Failed(other) => {
                warn!(generation, error = %other, "batch failed");
            }
        }
        self.emit(ExplorerEvent::StateChanged);
    }

    fn teardown(&self, inner: &mut ExplorerInner) {
        if let Some(generation) = inner.guard.teardown() {
            info!(generation, "cancelling batch in flight");
        }
        inner.images.clear();
        self.phase.send_replace(inner.guard.phase());
    }

    fn emit(&self, event: ExplorerEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/explorer_tests.rs"]
mod tests;
