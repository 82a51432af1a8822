//! Batch dispatch: change detection, the single-flight guard, generations
//! and the all-or-nothing join.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use shared::domain::{Algorithm, ColorSpace, ColorSpaceMode, ImageId};

use crate::{
    error::ProcessingError,
    image_source::ImageFile,
    processing::{ProcessedImage, ProcessingClient, ProcessingRequest},
    settings::Settings,
};

/// Everything a batch depends on. A new batch is warranted only when this
/// differs from the key of the last dispatched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchKey {
    algorithms: Vec<Algorithm>,
    image: ImageId,
    mode: ColorSpaceMode,
    input_color_space: ColorSpace,
    processing_space: ColorSpace,
}

impl DispatchKey {
    pub fn capture(settings: &Settings, image: ImageId) -> Self {
        let (input_color_space, processing_space) = settings.effective_color_spaces();
        Self {
            algorithms: settings.selected_algorithms().to_vec(),
            image,
            mode: settings.color_space_mode(),
            input_color_space,
            processing_space,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchPhase {
    Idle,
    Dispatching { generation: u64 },
}

impl DispatchPhase {
    pub fn is_dispatching(&self) -> bool {
        matches!(self, DispatchPhase::Dispatching { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Inputs may have changed; dispatch only if the key differs.
    Change,
    /// Explicit user request; dispatch even with an unchanged key.
    Reprocess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Dispatch { generation: u64 },
    /// A batch is in flight; the trigger is discarded, not queued.
    Dropped { generation_in_flight: u64 },
    Unchanged,
    NoImage,
}

/// Single-flight guard. At most one batch is `Dispatching`, and only the
/// batch carrying the current generation may settle.
#[derive(Debug, Default)]
pub struct DispatchGuard {
    generation: u64,
    in_flight: Option<u64>,
    last_dispatched: Option<DispatchKey>,
}

impl DispatchGuard {
    pub fn phase(&self) -> DispatchPhase {
        match self.in_flight {
            Some(generation) => DispatchPhase::Dispatching { generation },
            None => DispatchPhase::Idle,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn evaluate(&mut self, key: Option<DispatchKey>, trigger: Trigger) -> TriggerDecision {
        let Some(key) = key else {
            return TriggerDecision::NoImage;
        };
        let changed = self.last_dispatched.as_ref() != Some(&key);
        if !changed && trigger == Trigger::Change {
            return TriggerDecision::Unchanged;
        }
        if let Some(generation_in_flight) = self.in_flight {
            return TriggerDecision::Dropped {
                generation_in_flight,
            };
        }

        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.last_dispatched = Some(key);
        TriggerDecision::Dispatch {
            generation: self.generation,
        }
    }

    /// Returns `false` when the batch was cancelled; its results must then be
    /// discarded without touching any state.
    pub fn settle(&mut self, generation: u64) -> bool {
        if self.in_flight == Some(generation) && self.generation == generation {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Starts a new generation so anything still in flight resolves as
    /// cancelled. Returns the generation that was cancelled, if any.
    pub fn teardown(&mut self) -> Option<u64> {
        self.generation += 1;
        self.last_dispatched = None;
        self.in_flight.take()
    }
}

/// Builds one request per selected algorithm, all sharing the effective
/// color-space pair.
pub fn plan_batch(settings: &Settings, file: &Arc<ImageFile>) -> Vec<ProcessingRequest> {
    let (input_color_space, processing_space) = settings.effective_color_spaces();
    settings
        .selected_algorithms()
        .iter()
        .map(|algorithm| ProcessingRequest {
            algorithm: *algorithm,
            input_color_space,
            processing_space,
            file: Arc::clone(file),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    Completed(Vec<ProcessedImage>),
    Failed {
        algorithm: Algorithm,
        error: ProcessingError,
    },
}

/// Issues every request concurrently and waits for all of them. Results keep
/// request order. When several requests fail, the failure of the algorithm
/// that comes first in enumeration order is reported.
pub async fn run_batch(
    client: &dyn ProcessingClient,
    requests: Vec<ProcessingRequest>,
) -> BatchResult {
    let pending = requests.into_iter().map(|request| {
        let algorithm = request.algorithm;
        async move { (algorithm, client.process(request).await) }
    });
    let settled = join_all(pending).await;

    let mut processed = Vec::with_capacity(settled.len());
    let mut failure: Option<(Algorithm, ProcessingError)> = None;
    for (algorithm, result) in settled {
        match result {
            Ok(image) => processed.push(image),
            Err(error) => {
                let earlier = failure
                    .as_ref()
                    .map_or(true, |(failed, _)| algorithm < *failed);
                if earlier {
                    failure = Some((algorithm, error));
                }
            }
        }
    }

    match failure {
        Some((algorithm, error)) => BatchResult::Failed { algorithm, error },
        None => BatchResult::Completed(processed),
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
