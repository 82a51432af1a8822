use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::domain::{Algorithm, ColorSpace};
use tokio::sync::Semaphore;

use crate::{
    error::ProcessingError,
    image_source::ImageFile,
    processing::{ProcessedImage, ProcessingClient, ProcessingRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub algorithm: Algorithm,
    pub input_color_space: ColorSpace,
    pub processing_space: ColorSpace,
}

/// Processing double: answers every algorithm unless told to fail it, and
/// optionally parks each request on a gate. Every permit added to the gate
/// releases exactly one request.
pub(crate) struct ScriptedProcessor {
    failures: Mutex<HashMap<Algorithm, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedProcessor {
    pub fn ok() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut processor = Self::ok();
        processor.gate = Some(Arc::clone(&gate));
        (processor, gate)
    }

    pub fn failing(self, algorithm: Algorithm, message: &str) -> Self {
        self.fail(algorithm, message);
        self
    }

    pub fn fail(&self, algorithm: Algorithm, message: &str) {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(algorithm, message.to_string());
    }

    pub fn heal(&self) {
        self.failures.lock().expect("failures lock").clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self, algorithm: Algorithm) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.algorithm == algorithm)
            .count()
    }
}

#[async_trait]
impl ProcessingClient for ScriptedProcessor {
    async fn process(&self, request: ProcessingRequest) -> Result<ProcessedImage, ProcessingError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            algorithm: request.algorithm,
            input_color_space: request.input_color_space,
            processing_space: request.processing_space,
        });

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let failure = self
            .failures
            .lock()
            .expect("failures lock")
            .get(&request.algorithm)
            .cloned();
        if let Some(detail) = failure {
            return Err(ProcessingError::Rejected {
                status: 400,
                kind: None,
                detail,
            });
        }

        Ok(processed(request.algorithm, request.processing_space, &request.file))
    }
}

pub(crate) fn processed(
    algorithm: Algorithm,
    processing_space: ColorSpace,
    file: &ImageFile,
) -> ProcessedImage {
    ProcessedImage {
        algorithm,
        processing_space,
        image_png: format!("{algorithm}:{}", file.name).into_bytes(),
        avg_rgb_before: Some([0.6, 0.5, 0.4]),
        avg_rgb_after: Some([0.5, 0.5, 0.5]),
    }
}

pub(crate) fn jpeg(name: &str, size: usize) -> ImageFile {
    ImageFile::new(name, "image/jpeg", vec![0xAB; size])
}
