//! Merges a settled batch into view state.

use shared::domain::Algorithm;

use crate::{
    dispatch::BatchResult, error::ExplorerError, processing::ProcessedImage, settings::Settings,
};

/// Keeps `previous` if it still names a result, otherwise falls back to the
/// first result, or to nothing when there are no results.
pub fn reconcile_split_view(
    previous: Option<Algorithm>,
    results: &[ProcessedImage],
) -> Option<Algorithm> {
    match previous {
        Some(algorithm) if results.iter().any(|image| image.algorithm == algorithm) => {
            Some(algorithm)
        }
        _ => results.first().map(|image| image.algorithm),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Committed {
        results: usize,
        split_view_algorithm: Option<Algorithm>,
    },
    Failed(ExplorerError),
}

/// The view fields a settled batch may write.
pub struct ResultView<'a> {
    pub processed_images: &'a mut Vec<ProcessedImage>,
    pub settings: &'a mut Settings,
    pub error: &'a mut Option<ExplorerError>,
}

/// Applies a batch of the current generation. Cancelled batches never reach
/// this point.
pub fn reconcile(result: BatchResult, view: ResultView<'_>) -> Reconciled {
    match result {
        BatchResult::Completed(images) => {
            let split_view_algorithm =
                reconcile_split_view(view.settings.split_view_algorithm(), &images);
            view.settings.set_split_view_algorithm(split_view_algorithm);
            let results = images.len();
            *view.processed_images = images;
            Reconciled::Committed {
                results,
                split_view_algorithm,
            }
        }
        BatchResult::Failed { algorithm, error } => {
            let error = ExplorerError::Processing {
                algorithm,
                message: error.to_string(),
            };
            *view.error = Some(error.clone());
            Reconciled::Failed(error)
        }
    }
}
