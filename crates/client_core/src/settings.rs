//! User-selectable configuration: active algorithms, split-view pointer and
//! color-space mode with its manual overrides.

use serde::Serialize;
use shared::domain::{Algorithm, ColorSpace, ColorSpaceMode};

pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::GreyWorld;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    selected_algorithms: Vec<Algorithm>,
    split_view_algorithm: Option<Algorithm>,
    color_space_mode: ColorSpaceMode,
    input_color_space: ColorSpace,
    processing_space: ColorSpace,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selected_algorithms: vec![DEFAULT_ALGORITHM],
            split_view_algorithm: Some(DEFAULT_ALGORITHM),
            color_space_mode: ColorSpaceMode::Auto,
            input_color_space: ColorSpaceMode::AUTO_INPUT,
            processing_space: ColorSpaceMode::AUTO_PROCESSING,
        }
    }
}

impl Settings {
    pub fn selected_algorithms(&self) -> &[Algorithm] {
        &self.selected_algorithms
    }

    pub fn split_view_algorithm(&self) -> Option<Algorithm> {
        self.split_view_algorithm
    }

    pub fn color_space_mode(&self) -> ColorSpaceMode {
        self.color_space_mode
    }

    pub fn input_color_space(&self) -> ColorSpace {
        self.input_color_space
    }

    pub fn processing_space(&self) -> ColorSpace {
        self.processing_space
    }

    /// The (input, processing) pair every request of a batch is sent with.
    pub fn effective_color_spaces(&self) -> (ColorSpace, ColorSpace) {
        match self.color_space_mode {
            ColorSpaceMode::Auto => (
                ColorSpaceMode::AUTO_INPUT,
                ColorSpaceMode::AUTO_PROCESSING,
            ),
            ColorSpaceMode::Manual => (self.input_color_space, self.processing_space),
        }
    }

    /// Returns whether the selection changed. Removing the sole remaining
    /// algorithm is refused.
    pub fn toggle_algorithm(&mut self, algorithm: Algorithm) -> bool {
        if let Some(index) = self
            .selected_algorithms
            .iter()
            .position(|selected| *selected == algorithm)
        {
            if self.selected_algorithms.len() == 1 {
                return false;
            }
            self.selected_algorithms.remove(index);
            if self.split_view_algorithm == Some(algorithm) {
                self.split_view_algorithm = self.selected_algorithms.first().copied();
            }
        } else {
            self.selected_algorithms.push(algorithm);
            if self.split_view_algorithm.is_none() {
                self.split_view_algorithm = Some(algorithm);
            }
        }
        true
    }

    /// Replaces the whole selection. Duplicates are collapsed keeping the
    /// first occurrence; an empty list is rejected.
    pub fn set_algorithms(&mut self, algorithms: &[Algorithm]) -> bool {
        let mut deduped: Vec<Algorithm> = Vec::with_capacity(algorithms.len());
        for algorithm in algorithms {
            if !deduped.contains(algorithm) {
                deduped.push(*algorithm);
            }
        }
        let Some(first) = deduped.first().copied() else {
            return false;
        };

        match self.split_view_algorithm {
            Some(current) if deduped.contains(&current) => {}
            _ => self.split_view_algorithm = Some(first),
        }
        let changed = deduped != self.selected_algorithms;
        self.selected_algorithms = deduped;
        changed
    }

    /// Switching to `Auto` overwrites the stored pair with the auto values.
    pub fn set_color_space_mode(&mut self, mode: ColorSpaceMode) {
        self.color_space_mode = mode;
        if mode == ColorSpaceMode::Auto {
            self.input_color_space = ColorSpaceMode::AUTO_INPUT;
            self.processing_space = ColorSpaceMode::AUTO_PROCESSING;
        }
    }

    pub fn set_input_color_space(&mut self, space: ColorSpace) {
        self.input_color_space = space;
    }

    pub fn set_processing_space(&mut self, space: ColorSpace) {
        self.processing_space = space;
    }

    pub(crate) fn set_split_view_algorithm(&mut self, algorithm: Option<Algorithm>) {
        self.split_view_algorithm = algorithm;
    }
}
