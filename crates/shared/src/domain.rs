use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);
    };
}

id_newtype!(PreviewHandleId, u64);
id_newtype!(ImageId, Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

/// White-balance strategy run by the processing service.
///
/// Declaration order is significant: it is the enumeration order used to
/// pick which failure is reported when several requests of one batch fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    GreyWorld,
    WhitePatch,
    GreyEdge,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::GreyWorld,
        Algorithm::WhitePatch,
        Algorithm::GreyEdge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::GreyWorld => "grey_world",
            Algorithm::WhitePatch => "white_patch",
            Algorithm::GreyEdge => "grey_edge",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::GreyWorld => "Grey World",
            Algorithm::WhitePatch => "White Patch",
            Algorithm::GreyEdge => "Grey Edge",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl FromStr for Algorithm {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                kind: "algorithm",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    #[serde(rename = "sRGB")]
    Srgb,
    #[serde(rename = "linear_rgb")]
    LinearRgb,
}

impl ColorSpace {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorSpace::Srgb => "sRGB",
            ColorSpace::LinearRgb => "linear_rgb",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorSpace::Srgb => "sRGB",
            ColorSpace::LinearRgb => "Linear RGB",
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpace {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srgb" => Ok(ColorSpace::Srgb),
            "linear_rgb" | "linear-rgb" | "linear" => Ok(ColorSpace::LinearRgb),
            _ => Err(ParseEnumError {
                kind: "color space",
                value: s.to_string(),
            }),
        }
    }
}

/// In `Auto` the effective pair is always (sRGB, linear RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpaceMode {
    #[default]
    Auto,
    Manual,
}

impl ColorSpaceMode {
    pub const AUTO_INPUT: ColorSpace = ColorSpace::Srgb;
    pub const AUTO_PROCESSING: ColorSpace = ColorSpace::LinearRgb;

    pub fn as_str(self) -> &'static str {
        match self {
            ColorSpaceMode::Auto => "auto",
            ColorSpaceMode::Manual => "manual",
        }
    }
}

impl fmt::Display for ColorSpaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpaceMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorSpaceMode::Auto),
            "manual" => Ok(ColorSpaceMode::Manual),
            _ => Err(ParseEnumError {
                kind: "color space mode",
                value: s.to_string(),
            }),
        }
    }
}
