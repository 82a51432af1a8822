use serde::{Deserialize, Serialize};

use crate::domain::{Algorithm, ColorSpace};

pub const APPLY_WHITE_BALANCE_PATH: &str = "/white-balance/apply";

/// Average (r, g, b) of an image, as reported by the processing service.
pub type RgbTriple = [f32; 3];

/// Query string of an apply request. The image itself travels as the
/// multipart `file` part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteBalanceQuery {
    pub algorithm: Algorithm,
    pub input_color_space: ColorSpace,
    pub processing_space: ColorSpace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhiteBalanceResponse {
    pub algorithm: Algorithm,
    pub processing_space: ColorSpace,
    pub image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_rgb_before: Option<RgbTriple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_rgb_after: Option<RgbTriple>,
}
