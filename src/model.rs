//! Gemini model identifiers and shared retouch constants.

/// Gemini models available to the retouch workflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image (fast, economical image editing).
    #[default]
    Flash25Image,
    /// Gemini 3 Pro Image Preview (highest quality image editing).
    Pro3ImagePreview,
    /// Gemini 2.5 Flash (batch job processing).
    Flash25,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash25Image => "gemini-2.5-flash-image",
            Self::Pro3ImagePreview => "gemini-3-pro-image-preview",
            Self::Flash25 => "gemini-2.5-flash",
        }
    }

    /// Returns the fully-qualified resource name used in batch manifests.
    pub fn resource_name(&self) -> String {
        format!("models/{}", self.as_str())
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The shared retouch instruction applied when no prompt is given.
///
/// Single source of truth for every mode.
pub const DEFAULT_PROMPT: &str = "Analyze this batch of images taken in the same location. Your goal is to apply a uniform professional retouch across all photos, ensuring consistent lighting, color grading, and sharpness on the people.\n\n\
1. Lighting & Exposure Correction: The subjects are currently heavily backlit. Apply a flattering fill light to the people in the foreground to brighten their faces and reveal details in their black clothing. Balance this new foreground exposure with the bright window background so the images look naturally bright, not washed out. Remove atmospheric haze caused by the window light.\n\n\
2. Color Consistency: Establish a consistent white balance across the batch. The sheer curtains and white textured furniture should render as clean, neutral white (no blue or yellow tints). Skin tones for all individuals must be natural, warm, and consistent from photo to photo, regardless of their position relative to the window.\n\n\
3. Texture & Sharpening: Apply a uniform high-quality sharpening pass to the entire batch. The textures of the dried grass, the fabric of the sofa, and hair details should be crisp and visually identical in sharpness across all images.\n\n\
Output the processed batch maintaining high resolution.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_as_str() {
        assert_eq!(GeminiModel::Flash25Image.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::Pro3ImagePreview.as_str(),
            "gemini-3-pro-image-preview"
        );
        assert_eq!(GeminiModel::Flash25.as_str(), "gemini-2.5-flash");
    }

    #[test]
    fn test_resource_name() {
        assert_eq!(
            GeminiModel::Flash25.resource_name(),
            "models/gemini-2.5-flash"
        );
    }

    #[test]
    fn test_model_default() {
        assert_eq!(GeminiModel::default(), GeminiModel::Flash25Image);
    }
}
