pub mod avatar;
pub mod events;
pub mod features;
pub mod models;
pub mod providers;
pub mod records;
pub mod storage;

pub use avatar::{GeneratedImage, Style, DEFAULT_STYLE, PNG_MIME};
pub use features::{Brightness, Contrast, EyeRegion, FurColor, FurPattern, ImageFeatures};
