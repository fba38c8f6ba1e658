pub mod clahe;
pub mod draw;
pub mod equalization;
pub mod integral;
pub mod resize;
pub mod warp;
