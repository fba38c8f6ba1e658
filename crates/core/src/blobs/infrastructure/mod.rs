pub mod blob_classifier;
pub mod blob_detector;
pub mod color_histogram;
