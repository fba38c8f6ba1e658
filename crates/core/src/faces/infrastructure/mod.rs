pub mod face_detector;
pub mod haar_cascade;
pub mod rect_grouping;
