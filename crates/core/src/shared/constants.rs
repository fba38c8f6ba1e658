pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// File names of the stock OpenCV cascades looked up inside a cascade directory.
pub const HUMAN_FACE_CASCADE: &str = "haarcascade_frontalface_alt.xml";
pub const CAT_FACE_CASCADE: &str = "haarcascade_frontalcatface.xml";
pub const LEFT_EYE_CASCADE: &str = "haarcascade_lefteye_2splits.xml";
pub const RIGHT_EYE_CASCADE: &str = "haarcascade_righteye_2splits.xml";

/// Label carried by blobs that have not been classified.
pub const UNKNOWN_LABEL: u32 = 0;
