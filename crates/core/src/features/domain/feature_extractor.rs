use image::GrayImage;

/// 256-bit binary descriptor (ORB-style).
pub type BinaryDescriptor = [u8; 32];

/// Descriptors of every keypoint found in one image, in detection order.
#[derive(Clone, Debug, PartialEq)]
pub enum Descriptors {
    Binary(Vec<BinaryDescriptor>),
    Float(Vec<Vec<f32>>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match self {
            Descriptors::Binary(d) => d.len(),
            Descriptors::Float(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Best training descriptor for one query descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Domain interface for local keypoint features.
///
/// Implementations pair a detector/descriptor with the matcher suited to
/// their descriptor kind.
pub trait FeatureExtractor: Send {
    fn detect_and_compute(&self, image: &GrayImage) -> Descriptors;

    /// One brute-force best match per query descriptor.
    ///
    /// Returns no matches when either side is empty or the kinds differ.
    fn match_descriptors(&self, query: &Descriptors, train: &Descriptors) -> Vec<DescriptorMatch>;

    fn name(&self) -> &'static str;
}

/// Brute-force nearest neighbour over any descriptor slice and metric.
///
/// The first training descriptor wins ties.
pub fn brute_force_match<T, F>(query: &[T], train: &[T], distance: F) -> Vec<DescriptorMatch>
where
    F: Fn(&T, &T) -> f32,
{
    if train.is_empty() {
        return Vec::new();
    }
    query
        .iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            train
                .iter()
                .enumerate()
                .map(|(train_idx, t)| DescriptorMatch {
                    query_idx,
                    train_idx,
                    distance: distance(q, t),
                })
                .fold(None, |best: Option<DescriptorMatch>, m| match best {
                    Some(b) if b.distance <= m.distance => Some(b),
                    _ => Some(m),
                })
        })
        .collect()
}
