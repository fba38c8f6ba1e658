//! Boosted Haar cascades in OpenCV's XML storage format.
//!
//! Each window of a scaled image pyramid runs through the stages in order;
//! a stage sums the leaf values of its weak trees and rejects the window
//! when the sum falls below the stage threshold. Feature responses are
//! normalized by the window's standard deviation.

use std::path::Path;

use image::imageops::{resize, FilterType};
use image::GrayImage;
use roxmltree::{Document, Node};

use crate::faces::domain::object_cascade::{CascadeParams, ObjectCascade};
use crate::imaging::integral::IntegralImage;
use crate::shared::error::{Result, VisionError};
use crate::shared::geometry::Rect;

use super::rect_grouping::{group_rectangles, DEFAULT_GROUP_EPS};

/// Subtracted from stage thresholds to absorb float rounding in the sums.
const STAGE_THRESHOLD_EPS: f64 = 1e-5;

#[derive(Clone, Debug)]
struct TreeNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Clone, Debug)]
struct WeakTree {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

#[derive(Clone, Debug)]
struct Stage {
    threshold: f64,
    trees: Vec<WeakTree>,
}

#[derive(Clone, Debug)]
struct HaarFeature {
    rects: Vec<(Rect, f64)>,
}

#[derive(Clone, Debug)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path).map_err(|source| VisionError::CascadeIo {
            path: path.to_path_buf(),
            source,
        })?;
        let cascade = Self::from_xml_str(&xml)?;
        log::debug!(
            "Loaded cascade {} ({}x{} window, {} stages, {} features)",
            path.display(),
            cascade.window_width,
            cascade.window_height,
            cascade.stages.len(),
            cascade.features.len()
        );
        Ok(cascade)
    }

    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let cascade = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or_else(|| {
                VisionError::UnsupportedCascade("no <cascade> element (old-style cascades are not supported)".into())
            })?;

        let stage_type = child_text(cascade, "stageType")?;
        if stage_type != "BOOST" {
            return Err(VisionError::UnsupportedCascade(format!("stage type {stage_type}")));
        }
        let feature_type = child_text(cascade, "featureType")?;
        if feature_type != "HAAR" {
            return Err(VisionError::UnsupportedCascade(format!("feature type {feature_type}")));
        }

        let window_width = parse_number::<u32>(child_text(cascade, "width")?)?;
        let window_height = parse_number::<u32>(child_text(cascade, "height")?)?;
        if window_width < 3 || window_height < 3 {
            return Err(VisionError::CascadeFormat(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let stages = items(child(cascade, "stages")?)
            .map(parse_stage)
            .collect::<Result<Vec<_>>>()?;
        let features = items(child(cascade, "features")?)
            .map(parse_feature)
            .collect::<Result<Vec<_>>>()?;

        let feature_count = features.len();
        let dangling = stages
            .iter()
            .flat_map(|s| s.trees.iter())
            .flat_map(|t| t.nodes.iter())
            .any(|n| n.feature >= feature_count);
        if dangling {
            return Err(VisionError::CascadeFormat("node refers to a missing feature".into()));
        }

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Runs every stage on the window whose top-left corner is `(x, y)`.
    fn accepts(&self, ii: &IntegralImage, x: i32, y: i32) -> bool {
        let (w, h) = (self.window_width as i32, self.window_height as i32);
        let norm_area = ((w - 2) * (h - 2)) as f64;
        let sum = ii.sum(x + 1, y + 1, w - 2, h - 2);
        let square_sum = ii.square_sum(x + 1, y + 1, w - 2, h - 2);
        let nf = norm_area * square_sum - sum * sum;
        let norm_factor = if nf > 0.0 { 1.0 / nf.sqrt() } else { 1.0 };

        self.stages.iter().all(|stage| {
            let total: f64 = stage
                .trees
                .iter()
                .map(|tree| self.evaluate_tree(tree, ii, x, y, norm_factor))
                .sum();
            total >= stage.threshold
        })
    }

    fn evaluate_tree(&self, tree: &WeakTree, ii: &IntegralImage, x: i32, y: i32, norm_factor: f64) -> f64 {
        let mut idx: i32 = 0;
        loop {
            let node = &tree.nodes[idx as usize];
            let value = self.feature_value(node.feature, ii, x, y) * norm_factor;
            idx = if value < node.threshold { node.left } else { node.right };
            if idx <= 0 || idx as usize >= tree.nodes.len() {
                break;
            }
        }
        let leaf = (-idx).max(0) as usize;
        tree.leaves.get(leaf).copied().unwrap_or(0.0)
    }

    fn feature_value(&self, feature: usize, ii: &IntegralImage, x: i32, y: i32) -> f64 {
        self.features[feature]
            .rects
            .iter()
            .map(|(r, weight)| weight * ii.sum(x + r.x, y + r.y, r.width, r.height))
            .sum()
    }
}

impl ObjectCascade for HaarCascade {
    fn detect_regions(&self, image: &GrayImage, params: &CascadeParams) -> Vec<Rect> {
        if params.scale_factor <= 1.0 || !params.scale_factor.is_finite() {
            log::warn!("Cascade scale factor {} must exceed 1", params.scale_factor);
            return Vec::new();
        }
        let (img_w, img_h) = image.dimensions();
        let (win_w, win_h) = (self.window_width, self.window_height);

        let mut candidates = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            if scaled_w < win_w || scaled_h < win_h {
                break;
            }
            let window_w = (win_w as f64 * factor).round() as i32;
            let window_h = (win_h as f64 * factor).round() as i32;

            if window_w >= params.min_size as i32 && window_h >= params.min_size as i32 {
                let scaled = if factor == 1.0 {
                    image.clone()
                } else {
                    resize(image, scaled_w, scaled_h, FilterType::Triangle)
                };
                let ii = IntegralImage::new(&scaled);
                let step = if factor > 2.0 { 1 } else { 2 };

                for y in (0..=(scaled_h - win_h) as i32).step_by(step) {
                    for x in (0..=(scaled_w - win_w) as i32).step_by(step) {
                        if self.accepts(&ii, x, y) {
                            candidates.push(Rect::new(
                                (x as f64 * factor).round() as i32,
                                (y as f64 * factor).round() as i32,
                                window_w,
                                window_h,
                            ));
                        }
                    }
                }
            }
            factor *= params.scale_factor;
        }

        let grouped = group_rectangles(&candidates, params.min_neighbors, DEFAULT_GROUP_EPS);
        log::debug!(
            "Cascade scan of {}x{}: {} raw hits, {} grouped",
            img_w,
            img_h,
            candidates.len(),
            grouped.len()
        );
        grouped
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| VisionError::CascadeFormat(format!("missing <{name}>")))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    Ok(child(node, name)?.text().unwrap_or("").trim())
}

/// Element children (`<_>` list items in OpenCV storage).
fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| VisionError::CascadeFormat(format!("bad number '{text}'")))
}

fn parse_numbers(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace().map(parse_number::<f64>).collect()
}

fn parse_stage(node: Node) -> Result<Stage> {
    let threshold = parse_number::<f64>(child_text(node, "stageThreshold")?)? - STAGE_THRESHOLD_EPS;
    let trees = items(child(node, "weakClassifiers")?)
        .map(parse_tree)
        .collect::<Result<Vec<_>>>()?;
    Ok(Stage { threshold, trees })
}

fn parse_tree(node: Node) -> Result<WeakTree> {
    let raw = parse_numbers(child_text(node, "internalNodes")?)?;
    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(VisionError::CascadeFormat(format!(
            "internalNodes holds {} values, expected groups of 4 (categorical features are not supported)",
            raw.len()
        )));
    }
    let nodes = raw
        .chunks_exact(4)
        .map(|n| TreeNode {
            left: n[0] as i32,
            right: n[1] as i32,
            feature: n[2] as usize,
            threshold: n[3],
        })
        .collect();
    let leaves = parse_numbers(child_text(node, "leafValues")?)?;
    Ok(WeakTree { nodes, leaves })
}

fn parse_feature(node: Node) -> Result<HaarFeature> {
    if let Ok(tilted) = child_text(node, "tilted") {
        if parse_number::<i32>(tilted)? != 0 {
            return Err(VisionError::UnsupportedCascade("tilted Haar features".into()));
        }
    }
    let rects = items(child(node, "rects")?)
        .map(|r| {
            let v = parse_numbers(r.text().unwrap_or(""))?;
            if v.len() != 5 {
                return Err(VisionError::CascadeFormat(format!("feature rect has {} values", v.len())));
            }
            Ok((Rect::new(v[0] as i32, v[1] as i32, v[2] as i32, v[3] as i32), v[4]))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(HaarFeature { rects })
}
