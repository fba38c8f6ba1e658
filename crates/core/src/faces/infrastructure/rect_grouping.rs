//! Clustering of raw sliding-window hits into final detections.
//!
//! Hits whose edges all lie within `eps` of each other (relative to their
//! size) join one cluster; each cluster is averaged, clusters with too few
//! members are dropped, and small clusters nested inside stronger ones are
//! suppressed.

use crate::shared::geometry::Rect;

pub const DEFAULT_GROUP_EPS: f64 = 0.2;

/// Groups `rects`, keeping clusters with more than `group_threshold` members.
///
/// A threshold of zero returns the input unchanged.
pub fn group_rectangles(rects: &[Rect], group_threshold: u32, eps: f64) -> Vec<Rect> {
    if group_threshold == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let n = rects.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&rects[i], &rects[j], eps) {
                union(&mut parent, i, j);
            }
        }
    }

    // Class ids in order of first appearance.
    let mut class_of_root = vec![usize::MAX; n];
    let mut sums: Vec<[f64; 4]> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();
    for (i, r) in rects.iter().enumerate() {
        let root = find(&mut parent, i);
        if class_of_root[root] == usize::MAX {
            class_of_root[root] = sums.len();
            sums.push([0.0; 4]);
            counts.push(0);
        }
        let class = class_of_root[root];
        sums[class][0] += r.x as f64;
        sums[class][1] += r.y as f64;
        sums[class][2] += r.width as f64;
        sums[class][3] += r.height as f64;
        counts[class] += 1;
    }

    let averaged: Vec<Rect> = sums
        .iter()
        .zip(counts.iter())
        .map(|(s, &count)| {
            let inv = 1.0 / count as f64;
            Rect::new(
                (s[0] * inv).round() as i32,
                (s[1] * inv).round() as i32,
                (s[2] * inv).round() as i32,
                (s[3] * inv).round() as i32,
            )
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= group_threshold {
            continue;
        }
        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.right() <= r2.right() + dx
                && r1.bottom() <= r2.bottom() + dy
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            grouped.push(*r1);
        }
    }
    grouped
}

fn similar(r1: &Rect, r2: &Rect, eps: f64) -> bool {
    let delta = eps * (r1.width.min(r2.width) + r1.height.min(r2.height)) as f64 * 0.5;
    ((r1.x - r2.x).abs() as f64) <= delta
        && ((r1.y - r2.y).abs() as f64) <= delta
        && ((r1.right() - r2.right()).abs() as f64) <= delta
        && ((r1.bottom() - r2.bottom()).abs() as f64) <= delta
}

/// Find root of element `i` with path halving.
fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(base: Rect, count: usize) -> Vec<Rect> {
        (0..count)
            .map(|i| base.translated(i as i32 % 2, i as i32 % 3))
            .collect()
    }

    #[test]
    fn test_zero_threshold_passes_through() {
        let rects = vec![Rect::new(0, 0, 10, 10), Rect::new(1, 1, 10, 10)];
        assert_eq!(group_rectangles(&rects, 0, DEFAULT_GROUP_EPS), rects);
    }

    #[test]
    fn test_cluster_is_averaged() {
        let rects = vec![
            Rect::new(10, 10, 40, 40),
            Rect::new(12, 10, 40, 40),
            Rect::new(11, 13, 40, 40),
        ];
        let grouped = group_rectangles(&rects, 2, DEFAULT_GROUP_EPS);
        assert_eq!(grouped, vec![Rect::new(11, 11, 40, 40)]);
    }

    #[test]
    fn test_sparse_cluster_dropped() {
        let mut rects = cluster(Rect::new(10, 10, 40, 40), 5);
        rects.extend(cluster(Rect::new(200, 200, 40, 40), 2));
        let grouped = group_rectangles(&rects, 3, DEFAULT_GROUP_EPS);
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].x < 20);
    }

    #[test]
    fn test_separate_clusters_keep_order() {
        let mut rects = cluster(Rect::new(300, 10, 40, 40), 4);
        rects.extend(cluster(Rect::new(10, 10, 40, 40), 4));
        let grouped = group_rectangles(&rects, 2, DEFAULT_GROUP_EPS);
        assert_eq!(grouped.len(), 2);
        assert!(grouped[0].x > grouped[1].x);
    }

    #[test]
    fn test_nested_weak_cluster_suppressed() {
        let mut rects = cluster(Rect::new(0, 0, 100, 100), 10);
        rects.extend(cluster(Rect::new(30, 30, 20, 20), 4));
        let grouped = group_rectangles(&rects, 2, DEFAULT_GROUP_EPS);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].width, 100);
    }

    #[test]
    fn test_similarity_is_relative_to_size() {
        assert!(similar(&Rect::new(0, 0, 100, 100), &Rect::new(15, 15, 100, 100), 0.2));
        assert!(!similar(&Rect::new(0, 0, 10, 10), &Rect::new(5, 5, 10, 10), 0.2));
    }
}
