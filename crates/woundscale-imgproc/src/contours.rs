use std::collections::VecDeque;

use woundscale_image::{GrayscaleField, Point};

// Moore neighbourhood, clockwise in image coordinates starting west.
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// Label the 4-connected foreground components of a mask.
///
/// Returns the label of every pixel (`0` is background, components start at `1`)
/// and the pixel count of each component indexed by `label - 1`.
pub fn label_components(mask: &GrayscaleField, threshold: f32) -> (Vec<u32>, Vec<usize>) {
    let (cols, rows) = (mask.cols(), mask.rows());
    let data = mask.as_slice();
    let mut labels = vec![0u32; data.len()];
    let mut areas = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..data.len() {
        if labels[seed] != 0 || data[seed] <= threshold {
            continue;
        }
        let label = areas.len() as u32 + 1;
        let mut area = 0usize;
        labels[seed] = label;
        queue.push_back(seed);

        while let Some(idx) = queue.pop_front() {
            area += 1;
            let (x, y) = (idx % cols, idx / cols);
            let mut visit = |n: usize| {
                if labels[n] == 0 && data[n] > threshold {
                    labels[n] = label;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < cols {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - cols);
            }
            if y + 1 < rows {
                visit(idx + cols);
            }
        }
        areas.push(area);
    }

    (labels, areas)
}

/// Trace the outer boundary of the largest foreground region of a mask.
///
/// Pixels with a value above `threshold` are foreground. The largest 4-connected
/// component is traced with Moore neighbour tracing, clockwise in image coordinates,
/// starting at its top-left pixel. Ties between equally large components keep the
/// first one in raster order.
///
/// # Arguments
///
/// * `mask` - The segmentation mask.
/// * `threshold` - The foreground threshold, usually `0.5`.
///
/// # Returns
///
/// The ordered boundary pixels, empty if the mask has no foreground.
pub fn trace_outer_contour(mask: &GrayscaleField, threshold: f32) -> Vec<Point> {
    let (labels, areas) = label_components(mask, threshold);
    let Some(best) = areas
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, usize)>, (i, &a)| match best {
            Some((_, best_area)) if best_area >= a => best,
            _ => Some((i, a)),
        })
    else {
        return Vec::new();
    };
    let (label, area) = (best.0 as u32 + 1, best.1);

    let (cols, rows) = (mask.cols() as i64, mask.rows() as i64);
    let inside = |(x, y): (i64, i64)| {
        x >= 0 && y >= 0 && x < cols && y < rows && labels[(y * cols + x) as usize] == label
    };

    let Some(start_idx) = labels.iter().position(|&l| l == label) else {
        return Vec::new();
    };
    let start = (start_idx as i64 % cols, start_idx as i64 / cols);
    let to_point = |(x, y): (i64, i64)| Point::new(x as f64, y as f64);

    let mut contour = vec![to_point(start)];
    let Some((first, first_back)) = moore_step(start, (start.0 - 1, start.1), &inside) else {
        return contour;
    };

    let (mut current, mut back) = (first, first_back);
    let max_steps = 4 * area + 8;
    for _ in 0..max_steps {
        let Some((next, next_back)) = moore_step(current, back, &inside) else {
            break;
        };
        if current == start && next == first {
            break;
        }
        contour.push(to_point(current));
        current = next;
        back = next_back;
    }

    contour
}

// Clockwise search around `current` starting after the `back` neighbour.
fn moore_step(
    current: (i64, i64),
    back: (i64, i64),
    inside: &impl Fn((i64, i64)) -> bool,
) -> Option<((i64, i64), (i64, i64))> {
    let offset = (back.0 - current.0, back.1 - current.1);
    let k = NEIGHBOURS.iter().position(|&d| d == offset)?;
    let mut previous = back;
    for i in 1..=8 {
        let (dx, dy) = NEIGHBOURS[(k + i) % 8];
        let candidate = (current.0 + dx, current.1 + dy);
        if inside(candidate) {
            return Some((candidate, previous));
        }
        previous = candidate;
    }
    None
}
