//! Region extraction and presence detection.
//!
//! A region is a 4-connected set of in-range mask pixels; its area is the
//! pixel count. Holes inside a region do not split it and do not create
//! regions of their own. Detection is presence only: any region meeting the
//! minimum area makes the class detected, regardless of how many qualify.

use crate::segment::{ColorClass, Mask};

/// Per-iteration detection outcome, one flag per tracked class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Detections {
    pub red: bool,
    pub blue: bool,
}

/// Areas of all 4-connected regions in the mask.
pub fn region_areas(mask: &Mask) -> Vec<usize> {
    let mut areas = Vec::new();
    scan_regions(mask, |area| {
        areas.push(area);
        true
    });
    areas
}

/// True iff some region's area is at least `min_area` (inclusive).
///
/// Short-circuits as soon as a qualifying region is found.
pub fn has_region_at_least(mask: &Mask, min_area: usize) -> bool {
    if min_area == 0 {
        return mask.count() > 0;
    }
    let mut found = false;
    scan_regions(mask, |area| {
        if area >= min_area {
            found = true;
            return false;
        }
        true
    });
    found
}

/// Decide each class independently from its mask.
pub fn detect_classes(masks: &[(ColorClass, Mask)], min_area: usize) -> Detections {
    let mut detections = Detections::default();
    for (class, mask) in masks {
        let detected = has_region_at_least(mask, min_area);
        match class {
            ColorClass::Red => detections.red = detected,
            ColorClass::Blue => detections.blue = detected,
        }
    }
    detections
}

/// Flood-fill every region, reporting each area to `on_region`.
///
/// `on_region` returns false to stop scanning early.
fn scan_regions(mask: &Mask, mut on_region: impl FnMut(usize) -> bool) {
    let width = mask.width();
    let height = mask.height();
    let mut visited = vec![false; (width * height) as usize];
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) as usize;
            if visited[index] || !mask.get(x, y) {
                continue;
            }

            // Flood-fill one 4-connected region.
            let mut area = 0usize;
            visited[index] = true;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                area += 1;
                let mut visit = |nx: u32, ny: u32| {
                    let ni = (ny * width + nx) as usize;
                    if !visited[ni] && mask.get(nx, ny) {
                        visited[ni] = true;
                        stack.push((nx, ny));
                    }
                };
                if cx > 0 {
                    visit(cx - 1, cy);
                }
                if cx + 1 < width {
                    visit(cx + 1, cy);
                }
                if cy > 0 {
                    visit(cx, cy - 1);
                }
                if cy + 1 < height {
                    visit(cx, cy + 1);
                }
            }

            if !on_region(area) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Mask;

    /// Build a mask from rows of '.' and '#'.
    fn mask_of(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let bits = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '#'))
            .collect();
        Mask::from_bits(bits, width, height).unwrap()
    }

    #[test]
    fn area_threshold_is_inclusive() {
        let mask = mask_of(&[
            "....",
            ".##.",
            ".##.",
            "....",
        ]);

        assert!(has_region_at_least(&mask, 4));
        assert!(has_region_at_least(&mask, 3));
        assert!(!has_region_at_least(&mask, 5));
    }

    #[test]
    fn diagonal_pixels_are_separate_regions() {
        let mask = mask_of(&[
            "#.",
            ".#",
        ]);

        let mut areas = region_areas(&mask);
        areas.sort_unstable();
        assert_eq!(areas, vec![1, 1]);
        assert!(!has_region_at_least(&mask, 2));
    }

    #[test]
    fn region_with_hole_is_one_region() {
        let mask = mask_of(&[
            "###",
            "#.#",
            "###",
        ]);

        assert_eq!(region_areas(&mask), vec![8]);
        assert!(has_region_at_least(&mask, 8));
        assert!(!has_region_at_least(&mask, 9));
    }

    #[test]
    fn multiple_qualifying_regions_do_not_change_the_outcome() {
        let mask = mask_of(&[
            "##.##",
            "##.##",
        ]);

        assert_eq!(region_areas(&mask).len(), 2);
        assert!(has_region_at_least(&mask, 4));
    }

    #[test]
    fn empty_mask_detects_nothing() {
        let mask = mask_of(&["...", "..."]);

        assert!(region_areas(&mask).is_empty());
        assert!(!has_region_at_least(&mask, 1));
        assert!(!has_region_at_least(&mask, 0));
    }

    #[test]
    fn classes_are_decided_independently() {
        let red_mask = mask_of(&["####"]);
        let blue_mask = mask_of(&["#..."]);
        let masks = vec![
            (ColorClass::Red, red_mask),
            (ColorClass::Blue, blue_mask),
        ];

        let detections = detect_classes(&masks, 2);
        assert!(detections.red);
        assert!(!detections.blue);
    }
}
