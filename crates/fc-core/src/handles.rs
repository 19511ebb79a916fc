//! Connection-handle placement for custom nodes.
//!
//! A requested handle count is spread over the sides selected by the axis
//! mode. Every visual port is emitted twice, once as a source and once as a
//! target at the same offset, so a single port accepts edges in both
//! directions. Output order is fully determined by the inputs; layout port
//! assignment relies on that.

use crate::model::{Bounds, Point, StyleBag};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl HandleSide {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleSide::Top => "top",
            HandleSide::Right => "right",
            HandleSide::Bottom => "bottom",
            HandleSide::Left => "left",
        }
    }
}

/// Which sides of a node carry handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleAxis {
    /// Left and right sides.
    #[default]
    Horizontal,
    /// Top and bottom sides.
    Vertical,
    /// All four sides.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleRole {
    Source,
    Target,
}

impl HandleRole {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleRole::Source => "source",
            HandleRole::Target => "target",
        }
    }
}

/// A derived connection point on a node's boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    /// `<side>-<index>-<source|target>`
    pub id: String,
    pub side: HandleSide,
    pub index: usize,
    /// Position along the side, 0..=100.
    pub offset_percent: f32,
    pub role: HandleRole,
    #[serde(default, skip_serializing_if = "StyleBag::is_empty")]
    pub style: StyleBag,
}

impl Handle {
    /// World-space point of this handle on a node box.
    pub fn anchor(&self, bounds: Bounds) -> Point {
        let t = self.offset_percent / 100.0;
        match self.side {
            HandleSide::Top => Point::new(bounds.x + bounds.width * t, bounds.y),
            HandleSide::Bottom => Point::new(bounds.x + bounds.width * t, bounds.bottom()),
            HandleSide::Left => Point::new(bounds.x, bounds.y + bounds.height * t),
            HandleSide::Right => Point::new(bounds.right(), bounds.y + bounds.height * t),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.1}%", self.id, self.offset_percent)
    }
}

pub type HandleSet = SmallVec<[Handle; 8]>;

/// Offset of handle `i` among `n` evenly spread along a side.
fn even_offset(i: usize, n: usize) -> f32 {
    if n == 1 {
        return 50.0;
    }
    (i + 1) as f32 / (n + 1) as f32 * 100.0
}

fn push_side(out: &mut HandleSet, side: HandleSide, n: usize, style: &StyleBag) {
    for i in 0..n {
        let offset_percent = even_offset(i, n);
        for role in [HandleRole::Source, HandleRole::Target] {
            out.push(Handle {
                id: format!("{}-{}-{}", side.as_str(), i, role.as_str()),
                side,
                index: i,
                offset_percent,
                role,
                style: style.clone(),
            });
        }
    }
}

/// Compute the handles of a node.
///
/// - `Horizontal`: `ceil(n/2)` on the left, `floor(n/2)` on the right.
/// - `Vertical`: `ceil(n/2)` on top, `floor(n/2)` on the bottom.
/// - `All`: `max(floor(n/4), 1)` on each side, in order top, right, bottom, left.
///
/// `count == 0` yields no handles in every mode.
pub fn place_handles(count: usize, axis: HandleAxis, style: &StyleBag) -> HandleSet {
    let mut out = HandleSet::new();
    if count == 0 {
        return out;
    }
    let first = count.div_ceil(2);
    let second = count / 2;
    match axis {
        HandleAxis::Horizontal => {
            push_side(&mut out, HandleSide::Left, first, style);
            push_side(&mut out, HandleSide::Right, second, style);
        }
        HandleAxis::Vertical => {
            push_side(&mut out, HandleSide::Top, first, style);
            push_side(&mut out, HandleSide::Bottom, second, style);
        }
        HandleAxis::All => {
            let per_side = (count / 4).max(1);
            for side in [
                HandleSide::Top,
                HandleSide::Right,
                HandleSide::Bottom,
                HandleSide::Left,
            ] {
                push_side(&mut out, side, per_side, style);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn count_on(handles: &HandleSet, side: HandleSide) -> usize {
        handles.iter().filter(|h| h.side == side).count()
    }

    #[test]
    fn horizontal_five_splits_three_two() {
        let handles = place_handles(5, HandleAxis::Horizontal, &StyleBag::new());
        assert_eq!(handles.len(), 10);
        assert_eq!(count_on(&handles, HandleSide::Left), 6);
        assert_eq!(count_on(&handles, HandleSide::Right), 4);
        assert_eq!(count_on(&handles, HandleSide::Top), 0);
    }

    #[test]
    fn pairs_share_offsets() {
        let handles = place_handles(3, HandleAxis::Vertical, &StyleBag::new());
        for pair in handles.chunks(2) {
            assert_eq!(pair[0].role, HandleRole::Source);
            assert_eq!(pair[1].role, HandleRole::Target);
            assert_eq!(pair[0].offset_percent, pair[1].offset_percent);
            assert_eq!(pair[0].side, pair[1].side);
        }
    }

    #[test]
    fn offsets_are_evenly_spread() {
        let handles = place_handles(6, HandleAxis::Horizontal, &StyleBag::new());
        let left: Vec<f32> = handles
            .iter()
            .filter(|h| h.side == HandleSide::Left && h.role == HandleRole::Source)
            .map(|h| h.offset_percent)
            .collect();
        assert_eq!(left, vec![25.0, 50.0, 75.0]);
    }

    #[test]
    fn single_handle_is_centered() {
        let handles = place_handles(1, HandleAxis::Horizontal, &StyleBag::new());
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].id, "left-0-source");
        assert_eq!(handles[1].id, "left-0-target");
        assert_eq!(handles[0].offset_percent, 50.0);
    }

    #[test]
    fn zero_count_yields_nothing() {
        for axis in [HandleAxis::Horizontal, HandleAxis::Vertical, HandleAxis::All] {
            assert!(place_handles(0, axis, &StyleBag::new()).is_empty());
        }
    }

    #[test]
    fn all_sides_minimum_one() {
        let handles = place_handles(2, HandleAxis::All, &StyleBag::new());
        let sides: Vec<HandleSide> = handles.iter().step_by(2).map(|h| h.side).collect();
        assert_eq!(
            sides,
            vec![
                HandleSide::Top,
                HandleSide::Right,
                HandleSide::Bottom,
                HandleSide::Left
            ]
        );
    }

    #[test]
    fn all_sides_floor_division() {
        let handles = place_handles(9, HandleAxis::All, &StyleBag::new());
        // floor(9 / 4) = 2 per side, 2 descriptors per handle
        assert_eq!(handles.len(), 16);
    }

    #[test]
    fn placement_is_deterministic() {
        let mut style = StyleBag::new();
        style.insert("background".into(), "#555".into());
        let a = place_handles(7, HandleAxis::All, &style);
        let b = place_handles(7, HandleAxis::All, &style);
        assert_eq!(a, b);
    }

    #[test]
    fn anchors_sit_on_the_boundary() {
        let bounds = Bounds { x: 10.0, y: 20.0, width: 100.0, height: 40.0 };
        let handles = place_handles(2, HandleAxis::Horizontal, &StyleBag::new());
        assert_eq!(handles[0].anchor(bounds), Point::new(10.0, 40.0));
        assert_eq!(handles[2].anchor(bounds), Point::new(110.0, 40.0));
    }
}
