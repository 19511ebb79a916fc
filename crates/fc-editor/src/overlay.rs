//! Fixed-position overlay widgets.
//!
//! Overlays live in surface (screen) space and do not follow pan or zoom.
//! They are created from configuration at mount and only change through
//! committed gestures.

use crate::gesture::GestureCommit;
use crate::hit::{ElementRef, GRAB_RADIUS, Hit, hit_test_overlays};
use fc_core::{OverlayElement, OverlayId, Point};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayLayer {
    elements: Vec<OverlayElement>,
}

impl OverlayLayer {
    pub fn new(elements: Vec<OverlayElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    pub fn get(&self, id: OverlayId) -> Option<&OverlayElement> {
        self.elements.iter().find(|o| o.id == id)
    }

    pub fn hit(&self, p: Point) -> Option<Hit> {
        hit_test_overlays(&self.elements, p, GRAB_RADIUS)
    }

    /// Apply a finished gesture. Returns `false` for node commits and for
    /// overlays that no longer exist.
    pub fn commit(&mut self, commit: &GestureCommit) -> bool {
        let ElementRef::Overlay(id) = commit.element else {
            return false;
        };
        let Some(element) = self.elements.iter_mut().find(|o| o.id == id) else {
            log::debug!("dropping commit for unknown overlay {id}");
            return false;
        };
        if let Some(position) = commit.position {
            element.position = position;
        }
        if let Some(size) = commit.size {
            element.size = Some(size);
        }
        true
    }
}
