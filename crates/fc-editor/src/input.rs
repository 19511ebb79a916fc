//! Input abstraction layer.
//!
//! Normalizes mouse, touch and pen events from the rendering surface into a
//! unified `InputEvent` enum. Coordinates are screen pixels.

use fc_core::Point;

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown { x: f32, y: f32 },

    PointerMove { x: f32, y: f32 },

    PointerUp { x: f32, y: f32 },

    /// Wheel or pinch around the pointer.
    Scroll {
        x: f32,
        y: f32,
        /// Zoom factor (1.0 = no change; >1 = zoom in).
        zoom: f32,
    },
}

impl InputEvent {
    /// Screen position of the event.
    pub fn position(&self) -> Point {
        match self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::Scroll { x, y, .. } => Point::new(*x, *y),
        }
    }
}
