//! Coordinate transforms between screen pixels and world coordinates.
//!
//! `screen = world * zoom + pan`. Every function validates the viewport
//! first; a zero, negative or non-finite zoom is `InvalidViewport`.

use crate::error::CanvasError;
use crate::model::{Bounds, Point, Size, Viewport};

/// Zoom range enforced by interactive zooming and fit-view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.1, max: 4.0 }
    }
}

impl ZoomLimits {
    pub fn validate(&self) -> Result<(), CanvasError> {
        if self.min.is_finite() && self.max.is_finite() && 0.0 < self.min && self.min <= self.max {
            Ok(())
        } else {
            Err(CanvasError::InvalidZoomLimits {
                min: self.min,
                max: self.max,
            })
        }
    }

    fn clamp(&self, zoom: f32) -> Result<f32, CanvasError> {
        self.validate()?;
        Ok(zoom.clamp(self.min, self.max))
    }
}

pub fn screen_to_world(p: Point, viewport: Viewport) -> Result<Point, CanvasError> {
    viewport.validate()?;
    Ok(Point::new(
        (p.x - viewport.x) / viewport.zoom,
        (p.y - viewport.y) / viewport.zoom,
    ))
}

pub fn world_to_screen(p: Point, viewport: Viewport) -> Result<Point, CanvasError> {
    viewport.validate()?;
    Ok(Point::new(
        p.x * viewport.zoom + viewport.x,
        p.y * viewport.zoom + viewport.y,
    ))
}

/// Scale the viewport by `factor` around a screen-space anchor, keeping the
/// world point under the anchor fixed.
pub fn zoom_at(
    viewport: Viewport,
    anchor: Point,
    factor: f32,
    limits: ZoomLimits,
) -> Result<Viewport, CanvasError> {
    let world = screen_to_world(anchor, viewport)?;
    let zoom = limits.clamp(viewport.zoom * factor)?;
    let next = Viewport {
        x: anchor.x - world.x * zoom,
        y: anchor.y - world.y * zoom,
        zoom,
    };
    next.validate()?;
    Ok(next)
}

/// Viewport that centres `bounds` on a surface of `surface` pixels,
/// leaving `padding` (fraction of the surface, e.g. `0.1`) around it.
pub fn fit_view(
    bounds: Bounds,
    surface: Size,
    padding: f32,
    limits: ZoomLimits,
) -> Result<Viewport, CanvasError> {
    let usable_w = surface.width * (1.0 - 2.0 * padding);
    let usable_h = surface.height * (1.0 - 2.0 * padding);
    let zoom_x = if bounds.width > 0.0 {
        usable_w / bounds.width
    } else {
        f32::INFINITY
    };
    let zoom_y = if bounds.height > 0.0 {
        usable_h / bounds.height
    } else {
        f32::INFINITY
    };
    let zoom = limits.clamp(zoom_x.min(zoom_y))?;
    let center = bounds.center();
    let viewport = Viewport {
        x: surface.width / 2.0 - center.x * zoom,
        y: surface.height / 2.0 - center.y * zoom,
        zoom,
    };
    viewport.validate()?;
    Ok(viewport)
}
