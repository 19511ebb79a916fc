pub mod config;
pub mod error;
pub mod handles;
pub mod id;
pub mod model;
pub mod store;
pub mod transform;

pub use config::{CanvasConfig, LayoutConfig, LayoutDirection};
pub use error::CanvasError;
pub use handles::{Handle, HandleAxis, HandleRole, HandleSet, HandleSide, place_handles};
pub use id::{EdgeId, NodeId, OverlayId};
pub use model::*;
pub use store::{
    CanvasStore, ChangeCause, Connection, EdgeChange, NodeChange, StoreEvent, Subscription,
};
pub use transform::{ZoomLimits, fit_view, screen_to_world, world_to_screen, zoom_at};
