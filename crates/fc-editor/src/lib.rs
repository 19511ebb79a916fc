pub mod gesture;
pub mod hit;
pub mod input;
pub mod overlay;
pub mod persist;
pub mod session;

pub use gesture::{DragController, DragLimits, GestureArbiter, GestureCommit, GestureState};
pub use hit::{ElementRef, Hit, ResizeHandle};
pub use input::InputEvent;
pub use overlay::OverlayLayer;
pub use persist::{
    Debouncer, FileStorage, MemoryStorage, Snapshot, SnapshotError, SnapshotFormat,
    SnapshotPersistence, SnapshotStorage,
};
pub use session::{CanvasSession, default_graph};
