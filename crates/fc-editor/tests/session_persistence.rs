//! Integration tests: session ↔ snapshot persistence across remounts.
//!
//! Mounts a session over file-backed storage, edits it, lets the debounce
//! window close, and mounts a fresh session over the same directory.

use fc_core::{
    CanvasConfig, CanvasError, NodeId, NodeKind, OverlayElement, OverlayId, OverlayKind, Point, Size, StyleBag,
    Viewport,
};
use fc_editor::{
    CanvasSession, FileStorage, InputEvent, SnapshotFormat, SnapshotPersistence, SnapshotStorage,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SURFACE: Size = Size::new(800.0, 600.0);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config_with_note() -> CanvasConfig {
    CanvasConfig {
        overlays: vec![OverlayElement {
            id: OverlayId::intern("legend"),
            kind: OverlayKind::Text,
            position: Point::new(600.0, 20.0),
            size: Some(Size::new(150.0, 80.0)),
            content: "Legend".into(),
            style: StyleBag::new(),
        }],
        ..CanvasConfig::default()
    }
}

fn mount(dir: &TempDir, format: SnapshotFormat) -> CanvasSession<FileStorage> {
    let persistence = SnapshotPersistence::new(FileStorage::new(dir.path())).with_format(format);
    CanvasSession::mount(config_with_note(), persistence, SURFACE)
}

// ─── Restore ─────────────────────────────────────────────────────────────

#[test]
fn edits_survive_remount() {
    init_logging();
    let dir = TempDir::new().unwrap();

    let mut first = mount(&dir, SnapshotFormat::Json);
    let added = first.add_node(NodeKind::Default, Point::new(40.0, 400.0), 1_000).unwrap();
    first.connect(NodeId::intern("3"), added).unwrap();
    first
        .set_viewport(Viewport { x: -20.0, y: 10.0, zoom: 1.25 })
        .unwrap();

    assert!(!first.tick(1_000), "edits only schedule a write");
    assert!(!first.tick(1_050), "debounce window still open");
    assert!(first.tick(1_100));
    assert_eq!(first.persistence().write_count(), 1);

    let second = mount(&dir, SnapshotFormat::Json);
    assert_eq!(second.store().nodes(), first.store().nodes());
    assert_eq!(second.store().edges(), first.store().edges());
    assert_eq!(second.viewport(), Viewport { x: -20.0, y: 10.0, zoom: 1.25 });
    assert!(!second.layout_requested(), "restored positions are kept");
}

#[test]
fn messagepack_snapshots_restore_too() {
    let dir = TempDir::new().unwrap();
    let mut first = mount(&dir, SnapshotFormat::MessagePack);
    first.remove_node(NodeId::intern("1"));
    first.flush(5).unwrap();

    let second = mount(&dir, SnapshotFormat::MessagePack);
    assert_eq!(second.store().nodes().len(), 2);
    assert_eq!(second.store().edges().len(), 1);
}

#[test]
fn overlay_geometry_is_restored() {
    let dir = TempDir::new().unwrap();
    let mut first = mount(&dir, SnapshotFormat::Json);

    // Drag the legend far past the bottom-right corner of the surface.
    first.handle_input(InputEvent::PointerDown { x: 650.0, y: 50.0 }).unwrap();
    first.handle_input(InputEvent::PointerMove { x: 5_000.0, y: 5_000.0 }).unwrap();
    first.handle_input(InputEvent::PointerUp { x: 5_000.0, y: 5_000.0 }).unwrap();
    let legend = first.overlays().get(OverlayId::intern("legend")).unwrap();
    assert_eq!(legend.position, Point::new(750.0, 550.0));

    first.tick(0);
    assert!(first.tick(100));

    let second = mount(&dir, SnapshotFormat::Json);
    let legend = second.overlays().get(OverlayId::intern("legend")).unwrap();
    assert_eq!(legend.position, Point::new(750.0, 550.0));
    assert_eq!(legend.content, "Legend");
}

#[test]
fn non_finite_pointer_cannot_poison_the_snapshot() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let mut first = mount(&dir, SnapshotFormat::Json);
    let added = first.add_node(NodeKind::Default, Point::new(40.0, 400.0), 2_000).unwrap();

    // Node "2" sits at (100,125) under the identity viewport.
    first.handle_input(InputEvent::PointerDown { x: 150.0, y: 140.0 }).unwrap();
    let moved = first.handle_input(InputEvent::PointerMove { x: f32::NAN, y: 140.0 });
    assert!(matches!(moved, Err(CanvasError::NonFiniteCoordinate { .. })));
    assert!(first.handle_input(InputEvent::PointerMove { x: f32::INFINITY, y: 0.0 }).is_err());
    first.handle_input(InputEvent::PointerUp { x: f32::NAN, y: f32::NAN }).unwrap();
    assert_eq!(
        first.store().node(NodeId::intern("2")).unwrap().position,
        Point::new(100.0, 125.0)
    );
    assert!(first.preview().is_none(), "pointer-up still ends the gesture");

    assert!(first.add_node(NodeKind::Default, Point::new(f32::NAN, 0.0), 2_001).is_err());
    first.flush(2_002).unwrap();

    let second = mount(&dir, SnapshotFormat::Json);
    assert!(second.store().contains_node(added));
    assert_eq!(second.store().nodes(), first.store().nodes());
    assert!(!second.layout_requested(), "snapshot was readable");
}

// ─── Fallback ────────────────────────────────────────────────────────────

#[test]
fn corrupt_snapshot_falls_back_to_default_graph() {
    init_logging();
    let dir = TempDir::new().unwrap();
    FileStorage::new(dir.path())
        .put("flowcanvas.snapshot", b"\x00\x01 definitely not json")
        .unwrap();

    let session = mount(&dir, SnapshotFormat::Json);
    assert_eq!(session.store().nodes().len(), 3);
    assert!(session.layout_requested());
}

#[test]
fn newer_schema_falls_back_to_default_graph() {
    let dir = TempDir::new().unwrap();
    FileStorage::new(dir.path())
        .put(
            "flowcanvas.snapshot",
            br#"{ "schemaVersion": 2, "nodes": [], "edges": [] }"#,
        )
        .unwrap();

    let session = mount(&dir, SnapshotFormat::Json);
    assert_eq!(session.store().edges().len(), 2);
}

#[test]
fn idle_session_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut session = mount(&dir, SnapshotFormat::Json);
    for t in (0..1_000).step_by(100) {
        assert!(!session.tick(t));
    }
    assert_eq!(session.persistence().write_count(), 0);
}
