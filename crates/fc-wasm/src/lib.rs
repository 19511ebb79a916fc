//! WASM bridge for FlowCanvas: exposes the canvas session to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host page owns drawing;
//! it forwards pointer events here and re-renders from the JSON getters
//! whenever a handler returns `true`.

mod solver;
mod storage;

pub use solver::JsSolver;
pub use storage::LocalStorage;

use fc_core::{CanvasConfig, Connection, NodeId, NodeKind, Point, Size, screen_to_world};
use fc_editor::{CanvasSession, InputEvent, SnapshotPersistence};
use fc_layout::{LayoutResponse, LayoutSolver};
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas controller.
#[wasm_bindgen]
pub struct FlowCanvas {
    session: CanvasSession<LocalStorage>,
}

#[wasm_bindgen]
impl FlowCanvas {
    /// Mount a canvas of `width` × `height` pixels. `config_json` is the
    /// camelCase configuration object; anything unreadable falls back to
    /// the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, config_json: &str) -> Self {
        install_console_hooks();

        let config = if config_json.trim().is_empty() {
            CanvasConfig::default()
        } else {
            CanvasConfig::from_json(config_json).unwrap_or_else(|err| {
                log::warn!("{err}; using default configuration");
                CanvasConfig::default()
            })
        };
        let persistence = SnapshotPersistence::new(LocalStorage::open());
        let surface = Size::new(width as f32, height as f32);
        Self {
            session: CanvasSession::mount(config, persistence, surface),
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.session
            .resize_surface(Size::new(width as f32, height as f32));
    }

    // ─── State for rendering ─────────────────────────────────────────────

    pub fn get_nodes_json(&self) -> String {
        to_json(self.session.store().nodes(), "[]")
    }

    pub fn get_edges_json(&self) -> String {
        to_json(self.session.store().edges(), "[]")
    }

    pub fn get_overlays_json(&self) -> String {
        to_json(self.session.overlays().elements(), "[]")
    }

    pub fn get_viewport_json(&self) -> String {
        to_json(&self.session.viewport(), "null")
    }

    pub fn get_config_json(&self) -> String {
        to_json(self.session.config(), "null")
    }

    /// Handles of one node, or `[]` for unknown ids.
    pub fn get_handles_json(&self, node_id: &str) -> String {
        match self.session.handles_for(NodeId::intern(node_id)) {
            Some(handles) => to_json(&handles, "[]"),
            None => "[]".to_string(),
        }
    }

    /// `{ "id", "x", "y", "width", "height" }` of the element under an
    /// active gesture, or `null`. Node geometry is in world units, overlay
    /// geometry in pixels.
    pub fn get_preview_json(&self) -> String {
        let Some((element, b)) = self.session.preview() else {
            return "null".to_string();
        };
        let id = match element {
            fc_editor::ElementRef::Node(id) => id.as_str().to_string(),
            fc_editor::ElementRef::Overlay(id) => id.as_str().to_string(),
        };
        serde_json::json!({
            "id": id,
            "x": b.x,
            "y": b.y,
            "width": b.width,
            "height": b.height,
        })
        .to_string()
    }

    // ─── Pointer input (screen pixels) ───────────────────────────────────

    pub fn handle_pointer_down(&mut self, x: f32, y: f32) -> bool {
        self.input(InputEvent::PointerDown { x, y })
    }

    pub fn handle_pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.input(InputEvent::PointerMove { x, y })
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32) -> bool {
        self.input(InputEvent::PointerUp { x, y })
    }

    /// Wheel/pinch zoom around the pointer; `zoom` > 1 zooms in.
    pub fn handle_scroll(&mut self, x: f32, y: f32, zoom: f32) -> bool {
        self.input(InputEvent::Scroll { x, y, zoom })
    }

    pub fn fit_view(&mut self) -> bool {
        match self.session.fit_view() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("fit-view failed: {err}");
                false
            }
        }
    }

    // ─── Graph edits ─────────────────────────────────────────────────────

    /// Create a node at a screen position. Returns its id, or `""` on
    /// failure.
    pub fn add_node(&mut self, kind: &str, x: f32, y: f32) -> String {
        let kind = match kind {
            "input" => NodeKind::Input,
            "output" => NodeKind::Output,
            "custom" => NodeKind::Custom,
            _ => NodeKind::Default,
        };
        let result = screen_to_world(Point::new(x, y), self.session.viewport())
            .and_then(|world| self.session.add_node(kind, world, now_ms()));
        match result {
            Ok(id) => id.as_str().to_string(),
            Err(err) => {
                log::warn!("could not add node: {err}");
                String::new()
            }
        }
    }

    pub fn remove_node(&mut self, node_id: &str) -> bool {
        self.session.remove_node(NodeId::intern(node_id))
    }

    /// Connect two nodes. Self-connections and duplicates return `false`
    /// and create nothing.
    pub fn connect(&mut self, source: &str, target: &str) -> bool {
        self.session
            .connect(NodeId::intern(source), NodeId::intern(target))
            .is_ok()
    }

    /// Connect two handles; empty handle ids mean "no handle".
    pub fn connect_handles(
        &mut self,
        source: &str,
        source_handle: &str,
        target: &str,
        target_handle: &str,
    ) -> bool {
        let handle = |h: &str| (!h.is_empty()).then(|| h.to_string());
        let conn = Connection {
            source: NodeId::intern(source),
            target: NodeId::intern(target),
            source_handle: handle(source_handle),
            target_handle: handle(target_handle),
        };
        self.session.connect_handles(conn).is_ok()
    }

    /// Replace the configuration. Returns `false` (and changes nothing) when
    /// the JSON is unreadable.
    pub fn set_config(&mut self, config_json: &str) -> bool {
        match CanvasConfig::from_json(config_json) {
            Ok(config) => {
                self.session.set_config(config);
                true
            }
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    /// Whether a configuration change or mount asked for a relayout.
    pub fn needs_layout(&self) -> bool {
        self.session.layout_requested()
    }

    /// Lay out with the built-in solver. Returns `false` when the solver
    /// failed or left nodes unplaced.
    pub fn relayout(&mut self) -> bool {
        self.session.relayout_now().error().is_none()
    }

    /// Lay out with an external solver. `solver(requestJson)` must return a
    /// Promise of the response. The returned Promise resolves with the
    /// response JSON, to be passed to [`FlowCanvas::apply_layout`]; the graph
    /// stays editable meanwhile.
    pub fn solve_with(&mut self, solver: js_sys::Function) -> js_sys::Promise {
        let request = self.session.take_layout_job().request();
        let solver = JsSolver::new(solver);
        wasm_bindgen_futures::future_to_promise(async move {
            let response = solver
                .solve(&request)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            serde_json::to_string(&response)
                .map(|json| JsValue::from_str(&json))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    /// Apply a solver response to the graph as it is now. Returns `false`
    /// for malformed JSON.
    pub fn apply_layout(&mut self, response_json: &str) -> bool {
        match serde_json::from_str::<LayoutResponse>(response_json) {
            Ok(response) => {
                self.session.apply_layout_response(&response);
                true
            }
            Err(err) => {
                log::warn!("ignoring malformed layout response: {err}");
                false
            }
        }
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Call once per animation frame. Returns whether a snapshot was saved.
    pub fn tick(&mut self) -> bool {
        self.session.tick(now_ms())
    }

    /// Save immediately (e.g. on `pagehide`).
    pub fn flush(&mut self) -> bool {
        match self.session.flush(now_ms()) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }
}

impl FlowCanvas {
    fn input(&mut self, event: InputEvent) -> bool {
        match self.session.handle_input(event) {
            Ok(changed) => changed,
            Err(err) => {
                log::warn!("dropping {event:?}: {err}");
                false
            }
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Route panics and `log` records to the browser console.
fn install_console_hooks() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("FlowCanvas WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            if log::set_logger(&ConsoleLogger).is_ok() {
                log::set_max_level(log::LevelFilter::Info);
            }
        });
    }
}

#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg: JsValue = format!("[{}] {}", record.target(), record.args()).into();
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }

    fn flush(&self) {}
}
