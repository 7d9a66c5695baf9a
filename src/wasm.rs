//! Browser bindings: a DOM [`Surface`] and the JS-facing [`WasmGrid`].
//!
//! Deferred grid work (renders, post-render hooks, cleanup, editor loading)
//! runs on `setTimeout` ticks that advance the grid's scheduler clock.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::{Function, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

use crate::data::VecDataSource;
use crate::events::{EventKind, GridEvent, Key, KeyInput, Modifiers};
use crate::grid::{Grid, GridBuilder};
use crate::layout::{MetricsProbe, PlatformMetrics};
use crate::navigation::Direction;
use crate::render::{CellMarkup, NodeId, RowMarkup, Surface};
use crate::types::{Column, Item};

const FALLBACK_SCROLLBAR: (f64, f64) = (17.0, 17.0);
const MAX_HEIGHT_PROBE_LIMIT: f64 = 1_000_000_000.0;

static NEXT_DOM_UID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| js_err("no document"))
}

fn read_f64(target: &JsValue, key: &str) -> f64 {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

#[allow(clippy::cast_possible_truncation)]
fn to_timeout_ms(delay: f64) -> i32 {
    delay.ceil().clamp(0.0, f64::from(i32::MAX)) as i32
}

/// Measures scrollbars and the tallest element height the browser honours.
struct DomMetrics {
    document: Document,
}

impl DomMetrics {
    fn probe(&self, style: &str) -> Option<HtmlElement> {
        let probe = self.document.create_element("div").ok()?;
        probe.set_attribute("style", style).ok()?;
        self.document.body()?.append_child(&probe).ok()?;
        probe.dyn_into::<HtmlElement>().ok()
    }
}

impl MetricsProbe for DomMetrics {
    fn scrollbar_size(&self) -> (f64, f64) {
        let Some(probe) = self.probe(
            "position:absolute;top:-10000px;left:-10000px;width:100px;height:100px;overflow:scroll;",
        ) else {
            return FALLBACK_SCROLLBAR;
        };
        let size = (
            f64::from(probe.offset_width() - probe.client_width()),
            f64::from(probe.offset_height() - probe.client_height()),
        );
        probe.remove();
        size
    }

    fn max_supported_height(&self) -> f64 {
        let mut supported = 1_000_000.0;
        let Some(probe) = self.probe("position:absolute;top:-10000px;display:block;") else {
            return supported;
        };
        loop {
            let test = supported * 2.0;
            if test > MAX_HEIGHT_PROBE_LIMIT {
                break;
            }
            if probe
                .set_attribute(
                    "style",
                    &format!("position:absolute;top:-10000px;display:block;height:{test}px"),
                )
                .is_err()
            {
                break;
            }
            if (f64::from(probe.offset_height()) - test).abs() > 0.5 {
                break;
            }
            supported = test;
        }
        probe.remove();
        supported
    }
}

struct DomNode {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

/// Rows and cells as absolutely positioned `div`s inside a scrolling viewport.
struct DomSurface {
    document: Document,
    uid: u64,
    viewport: HtmlElement,
    canvas: HtmlElement,
    style: Element,
    nodes: HashMap<NodeId, DomNode>,
    next_id: NodeId,
    canvas_width: f64,
    edges: Vec<(f64, f64)>,
}

impl DomSurface {
    fn new(container: &HtmlElement) -> Result<Self, JsValue> {
        let document = document()?;
        let uid = NEXT_DOM_UID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        container.class_list().add_1(&format!("vgrid-{uid}"))?;

        let viewport: HtmlElement = document.create_element("div")?.dyn_into()?;
        viewport.set_class_name("vgrid-viewport");
        viewport.set_attribute("style", "position:relative;overflow:auto;width:100%;height:100%;")?;
        let canvas: HtmlElement = document.create_element("div")?.dyn_into()?;
        canvas.set_class_name("vgrid-canvas");
        canvas.set_attribute("style", "position:relative;")?;
        let style = document.create_element("style")?;

        viewport.append_child(&canvas)?;
        container.append_child(&style)?;
        container.append_child(&viewport)?;
        Ok(Self {
            document,
            uid,
            viewport,
            canvas,
            style,
            nodes: HashMap::new(),
            next_id: 1,
            canvas_width: 0.0,
            edges: Vec::new(),
        })
    }

    fn scroll_position(&self) -> (f64, f64) {
        (
            read_f64(self.viewport.as_ref(), "scrollTop"),
            read_f64(self.viewport.as_ref(), "scrollLeft"),
        )
    }

    fn element(&self, class_names: &[String]) -> Option<Element> {
        let element = self.document.create_element("div").ok()?;
        element.set_class_name(&class_names.join(" "));
        Some(element)
    }

    fn insert(&mut self, element: Element, parent: Option<NodeId>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            DomNode {
                element,
                parent,
                children: Vec::new(),
                attached: true,
            },
        );
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        id
    }

    fn insert_cells(&mut self, row: NodeId, cells: Vec<CellMarkup>) -> Vec<NodeId> {
        let Some(row_element) = self.nodes.get(&row).map(|n| n.element.clone()) else {
            return Vec::new();
        };
        let mut ids = Vec::with_capacity(cells.len());
        for markup in cells {
            let Some(element) = self.element(&markup.classes) else {
                continue;
            };
            element.set_text_content(Some(&markup.text));
            if row_element.append_child(&element).is_err() {
                continue;
            }
            ids.push(self.insert(element, Some(row)));
        }
        ids
    }

    fn forget(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        removed.element.remove();
        for child in removed.children {
            self.nodes.remove(&child);
        }
        if let Some(parent) = removed.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
    }

    fn write_column_rules(&self) {
        let scope = format!(".vgrid-{}", self.uid);
        let mut css = String::new();
        for (i, (left, right)) in self.edges.iter().enumerate() {
            css.push_str(&format!(
                "{scope} .l{i}{{left:{left}px}} {scope} .r{i}{{right:{}px}}\n",
                (self.canvas_width - right).max(0.0)
            ));
        }
        self.style.set_text_content(Some(&css));
    }
}

impl Surface for DomSurface {
    fn create_rows(&mut self, rows: Vec<RowMarkup>) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(rows.len());
        for markup in rows {
            let Some(element) = self.element(&markup.classes) else {
                continue;
            };
            let _ = element.set_attribute("style", &format!("top:{}px", markup.top));
            if let Some(id) = &markup.data_id {
                let _ = element.set_attribute("data-id", id);
            }
            if self.canvas.append_child(&element).is_err() {
                continue;
            }
            let id = self.insert(element, None);
            self.insert_cells(id, markup.cells);
            ids.push(id);
        }
        ids
    }

    fn append_cells(&mut self, row: NodeId, cells: Vec<CellMarkup>) -> Vec<NodeId> {
        self.insert_cells(row, cells)
    }

    fn cell_nodes(&self, row: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&row)
            .map(|r| {
                r.children
                    .iter()
                    .copied()
                    .filter(|c| self.nodes.get(c).is_some_and(|n| n.attached))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remove_row(&mut self, row: NodeId) {
        self.forget(row);
    }

    fn remove_cell(&mut self, _row: NodeId, cell: NodeId) {
        self.forget(cell);
    }

    fn detach_row(&mut self, row: NodeId) {
        if let Some(node) = self.nodes.get_mut(&row) {
            node.element.remove();
            node.attached = false;
        }
    }

    fn detach_cell(&mut self, _row: NodeId, cell: NodeId) {
        self.detach_row(cell);
    }

    fn release(&mut self, node: NodeId) {
        self.forget(node);
    }

    fn hide_row(&mut self, row: NodeId) {
        if let Some(node) = self.nodes.get(&row) {
            let _ = node.element.set_attribute("style", "display:none");
        }
    }

    fn set_row_top(&mut self, row: NodeId, top: f64) {
        if let Some(node) = self.nodes.get(&row) {
            let _ = node.element.set_attribute("style", &format!("top:{top}px"));
        }
    }

    fn set_cell_content(&mut self, cell: NodeId, text: &str) {
        if let Some(node) = self.nodes.get(&cell) {
            node.element.set_text_content(Some(text));
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.nodes.get(&node) {
            let _ = node.element.class_list().add_1(class);
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.nodes.get(&node) {
            let _ = node.element.class_list().remove_1(class);
        }
    }

    fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_width = width;
        let _ = self.canvas.set_attribute(
            "style",
            &format!("position:relative;width:{width}px;height:{height}px"),
        );
        self.write_column_rules();
    }

    fn scroll_viewport(&mut self, scroll_top: f64, scroll_left: f64) {
        let target: &JsValue = self.viewport.as_ref();
        let _ = Reflect::set(target, &"scrollTop".into(), &scroll_top.into());
        let _ = Reflect::set(target, &"scrollLeft".into(), &scroll_left.into());
    }

    fn apply_column_widths(&mut self, edges: &[(f64, f64)]) {
        self.edges = edges.to_vec();
        self.write_column_rules();
    }
}

fn event_kind(name: &str) -> Option<EventKind> {
    Some(match name {
        "scroll" => EventKind::Scroll,
        "viewportChanged" => EventKind::ViewportChanged,
        "sort" => EventKind::Sort,
        "headerClick" => EventKind::HeaderClick,
        "columnsResized" => EventKind::ColumnsResized,
        "columnsReordered" => EventKind::ColumnsReordered,
        "click" => EventKind::Click,
        "dblClick" => EventKind::DblClick,
        "keyDown" => EventKind::KeyDown,
        "activeCellChanged" => EventKind::ActiveCellChanged,
        "activeCellPositionChanged" => EventKind::ActiveCellPositionChanged,
        "beforeEditCell" => EventKind::BeforeEditCell,
        "beforeCellEditorDestroy" => EventKind::BeforeCellEditorDestroy,
        "validationError" => EventKind::ValidationError,
        "cellChange" => EventKind::CellChange,
        "addNewRow" => EventKind::AddNewRow,
        "selectedRowsChanged" => EventKind::SelectedRowsChanged,
        "cellCssStylesChanged" => EventKind::CellCssStylesChanged,
        "rowsRendered" => EventKind::RowsRendered,
        "rendered" => EventKind::Rendered,
        "canvasResized" => EventKind::CanvasResized,
        _ => return None,
    })
}

struct Shared {
    grid: RefCell<Grid<DomSurface>>,
    timer: Cell<Option<i32>>,
}

/// Arm a `setTimeout` for the grid's next due timer.
fn pump(shared: &Rc<Shared>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Some(handle) = shared.timer.take() {
        window.clear_timeout_with_handle(handle);
    }
    let delay = {
        let Ok(grid) = shared.grid.try_borrow() else {
            return;
        };
        let scheduler = grid.scheduler();
        match scheduler.next_due() {
            Some(due) => (due - scheduler.now()).max(0.0),
            None => return,
        }
    };
    let weak: Weak<Shared> = Rc::downgrade(shared);
    let callback = Closure::once_into_js(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        shared.timer.set(None);
        if let Ok(mut grid) = shared.grid.try_borrow_mut() {
            grid.advance_time(delay);
        }
        pump(&shared);
    });
    match window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        to_timeout_ms(delay),
    ) {
        Ok(handle) => shared.timer.set(Some(handle)),
        Err(e) => tracing::warn!(error = ?e, "setTimeout failed"),
    }
}

/// A grid bound to a DOM container.
#[wasm_bindgen]
pub struct WasmGrid {
    shared: Rc<Shared>,
    scroll_closure: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

#[wasm_bindgen]
impl WasmGrid {
    /// Create a grid inside `container`.
    ///
    /// `columns` is an array of column definitions and `options` an object of
    /// option overrides, both in camelCase.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: HtmlElement,
        columns: JsValue,
        options: JsValue,
    ) -> Result<WasmGrid, JsValue> {
        console_error_panic_hook::set_once();
        let columns: Vec<Column> = serde_wasm_bindgen::from_value(columns)?;
        let overrides: serde_json::Value = if options.is_undefined() || options.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_wasm_bindgen::from_value(options)?
        };

        let surface = DomSurface::new(&container)?;
        let metrics = PlatformMetrics::new(DomMetrics {
            document: document()?,
        });
        let width = f64::from(container.client_width());
        let height = f64::from(container.client_height());
        let grid = GridBuilder::new(surface)
            .columns(columns)
            .option_overrides(overrides)
            .metrics(Rc::new(metrics))
            .size(width, height)
            .build()
            .map_err(js_err)?;

        let shared = Rc::new(Shared {
            grid: RefCell::new(grid),
            timer: Cell::new(None),
        });

        let weak = Rc::downgrade(&shared);
        let scroll_closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Ok(mut grid) = shared.grid.try_borrow_mut() {
                let (top, left) = grid.surface().scroll_position();
                grid.handle_scroll(top, left);
            }
            pump(&shared);
        }) as Box<dyn FnMut(web_sys::Event)>);
        {
            let grid = shared.grid.borrow();
            grid.surface()
                .viewport
                .add_event_listener_with_callback("scroll", scroll_closure.as_ref().unchecked_ref())?;
        }
        tracing::debug!(width, height, "wasm grid created");
        pump(&shared);

        Ok(WasmGrid {
            shared,
            scroll_closure: Some(scroll_closure),
        })
    }

    fn with_grid<R>(&self, f: impl FnOnce(&mut Grid<DomSurface>) -> R) -> Result<R, JsValue> {
        let result = {
            let mut grid = self
                .shared
                .grid
                .try_borrow_mut()
                .map_err(|_| js_err("grid is busy"))?;
            f(&mut grid)
        };
        pump(&self.shared);
        Ok(result)
    }

    /// Replace the rows with an array of item objects.
    #[wasm_bindgen(js_name = "setItems")]
    pub fn set_items(&self, items: JsValue, scroll_to_top: bool) -> Result<(), JsValue> {
        let items: Vec<Item> = serde_wasm_bindgen::from_value(items)?;
        self.with_grid(|grid| {
            grid.set_data(Box::new(VecDataSource::new(items)), scroll_to_top);
            grid.render();
        })
    }

    #[wasm_bindgen(js_name = "setOptions")]
    pub fn set_options(&self, options: JsValue) -> Result<bool, JsValue> {
        let overrides: serde_json::Value = serde_wasm_bindgen::from_value(options)?;
        self.with_grid(|grid| grid.set_options(&overrides))?
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = "resizeCanvas")]
    pub fn resize_canvas(&self, width: f64, height: f64) -> Result<(), JsValue> {
        self.with_grid(|grid| grid.resize_viewport(width, height))?
            .map_err(js_err)
    }

    pub fn invalidate(&self) -> Result<(), JsValue> {
        self.with_grid(Grid::invalidate)
    }

    /// Returns `true` when the key was handled and the default should be prevented.
    #[wasm_bindgen(js_name = "handleKeyDown")]
    pub fn handle_key_down(
        &self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> Result<bool, JsValue> {
        let input = KeyInput {
            key: Key::from_dom(key),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        };
        self.with_grid(|grid| grid.handle_key_down(input))
    }

    /// A click at viewport-relative coordinates.
    #[wasm_bindgen(js_name = "handleClick")]
    pub fn handle_click(
        &self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        meta: bool,
    ) -> Result<bool, JsValue> {
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt: false,
            meta,
        };
        self.with_grid(|grid| grid.handle_click(x, y, modifiers))
    }

    #[wasm_bindgen(js_name = "handleDblClick")]
    pub fn handle_dbl_click(&self, x: f64, y: f64) -> Result<bool, JsValue> {
        self.with_grid(|grid| grid.handle_dbl_click(x, y))
    }

    #[wasm_bindgen(js_name = "handleHeaderClick")]
    pub fn handle_header_click(
        &self,
        column_id: &str,
        shift: bool,
        ctrl: bool,
        meta: bool,
    ) -> Result<bool, JsValue> {
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt: false,
            meta,
        };
        self.with_grid(|grid| grid.handle_header_click(column_id, modifiers))
    }

    /// `direction` is one of up, down, left, right, next, prev, home, end.
    pub fn navigate(&self, direction: &str) -> Result<bool, JsValue> {
        let direction: Direction = direction.parse().map_err(js_err)?;
        self.with_grid(|grid| grid.navigate(direction))
    }

    #[wasm_bindgen(js_name = "setActiveCell")]
    pub fn set_active_cell(&self, row: usize, cell: usize) -> Result<bool, JsValue> {
        self.with_grid(|grid| grid.set_active_cell(row, cell))
    }

    #[wasm_bindgen(js_name = "getRowByRecordId")]
    pub fn row_by_record_id(&self, id: &str) -> Result<Option<usize>, JsValue> {
        self.with_grid(|grid| grid.row_by_record_id(id))
    }

    #[wasm_bindgen(js_name = "getActiveCell")]
    pub fn active_cell(&self) -> Result<JsValue, JsValue> {
        let active = self.with_grid(|grid| grid.active_cell())?;
        Ok(serde_wasm_bindgen::to_value(&active)?)
    }

    #[wasm_bindgen(js_name = "editActiveCell")]
    pub fn edit_active_cell(&self) -> Result<bool, JsValue> {
        self.with_grid(|grid| grid.make_active_cell_editable(false))
    }

    #[wasm_bindgen(js_name = "setEditorInput")]
    pub fn set_editor_input(&self, text: &str) -> Result<bool, JsValue> {
        self.with_grid(|grid| grid.set_editor_input(text))
    }

    #[wasm_bindgen(js_name = "commitCurrentEdit")]
    pub fn commit_current_edit(&self) -> Result<bool, JsValue> {
        self.with_grid(Grid::commit_current_edit)
    }

    #[wasm_bindgen(js_name = "cancelCurrentEdit")]
    pub fn cancel_current_edit(&self) -> Result<bool, JsValue> {
        self.with_grid(Grid::cancel_current_edit)
    }

    #[wasm_bindgen(js_name = "scrollRowIntoView")]
    pub fn scroll_row_into_view(&self, row: usize) -> Result<(), JsValue> {
        self.with_grid(|grid| grid.scroll_row_into_view(row, false))
    }

    /// Subscribe `callback(event)` to a notification by camelCase name.
    ///
    /// A callback returning `false` vetoes the action where one can be vetoed.
    /// Callbacks must not call back into the grid synchronously.
    pub fn on(&self, name: &str, callback: Function) -> Result<u64, JsValue> {
        let kind = event_kind(name).ok_or_else(|| js_err(format!("unknown event: {name}")))?;
        self.with_grid(move |grid| {
            grid.subscribe(kind, move |event: &GridEvent, args| {
                let Ok(payload) = serde_wasm_bindgen::to_value(event) else {
                    return;
                };
                match callback.call1(&JsValue::NULL, &payload) {
                    Ok(result) if result.as_bool() == Some(false) => args.veto(),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = ?e, "event handler threw"),
                }
            })
        })
    }

    pub fn off(&self, subscription: u64) -> Result<bool, JsValue> {
        self.with_grid(|grid| grid.unsubscribe(subscription))
    }

    #[wasm_bindgen(js_name = "debugStats")]
    pub fn debug_stats(&self) -> Result<JsValue, JsValue> {
        let stats = self.with_grid(|grid| grid.debug_stats())?;
        Ok(serde_wasm_bindgen::to_value(&stats)?)
    }
}

impl Drop for WasmGrid {
    fn drop(&mut self) {
        if let Some(closure) = self.scroll_closure.take() {
            if let Ok(grid) = self.shared.grid.try_borrow() {
                let _ = grid.surface().viewport.remove_event_listener_with_callback(
                    "scroll",
                    closure.as_ref().unchecked_ref(),
                );
            }
        }
        if let (Some(window), Some(handle)) = (web_sys::window(), self.shared.timer.take()) {
            window.clear_timeout_with_handle(handle);
        }
    }
}
