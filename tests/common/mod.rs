//! Shared fake automation driver for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;
use std::time::Duration;

use patient_locator::{
    By, Config, Driver, DriverError, DriverErrorKind, DriverResult, FixedInterval, Handle,
    RemoteElement, RemoteSession, Session,
};
use rustc_hash::FxHashMap;

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Screen
// ============================================================================

#[derive(Default)]
struct Widget {
    handle: Option<Handle>,
    generation: u64,
    parent: Option<String>,
    selector: Option<By>,
    detached: bool,
    hidden: bool,
    typed: String,
    clicks: usize,
}

#[derive(Default)]
struct ScreenState {
    widgets: RefCell<FxHashMap<String, Widget>>,
    order: RefCell<Vec<String>>,
    lookups: Cell<usize>,
    generations: Cell<u64>,
    sessions: Cell<usize>,
    windows: Cell<usize>,
}

/// A mutable in-memory UI tree.
///
/// Widgets are matched by exact selector equality under their parent.
#[derive(Clone, Default)]
pub struct Screen {
    state: Rc<ScreenState>,
}

impl Screen {
    pub fn new() -> Self {
        let screen = Self::default();
        screen.state.windows.set(1);
        screen
    }

    /// Adds a widget under `parent` (or at the top level) matched by `by`.
    pub fn add(&self, id: &str, parent: Option<&str>, by: By) {
        let generation = self.state.generations.get() + 1;
        self.state.generations.set(generation);
        let handle = Handle::new(WidgetRef {
            id: id.to_string(),
            generation,
            state: Rc::clone(&self.state),
        });
        self.state.widgets.borrow_mut().insert(
            id.to_string(),
            Widget {
                handle: Some(handle),
                generation,
                parent: parent.map(str::to_string),
                selector: Some(by),
                ..Widget::default()
            },
        );
        self.state.order.borrow_mut().push(id.to_string());
    }

    /// Detaches a widget; its old handle goes stale and lookups skip it.
    pub fn remove(&self, id: &str) {
        if let Some(widget) = self.state.widgets.borrow_mut().get_mut(id) {
            widget.detached = true;
        }
        self.state.order.borrow_mut().retain(|w| w != id);
    }

    /// Replaces a widget with a fresh node under the same id and selector.
    pub fn rerender(&self, id: &str) {
        let (parent, selector) = {
            let widgets = self.state.widgets.borrow();
            let Some(widget) = widgets.get(id) else { return };
            (widget.parent.clone(), widget.selector.clone())
        };
        let typed = self.typed(id);
        self.remove(id);
        if let Some(by) = selector {
            self.add(id, parent.as_deref(), by);
            if let Some(widget) = self.state.widgets.borrow_mut().get_mut(id) {
                widget.typed = typed;
            }
        }
    }

    pub fn hide(&self, id: &str) {
        if let Some(widget) = self.state.widgets.borrow_mut().get_mut(id) {
            widget.hidden = true;
        }
    }

    pub fn typed(&self, id: &str) -> String {
        self.state
            .widgets
            .borrow()
            .get(id)
            .map(|w| w.typed.clone())
            .unwrap_or_default()
    }

    pub fn clicks(&self, id: &str) -> usize {
        self.state.widgets.borrow().get(id).map_or(0, |w| w.clicks)
    }

    pub fn lookups(&self) -> usize {
        self.state.lookups.get()
    }

    pub fn sessions(&self) -> usize {
        self.state.sessions.get()
    }

    pub fn windows(&self) -> usize {
        self.state.windows.get()
    }

    pub fn open_window(&self) {
        self.state.windows.set(self.state.windows.get() + 1);
    }

    pub fn handle(&self, id: &str) -> Option<Handle> {
        self.state.widgets.borrow().get(id).and_then(|w| w.handle.clone())
    }

    pub fn session(&self) -> Session {
        self.state.sessions.set(self.state.sessions.get() + 1);
        Session::new(ScreenSession {
            id: format!("screen-{}", self.state.sessions.get()),
            state: Rc::clone(&self.state),
        })
    }

    /// Builds a driver with short timeouts over this screen.
    pub fn driver(&self) -> Driver {
        let screen = self.clone();
        Driver::builder()
            .config(fast_config())
            .connect(move || Ok(screen.session()))
            .build()
            .unwrap()
    }
}

/// Polls every 2ms and gives up after 60ms.
pub fn fast_config() -> Config {
    Config::builder()
        .wait(FixedInterval(Duration::from_millis(2)))
        .present_timeout(Duration::from_millis(60))
        .not_present_timeout(Duration::from_millis(60))
        .build()
        .unwrap()
}

impl ScreenState {
    fn find(&self, parent: Option<&str>, by: &By) -> Vec<Handle> {
        self.lookups.set(self.lookups.get() + 1);
        let widgets = self.widgets.borrow();
        self.order
            .borrow()
            .iter()
            .filter_map(|id| widgets.get(id))
            .filter(|w| !w.detached)
            .filter(|w| w.parent.as_deref() == parent && w.selector.as_ref() == Some(by))
            .filter_map(|w| w.handle.clone())
            .collect()
    }
}

// ============================================================================
// Remote implementations
// ============================================================================

struct WidgetRef {
    id: String,
    generation: u64,
    state: Rc<ScreenState>,
}

impl WidgetRef {
    /// Runs `f` if this reference still points at the attached widget.
    fn live<T>(&self, f: impl FnOnce(&mut Widget) -> T) -> DriverResult<T> {
        let mut widgets = self.state.widgets.borrow_mut();
        match widgets.get_mut(&self.id) {
            Some(widget) if !widget.detached && widget.generation == self.generation => {
                Ok(f(widget))
            }
            _ => Err(DriverError::stale(format!("{} is no longer attached", self.id))),
        }
    }
}

impl RemoteElement for WidgetRef {
    fn id(&self) -> &str {
        &self.id
    }

    fn find_children(&self, by: &By) -> DriverResult<Vec<Handle>> {
        self.live(|_| ())?;
        Ok(self.state.find(Some(&self.id), by))
    }

    fn click(&self) -> DriverResult<()> {
        self.live(|w| w.clicks += 1)
    }

    fn send_keys(&self, text: &str) -> DriverResult<()> {
        self.live(|w| w.typed.push_str(text))
    }

    fn clear(&self) -> DriverResult<()> {
        self.live(|w| w.typed.clear())
    }

    fn text(&self) -> DriverResult<String> {
        self.live(|w| w.typed.clone())
    }

    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        self.live(|_| (name == "data-id").then(|| self.id.clone()))
    }

    fn is_displayed(&self) -> DriverResult<bool> {
        self.live(|w| !w.hidden)
    }

    fn is_enabled(&self) -> DriverResult<bool> {
        self.live(|_| true)
    }
}

struct ScreenSession {
    id: String,
    state: Rc<ScreenState>,
}

impl RemoteSession for ScreenSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn find_children(&self, by: &By) -> DriverResult<Vec<Handle>> {
        Ok(self.state.find(None, by))
    }

    fn window_count(&self) -> DriverResult<usize> {
        Ok(self.state.windows.get())
    }

    fn close_window(&self) -> DriverResult<()> {
        match self.state.windows.get() {
            0 => Err(DriverError::new(DriverErrorKind::NoSuchWindow, "no window open")),
            n => {
                self.state.windows.set(n - 1);
                Ok(())
            }
        }
    }

    fn quit(&self) -> DriverResult<()> {
        self.state.windows.set(0);
        Ok(())
    }
}
