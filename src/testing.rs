//! In-process fake driver used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{DriverError, DriverErrorKind, DriverResult};
use crate::locate::By;
use crate::remote::{Handle, RemoteElement, RemoteSession, Session};

// ============================================================================
// Types
// ============================================================================

type LookupKey = (Option<String>, By);

#[derive(Default)]
struct NodeState {
    displayed: bool,
    stale: bool,
    text: String,
    actions: usize,
    clicks: usize,
    failures: VecDeque<DriverErrorKind>,
}

#[derive(Default)]
struct DomState {
    handles: RefCell<FxHashMap<String, Handle>>,
    nodes: RefCell<FxHashMap<String, NodeState>>,
    matches: RefCell<FxHashMap<LookupKey, VecDeque<Vec<String>>>>,
    lookup_failures: RefCell<FxHashMap<LookupKey, VecDeque<DriverErrorKind>>>,
    lookups: RefCell<FxHashMap<LookupKey, usize>>,
    windows: Cell<usize>,
    quits: Cell<usize>,
    sessions: Cell<usize>,
}

/// Scriptable in-memory remote tree.
#[derive(Clone, Default)]
pub(crate) struct FakeDom {
    state: Rc<DomState>,
}

struct FakeNode {
    id: String,
    state: Rc<DomState>,
}

struct FakeSession {
    id: String,
    state: Rc<DomState>,
}

// ============================================================================
// FakeDom
// ============================================================================

impl FakeDom {
    pub(crate) fn new() -> Self {
        let dom = Self::default();
        dom.state.windows.set(1);
        dom
    }

    /// Returns the handle for `id`, creating a displayed node on first use.
    pub(crate) fn node(&self, id: &str) -> Handle {
        if let Some(handle) = self.state.handles.borrow().get(id) {
            return handle.clone();
        }
        let handle = Handle::new(FakeNode {
            id: id.to_string(),
            state: Rc::clone(&self.state),
        });
        self.state.handles.borrow_mut().insert(id.to_string(), handle.clone());
        self.state.nodes.borrow_mut().insert(
            id.to_string(),
            NodeState {
                displayed: true,
                text: id.to_string(),
                ..NodeState::default()
            },
        );
        handle
    }

    /// Sets what every following top-level lookup for `by` returns.
    pub(crate) fn set_matches(&self, by: &By, ids: &[&str]) {
        self.script(None, by, vec![ids.to_vec()]);
    }

    /// Sets what every following child lookup for `by` under `parent` returns.
    pub(crate) fn set_child_matches(&self, parent: &str, by: &By, ids: &[&str]) {
        self.script(Some(parent), by, vec![ids.to_vec()]);
    }

    /// Queues successive lookup results. The last one repeats forever.
    pub(crate) fn script(&self, parent: Option<&str>, by: &By, results: Vec<Vec<&str>>) {
        let queue = results
            .into_iter()
            .map(|ids| {
                ids.into_iter()
                    .map(|id| {
                        self.node(id);
                        id.to_string()
                    })
                    .collect()
            })
            .collect();
        self.state
            .matches
            .borrow_mut()
            .insert((parent.map(str::to_string), by.clone()), queue);
    }

    /// Makes the next `times` top-level lookups for `by` fail with `kind`.
    pub(crate) fn fail_lookups(&self, by: &By, kind: DriverErrorKind, times: usize) {
        self.state
            .lookup_failures
            .borrow_mut()
            .insert((None, by.clone()), std::iter::repeat_n(kind, times).collect());
    }

    /// Makes the next `times` actions on `id` fail with `kind`.
    pub(crate) fn fail_actions(&self, id: &str, kind: DriverErrorKind, times: usize) {
        self.node(id);
        if let Some(node) = self.state.nodes.borrow_mut().get_mut(id) {
            node.failures.extend(std::iter::repeat_n(kind, times));
        }
    }

    pub(crate) fn set_stale(&self, id: &str, stale: bool) {
        self.node(id);
        if let Some(node) = self.state.nodes.borrow_mut().get_mut(id) {
            node.stale = stale;
        }
    }

    pub(crate) fn set_displayed(&self, id: &str, displayed: bool) {
        self.node(id);
        if let Some(node) = self.state.nodes.borrow_mut().get_mut(id) {
            node.displayed = displayed;
        }
    }

    pub(crate) fn lookup_count(&self, by: &By) -> usize {
        self.child_lookup_count(None, by)
    }

    pub(crate) fn child_lookup_count(&self, parent: Option<&str>, by: &By) -> usize {
        self.state
            .lookups
            .borrow()
            .get(&(parent.map(str::to_string), by.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn action_count(&self, id: &str) -> usize {
        self.state.nodes.borrow().get(id).map_or(0, |n| n.actions)
    }

    pub(crate) fn click_count(&self, id: &str) -> usize {
        self.state.nodes.borrow().get(id).map_or(0, |n| n.clicks)
    }

    pub(crate) fn set_windows(&self, count: usize) {
        self.state.windows.set(count);
    }

    pub(crate) fn windows(&self) -> usize {
        self.state.windows.get()
    }

    pub(crate) fn quit_count(&self) -> usize {
        self.state.quits.get()
    }

    pub(crate) fn session_count(&self) -> usize {
        self.state.sessions.get()
    }

    /// Opens a new session over this tree.
    pub(crate) fn session(&self) -> Session {
        let count = self.state.sessions.get() + 1;
        self.state.sessions.set(count);
        Session::new(FakeSession {
            id: format!("session-{count}"),
            state: Rc::clone(&self.state),
        })
    }
}

// ============================================================================
// DomState
// ============================================================================

impl DomState {
    fn lookup(&self, parent: Option<&str>, by: &By) -> DriverResult<Vec<Handle>> {
        let key = (parent.map(str::to_string), by.clone());
        *self.lookups.borrow_mut().entry(key.clone()).or_default() += 1;

        if let Some(kind) = self
            .lookup_failures
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return Err(DriverError::new(kind, format!("lookup {by} failed")));
        }

        let ids = {
            let mut matches = self.matches.borrow_mut();
            match matches.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
                Some(queue) => queue.front().cloned().unwrap_or_default(),
                None => Vec::new(),
            }
        };

        let handles = self.handles.borrow();
        Ok(ids.iter().filter_map(|id| handles.get(id).cloned()).collect())
    }

    fn act<T>(&self, id: &str, f: impl FnOnce(&mut NodeState) -> T) -> DriverResult<T> {
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| DriverError::no_such_element(id.to_string()))?;
        node.actions += 1;
        if let Some(kind) = node.failures.pop_front() {
            return Err(DriverError::new(kind, format!("{id} failed")));
        }
        if node.stale {
            return Err(DriverError::stale(format!("{id} is detached")));
        }
        Ok(f(node))
    }
}

// ============================================================================
// RemoteElement / RemoteSession
// ============================================================================

impl RemoteElement for FakeNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn find_children(&self, by: &By) -> DriverResult<Vec<Handle>> {
        self.state.act(&self.id, |_| ())?;
        self.state.lookup(Some(&self.id), by)
    }

    fn click(&self) -> DriverResult<()> {
        self.state.act(&self.id, |n| n.clicks += 1)
    }

    fn send_keys(&self, text: &str) -> DriverResult<()> {
        self.state.act(&self.id, |n| n.text.push_str(text))
    }

    fn clear(&self) -> DriverResult<()> {
        self.state.act(&self.id, |n| n.text.clear())
    }

    fn text(&self) -> DriverResult<String> {
        self.state.act(&self.id, |n| n.text.clone())
    }

    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        self.state
            .act(&self.id, |_| (name == "id").then(|| self.id.clone()))
    }

    fn is_displayed(&self) -> DriverResult<bool> {
        let nodes = self.state.nodes.borrow();
        match nodes.get(&self.id) {
            Some(node) if node.stale => Err(DriverError::stale(format!("{} is detached", self.id))),
            Some(node) => Ok(node.displayed),
            None => Err(DriverError::no_such_element(self.id.clone())),
        }
    }

    fn is_enabled(&self) -> DriverResult<bool> {
        self.state.act(&self.id, |_| true)
    }
}

impl RemoteSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn find_children(&self, by: &By) -> DriverResult<Vec<Handle>> {
        self.state.lookup(None, by)
    }

    fn window_count(&self) -> DriverResult<usize> {
        Ok(self.state.windows.get())
    }

    fn close_window(&self) -> DriverResult<()> {
        let windows = self.state.windows.get();
        self.state.windows.set(windows.saturating_sub(1));
        Ok(())
    }

    fn quit(&self) -> DriverResult<()> {
        self.state.quits.set(self.state.quits.get() + 1);
        self.state.windows.set(0);
        Ok(())
    }
}
