use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    NoSession,
    SessionPending,
    SessionActive,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UiState {
    pub current_project_id: Option<String>,
    pub current_doc_base_id: Option<String>,
    pub current_version_id: Option<String>,
    pub current_session_id: Option<String>,
    pub highlighted_block_id: Option<String>,
    pub phase: SessionPhase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionTicket(u64);

// Stale once either the selection or a later send moves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendTicket {
    selection: u64,
    send: u64,
}

#[derive(Debug, Default)]
struct Generation(Cell<u64>);

impl Generation {
    fn issue(&self) -> u64 {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }

    fn current(&self) -> u64 {
        self.0.get()
    }
}

type Listener = Rc<dyn Fn(u64)>;

#[derive(Default)]
struct Inner {
    state: RefCell<UiState>,
    selection: Generation,
    send: Generation,
    loading: Cell<usize>,
    revision: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
}

#[derive(Clone, Default)]
pub struct UiStateStore {
    inner: Rc<Inner>,
}

impl UiStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UiState {
        self.inner.state.borrow().clone()
    }

    pub fn current_version_id(&self) -> Option<String> {
        self.inner.state.borrow().current_version_id.clone()
    }

    pub fn highlighted_block_id(&self) -> Option<String> {
        self.inner.state.borrow().highlighted_block_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.get() > 0
    }

    pub fn subscribe(&self, listener: impl Fn(u64) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn touch(&self) {
        let revision = self.inner.revision.get() + 1;
        self.inner.revision.set(revision);
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(revision);
        }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut UiState) -> R) -> R {
        let out = {
            let mut state = self.inner.state.borrow_mut();
            f(&mut state)
        };
        self.touch();
        out
    }

    pub fn set_project_context(&self, project_id: Option<String>, doc_base_id: Option<String>) {
        self.mutate(|state| {
            state.current_project_id = project_id;
            state.current_doc_base_id = doc_base_id;
        });
    }

    pub fn begin_selection(&self, version_id: &str) -> SelectionTicket {
        let ticket = SelectionTicket(self.inner.selection.issue());
        self.inner.send.issue();
        self.mutate(|state| {
            state.current_version_id = Some(version_id.to_string());
            state.current_session_id = None;
            state.phase = SessionPhase::SessionPending;
        });
        ticket
    }

    pub fn is_current_selection(&self, ticket: SelectionTicket) -> bool {
        ticket.0 == self.inner.selection.current()
    }

    pub fn commit_session(&self, ticket: SelectionTicket, session_id: &str) -> bool {
        if !self.is_current_selection(ticket) {
            return false;
        }
        self.mutate(|state| state.current_session_id = Some(session_id.to_string()));
        true
    }

    pub fn activate_session(&self, ticket: SelectionTicket) -> bool {
        if !self.is_current_selection(ticket) {
            return false;
        }
        self.mutate(|state| state.phase = SessionPhase::SessionActive);
        true
    }

    pub fn abandon_selection(&self, ticket: SelectionTicket) -> bool {
        if !self.is_current_selection(ticket) {
            return false;
        }
        self.mutate(|state| {
            state.current_session_id = None;
            state.phase = SessionPhase::NoSession;
        });
        true
    }

    pub fn begin_send(&self) -> Option<(SendTicket, String)> {
        let session_id = {
            let state = self.inner.state.borrow();
            if state.phase != SessionPhase::SessionActive {
                return None;
            }
            state.current_session_id.clone()?
        };
        let ticket = SendTicket {
            selection: self.inner.selection.current(),
            send: self.inner.send.issue(),
        };
        Some((ticket, session_id))
    }

    pub fn is_current_send(&self, ticket: SendTicket) -> bool {
        ticket.selection == self.inner.selection.current()
            && ticket.send == self.inner.send.current()
    }

    pub fn set_highlighted_block(&self, block_id: Option<String>) {
        self.mutate(|state| state.highlighted_block_id = block_id);
    }

    pub fn acquire_loading(&self) -> LoadingGuard {
        self.inner.loading.set(self.inner.loading.get() + 1);
        self.touch();
        LoadingGuard {
            store: self.clone(),
        }
    }
}

#[must_use = "the loading indicator is released when the guard drops"]
pub struct LoadingGuard {
    store: UiStateStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let loading = &self.store.inner.loading;
        loading.set(loading.get().saturating_sub(1));
        self.store.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_selection_supersedes_earlier_ticket() {
        let store = UiStateStore::new();
        let first = store.begin_selection("v1");
        let second = store.begin_selection("v2");

        assert!(!store.commit_session(first, "s1"));
        assert!(store.commit_session(second, "s2"));
        assert!(!store.activate_session(first));
        assert!(store.activate_session(second));

        let state = store.snapshot();
        assert_eq!(state.current_version_id.as_deref(), Some("v2"));
        assert_eq!(state.current_session_id.as_deref(), Some("s2"));
        assert_eq!(state.phase, SessionPhase::SessionActive);
    }

    #[test]
    fn send_requires_active_session() {
        let store = UiStateStore::new();
        assert!(store.begin_send().is_none());

        let ticket = store.begin_selection("v1");
        store.commit_session(ticket, "s1");
        assert!(store.begin_send().is_none());

        store.activate_session(ticket);
        let (send, session) = store.begin_send().unwrap();
        assert_eq!(session, "s1");
        assert!(store.is_current_send(send));
    }

    #[test]
    fn new_selection_or_send_invalidates_send_ticket() {
        let store = UiStateStore::new();
        let ticket = store.begin_selection("v1");
        store.commit_session(ticket, "s1");
        store.activate_session(ticket);

        let (first, _) = store.begin_send().unwrap();
        let (second, _) = store.begin_send().unwrap();
        assert!(!store.is_current_send(first));
        assert!(store.is_current_send(second));

        store.begin_selection("v2");
        assert!(!store.is_current_send(second));
        let state = store.snapshot();
        assert_eq!(state.phase, SessionPhase::SessionPending);
        assert_eq!(state.current_session_id, None);
    }

    #[test]
    fn loading_guard_releases_on_drop() {
        let store = UiStateStore::new();
        {
            let _outer = store.acquire_loading();
            let inner = store.acquire_loading();
            assert!(store.is_loading());
            drop(inner);
            assert!(store.is_loading());
        }
        assert!(!store.is_loading());
    }

    #[test]
    fn listeners_see_each_revision() {
        let store = UiStateStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |rev| sink.borrow_mut().push(rev));

        store.set_project_context(Some("P-1".into()), None);
        store.set_highlighted_block(Some("blk".into()));

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
