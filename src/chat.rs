use std::cell::RefCell;
use std::rc::Rc;

use crate::error::UiError;
use crate::gateway::RemoteGateway;
use crate::linker::SourceLinker;
use crate::model::Message;
use crate::notify::Notifier;
use crate::preview::DocumentPreview;
use crate::render::{self, CitationAction, CitationBinding, MessageView};
use crate::store::UiStateStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayedMessage {
    pub view: MessageView,
    pub bindings: Vec<CitationBinding>,
}

impl DisplayedMessage {
    fn new(message: &Message) -> Self {
        let view = render::render(message);
        let bindings = render::bindings(&view);
        Self { view, bindings }
    }
}

pub struct ChatSessionController<P: DocumentPreview> {
    gateway: Rc<dyn RemoteGateway>,
    notifier: Rc<dyn Notifier>,
    store: UiStateStore,
    linker: SourceLinker<P>,
    messages: RefCell<Vec<DisplayedMessage>>,
    draft: RefCell<String>,
}

impl<P: DocumentPreview> ChatSessionController<P> {
    pub fn new(
        gateway: Rc<dyn RemoteGateway>,
        notifier: Rc<dyn Notifier>,
        store: UiStateStore,
        preview: P,
    ) -> Self {
        Self {
            gateway,
            notifier,
            linker: SourceLinker::new(store.clone(), preview),
            store,
            messages: RefCell::new(Vec::new()),
            draft: RefCell::new(String::new()),
        }
    }

    fn report<T>(&self, result: Result<T, UiError>) -> Result<T, UiError> {
        if let Err(err) = &result {
            log::warn!("{err}");
            self.notifier.notice(err.notice());
        }
        result
    }

    pub fn messages(&self) -> Vec<DisplayedMessage> {
        self.messages.borrow().clone()
    }

    pub fn draft(&self) -> String {
        self.draft.borrow().clone()
    }

    pub fn set_draft(&self, text: String) {
        *self.draft.borrow_mut() = text;
    }

    #[cfg(test)]
    pub fn linker(&self) -> &SourceLinker<P> {
        &self.linker
    }

    fn append(&self, message: &Message) {
        self.messages
            .borrow_mut()
            .push(DisplayedMessage::new(message));
        self.store.touch();
    }

    pub async fn select_version(&self, version_id: &str) -> Result<(), UiError> {
        let ticket = self.store.begin_selection(version_id);
        self.linker.clear();

        let created = {
            let _loading = self.store.acquire_loading();
            self.gateway.create_chat_session(version_id).await
        };
        let session_id = match created {
            Ok(session_id) => {
                if !self.store.commit_session(ticket, &session_id) {
                    log::debug!("dropping session {session_id}: version {version_id} superseded");
                    return Ok(());
                }
                session_id
            }
            Err(err) => {
                if !self.store.abandon_selection(ticket) {
                    log::debug!("dropping session error for superseded version {version_id}");
                    return Ok(());
                }
                return self.report(Err(UiError::network("Open chat session", err)));
            }
        };
        self.messages.borrow_mut().clear();
        self.store.touch();

        let history = {
            let _loading = self.store.acquire_loading();
            self.gateway.chat_history(&session_id).await
        };
        if !self.store.is_current_selection(ticket) {
            log::debug!("dropping history of session {session_id}: superseded");
            return Ok(());
        }
        match history {
            Ok(history) => {
                *self.messages.borrow_mut() = history.iter().map(DisplayedMessage::new).collect();
                self.store.activate_session(ticket);
                Ok(())
            }
            Err(err) => {
                self.store.activate_session(ticket);
                self.report(Err(UiError::network("Load chat history", err)))
            }
        }
    }

    // The question stays shown even if sending fails.
    pub async fn send_question(&self, text: &str) -> Result<(), UiError> {
        let query = text.trim();
        if query.is_empty() {
            return self.report(Err(UiError::validation("Enter a question")));
        }
        let Some((ticket, session_id)) = self.store.begin_send() else {
            return self.report(Err(UiError::validation("Select a document version first")));
        };

        self.draft.borrow_mut().clear();
        self.append(&Message::user(query));

        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway.send_message(&session_id, query).await
        };
        if !self.store.is_current_send(ticket) {
            log::debug!("dropping answer for session {session_id}: superseded");
            return Ok(());
        }
        let answer = self.report(result.map_err(|e| UiError::network("Send question", e)))?;
        self.append(&Message::system(answer.answer, answer.sources));
        Ok(())
    }

    pub fn activate_citation(&self, index: usize, marker: usize) -> bool {
        let action = self
            .messages
            .borrow()
            .get(index)
            .and_then(|msg| msg.bindings.iter().find(|b| b.marker == marker))
            .map(|binding| binding.action.clone());
        match action {
            Some(CitationAction::HighlightSource(block_id)) => {
                self.linker.highlight_source(&block_id)
            }
            None => false,
        }
    }
}
