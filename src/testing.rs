//! In-memory collaborators for controller tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::channel::oneshot;

use crate::error::{GatewayError, Notice};
use crate::gateway::{GatewayResult, RemoteGateway};
use crate::model::{
    Answer, DocumentSummary, Message, Project, UploadFile, UploadReceipt, Version, VersionStatus,
};
use crate::notify::Notifier;
use crate::preview::DocumentPreview;
use crate::store::UiStateStore;

pub(crate) enum Reply<T> {
    Ready(GatewayResult<T>),
    Held(oneshot::Receiver<GatewayResult<T>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> GatewayResult<T> {
        match self {
            Reply::Ready(result) => result,
            Reply::Held(rx) => rx
                .await
                .unwrap_or_else(|_| Err(GatewayError::Transport("gate dropped".to_string()))),
        }
    }
}

/// Backend double: a small in-memory store plus scripted session and answer
/// replies that can be held open to force completion order.
#[derive(Default)]
pub(crate) struct FakeGateway {
    pub calls: RefCell<Vec<String>>,
    pub projects: RefCell<Vec<Project>>,
    pub documents: RefCell<HashMap<String, Vec<DocumentSummary>>>,
    pub versions: RefCell<HashMap<String, Vec<Version>>>,
    pub histories: RefCell<HashMap<String, Vec<Message>>>,
    pub api_key: RefCell<Option<String>>,
    sessions: RefCell<VecDeque<Reply<String>>>,
    answers: RefCell<VecDeque<Reply<Answer>>>,
    held_histories: RefCell<HashMap<String, oneshot::Receiver<GatewayResult<Vec<Message>>>>>,
    failures: RefCell<HashMap<&'static str, GatewayError>>,
}

impl FakeGateway {
    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn take_failure(&self, op: &'static str) -> GatewayResult<()> {
        match self.failures.borrow_mut().remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Makes the next call of `op` fail.
    pub fn fail_next(&self, op: &'static str, err: GatewayError) {
        self.failures.borrow_mut().insert(op, err);
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.split(':').next() == Some(op))
            .count()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == call)
    }

    pub fn queue_session(&self, session_id: &str) {
        self.sessions
            .borrow_mut()
            .push_back(Reply::Ready(Ok(session_id.to_string())));
    }

    pub fn hold_session(&self) -> oneshot::Sender<GatewayResult<String>> {
        let (tx, rx) = oneshot::channel();
        self.sessions.borrow_mut().push_back(Reply::Held(rx));
        tx
    }

    pub fn queue_answer(&self, answer: &str, sources: &[&str]) {
        self.answers.borrow_mut().push_back(Reply::Ready(Ok(Answer {
            answer: answer.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        })));
    }

    pub fn hold_answer(&self) -> oneshot::Sender<GatewayResult<Answer>> {
        let (tx, rx) = oneshot::channel();
        self.answers.borrow_mut().push_back(Reply::Held(rx));
        tx
    }

    pub fn hold_history(&self, session_id: &str) -> oneshot::Sender<GatewayResult<Vec<Message>>> {
        let (tx, rx) = oneshot::channel();
        self.held_histories
            .borrow_mut()
            .insert(session_id.to_string(), rx);
        tx
    }

    pub fn add_project(&self, id: &str, name: Option<&str>) {
        self.projects.borrow_mut().push(Project {
            project_id: id.to_string(),
            project_name: name.map(str::to_string),
        });
    }

    pub fn add_document(&self, project_id: &str, doc_base_id: &str, filename: &str) {
        self.documents
            .borrow_mut()
            .entry(project_id.to_string())
            .or_default()
            .push(DocumentSummary {
                doc_base_id: doc_base_id.to_string(),
                filename: filename.to_string(),
                latest_version_number: None,
                version_id: None,
                status: None,
            });
    }

    /// Adds versions `1..=count` to a document; the highest is latest.
    pub fn add_versions(&self, doc_base_id: &str, count: u32) {
        let versions = (1..=count)
            .rev()
            .map(|n| Version {
                version_id: format!("{doc_base_id}-v{n}"),
                version_number: n,
                upload_time: Utc.with_ymd_and_hms(2024, 5, n, 9, 0, 0).unwrap(),
                is_latest: n == count,
                deleted: false,
                status: VersionStatus::Ready,
            })
            .collect();
        self.versions
            .borrow_mut()
            .insert(doc_base_id.to_string(), versions);
    }
}

#[async_trait(?Send)]
impl RemoteGateway for FakeGateway {
    async fn create_project(
        &self,
        project_id: &str,
        project_name: Option<&str>,
    ) -> GatewayResult<Project> {
        self.record(format!("create_project:{project_id}"));
        self.take_failure("create_project")?;
        self.add_project(project_id, project_name);
        Ok(Project {
            project_id: project_id.to_string(),
            project_name: project_name.map(str::to_string),
        })
    }

    async fn list_projects(&self) -> GatewayResult<Vec<Project>> {
        self.record("list_projects".to_string());
        self.take_failure("list_projects")?;
        Ok(self.projects.borrow().clone())
    }

    async fn upload_document(
        &self,
        project_id: &str,
        file: UploadFile,
        doc_base_id: Option<&str>,
    ) -> GatewayResult<UploadReceipt> {
        self.record(format!("upload_document:{project_id}:{}", file.name));
        self.take_failure("upload_document")?;
        let doc_base_id = match doc_base_id {
            Some(id) => id.to_string(),
            None => {
                let id = format!("doc-{}", file.name);
                self.add_document(project_id, &id, &file.name);
                id
            }
        };
        let mut versions = self.versions.borrow_mut();
        let list = versions.entry(doc_base_id.clone()).or_default();
        let next = list.iter().map(|v| v.version_number).max().unwrap_or(0) + 1;
        for v in list.iter_mut() {
            v.is_latest = false;
        }
        let version_id = format!("{doc_base_id}-v{next}");
        list.insert(
            0,
            Version {
                version_id: version_id.clone(),
                version_number: next,
                upload_time: Utc::now(),
                is_latest: true,
                deleted: false,
                status: VersionStatus::Processing,
            },
        );
        Ok(UploadReceipt {
            version_id,
            version_number: next,
        })
    }

    async fn list_documents(&self, project_id: &str) -> GatewayResult<Vec<DocumentSummary>> {
        self.record(format!("list_documents:{project_id}"));
        self.take_failure("list_documents")?;
        Ok(self
            .documents
            .borrow()
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_versions(&self, doc_base_id: &str) -> GatewayResult<Vec<Version>> {
        self.record(format!("list_versions:{doc_base_id}"));
        self.take_failure("list_versions")?;
        Ok(self
            .versions
            .borrow()
            .get(doc_base_id)
            .map(|list| list.iter().filter(|v| !v.deleted).cloned().collect())
            .unwrap_or_default())
    }

    async fn soft_delete_version(&self, version_id: &str) -> GatewayResult<()> {
        self.record(format!("soft_delete_version:{version_id}"));
        self.take_failure("soft_delete_version")?;
        let mut versions = self.versions.borrow_mut();
        let target = versions
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|v| v.version_id == version_id);
        match target {
            Some(v) if v.is_latest => Err(GatewayError::Status {
                status: 400,
                detail: "cannot delete the latest version".to_string(),
            }),
            Some(v) => {
                v.deleted = true;
                Ok(())
            }
            None => Err(GatewayError::Status {
                status: 404,
                detail: "version not found".to_string(),
            }),
        }
    }

    async fn create_chat_session(&self, version_id: &str) -> GatewayResult<String> {
        self.record(format!("create_chat_session:{version_id}"));
        let reply = self.sessions.borrow_mut().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(format!("session-{version_id}")),
        }
    }

    async fn send_message(&self, session_id: &str, query: &str) -> GatewayResult<Answer> {
        self.record(format!("send_message:{session_id}:{query}"));
        let reply = self.answers.borrow_mut().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(GatewayError::Transport("no answer scripted".to_string())),
        }
    }

    async fn chat_history(&self, session_id: &str) -> GatewayResult<Vec<Message>> {
        self.record(format!("chat_history:{session_id}"));
        self.take_failure("chat_history")?;
        let held = self.held_histories.borrow_mut().remove(session_id);
        if let Some(rx) = held {
            return Reply::Held(rx).resolve().await;
        }
        Ok(self
            .histories
            .borrow()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn api_key(&self) -> GatewayResult<Option<String>> {
        self.record("api_key".to_string());
        self.take_failure("api_key")?;
        Ok(self.api_key.borrow().clone())
    }

    async fn set_api_key(&self, api_key: &str) -> GatewayResult<()> {
        self.record("set_api_key".to_string());
        self.take_failure("set_api_key")?;
        *self.api_key.borrow_mut() = Some(api_key.to_string());
        Ok(())
    }
}

/// Records notices together with whether the loading indicator was still held.
pub(crate) struct RecordingNotifier {
    store: UiStateStore,
    pub notices: RefCell<Vec<Notice>>,
    pub loading_at_notice: RefCell<Vec<bool>>,
    pub prompts: RefCell<Vec<String>>,
    pub confirm_answer: Cell<bool>,
    held_confirm: RefCell<Option<oneshot::Receiver<bool>>>,
}

impl RecordingNotifier {
    pub fn new(store: &UiStateStore) -> Self {
        Self {
            store: store.clone(),
            notices: RefCell::new(Vec::new()),
            loading_at_notice: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
            confirm_answer: Cell::new(true),
            held_confirm: RefCell::new(None),
        }
    }

    /// Keeps the next confirmation open until the returned sender answers it.
    pub fn hold_confirm(&self) -> oneshot::Sender<bool> {
        let (tx, rx) = oneshot::channel();
        *self.held_confirm.borrow_mut() = Some(rx);
        tx
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices
            .borrow()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

#[async_trait(?Send)]
impl Notifier for RecordingNotifier {
    fn notice(&self, notice: Notice) {
        self.loading_at_notice
            .borrow_mut()
            .push(self.store.is_loading());
        self.notices.borrow_mut().push(notice);
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        let held = self.held_confirm.borrow_mut().take();
        match held {
            Some(rx) => rx.await.unwrap_or(false),
            None => self.confirm_answer.get(),
        }
    }
}

/// Preview recording highlight state and scroll requests.
#[derive(Default)]
pub(crate) struct FakePreview {
    pub blocks: RefCell<HashSet<String>>,
    pub highlighted: RefCell<BTreeSet<String>>,
    pub scrolled: RefCell<Vec<String>>,
}

impl FakePreview {
    pub fn with_blocks(ids: &[&str]) -> Self {
        let preview = Self::default();
        preview
            .blocks
            .borrow_mut()
            .extend(ids.iter().map(|id| id.to_string()));
        preview
    }

    pub fn highlighted(&self) -> Vec<String> {
        self.highlighted.borrow().iter().cloned().collect()
    }
}

impl DocumentPreview for FakePreview {
    type Block = String;

    fn resolve_block(&self, block_id: &str) -> Option<String> {
        self.blocks
            .borrow()
            .contains(block_id)
            .then(|| block_id.to_string())
    }

    fn set_highlighted(&self, block: &String, highlighted: bool) {
        let mut set = self.highlighted.borrow_mut();
        if highlighted {
            set.insert(block.clone());
        } else {
            set.remove(block);
        }
    }

    fn scroll_into_view(&self, block: &String) {
        self.scrolled.borrow_mut().push(block.clone());
    }
}
