use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::UiError;
use crate::gateway::RemoteGateway;
use crate::model::{
    local_label, DocumentSummary, Project, UploadFile, UploadReceipt, Version, VersionStatus,
};
use crate::notify::Notifier;
use crate::store::UiStateStore;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Project(String),
    Document(String),
}

impl NodeKey {
    pub fn id(&self) -> &str {
        match self {
            Self::Project(id) | Self::Document(id) => id,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Disclosure {
    #[default]
    Collapsed,
    Expanded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectRow {
    pub project: Project,
    pub expanded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionRow {
    pub version_id: String,
    pub label: String,
    pub is_latest: bool,
    pub deletable: bool,
    pub uploaded: String,
    pub status: VersionStatus,
}

impl From<&Version> for VersionRow {
    fn from(version: &Version) -> Self {
        Self {
            version_id: version.version_id.clone(),
            label: format!("v{}", version.version_number),
            is_latest: version.is_latest,
            deletable: !version.is_latest,
            uploaded: local_label(&version.upload_time),
            status: version.status,
        }
    }
}

enum Children {
    Documents(Vec<DocumentSummary>),
    Versions(Vec<Version>),
}

#[derive(Default)]
struct TreeState {
    projects: Vec<Project>,
    filter: String,
    disclosure: HashMap<NodeKey, Disclosure>,
    documents: HashMap<String, Vec<DocumentSummary>>,
    versions: HashMap<String, Vec<Version>>,
    in_flight: HashSet<NodeKey>,
}

impl TreeState {
    fn disclosure(&self, node: &NodeKey) -> Disclosure {
        self.disclosure.get(node).copied().unwrap_or_default()
    }

    fn matches_filter(&self, project: &Project) -> bool {
        let needle = self.filter.to_lowercase();
        needle.is_empty()
            || project.project_id.to_lowercase().contains(&needle)
            || project
                .project_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
    }
}

pub struct TreeController {
    gateway: Rc<dyn RemoteGateway>,
    notifier: Rc<dyn Notifier>,
    store: UiStateStore,
    state: RefCell<TreeState>,
}

impl TreeController {
    pub fn new(
        gateway: Rc<dyn RemoteGateway>,
        notifier: Rc<dyn Notifier>,
        store: UiStateStore,
    ) -> Self {
        Self {
            gateway,
            notifier,
            store,
            state: RefCell::new(TreeState::default()),
        }
    }

    fn report<T>(&self, result: Result<T, UiError>) -> Result<T, UiError> {
        if let Err(err) = &result {
            log::warn!("{err}");
            self.notifier.notice(err.notice());
        }
        result
    }

    pub fn visible_projects(&self) -> Vec<ProjectRow> {
        let state = self.state.borrow();
        state
            .projects
            .iter()
            .filter(|project| state.matches_filter(project))
            .map(|project| ProjectRow {
                project: project.clone(),
                expanded: state.disclosure(&NodeKey::Project(project.project_id.clone()))
                    == Disclosure::Expanded,
            })
            .collect()
    }

    pub fn disclosure(&self, node: &NodeKey) -> Disclosure {
        self.state.borrow().disclosure(node)
    }

    pub fn is_expanded(&self, node: &NodeKey) -> bool {
        self.disclosure(node) == Disclosure::Expanded
    }

    pub fn documents(&self, project_id: &str) -> Vec<DocumentSummary> {
        self.state
            .borrow()
            .documents
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn version_rows(&self, doc_base_id: &str) -> Vec<VersionRow> {
        self.state
            .borrow()
            .versions
            .get(doc_base_id)
            .map(|versions| versions.iter().map(VersionRow::from).collect())
            .unwrap_or_default()
    }

    pub async fn load_projects(&self) -> Result<(), UiError> {
        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway.list_projects().await
        };
        let projects = self.report(result.map_err(|e| UiError::network("Load projects", e)))?;
        self.state.borrow_mut().projects = projects;
        self.store.touch();
        Ok(())
    }

    pub async fn toggle(&self, node: NodeKey) -> Result<(), UiError> {
        {
            let mut state = self.state.borrow_mut();
            if state.in_flight.contains(&node) {
                log::debug!("{node:?} is already loading");
                return Ok(());
            }
            if state.disclosure(&node) == Disclosure::Expanded {
                state.disclosure.insert(node, Disclosure::Collapsed);
                drop(state);
                self.store.touch();
                return Ok(());
            }
        }
        self.expand(node).await
    }

    async fn expand(&self, node: NodeKey) -> Result<(), UiError> {
        self.reload(&node).await?;
        log::debug!("expanded {node:?}");
        self.state
            .borrow_mut()
            .disclosure
            .insert(node, Disclosure::Expanded);
        self.store.touch();
        Ok(())
    }

    // Disclosure is left as the user set it.
    async fn reload(&self, node: &NodeKey) -> Result<(), UiError> {
        self.state.borrow_mut().in_flight.insert(node.clone());
        let result = {
            let _loading = self.store.acquire_loading();
            self.fetch_children(node).await
        };
        self.state.borrow_mut().in_flight.remove(node);
        let children = self.report(result)?;

        {
            let mut state = self.state.borrow_mut();
            let id = node.id().to_string();
            match children {
                Children::Documents(docs) => {
                    state.documents.insert(id, docs);
                }
                Children::Versions(versions) => {
                    state.versions.insert(id, versions);
                }
            }
        }
        self.store.touch();
        Ok(())
    }

    async fn fetch_children(&self, node: &NodeKey) -> Result<Children, UiError> {
        match node {
            NodeKey::Project(id) => self
                .gateway
                .list_documents(id)
                .await
                .map(Children::Documents)
                .map_err(|e| UiError::network("Load documents", e)),
            NodeKey::Document(id) => self
                .gateway
                .list_versions(id)
                .await
                .map(|versions| {
                    Children::Versions(versions.into_iter().filter(|v| !v.deleted).collect())
                })
                .map_err(|e| UiError::network("Load versions", e)),
        }
    }

    pub fn filter(&self, search_text: &str) {
        self.state.borrow_mut().filter = search_text.to_string();
        self.store.touch();
    }

    pub async fn delete_version(&self, doc_base_id: &str, version_id: &str) -> Result<bool, UiError> {
        let row = self
            .version_rows(doc_base_id)
            .into_iter()
            .find(|row| row.version_id == version_id);
        let label = match row {
            Some(row) if !row.deletable => {
                return self.report(Err(UiError::validation(
                    "The latest version cannot be deleted",
                )));
            }
            Some(row) => row.label,
            None => version_id.to_string(),
        };
        if !self
            .notifier
            .confirm(&format!("Delete version {label}?"))
            .await
        {
            return Ok(false);
        }

        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway.soft_delete_version(version_id).await
        };
        self.report(result.map_err(|e| UiError::network("Delete version", e)))?;
        self.reload(&NodeKey::Document(doc_base_id.to_string()))
            .await?;
        Ok(true)
    }

    pub async fn create_project(&self, project_id: &str, project_name: &str) -> Result<(), UiError> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return self.report(Err(UiError::validation("Enter a project id")));
        }
        let project_name = Some(project_name.trim()).filter(|name| !name.is_empty());

        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway.create_project(project_id, project_name).await
        };
        self.report(result.map_err(|e| UiError::network("Create project", e)))?;
        self.load_projects().await
    }

    pub async fn upload_document(
        &self,
        project_id: &str,
        file: UploadFile,
        doc_base_id: Option<&str>,
    ) -> Result<UploadReceipt, UiError> {
        if file.name.trim().is_empty() {
            return self.report(Err(UiError::validation("Choose a file to upload")));
        }
        if !file.name.to_ascii_lowercase().ends_with(".docx") {
            return self.report(Err(UiError::validation("Only .docx files are supported")));
        }

        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway
                .upload_document(project_id, file, doc_base_id)
                .await
        };
        let receipt = self.report(result.map_err(|e| UiError::network("Upload document", e)))?;

        let project = NodeKey::Project(project_id.to_string());
        if self.is_expanded(&project) {
            self.reload(&project).await?;
        }
        if let Some(doc_base_id) = doc_base_id {
            let document = NodeKey::Document(doc_base_id.to_string());
            if self.is_expanded(&document) {
                self.reload(&document).await?;
            }
        }
        Ok(receipt)
    }

    pub fn focus_version(&self, project_id: &str, doc_base_id: &str) {
        self.store
            .set_project_context(Some(project_id.to_string()), Some(doc_base_id.to_string()));
    }
}
