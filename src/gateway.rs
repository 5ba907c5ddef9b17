use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::GatewayError;
use crate::model::{
    wire_id, Answer, DocumentSummary, Message, Project, UploadReceipt, UploadFile, Version,
};

pub type GatewayResult<T> = Result<T, GatewayError>;

#[async_trait(?Send)]
pub trait RemoteGateway {
    async fn create_project(&self, project_id: &str, project_name: Option<&str>)
        -> GatewayResult<Project>;
    async fn list_projects(&self) -> GatewayResult<Vec<Project>>;
    async fn upload_document(
        &self,
        project_id: &str,
        file: UploadFile,
        doc_base_id: Option<&str>,
    ) -> GatewayResult<UploadReceipt>;
    async fn list_documents(&self, project_id: &str) -> GatewayResult<Vec<DocumentSummary>>;
    async fn list_versions(&self, doc_base_id: &str) -> GatewayResult<Vec<Version>>;
    async fn soft_delete_version(&self, version_id: &str) -> GatewayResult<()>;
    async fn create_chat_session(&self, version_id: &str) -> GatewayResult<String>;
    async fn send_message(&self, session_id: &str, query: &str) -> GatewayResult<Answer>;
    async fn chat_history(&self, session_id: &str) -> GatewayResult<Vec<Message>>;
    async fn api_key(&self) -> GatewayResult<Option<String>>;
    async fn set_api_key(&self, api_key: &str) -> GatewayResult<()>;
}

#[derive(Deserialize)]
struct ProjectList {
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct DocumentList {
    documents: Vec<DocumentSummary>,
}

#[derive(Deserialize)]
struct VersionList {
    versions: Vec<Version>,
}

#[derive(Deserialize)]
struct MessageList {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct CreatedSession {
    #[serde(deserialize_with = "wire_id")]
    session_id: String,
}

#[derive(Deserialize)]
struct ApiKey {
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(text),
            }) => text,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string(),
            Err(_) => body,
        };
        Err(GatewayError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }
}

#[async_trait(?Send)]
impl RemoteGateway for HttpGateway {
    async fn create_project(
        &self,
        project_id: &str,
        project_name: Option<&str>,
    ) -> GatewayResult<Project> {
        let mut query = vec![("project_id", project_id)];
        if let Some(name) = project_name {
            query.push(("project_name", name));
        }
        let request = self.client.post(self.url("/projects/")).query(&query);
        self.send(request).await?;
        Ok(Project {
            project_id: project_id.to_string(),
            project_name: project_name.map(str::to_string),
        })
    }

    async fn list_projects(&self) -> GatewayResult<Vec<Project>> {
        let list: ProjectList = self.json(self.client.get(self.url("/projects/"))).await?;
        Ok(list.projects)
    }

    async fn upload_document(
        &self,
        project_id: &str,
        file: UploadFile,
        doc_base_id: Option<&str>,
    ) -> GatewayResult<UploadReceipt> {
        let mut query = vec![("project_id", project_id)];
        if let Some(doc_base_id) = doc_base_id {
            query.push(("doc_base_id", doc_base_id));
        }
        let part = Part::bytes(file.bytes).file_name(file.name);
        let request = self
            .client
            .post(self.url("/documents/upload/"))
            .query(&query)
            .multipart(Form::new().part("file", part));
        self.json(request).await
    }

    async fn list_documents(&self, project_id: &str) -> GatewayResult<Vec<DocumentSummary>> {
        let url = self.url(&format!("/documents/{project_id}"));
        let list: DocumentList = self.json(self.client.get(url)).await?;
        Ok(list.documents)
    }

    async fn list_versions(&self, doc_base_id: &str) -> GatewayResult<Vec<Version>> {
        let url = self.url(&format!("/documents/{doc_base_id}/versions"));
        let list: VersionList = self.json(self.client.get(url)).await?;
        Ok(list.versions)
    }

    async fn soft_delete_version(&self, version_id: &str) -> GatewayResult<()> {
        let url = self.url(&format!("/versions/{version_id}"));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn create_chat_session(&self, version_id: &str) -> GatewayResult<String> {
        let request = self
            .client
            .post(self.url("/chat/sessions/"))
            .query(&[("version_id", version_id)]);
        let created: CreatedSession = self.json(request).await?;
        Ok(created.session_id)
    }

    async fn send_message(&self, session_id: &str, query: &str) -> GatewayResult<Answer> {
        let request = self
            .client
            .post(self.url(&format!("/chat/{session_id}/messages")))
            .query(&[("query", query)]);
        self.json(request).await
    }

    async fn chat_history(&self, session_id: &str) -> GatewayResult<Vec<Message>> {
        let url = self.url(&format!("/chat/{session_id}/messages"));
        let list: MessageList = self.json(self.client.get(url)).await?;
        Ok(list.messages)
    }

    async fn api_key(&self) -> GatewayResult<Option<String>> {
        let key: ApiKey = self
            .json(self.client.get(self.url("/settings/api-key")))
            .await?;
        Ok(key.api_key.filter(|k| !k.trim().is_empty()))
    }

    async fn set_api_key(&self, api_key: &str) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url("/settings/api-key"))
            .query(&[("api_key", api_key)]);
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_joined_without_double_slash() {
        let gateway = HttpGateway::new("http://127.0.0.1:8000/api/");
        assert_eq!(
            gateway.url("/documents/7/versions"),
            "http://127.0.0.1:8000/api/documents/7/versions"
        );
    }

    #[test]
    fn session_id_accepts_integer() {
        let created: CreatedSession = serde_json::from_str(r#"{"session_id": 12}"#).unwrap();
        assert_eq!(created.session_id, "12");
    }
}
