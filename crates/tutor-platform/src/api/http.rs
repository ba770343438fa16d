//! REST adapter for the tutor backend.
//!
//! Uses browser `fetch()` via gloo-net for WASM compatibility. Bodies are
//! camelCase JSON; an optional bearer token is sent with every request.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use tutor_core::ports::TutorApiPort;
use tutor_types::{
    AgentId, Result, TutorError,
    config::ApiConfig,
    pulse::{PulseContextType, PulseHistory, PulseSubmission},
    session::{
        Agent, Conversation, ConversationDetail, SendMessageRequest, SendMessageResponse,
        Session, SessionBundle, TutorMode,
    },
};

pub struct HttpTutorApi {
    config: ApiConfig,
    base_url: String,
}

impl HttpTutorApi {
    pub fn new(config: ApiConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self { config, base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Accept", "application/json");
        match self.config.auth_token.as_deref() {
            Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .authorize(Request::get(&self.url(path)))
            .send()
            .await
            .map_err(|e| TutorError::Network(e.to_string()))?;
        read_json(response).await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self
            .authorize(Request::put(&self.url(path)))
            .json(body)
            .map_err(|e| TutorError::Serialization(e.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|e| TutorError::Network(e.to_string()))?;
        read_json(response).await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Response> {
        let request = self
            .authorize(Request::post(&self.url(path)))
            .json(body)
            .map_err(|e| TutorError::Serialization(e.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|e| TutorError::Network(e.to_string()))?;
        ensure_ok(response).await
    }
}

#[async_trait(?Send)]
impl TutorApiPort for HttpTutorApi {
    async fn get_session_bundle(&self) -> Result<SessionBundle> {
        self.get("/tutor/session").await
    }

    async fn set_mode(&self, mode: TutorMode) -> Result<Session> {
        self.put("/tutor/session/mode", &json!({ "mode": mode })).await
    }

    async fn set_active_agent(&self, agent_id: AgentId) -> Result<Session> {
        self.put("/tutor/session/active-agent", &json!({ "agentId": agent_id }))
            .await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.get("/tutor/conversations").await
    }

    async fn get_conversation(&self, agent_id: AgentId) -> Result<ConversationDetail> {
        self.get(&conversation_path(agent_id)).await
    }

    async fn clear_conversation(&self, agent_id: AgentId) -> Result<()> {
        let response = self
            .authorize(Request::delete(&self.url(&conversation_path(agent_id))))
            .send()
            .await
            .map_err(|e| TutorError::Network(e.to_string()))?;
        ensure_ok(response).await?;
        log::info!("Cleared conversation with agent {}", agent_id);
        Ok(())
    }

    async fn send_message(
        &self,
        agent_id: AgentId,
        req: SendMessageRequest,
    ) -> Result<SendMessageResponse> {
        let path = format!("{}/messages", conversation_path(agent_id));
        let response = self.post(&path, &req).await?;
        response
            .json()
            .await
            .map_err(|e| TutorError::Serialization(e.to_string()))
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.get("/tutor/agents").await
    }

    async fn log_pulse(&self, submission: PulseSubmission) -> Result<()> {
        // The created record is echoed back; nothing reads it.
        self.post("/emotional-pulse", &submission).await?;
        Ok(())
    }

    async fn pulse_history(
        &self,
        context: PulseContextType,
        agent_id: Option<AgentId>,
        limit: u32,
    ) -> Result<PulseHistory> {
        self.get(&pulse_history_path(context, agent_id, limit)).await
    }
}

// ─── Paths ───────────────────────────────────────────────────

pub fn conversation_path(agent_id: AgentId) -> String {
    format!("/tutor/conversations/{}", agent_id)
}

pub fn pulse_history_path(
    context: PulseContextType,
    agent_id: Option<AgentId>,
    limit: u32,
) -> String {
    let mut path = format!("/emotional-pulse/history?context={}", context.as_str());
    if let Some(agent_id) = agent_id {
        path.push_str(&format!("&agentId={}", agent_id));
    }
    path.push_str(&format!("&limit={}", limit));
    path
}

// ─── Response handling ───────────────────────────────────────

async fn ensure_ok(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    ensure_ok(response)
        .await?
        .json()
        .await
        .map_err(|e| TutorError::Serialization(e.to_string()))
}

/// Map a non-2xx response to `TutorError::Api`, preferring the backend's
/// own `error`/`message` field over the raw body.
pub fn api_error(status: u16, body: &str) -> TutorError {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["error", "message"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    let message = match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("HTTP {}", status),
    };
    log::warn!("Tutor API returned {}: {}", status, message);
    TutorError::Api { status, message }
}
