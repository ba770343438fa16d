//! JS-facing tutor client.
//!
//! Every async operation returns a `Promise`. Reveal and cooldown tasks are
//! spawned here; the host page polls `viewState()` and `messages()` to
//! render.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::Promise;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use tutor_core::event_bus::EventBus;
use tutor_core::orchestrator::TutorOrchestrator;
use tutor_core::reveal::RevealJob;
use tutor_platform::api::HttpTutorApi;
use tutor_platform::random::JsRandom;
use tutor_platform::spawn::{spawn_cooldown, spawn_reveals};
use tutor_types::{
    AgentId, TutorError,
    config::TutorConfig,
    pulse::EmotionTag,
    session::{CollaborativeSettings, CoursePolicy, TutorMode},
};
use tutor_ui::state::ViewState;
use tutor_ui::thread::project_thread;

#[wasm_bindgen]
pub struct TutorClient {
    orchestrator: Rc<TutorOrchestrator>,
    view: Rc<RefCell<ViewState>>,
}

#[wasm_bindgen]
impl TutorClient {
    /// Build a client from a JSON `TutorConfig`. Missing fields take defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<TutorClient, JsValue> {
        let config = match config_json.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => TutorConfig::from_json(json).map_err(to_js)?,
            _ => TutorConfig::default(),
        };
        apply_log_level(&config.log_level);
        log::info!("Tutor client using backend at {}", config.api.base_url);

        let api = Rc::new(HttpTutorApi::new(config.api.clone()));
        let orchestrator = TutorOrchestrator::new(api, Rc::new(JsRandom), config, EventBus::new());
        Ok(TutorClient {
            orchestrator: Rc::new(orchestrator),
            view: Rc::new(RefCell::new(ViewState::new())),
        })
    }

    // ─── Session ─────────────────────────────────────────────

    /// Load the session. `forced_mode` comes from the course settings,
    /// `agent_id` from a deep link.
    pub fn load(&self, forced_mode: Option<String>, agent_id: Option<i32>) -> Promise {
        let policy = match forced_mode.as_deref().map(parse_mode).transpose() {
            Ok(forced_mode) => forced_mode.map(|m| CoursePolicy { forced_mode: Some(m) }),
            Err(e) => return Promise::reject(&e),
        };
        self.run(move |orch| async move {
            orch.load(policy, agent_id.map(AgentId::from), Utc::now()).await
        })
    }

    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&self, mode: String) -> Promise {
        let mode = match parse_mode(&mode) {
            Ok(mode) => mode,
            Err(e) => return Promise::reject(&e),
        };
        self.run(move |orch| async move { orch.set_mode(mode, Utc::now()).await })
    }

    #[wasm_bindgen(js_name = selectAgent)]
    pub fn select_agent(&self, agent_id: i32) -> Promise {
        self.run(move |orch| async move {
            orch.select_agent(AgentId::from(agent_id), Utc::now()).await
        })
    }

    #[wasm_bindgen(js_name = openThread)]
    pub fn open_thread(&self, agent_id: i32) -> Promise {
        self.run(move |orch| async move {
            orch.open_thread(AgentId::from(agent_id), Utc::now()).await
        })
    }

    #[wasm_bindgen(js_name = refreshAgents)]
    pub fn refresh_agents(&self) -> Promise {
        let orch = self.orchestrator.clone();
        future_to_promise(async move {
            orch.refresh_agents().await.map_err(to_js)?;
            let agents = orch.session_state().agents;
            to_js_value(&agents)
        })
    }

    pub fn mode(&self) -> String {
        self.orchestrator.session_state().mode.as_str().to_string()
    }

    pub fn agents(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.orchestrator.session_state().agents)
    }

    #[wasm_bindgen(js_name = welcomeMessage)]
    pub fn welcome_message(&self) -> Option<String> {
        self.orchestrator.welcome_message()
    }

    // ─── Conversations ───────────────────────────────────────

    /// Send a turn. `settings` is an optional `CollaborativeSettings` object.
    pub fn send(&self, text: String, settings: JsValue) -> Promise {
        let settings = match from_js_optional::<CollaborativeSettings>(settings) {
            Ok(settings) => settings,
            Err(e) => return Promise::reject(&e),
        };
        let orch = self.orchestrator.clone();
        let view = self.view.clone();
        future_to_promise(async move {
            let job = orch.send(&text, settings, Utc::now()).await.map_err(to_js)?;
            start_reveals(&orch, &view, job.into_iter().collect());
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = clearConversation)]
    pub fn clear_conversation(&self, agent_id: i32) -> Promise {
        let orch = self.orchestrator.clone();
        future_to_promise(async move {
            orch.clear_conversation(AgentId::from(agent_id))
                .await
                .map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = refreshConversations)]
    pub fn refresh_conversations(&self) -> Promise {
        let orch = self.orchestrator.clone();
        future_to_promise(async move {
            orch.refresh_conversations().await.map_err(to_js)?;
            let previews = orch.store().previews().to_vec();
            to_js_value(&previews)
        })
    }

    pub fn conversations(&self) -> Result<JsValue, JsValue> {
        let previews = self.orchestrator.store().previews().to_vec();
        to_js_value(&previews)
    }

    /// Messages of the open thread, with collaborative contributions cut
    /// to what has been revealed so far
    pub fn messages(&self) -> Result<JsValue, JsValue> {
        let view = self.sync_view();
        let entries = self.orchestrator.messages();
        to_js_value(&project_thread(&entries, &view))
    }

    #[wasm_bindgen(js_name = isSending)]
    pub fn is_sending(&self) -> bool {
        self.orchestrator.is_sending()
    }

    // ─── Emotional pulse ─────────────────────────────────────

    #[wasm_bindgen(js_name = submitPulse)]
    pub fn submit_pulse(&self, emotion: String) -> Promise {
        let emotion = match parse_enum::<EmotionTag>(&emotion) {
            Ok(emotion) => emotion,
            Err(e) => return Promise::reject(&e),
        };
        let orch = self.orchestrator.clone();
        future_to_promise(async move {
            let counter = orch.submit_pulse(emotion).await.map_err(to_js)?;
            spawn_cooldown(orch.clone());
            Ok(JsValue::from_f64(counter as f64))
        })
    }

    #[wasm_bindgen(js_name = pulseHistory)]
    pub fn pulse_history(&self) -> Promise {
        let orch = self.orchestrator.clone();
        future_to_promise(async move {
            let history = orch.pulse_history().await.map_err(to_js)?;
            to_js_value(&history)
        })
    }

    // ─── View ────────────────────────────────────────────────

    /// Drain pending events into the view state and return a snapshot
    #[wasm_bindgen(js_name = viewState)]
    pub fn view_state(&self) -> Result<JsValue, JsValue> {
        let view = self.sync_view();
        to_js_value(&view)
    }
}

impl TutorClient {
    fn sync_view(&self) -> ViewState {
        let events = self.orchestrator.event_bus().drain();
        let mut view = self.view.borrow_mut();
        if !events.is_empty() {
            view.process_events(events);
        }
        view.clone()
    }

    /// Run an operation that may hand back reveal jobs and start them.
    fn run<F, Fut>(&self, op: F) -> Promise
    where
        F: FnOnce(Rc<TutorOrchestrator>) -> Fut + 'static,
        Fut: std::future::Future<Output = tutor_types::Result<Vec<RevealJob>>> + 'static,
    {
        let orch = self.orchestrator.clone();
        let view = self.view.clone();
        future_to_promise(async move {
            let jobs = op(orch.clone()).await.map_err(to_js)?;
            start_reveals(&orch, &view, jobs);
            Ok(JsValue::UNDEFINED)
        })
    }
}

fn start_reveals(orch: &Rc<TutorOrchestrator>, view: &Rc<RefCell<ViewState>>, jobs: Vec<RevealJob>) {
    if jobs.is_empty() {
        return;
    }
    // Events emitted before the jobs were built belong before them.
    let events = orch.event_bus().drain();
    {
        let mut view = view.borrow_mut();
        view.process_events(events);
        for job in &jobs {
            view.begin_reveal(job);
        }
    }
    spawn_reveals(orch, jobs);
}

fn apply_log_level(level: &str) {
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => log::warn!("Unknown log level '{}', keeping the current one", level),
    }
}

fn parse_enum<T: DeserializeOwned>(raw: &str) -> Result<T, JsValue> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| to_js(TutorError::Other(format!("Unknown value: {}", raw))))
}

fn parse_mode(raw: &str) -> Result<TutorMode, JsValue> {
    parse_enum(raw)
}

fn from_js_optional<T: DeserializeOwned>(value: JsValue) -> Result<Option<T>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .into_serde()
        .map(Some)
        .map_err(|e| to_js(TutorError::from(e)))
}

fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|e| to_js(TutorError::from(e)))
}

fn to_js(e: TutorError) -> JsValue {
    JsValue::from_str(&e.to_string())
}
