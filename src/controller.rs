use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::backend::{AskResponse, StatusResponse};
use crate::error::SubmitRejected;
use crate::history::{HistoryRecord, HistoryStore};
use crate::view_model::{self, OrderMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Ready,
    NotReady(String),
    Error(String),
}

impl BackendStatus {
    pub fn label(&self) -> String {
        match self {
            BackendStatus::Checking => "Checking backend...".to_string(),
            BackendStatus::Ready => "Backend ready".to_string(),
            BackendStatus::NotReady(message) => format!("Backend not ready: {message}"),
            BackendStatus::Error(message) => format!("Backend unavailable: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
}

/// The answer currently on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub inference_time: String,
}

pub struct Controller {
    status: BackendStatus,
    phase: Phase,
    input: String,
    answer: Option<Answer>,
    notice: Option<String>,
    order: OrderMode,
    confirming_clear: bool,
    history: HistoryStore,
}

impl Controller {
    pub fn new(history: HistoryStore) -> Self {
        Controller {
            status: BackendStatus::Checking,
            phase: Phase::Idle,
            input: String::new(),
            answer: None,
            notice: None,
            order: OrderMode::default(),
            confirming_clear: false,
            history,
        }
    }

    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn order(&self) -> OrderMode {
        self.order
    }

    pub fn is_confirming_clear(&self) -> bool {
        self.confirming_clear
    }

    pub fn history_view(&self) -> Vec<&HistoryRecord> {
        view_model::recompute(self.history.records(), self.order)
    }

    pub fn set_input(&mut self, value: String) {
        self.input = value;
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.status == BackendStatus::Ready && self.phase == Phase::Idle
    }

    pub fn begin_status_check(&mut self) {
        self.status = BackendStatus::Checking;
    }

    pub fn status_resolved<E: Display>(&mut self, result: Result<StatusResponse, E>) {
        self.status = match result {
            Ok(response) if response.is_ready() => BackendStatus::Ready,
            Ok(response) => BackendStatus::NotReady(
                response.message.unwrap_or_else(|| format!("status is \"{}\"", response.status)),
            ),
            Err(e) => {
                warn!(error = %e, "status check failed");
                BackendStatus::Error(e.to_string())
            }
        };
        info!(status = ?self.status, "backend status resolved");
    }

    /// Moves to `Loading` and returns the question to dispatch.
    pub fn begin_submit(&mut self) -> Result<String, SubmitRejected> {
        if self.phase == Phase::Loading {
            return Err(SubmitRejected::Busy);
        }
        if self.status != BackendStatus::Ready {
            return Err(SubmitRejected::NotReady);
        }
        let question = self.input.trim();
        if question.is_empty() {
            self.notice = Some(SubmitRejected::EmptyInput.to_string());
            return Err(SubmitRejected::EmptyInput);
        }

        let question = question.to_string();
        self.phase = Phase::Loading;
        self.answer = None;
        self.notice = None;
        debug!(%question, "submission started");
        Ok(question)
    }

    pub fn answer_received(&mut self, question: String, response: AskResponse, now_ms: i64) {
        self.phase = Phase::Idle;
        self.history.append(HistoryRecord {
            question: question.clone(),
            answer: response.answer.clone(),
            inference_time: response.inference_time.clone(),
            timestamp: now_ms,
        });
        self.answer = Some(Answer {
            question,
            text: response.answer,
            inference_time: response.inference_time,
        });
    }

    pub fn ask_failed<E: Display>(&mut self, error: E) {
        warn!(error = %error, "question failed");
        self.phase = Phase::Idle;
        self.notice = Some(format!("Error: {error}"));
    }

    pub fn set_order(&mut self, mode: OrderMode) {
        self.order = mode;
    }

    /// Shows a past answer, indexed by its position in the current view.
    pub fn select_history(&mut self, index: usize) {
        let selected = self.history_view().get(index).map(|record| Answer {
            question: record.question.clone(),
            text: record.answer.clone(),
            inference_time: record.inference_time.clone(),
        });
        if let Some(answer) = selected {
            self.answer = Some(answer);
            self.notice = None;
        }
    }

    pub fn request_clear(&mut self) {
        if !self.history.records().is_empty() {
            self.confirming_clear = true;
        }
    }

    pub fn cancel_clear(&mut self) {
        self.confirming_clear = false;
    }

    pub fn confirm_clear(&mut self) {
        if !self.confirming_clear {
            return;
        }
        self.confirming_clear = false;
        self.history.clear();
        info!("history cleared");
    }
}
