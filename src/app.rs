//! Chat UI state.

use crate::openai::{self, WorkerReply};
use crate::rag::RagSystem;
use crate::tools::EvidenceItem;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

pub struct App {
    /// Line being typed.
    pub input: String,
    pub last_submitted: String,
    pub answer: Option<String>,
    /// Sources cited by the current answer.
    pub sources: Vec<EvidenceItem>,
    pub error: Option<String>,
    /// A question is in flight.
    pub pending: bool,
    pub started: Instant,
    /// Courses available when the UI started.
    pub course_titles: Vec<String>,
    poll_interval_ms: u64,
    tx: Sender<String>,
    rx: Receiver<WorkerReply>,
}

impl App {
    /// Spawn the query worker and build the UI state around it.
    pub fn new(system: Arc<RagSystem>) -> Self {
        let (tx_question, rx_question) = mpsc::channel::<String>();
        let (tx_reply, rx_reply) = mpsc::channel::<WorkerReply>();
        let course_titles = system.course_analytics().course_titles;
        let poll_interval_ms = system.config().poll_interval_ms;
        openai::start_rag_worker(rx_question, tx_reply, system);
        Self::from_channels(tx_question, rx_reply, course_titles, poll_interval_ms)
    }

    /// UI state over existing channels; the caller owns the other ends.
    pub fn from_channels(
        tx: Sender<String>,
        rx: Receiver<WorkerReply>,
        course_titles: Vec<String>,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            input: String::new(),
            last_submitted: String::from("(nothing yet)"),
            answer: None,
            sources: Vec::new(),
            error: None,
            pending: false,
            started: Instant::now(),
            course_titles,
            poll_interval_ms,
            tx,
            rx,
        }
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Send the typed question to the worker. Ignored while one is pending
    /// or when the input is blank.
    pub fn submit(&mut self) {
        if self.input.trim().is_empty() || self.pending {
            return;
        }
        self.last_submitted = std::mem::take(&mut self.input);
        self.answer = None;
        self.sources.clear();
        self.error = None;
        info!(target: "app", "submit_question: {}", self.last_submitted);
        if self.tx.send(self.last_submitted.clone()).is_err() {
            self.error = Some("query worker has stopped".to_string());
            return;
        }
        self.pending = true;
    }

    /// Pick up a reply if the worker has one ready.
    pub fn check_worker_reply(&mut self) {
        let Ok(reply) = self.rx.try_recv() else { return };
        self.pending = false;
        match reply {
            WorkerReply::Answer(a) => {
                info!(target: "app", sources = a.sources.len(), "answer_received");
                self.answer = Some(a.answer);
                self.sources = a.sources;
            }
            WorkerReply::Error(e) => {
                info!(target: "app", "error_received: {}", e);
                self.error = Some(e);
            }
        }
    }

    pub fn elapsed_time(&self) -> Duration {
        self.started.elapsed()
    }
}
