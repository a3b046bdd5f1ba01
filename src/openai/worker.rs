//! Background query worker (runs on its own thread, apart from the TUI).

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{error, info, warn};

use crate::rag::{QueryAnswer, RagSystem};

/// What the worker sends back for each question.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReply {
    Answer(QueryAnswer),
    Error(String),
}

/// Start the worker. Questions arrive on `rx_question`; one reply per
/// question goes out on `tx_reply`. All questions share one chat session.
/// The thread exits when either channel is closed.
pub fn start_rag_worker(rx_question: Receiver<String>, tx_reply: Sender<WorkerReply>, system: Arc<RagSystem>) {
    std::thread::spawn(move || {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!(target: "worker", "tokio runtime unavailable: {e}");
                let _ = tx_reply.send(WorkerReply::Error(format!("worker failed to start: {e}")));
                return;
            }
        };
        rt.block_on(async move {
            let session = match system.create_session() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(target: "worker", "running without session history: {e}");
                    None
                }
            };

            while let Ok(question) = rx_question.recv() {
                info!(target: "worker", "question_received: {}", question);
                let reply = match system.query(&question, session.as_deref()).await {
                    Ok(answer) => {
                        info!(target: "worker", sources = answer.sources.len(), "answer_ready");
                        WorkerReply::Answer(answer)
                    }
                    Err(e) => {
                        error!(target: "worker", "query_error: {e:#}");
                        WorkerReply::Error(format!("API error: {e}"))
                    }
                };
                if tx_reply.send(reply).is_err() {
                    break;
                }
            }
        });
    });
}
