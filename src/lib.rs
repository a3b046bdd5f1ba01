pub mod app;
pub mod citations;
pub mod config;
pub mod event;
pub mod index;
pub mod openai;
pub mod rag;
pub mod session;
pub mod tools;
pub mod ui;

pub use citations::{extract_citation_numbers, filter_cited_sources};
pub use config::Config;
pub use index::{CourseIndex, SearchRequest, SearchResults, SqliteCourseIndex};
pub use openai::{AiGenerator, InferenceClient, OpenAiClient};
pub use rag::{CourseAnalytics, QueryAnswer, RagSystem};
pub use session::SessionManager;
pub use tools::{EvidenceItem, Tool, ToolDefinition, ToolOutput, ToolRegistry};

use color_eyre::Result;
use crossterm::event::{self as crossterm_event, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::Duration;

// Ensure .env is loaded for tests before anything else runs in the test process.
#[cfg(test)]
#[ctor::ctor]
fn load_dotenv_for_tests() {
    let _ = dotenvy::dotenv();
}

/// Run the chat UI until the user quits.
pub fn run(mut terminal: DefaultTerminal, mut app: app::App) -> Result<()> {
    let poll = Duration::from_millis(app.poll_interval_ms());
    loop {
        app.check_worker_reply();
        terminal.draw(|f| ui::render(f, &app))?;

        if crossterm_event::poll(poll)? {
            match crossterm_event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if event::handle_key(&mut app, key)? {
                        break;
                    }
                }
                // redrawn on the next pass
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }
    Ok(())
}
