use std::sync::Arc;

use color_eyre::Result;
use course_rag::index::SqliteCourseIndex;
use course_rag::openai::{CompletionResponse, MessageContent};
use course_rag::tools::{EvidenceItem, SEARCH_TOOL_NAME};
use course_rag::{Config, RagSystem};
use serde_json::json;

mod common;
use common::{FailingClient, ScriptedClient, MCP_COURSE, RETRIEVAL_COURSE};

#[ctor::ctor]
fn _init() {
    common::init();
}

fn system_with(client: Arc<ScriptedClient>) -> Result<RagSystem> {
    let config = Config::new();
    let index = Arc::new(SqliteCourseIndex::in_memory(config.max_results)?);
    let system = RagSystem::new(config, index, client);
    system.add_course_from_text(MCP_COURSE)?;
    system.add_course_from_text(RETRIEVAL_COURSE)?;
    Ok(system)
}

fn search(id: &str, query: &str) -> CompletionResponse {
    CompletionResponse::tool_use(id, SEARCH_TOOL_NAME, json!({ "query": query, "course_name": "MCP" }))
}

#[tokio::test]
async fn answer_carries_only_cited_sources() -> Result<()> {
    let client = Arc::new(ScriptedClient::new(vec![
        search("c1", "protocol context servers tools"),
        CompletionResponse::text("MCP standardizes context [2]."),
    ]));
    let system = system_with(client.clone())?;

    let answer = system.query("What is MCP?", None).await?;

    assert_eq!(answer.answer, "MCP standardizes context [1].");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].citation_num, 1);
    assert!(answer.sources[0].title.starts_with("MCP: Build Rich-Context AI Apps with Anthropic - Lesson "));
    assert!(answer.sources[0].url.as_deref().is_some_and(|u| u.starts_with("https://example.com/mcp/lesson")));
    Ok(())
}

#[tokio::test]
async fn each_query_starts_citations_at_one() -> Result<()> {
    let client = Arc::new(ScriptedClient::new(vec![
        search("c1", "protocol"),
        CompletionResponse::text("First [1]."),
        search("c2", "protocol"),
        CompletionResponse::text("Second [1]."),
    ]));
    let system = system_with(client.clone())?;

    system.query("one", None).await?;
    system.query("two", None).await?;

    let requests = client.requests();
    let tool_result = |i: usize| match &requests[i].messages[2].content {
        MessageContent::ToolResults(r) => r[0].content.clone(),
        other => panic!("expected tool results, got {other:?}"),
    };
    assert!(tool_result(1).starts_with("[1] "));
    assert!(tool_result(3).starts_with("[1] "));
    Ok(())
}

#[tokio::test]
async fn session_history_feeds_the_next_query() -> Result<()> {
    let client = Arc::new(ScriptedClient::new(vec![
        CompletionResponse::text("Hello there."),
        CompletionResponse::text("You said hi."),
    ]));
    let system = system_with(client.clone())?;
    let session = system.create_session()?;

    system.query("hi", Some(&session)).await?;
    let second = system.query("what did I say?", Some(&session)).await?;

    assert_eq!(second.answer, "You said hi.");
    assert!(second.sources.is_empty());
    let requests = client.requests();
    assert!(!requests[0].system.contains("Previous conversation"));
    assert!(requests[1].system.ends_with("Previous conversation:\nUser: hi\nAssistant: Hello there."));
    Ok(())
}

#[tokio::test]
async fn endpoint_failure_reaches_the_caller() -> Result<()> {
    let config = Config::new();
    let index = Arc::new(SqliteCourseIndex::in_memory(5)?);
    let system = RagSystem::new(config, index, Arc::new(FailingClient));
    assert!(system.query("anything", None).await.is_err());
    Ok(())
}

#[test]
fn analytics_and_deletion() -> Result<()> {
    let system = system_with(Arc::new(ScriptedClient::new(vec![])))?;
    let analytics = system.course_analytics();
    assert_eq!(analytics.total_courses, 2);
    assert_eq!(
        analytics.course_titles,
        vec!["Advanced Retrieval for AI with Chroma", "MCP: Build Rich-Context AI Apps with Anthropic"]
    );

    assert!(system.delete_course("Advanced Retrieval for AI with Chroma")?);
    assert_eq!(system.course_analytics().total_courses, 1);
    assert!(system.add_course_from_text("Lesson 1: no title").is_err());
    Ok(())
}

#[test]
fn answer_serializes_for_display() -> Result<()> {
    let answer = course_rag::QueryAnswer {
        answer: "x [1]".into(),
        sources: vec![EvidenceItem { citation_num: 1, title: "T".into(), url: None }],
    };
    let v = serde_json::to_value(&answer)?;
    assert_eq!(v["sources"][0]["citation_num"], 1);
    Ok(())
}
