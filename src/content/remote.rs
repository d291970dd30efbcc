//! Remote chat-completion content with template fallback.
//!
//! One attempt per request, bounded by the client timeout. Every failure mode is
//! folded into [`ContentError`], logged at `warn`, and answered from templates.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ContentSource, DescriptionShape, TemplateSource};
use crate::errors::ContentError;
use crate::models::ProjectType;
use crate::rng::SimRng;

pub const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Remote titles longer than this are discarded in favour of a template.
const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2_000;
const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct RemoteSource {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    /// Share of eligible requests (0-100) sent to the remote service.
    percentage: u8,
    fallback: TemplateSource,
}

impl RemoteSource {
    pub fn new(
        api_url: &str,
        api_key: &str,
        model: &str,
        percentage: u8,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for remote content")?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            percentage: percentage.min(100),
            fallback: TemplateSource::new(),
        })
    }

    fn should_use_remote(&self, rng: &mut SimRng) -> bool {
        self.percentage > 0 && rng.r#gen::<f64>() * 100.0 < f64::from(self.percentage)
    }

    /// Single chat-completion attempt.
    async fn complete(
        &self,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, ContentError> {
        if self.api_key.is_empty() {
            return Err(ContentError::MissingApiKey);
        }
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "worksim seed data generator")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                code: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ContentError::EmptyCompletion)
    }

    /// Run a completion and reduce any failure to `None`, logging why.
    async fn attempt(
        &self,
        kind: &str,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Option<String> {
        match self.complete(prompt, temperature, max_tokens).await {
            Ok(text) => {
                debug!(kind, chars = text.len(), "Remote content generated");
                Some(text)
            }
            Err(err) => {
                warn!(kind, error = %err, "Remote content failed, using template fallback");
                None
            }
        }
    }
}

fn strip_quotes(text: &str) -> String {
    text.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

fn title_prompt(project_type: ProjectType, project_name: &str) -> String {
    match project_type {
        ProjectType::Engineering => format!(
            "Generate a concise task title for an engineering team.\n\
             Project: {}\n\n\
             Examples:\n\
             - \"Auth API - Fix token refresh bug\"\n\
             - \"Frontend UI - Add pagination to user list\"\n\
             - \"Database Layer - Optimize query performance\"\n\n\
             Generate ONE task title (3-8 words), format: \"[Component] - [Action] [Detail]\"\n\
             Task title:",
            if project_name.is_empty() { "Platform Development" } else { project_name }
        ),
        ProjectType::Marketing => format!(
            "Generate a concise task title for a marketing team.\n\
             Project: {}\n\n\
             Examples:\n\
             - \"Product Launch - Create landing page\"\n\
             - \"Brand Awareness - Write blog posts\"\n\
             - \"Lead Generation - Design email campaign\"\n\n\
             Generate ONE task title (3-8 words), format: \"[Campaign] - Create [Deliverable]\"\n\
             Task title:",
            if project_name.is_empty() { "Q1 Campaign" } else { project_name }
        ),
        ProjectType::Ops => format!(
            "Generate a concise task title for an operations team.\n\
             Project: {}\n\n\
             Examples:\n\
             - \"Update onboarding process\"\n\
             - \"Review vendor contracts\"\n\
             - \"Setup new workspace\"\n\n\
             Generate ONE task title (3-6 words)\n\
             Task title:",
            if project_name.is_empty() { "Process Improvement" } else { project_name }
        ),
    }
}

fn description_prompt(task_name: &str, shape: DescriptionShape) -> (String, u32) {
    match shape {
        DescriptionShape::Detailed => (
            format!(
                "Write a detailed task description for: \"{}\"\n\n\
                 Include:\n\
                 1. Brief overview (1-2 sentences)\n\
                 2. Acceptance criteria (2-4 bullet points)\n\n\
                 Format:\n\
                 [Overview paragraph]\n\n\
                 Acceptance Criteria:\n\
                 - [Criterion 1]\n\
                 - [Criterion 2]\n\n\
                 Description:",
                task_name
            ),
            250,
        ),
        _ => (
            format!(
                "Write a brief 1-2 sentence task description for: \"{}\"\n\
                 Keep it concise and professional.\n\
                 Description:",
                task_name
            ),
            100,
        ),
    }
}

fn comment_prompt(task_name: &str) -> String {
    format!(
        "Write a brief realistic comment a team member might leave on task: \"{}\"\n\n\
         Examples:\n\
         - \"Looks good, approved!\"\n\
         - \"Can you clarify the requirements?\"\n\
         - \"This is blocked by X\"\n\n\
         Generate ONE short comment (1-2 sentences):\n\
         Comment:",
        task_name
    )
}

#[async_trait]
impl ContentSource for RemoteSource {
    fn templates(&self) -> &TemplateSource {
        &self.fallback
    }

    async fn task_name(
        &self,
        rng: &mut SimRng,
        project_type: ProjectType,
        project_name: &str,
    ) -> String {
        if !self.should_use_remote(rng) {
            return self.fallback.task_name_for(rng, project_type);
        }
        let temperature = rng.gen_range(0.7..=1.0);
        let prompt = title_prompt(project_type, project_name);
        match self.attempt("task_name", &prompt, temperature, 50).await {
            Some(text) => {
                let title = strip_quotes(&text);
                if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
                    self.fallback.task_name_for(rng, project_type)
                } else {
                    title
                }
            }
            None => self.fallback.task_name_for(rng, project_type),
        }
    }

    async fn task_description(
        &self,
        rng: &mut SimRng,
        _project_type: ProjectType,
        task_name: &str,
        shape: DescriptionShape,
    ) -> String {
        if shape == DescriptionShape::Empty || !self.should_use_remote(rng) {
            return self.fallback.description_for(rng, shape);
        }
        let (prompt, max_tokens) = description_prompt(task_name, shape);
        match self.attempt("task_description", &prompt, 0.8, max_tokens).await {
            Some(text) => text.chars().take(MAX_DESCRIPTION_CHARS).collect(),
            None => self.fallback.description_for(rng, shape),
        }
    }

    async fn comment(&self, rng: &mut SimRng, task_name: &str) -> String {
        if !self.should_use_remote(rng) {
            return self.fallback.comment_text(rng);
        }
        let prompt = comment_prompt(task_name);
        match self.attempt("comment", &prompt, 0.9, 50).await {
            Some(text) => {
                let comment = strip_quotes(&text);
                if comment.is_empty() {
                    self.fallback.comment_text(rng)
                } else {
                    comment.chars().take(MAX_COMMENT_CHARS).collect()
                }
            }
            None => self.fallback.comment_text(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = header_end(&buf) {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
    }

    /// Serve exactly one canned HTTP response and return the URL to hit.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/api/v1/chat/completions", addr)
    }

    fn completion(text: &str) -> String {
        serde_json::json!({ "choices": [{ "message": { "content": text } }] }).to_string()
    }

    fn source(url: &str, timeout: Duration) -> RemoteSource {
        RemoteSource::new(url, "sk-test", "test/model", 100, timeout).unwrap()
    }

    #[tokio::test]
    async fn uses_remote_title_when_service_succeeds() {
        let url = serve_once("200 OK", completion("\"Search Engine - Fix ranking bug\"")).await;
        let remote = source(&url, Duration::from_secs(5));
        let title = remote
            .task_name(&mut seeded(1), ProjectType::Engineering, "Search")
            .await;
        assert_eq!(title, "Search Engine - Fix ranking bug");
    }

    #[tokio::test]
    async fn falls_back_on_error_status() {
        let url = serve_once("500 Internal Server Error", "{}".to_string()).await;
        let remote = source(&url, Duration::from_secs(5));
        let title = remote.task_name(&mut seeded(2), ProjectType::Ops, "").await;
        assert!(title.ends_with(" process"), "got {title}");
    }

    #[tokio::test]
    async fn falls_back_when_service_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let remote = source(&format!("http://{}/", addr), Duration::from_secs(5));
        let comment = remote.comment(&mut seeded(3), "Anything").await;
        assert!(!comment.is_empty());
    }

    #[tokio::test]
    async fn falls_back_on_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let remote = source(&format!("http://{}/", addr), Duration::from_millis(200));
        let description = remote
            .task_description(
                &mut seeded(4),
                ProjectType::Marketing,
                "Launch",
                DescriptionShape::Short,
            )
            .await;
        assert!(description.ends_with('.'));
    }

    #[tokio::test]
    async fn overlong_title_falls_back_to_template() {
        let url = serve_once("200 OK", completion(&"word ".repeat(40))).await;
        let remote = source(&url, Duration::from_secs(5));
        let title = remote
            .task_name(&mut seeded(5), ProjectType::Marketing, "")
            .await;
        assert!(title.contains(" - Create "), "got {title}");
    }

    #[tokio::test]
    async fn empty_shape_never_calls_remote() {
        // Nothing listens on port 1; the empty shape must short-circuit first.
        let remote = source("http://127.0.0.1:1/", Duration::from_millis(100));
        let text = remote
            .task_description(&mut seeded(6), ProjectType::Ops, "x", DescriptionShape::Empty)
            .await;
        assert!(text.is_empty());
    }

    #[test]
    fn strip_quotes_trims_wrappers() {
        assert_eq!(strip_quotes("  \"Ready for review\" "), "Ready for review");
        assert_eq!(strip_quotes("'LGTM'"), "LGTM");
    }

    #[test]
    fn zero_percentage_never_goes_remote() {
        let remote = RemoteSource::new(OPENROUTER_CHAT_URL, "k", "m", 0, Duration::from_secs(1))
            .unwrap();
        let mut rng = seeded(7);
        assert!((0..100).all(|_| !remote.should_use_remote(&mut rng)));
    }
}
