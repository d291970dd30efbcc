//! Human-readable strings for generated rows.
//!
//! The generators never care where text comes from. They talk to a
//! [`ContentSource`], which is either [`TemplateSource`] (local, deterministic)
//! or [`RemoteSource`] (a chat-completion service for a configurable share of
//! requests, with unconditional template fallback on any failure).
//!
//! Names of organizations, users, teams, projects, subtasks and attachments are
//! always template-generated; only task titles, descriptions and comments are
//! eligible for the remote service.

pub mod remote;
pub mod templates;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

pub use remote::RemoteSource;
pub use templates::TemplateSource;

use crate::config::SimConfig;
use crate::models::ProjectType;
use crate::rng::SimRng;

/// Length class of a task description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionShape {
    Empty,
    Short,
    Detailed,
}

impl DescriptionShape {
    /// 20% empty, 50% a single sentence, 30% multi-paragraph with bullets.
    pub fn draw(rng: &mut SimRng) -> Self {
        let roll: f64 = rng.r#gen();
        if roll < 0.2 {
            Self::Empty
        } else if roll < 0.7 {
            Self::Short
        } else {
            Self::Detailed
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Template generator for the strings that never go remote.
    fn templates(&self) -> &TemplateSource;

    async fn task_name(
        &self,
        rng: &mut SimRng,
        project_type: ProjectType,
        project_name: &str,
    ) -> String;

    async fn task_description(
        &self,
        rng: &mut SimRng,
        project_type: ProjectType,
        task_name: &str,
        shape: DescriptionShape,
    ) -> String;

    async fn comment(&self, rng: &mut SimRng, task_name: &str) -> String;
}

/// Pick the content source for a run.
///
/// A zero `llm_percentage` or a missing API key yields the template source, so
/// a given seed produces fully deterministic content.
pub fn select_source(config: &SimConfig) -> anyhow::Result<Box<dyn ContentSource>> {
    if config.llm_percentage == 0 {
        return Ok(Box::new(TemplateSource::new()));
    }
    match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(Box::new(RemoteSource::new(
            &config.api_url,
            key,
            &config.llm_model,
            config.llm_percentage,
            std::time::Duration::from_secs(config.request_timeout_secs),
        )?)),
        _ => {
            warn!(
                llm_percentage = config.llm_percentage,
                "No API key configured, using template content only"
            );
            Ok(Box::new(TemplateSource::new()))
        }
    }
}
