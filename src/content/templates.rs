//! Local template content. Deterministic for a given random stream.

use async_trait::async_trait;
use rand::prelude::*;

use super::{ContentSource, DescriptionShape};
use crate::models::ProjectType;
use crate::rng::SimRng;

const FIRST_NAMES: &[&str] = &[
    "Aisha", "Ben", "Carla", "Dev", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas", "Kemi",
    "Liam", "Maya", "Nikhil", "Olga", "Pablo", "Quinn", "Rosa", "Sami", "Tara", "Uma", "Victor",
    "Wen", "Ximena", "Yusuf", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Bauer", "Chen", "Diaz", "Eriksen", "Fischer", "Garcia", "Haddad", "Ito", "Jensen",
    "Kowalski", "Lopez", "Mensah", "Nakamura", "Okafor", "Patel", "Quispe", "Rossi", "Silva",
    "Tanaka", "Umarov", "Varga", "Weber", "Xu", "Yilmaz", "Zhang",
];

const COMPANY_PREFIXES: &[&str] = &[
    "North", "Blue", "Bright", "Iron", "Silver", "Summit", "Clear", "Red", "Pine", "Harbor",
];

const COMPANY_SUFFIXES: &[&str] = &[
    "wind", "stone", "field", "path", "works", "bridge", "line", "wave", "point", "gate",
];

const COMPANY_KINDS: &[&str] = &["Labs", "Systems", "Group", "Digital", "Partners", "Software"];

const WORDS: &[&str] = &[
    "align", "roadmap", "customer", "metrics", "release", "scope", "quality", "feedback",
    "launch", "review", "budget", "timeline", "stakeholder", "process", "platform", "workflow",
    "insight", "priority", "handoff", "backlog", "design", "research", "rollout", "support",
    "update", "target", "pipeline", "report", "growth", "onboarding", "migration", "audit",
];

const BUZZ_VERBS: &[&str] = &[
    "Streamline", "Scale", "Unify", "Accelerate", "Modernize", "Simplify", "Automate", "Expand",
];

const BUZZ_NOUNS: &[&str] = &[
    "Delivery", "Insights", "Operations", "Experience", "Infrastructure", "Growth", "Analytics",
    "Collaboration",
];

const CATCH_PHRASES: &[&str] = &[
    "Future-Ready Growth",
    "Customer First",
    "Bold New Horizons",
    "Smarter Every Day",
    "Built to Last",
    "Spring Forward",
    "Always On",
    "Made for Teams",
];

const ENGINEERING_COMPONENTS: &[&str] = &[
    "Auth API",
    "User Service",
    "Payment Gateway",
    "Database Layer",
    "Frontend UI",
    "Backend API",
    "CI/CD Pipeline",
    "Monitoring",
    "Analytics",
    "Search Engine",
    "Cache Layer",
    "Message Queue",
    "File Storage",
    "Email Service",
    "Notification System",
    "Admin Dashboard",
    "Mobile App",
    "Web App",
    "GraphQL API",
    "REST API",
];

const ENGINEERING_ACTIONS: &[(&str, &[&str])] = &[
    ("Implement", &["authentication flow", "endpoint", "feature", "integration", "validation"]),
    ("Fix", &["bug in", "memory leak in", "race condition in", "performance issue in"]),
    ("Refactor", &["codebase for", "module to improve", "legacy code in", "architecture of"]),
    ("Optimize", &["query performance in", "loading time for", "memory usage in"]),
    ("Add", &["unit tests for", "logging to", "monitoring for", "error handling to"]),
    ("Update", &["dependencies in", "configuration for", "schema for", "documentation for"]),
    ("Debug", &["failing tests in", "timeout issues in", "crash in", "error in"]),
    ("Migrate", &["database schema for", "users to", "service to", "infrastructure to"]),
];

const MARKETING_CAMPAIGNS: &[&str] = &[
    "Q1 Product Launch",
    "Summer Sale",
    "Brand Awareness",
    "Lead Generation",
    "Customer Retention",
    "Email Campaign",
    "Social Media",
    "Content Marketing",
    "Webinar Series",
    "Trade Show",
    "Partner Marketing",
    "Referral Program",
];

const MARKETING_DELIVERABLES: &[&str] = &[
    "landing page",
    "email templates",
    "social media assets",
    "blog posts",
    "video content",
    "infographics",
    "case studies",
    "whitepapers",
    "ad creative",
    "press release",
    "event materials",
    "survey",
];

const OPS_CATEGORIES: &[&str] = &[
    "Onboarding",
    "Compliance",
    "Security",
    "Infrastructure",
    "Vendor Management",
    "Budget Planning",
    "Team Training",
    "Process Improvement",
    "Documentation",
];

const OPS_ACTIONS: &[&str] = &[
    "Review", "Update", "Implement", "Audit", "Schedule", "Coordinate", "Analyze", "Prepare",
    "Execute", "Monitor",
];

const COMMENTS: &[&str] = &[
    "Looks good, approved!",
    "Can you provide more details on this?",
    "Working on this now.",
    "This is blocked by another task.",
    "Ready for review.",
    "LGTM, merging.",
    "Let's discuss this in the standup.",
    "Added some notes in the description.",
    "Can we prioritize this?",
    "Moving to next sprint.",
];

fn pick<'a>(rng: &mut SimRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Template-backed implementation of every content request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSource;

impl TemplateSource {
    pub fn new() -> Self {
        Self
    }

    pub fn company_name(&self, rng: &mut SimRng) -> String {
        format!(
            "{}{} {}",
            pick(rng, COMPANY_PREFIXES),
            pick(rng, COMPANY_SUFFIXES),
            pick(rng, COMPANY_KINDS)
        )
    }

    /// `(first, last)`.
    pub fn person_name(&self, rng: &mut SimRng) -> (String, String) {
        (
            pick(rng, FIRST_NAMES).to_string(),
            pick(rng, LAST_NAMES).to_string(),
        )
    }

    pub fn word(&self, rng: &mut SimRng) -> String {
        pick(rng, WORDS).to_string()
    }

    /// A capitalized sentence of `words` words ending in a period.
    pub fn sentence(&self, rng: &mut SimRng, words: usize) -> String {
        let body: Vec<&str> = (0..words.max(1)).map(|_| pick(rng, WORDS)).collect();
        format!("{}.", capitalize(&body.join(" ")))
    }

    pub fn paragraph(&self, rng: &mut SimRng, sentences: usize) -> String {
        (0..sentences.max(1))
            .map(|_| {
                let n = rng.gen_range(5..=12);
                self.sentence(rng, n)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn team_name(&self, rng: &mut SimRng) -> String {
        format!("{} {} Team", pick(rng, BUZZ_VERBS), pick(rng, BUZZ_NOUNS))
    }

    pub fn project_name(&self, rng: &mut SimRng, project_type: ProjectType) -> String {
        match project_type {
            ProjectType::Engineering => {
                format!("{} Platform Revamp", capitalize(pick(rng, WORDS)))
            }
            ProjectType::Marketing => format!("{} Campaign", pick(rng, CATCH_PHRASES)),
            ProjectType::Ops => format!("{} Ops Initiative", capitalize(pick(rng, WORDS))),
        }
    }

    pub fn task_name_for(&self, rng: &mut SimRng, project_type: ProjectType) -> String {
        match project_type {
            ProjectType::Engineering => {
                let component = pick(rng, ENGINEERING_COMPONENTS);
                let (action, details) = ENGINEERING_ACTIONS
                    .choose(rng)
                    .copied()
                    .unwrap_or(ENGINEERING_ACTIONS[0]);
                format!("{} - {} {}", component, action, pick(rng, details))
            }
            ProjectType::Marketing => format!(
                "{} - Create {}",
                pick(rng, MARKETING_CAMPAIGNS),
                pick(rng, MARKETING_DELIVERABLES)
            ),
            ProjectType::Ops => {
                let category = pick(rng, OPS_CATEGORIES);
                let action = pick(rng, OPS_ACTIONS);
                format!("{} {} process", action, category.to_lowercase())
            }
        }
    }

    pub fn description_for(&self, rng: &mut SimRng, shape: DescriptionShape) -> String {
        match shape {
            DescriptionShape::Empty => String::new(),
            DescriptionShape::Short => {
                let n = rng.gen_range(6..=18);
                self.sentence(rng, n)
            }
            DescriptionShape::Detailed => {
                let overview = self.paragraph(rng, 4);
                let bullets: Vec<String> = (0..rng.gen_range(2..=4))
                    .map(|_| format!("- {}", self.sentence(rng, 6)))
                    .collect();
                format!("{}\n\nAcceptance Criteria:\n{}", overview, bullets.join("\n"))
            }
        }
    }

    pub fn subtask_name(&self, rng: &mut SimRng) -> String {
        self.sentence(rng, 4)
    }

    pub fn comment_text(&self, rng: &mut SimRng) -> String {
        pick(rng, COMMENTS).to_string()
    }

    pub fn attachment_filename(&self, rng: &mut SimRng) -> String {
        format!("{}.pdf", pick(rng, WORDS))
    }
}

#[async_trait]
impl ContentSource for TemplateSource {
    fn templates(&self) -> &TemplateSource {
        self
    }

    async fn task_name(
        &self,
        rng: &mut SimRng,
        project_type: ProjectType,
        _project_name: &str,
    ) -> String {
        self.task_name_for(rng, project_type)
    }

    async fn task_description(
        &self,
        rng: &mut SimRng,
        _project_type: ProjectType,
        _task_name: &str,
        shape: DescriptionShape,
    ) -> String {
        self.description_for(rng, shape)
    }

    async fn comment(&self, rng: &mut SimRng, _task_name: &str) -> String {
        self.comment_text(rng)
    }
}
