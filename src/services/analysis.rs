// src/services/analysis.rs
//! Post interaction pipeline: scraper run, webhook, classification, upserts

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::ai_analysis::{AiAnalysisService, PostInsights};
use super::apify::ApifyService;
use super::dataset::{extract_post, ScrapedInteraction};
use super::scoring;
use crate::core::config_manager::ServiceConfig;
use crate::core::Database;
use crate::models::{
    Classification, InteractionType, InteractionUpsert, Lead, LeadCandidate, LinkedInPost,
    PersonaDefinition, PostStatus, PostSummary,
};
use crate::repositories::{
    LeadRepository, OrganizationRepository, PersonaRepository, PostRepository,
};

pub const MAX_URLS_PER_BATCH: usize = 10;
pub const MAX_RESULTS_LIMIT: i64 = 100;
pub const LEAD_SOURCE: &str = "linkedin_post";
const CONTENT_PREVIEW_CHARS: usize = 200;

/// Counts produced by processing one dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub interactions: usize,
    pub leads: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub url: String,
    pub content: String,
    pub author: Option<String>,
    pub status: PostStatus,
    pub intent: Option<String>,
    pub ai_insights: Value,
    pub total_comments: i64,
    pub total_likes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub actor_name: Option<String>,
    pub actor_headline: Option<String>,
    pub actor_profile_url: Option<String>,
    pub content: Option<String>,
    pub classification: Classification,
    pub score: i64,
    pub profile_type: Option<String>,
    pub seniority: Option<String>,
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResult {
    pub post: PostView,
    pub interactions: Vec<InteractionView>,
    pub leads: Vec<Lead>,
    pub leads_created: usize,
    pub high_value_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    pub total: usize,
    pub results: Vec<PostResult>,
}

#[derive(Clone)]
pub struct AnalysisService {
    database: Database,
    ai: Arc<AiAnalysisService>,
    apify: Arc<ApifyService>,
    config: ServiceConfig,
}

impl AnalysisService {
    pub fn new(
        database: Database,
        ai: Arc<AiAnalysisService>,
        apify: Arc<ApifyService>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            database,
            ai,
            apify,
            config,
        }
    }

    pub fn apify(&self) -> &ApifyService {
        &self.apify
    }

    /// Why post analysis cannot start, if it cannot
    pub fn scraper_unavailable_reason(&self) -> Option<&'static str> {
        if !self.apify.is_configured() {
            Some("APIFY_API_TOKEN is not configured")
        } else if self.config.post_actor_id.is_none() {
            Some("APIFY_POST_ACTOR_ID is not configured")
        } else {
            None
        }
    }

    /// Create a pending post per URL and start one scraper run for each.
    /// Returns the ids of every created post, including those whose run failed to start.
    pub async fn analyze_posts(
        &self,
        post_urls: &[String],
        org_id: Uuid,
        persona_id: Option<Uuid>,
    ) -> Result<Vec<Uuid>> {
        if post_urls.len() > MAX_URLS_PER_BATCH {
            anyhow::bail!("Max {} URLs allowed per batch", MAX_URLS_PER_BATCH);
        }
        if post_urls.iter().any(|url| url.trim().is_empty()) {
            anyhow::bail!("Post URLs must not be empty");
        }
        let actor_id = self
            .config
            .post_actor_id
            .as_deref()
            .context("APIFY_POST_ACTOR_ID is not configured")?;

        let posts = PostRepository::new(self.database.pool());
        let webhook_url = self.config.analysis_webhook_url()?;
        let mut ids = Vec::with_capacity(post_urls.len());

        for url in post_urls {
            let post = posts
                .create_pending(url, org_id, persona_id)
                .await
                .with_context(|| format!("Failed to store post {}", url))?;
            ids.push(post.id);

            let run_input = json!({
                "postUrls": [post.post_url],
                "includeComments": true,
                "includeReactions": true,
            });

            match self
                .apify
                .run_actor(actor_id, &run_input, Some(&webhook_url))
                .await
            {
                Ok(run) => {
                    posts.set_run(post.id, &run.id).await?;
                    info!("Post {} queued for analysis (run {})", post.id, run.id);
                }
                Err(e) => {
                    error!("Failed to start scraper for post {}: {}", post.id, e);
                    posts.mark_status(post.id, PostStatus::Failed).await?;
                }
            }
        }

        Ok(ids)
    }

    /// Background entry point for a finished run. Failures mark the post `failed`.
    pub async fn process_webhook(&self, dataset_id: &str, run_id: &str) {
        let posts = PostRepository::new(self.database.pool());
        let post = match posts.find_by_run_id(run_id).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                warn!("No post found for run {}", run_id);
                return;
            }
            Err(e) => {
                error!("Failed to look up post for run {}: {}", run_id, e);
                return;
            }
        };

        let result = async {
            let items = self.apify.get_dataset_items(dataset_id).await?;
            self.process_items(&post, &items).await
        }
        .await;

        match result {
            Ok(outcome) => info!(
                "Run {} processed: {} interactions, {} leads",
                run_id, outcome.interactions, outcome.leads
            ),
            Err(e) => {
                error!("Processing run {} for post {} failed: {:#}", run_id, post.id, e);
                if let Err(e) = posts.mark_status(post.id, PostStatus::Failed).await {
                    error!("Failed to mark post {} as failed: {}", post.id, e);
                }
            }
        }
    }

    /// A run that ended without data fails its post
    pub async fn handle_failed_run(&self, run_id: &str) -> Result<bool> {
        let posts = PostRepository::new(self.database.pool());
        match posts.find_by_run_id(run_id).await? {
            Some(post) => {
                warn!("Scraper run {} failed, marking post {} failed", run_id, post.id);
                posts.mark_status(post.id, PostStatus::Failed).await
            }
            None => Ok(false),
        }
    }

    /// Classify and store every interaction of a dataset, then summarize the post.
    /// Redelivering the same items updates the same rows.
    pub async fn process_items(&self, post: &LinkedInPost, items: &[Value]) -> Result<ProcessOutcome> {
        let pool = self.database.pool();
        let posts = PostRepository::new(pool);
        let leads = LeadRepository::new(pool);

        let persona = self.persona_for(post).await?;
        let product = OrganizationRepository::new(pool)
            .find_by_id(post.org_id)
            .await?
            .and_then(|org| org.product_description)
            .unwrap_or_default();

        let scraped = extract_post(items);
        let mut outcome = ProcessOutcome::default();

        for interaction in &scraped.interactions {
            let row = self.classify(post.id, interaction, &persona).await;

            let lead_id = match row.lead_candidate {
                Some(candidate) => {
                    outcome.leads += 1;
                    Some(leads.upsert(post.org_id, &candidate).await?)
                }
                None => None,
            };

            posts
                .upsert_interaction(&InteractionUpsert {
                    lead_id,
                    ..row.upsert
                })
                .await
                .with_context(|| format!("Failed to store interaction of {}", interaction.actor_key))?;
            outcome.interactions += 1;
        }

        let text = scraped
            .text
            .clone()
            .or_else(|| post.post_content.clone())
            .filter(|t| !t.trim().is_empty());
        let insights = match &text {
            Some(text) => self.ai.analyze_post_content(text, &product).await,
            None => PostInsights {
                intent: "unknown".to_string(),
                topics: Vec::new(),
                relevance_score: 0,
                summary: None,
            },
        };

        let summary = PostSummary {
            author_name: scraped.author_name.clone(),
            post_content: text,
            posted_at: scraped.posted_at,
            post_intent: Some(insights.intent.clone()),
            total_comments: scraped.comment_count(),
            total_likes: scraped.like_count(),
            ai_insights: serde_json::to_value(&insights)?,
        };
        posts.complete(post.id, &summary).await?;

        Ok(outcome)
    }

    async fn persona_for(&self, post: &LinkedInPost) -> Result<PersonaDefinition> {
        let Some(persona_id) = post.persona_id else {
            return Ok(PersonaDefinition::default());
        };

        match PersonaRepository::new(self.database.pool())
            .find(post.org_id, persona_id)
            .await?
        {
            Some(persona) => Ok(persona.definition.0),
            None => {
                warn!("Persona {} not found for post {}, using an open persona", persona_id, post.id);
                Ok(PersonaDefinition::default())
            }
        }
    }

    async fn classify(
        &self,
        post_id: Uuid,
        interaction: &ScrapedInteraction,
        persona: &PersonaDefinition,
    ) -> ClassifiedInteraction {
        let evaluation = self
            .ai
            .evaluate_profile(
                interaction.name.as_deref().unwrap_or_default(),
                interaction.headline.as_deref().unwrap_or_default(),
                interaction.content.as_deref().unwrap_or_default(),
                persona,
            )
            .await;

        let (relevance_score, classification) =
            scoring::score(&evaluation, interaction.interaction_type);

        let lead_candidate = match &interaction.profile_url {
            Some(url) if scoring::qualifies_as_lead(classification, evaluation.profile_type) => {
                Some(LeadCandidate {
                    full_name: interaction.name.clone(),
                    headline: interaction.headline.clone(),
                    profile_url: url.clone(),
                    source: LEAD_SOURCE.to_string(),
                    score: relevance_score,
                })
            }
            _ => None,
        };

        ClassifiedInteraction {
            upsert: InteractionUpsert {
                post_id,
                interaction_type: interaction.interaction_type,
                actor_key: interaction.actor_key.clone(),
                content: interaction.content.clone(),
                reacted_at: interaction.reacted_at,
                actor_name: interaction.name.clone(),
                actor_profile_url: interaction.profile_url.clone(),
                actor_headline: interaction.headline.clone(),
                actor_urn: interaction.urn.clone(),
                relevance_score,
                classification,
                profile_type: Some(evaluation.profile_type.as_str().to_string()),
                seniority_level: Some(evaluation.seniority_level.as_str().to_string()),
                role_category: Some(evaluation.role_category.as_str().to_string()),
                ai_insights: serde_json::to_value(&evaluation).unwrap_or(Value::Null),
                lead_id: None,
            },
            lead_candidate,
        }
    }

    /// Recent posts of an organization with their scored interactions
    pub async fn results(
        &self,
        org_id: Uuid,
        status: Option<PostStatus>,
        limit: i64,
    ) -> Result<AnalysisResults> {
        let limit = limit.clamp(1, MAX_RESULTS_LIMIT);
        let pool = self.database.pool();
        let posts = PostRepository::new(pool);
        let lead_repo = LeadRepository::new(pool);

        let mut results = Vec::new();
        for post in posts.list_for_org(org_id, status, limit).await? {
            let interactions = posts.interactions_for(post.id).await?;
            let lead_ids: Vec<Uuid> = interactions.iter().filter_map(|i| i.lead_id).collect();
            let leads = lead_repo.find_many(&lead_ids).await?;

            let leads_created = lead_ids.len();
            let high_value_count = interactions
                .iter()
                .filter(|i| i.classification == Classification::High)
                .count();

            results.push(PostResult {
                post: PostView {
                    id: post.id,
                    url: post.post_url,
                    content: post
                        .post_content
                        .map(|c| c.chars().take(CONTENT_PREVIEW_CHARS).collect())
                        .unwrap_or_default(),
                    author: post.author_name,
                    status: post.status,
                    intent: post.post_intent,
                    ai_insights: post.ai_insights.0,
                    total_comments: post.total_comments,
                    total_likes: post.total_likes,
                    created_at: post.created_at,
                },
                interactions: interactions
                    .into_iter()
                    .map(|i| InteractionView {
                        id: i.id,
                        interaction_type: i.interaction_type,
                        actor_name: i.actor_name,
                        actor_headline: i.actor_headline,
                        actor_profile_url: i.actor_profile_url,
                        content: i.content,
                        classification: i.classification,
                        score: i.relevance_score,
                        profile_type: i.profile_type,
                        seniority: i.seniority_level,
                        lead_id: i.lead_id,
                    })
                    .collect(),
                leads,
                leads_created,
                high_value_count,
            });
        }

        Ok(AnalysisResults {
            total: results.len(),
            results,
        })
    }
}

struct ClassifiedInteraction {
    upsert: InteractionUpsert,
    lead_candidate: Option<LeadCandidate>,
}

