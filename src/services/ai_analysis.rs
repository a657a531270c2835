// src/services/ai_analysis.rs
//! Prompt-based post and profile classification with a keyword fallback

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info, warn};

use super::llm_client::LlmClient;
use crate::core::config_manager::ServiceConfig;
use crate::models::PersonaDefinition;

const DEFAULT_CUSTOMER_PRODUCT: &str = "General B2B SaaS";
const POST_TEMPERATURE: f32 = 0.3;
const PROFILE_TEMPERATURE: f32 = 0.2;
pub const FALLBACK_REASONING: &str = "Fallback evaluation (AI unavailable)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileType {
    #[serde(rename = "individual", alias = "Individual")]
    Individual,
    #[serde(rename = "company", alias = "Company")]
    Company,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoleCategory {
    #[serde(rename = "decision_maker", alias = "Decision Maker")]
    DecisionMaker,
    #[serde(rename = "influencer", alias = "Influencer")]
    Influencer,
    #[serde(rename = "end_user", alias = "End User")]
    EndUser,
    #[serde(rename = "irrelevant", alias = "Irrelevant")]
    Irrelevant,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeniorityLevel {
    #[serde(rename = "C-level", alias = "C-Level", alias = "c-level")]
    CLevel,
    #[serde(rename = "VP", alias = "vp")]
    Vp,
    #[serde(rename = "Director", alias = "director")]
    Director,
    #[serde(rename = "Manager", alias = "manager")]
    Manager,
    #[serde(rename = "IC", alias = "ic")]
    Ic,
    #[serde(rename = "Student", alias = "student")]
    Student,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntentLevel {
    #[serde(rename = "high", alias = "High")]
    High,
    #[serde(rename = "medium", alias = "Medium")]
    Medium,
    #[serde(rename = "low", alias = "Low")]
    Low,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Individual => "individual",
            ProfileType::Company => "company",
            ProfileType::Unknown => "unknown",
        }
    }
}

impl RoleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCategory::DecisionMaker => "decision_maker",
            RoleCategory::Influencer => "influencer",
            RoleCategory::EndUser => "end_user",
            RoleCategory::Irrelevant => "irrelevant",
            RoleCategory::Unknown => "unknown",
        }
    }
}

impl SeniorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeniorityLevel::CLevel => "C-level",
            SeniorityLevel::Vp => "VP",
            SeniorityLevel::Director => "Director",
            SeniorityLevel::Manager => "Manager",
            SeniorityLevel::Ic => "IC",
            SeniorityLevel::Student => "Student",
            SeniorityLevel::Unknown => "unknown",
        }
    }
}

/// Classification of one actor against the target persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvaluation {
    #[serde(default)]
    pub profile_type: ProfileType,
    #[serde(default)]
    pub role_category: RoleCategory,
    #[serde(default)]
    pub seniority_level: SeniorityLevel,
    #[serde(default)]
    pub industry_match: bool,
    #[serde(default)]
    pub intent_from_comment: IntentLevel,
    /// 0-100
    #[serde(default, deserialize_with = "lenient_score")]
    pub persona_fit_score: i64,
    #[serde(default)]
    pub reasoning: String,
}

/// What a post is about and how relevant it is to the customer's product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostInsights {
    #[serde(default = "unknown_intent")]
    pub intent: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "neutral_score", deserialize_with = "lenient_score")]
    pub relevance_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl PostInsights {
    fn neutral(summary: Option<String>) -> Self {
        Self {
            intent: unknown_intent(),
            topics: Vec::new(),
            relevance_score: neutral_score(),
            summary,
        }
    }
}

fn unknown_intent() -> String {
    "unknown".to_string()
}

fn neutral_score() -> i64 {
    50
}

/// Accept integers, floats and numeric strings; clamp to 0-100
fn lenient_score<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let raw = match &value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(raw.round().clamp(0.0, 100.0) as i64)
}

pub struct AiAnalysisService {
    client: Option<LlmClient>,
}

impl AiAnalysisService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = match &config.openai_api_key {
            Some(key) => Some(LlmClient::new(
                key.clone(),
                config.openai_base_url.clone(),
                config.ai_model.clone(),
                config.timeout_seconds,
            )?),
            None => {
                warn!("OPENAI_API_KEY not configured, AI analysis will use the rule-based fallback");
                None
            }
        };

        Ok(Self { client })
    }

    /// Service that always answers from the fallback rules
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn with_client(client: LlmClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Intent, topics and relevance of a post for the customer's product
    pub async fn analyze_post_content(&self, post_text: &str, customer_product: &str) -> PostInsights {
        let Some(client) = &self.client else {
            warn!("AI client not configured, skipping post analysis");
            return PostInsights::neutral(None);
        };

        let prompt = post_prompt(post_text, customer_product);
        match client.complete_json::<PostInsights>(&prompt, POST_TEMPERATURE).await {
            Ok(insights) => {
                info!(
                    "Post analyzed: intent={}, relevance={}",
                    insights.intent, insights.relevance_score
                );
                insights
            }
            Err(e) => {
                error!("AI post analysis failed: {}", e);
                PostInsights::neutral(Some(String::new()))
            }
        }
    }

    /// Classify an actor and match them against the persona
    pub async fn evaluate_profile(
        &self,
        name: &str,
        headline: &str,
        comment_text: &str,
        persona: &PersonaDefinition,
    ) -> ProfileEvaluation {
        let Some(client) = &self.client else {
            return Self::fallback_evaluation(headline);
        };

        let prompt = profile_prompt(name, headline, comment_text, persona);
        match client
            .complete_json::<ProfileEvaluation>(&prompt, PROFILE_TEMPERATURE)
            .await
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                error!("AI profile evaluation failed for {}: {}", name, e);
                Self::fallback_evaluation(headline)
            }
        }
    }

    /// Keyword rules used when the LLM is unavailable or fails
    pub fn fallback_evaluation(headline: &str) -> ProfileEvaluation {
        let contains_any = |needles: &[&str]| needles.iter().any(|n| headline.contains(n));

        let seniority_level = if contains_any(&["CEO", "Founder", "President"]) {
            SeniorityLevel::CLevel
        } else if contains_any(&["VP", "Vice President"]) {
            SeniorityLevel::Vp
        } else if headline.contains("Director") {
            SeniorityLevel::Director
        } else if headline.contains("Manager") {
            SeniorityLevel::Manager
        } else {
            SeniorityLevel::Ic
        };

        let lowered = headline.to_lowercase();
        let excluded = ["student", "recruiter", "intern"]
            .iter()
            .any(|term| lowered.contains(term));

        let profile_type = if contains_any(&["Company", "Ltd"]) {
            ProfileType::Company
        } else {
            ProfileType::Individual
        };

        ProfileEvaluation {
            profile_type,
            role_category: if excluded {
                RoleCategory::Irrelevant
            } else {
                RoleCategory::Influencer
            },
            seniority_level,
            industry_match: false,
            intent_from_comment: IntentLevel::Medium,
            persona_fit_score: if excluded { 0 } else { 50 },
            reasoning: FALLBACK_REASONING.to_string(),
        }
    }
}

fn list_or_any(values: &[String]) -> String {
    if values.is_empty() {
        "any".to_string()
    } else {
        values.join(", ")
    }
}

pub(crate) fn post_prompt(post_text: &str, customer_product: &str) -> String {
    let product = if customer_product.trim().is_empty() {
        DEFAULT_CUSTOMER_PRODUCT
    } else {
        customer_product
    };

    format!(
        r#"You classify LinkedIn posts for a B2B sales team. Answer with a single JSON object.

Post: "{post}"
Customer product or service: "{product}"

JSON fields:
- intent: one of problem, solution_seeking, discussion, success_story, promotion, question
- topics: 3 to 5 main topics or keywords
- relevance_score: integer 0-100, how relevant the post is to the customer's product
- summary: one sentence

Example: {{"intent": "solution_seeking", "topics": ["CRM", "pipeline hygiene"], "relevance_score": 80, "summary": "Sales lead asking for CRM recommendations"}}"#,
        post = post_text,
        product = product
    )
}

pub(crate) fn profile_prompt(
    name: &str,
    headline: &str,
    comment_text: &str,
    persona: &PersonaDefinition,
) -> String {
    format!(
        r#"You qualify people who interacted with a LinkedIn post. Answer with a single JSON object.

Name: {name}
Headline: {headline}
Comment: "{comment}"

Target persona:
- Industries: {industries}
- Job titles: {titles}
- Seniority: {seniority}

JSON fields:
- profile_type: "individual" or "company"
- role_category: "decision_maker", "influencer", "end_user" or "irrelevant"
- seniority_level: "C-level", "VP", "Director", "Manager", "IC" or "Student"
- industry_match: true or false
- intent_from_comment: "high" (asking for a solution), "medium" (sharing an opinion) or "low" (generic engagement)
- persona_fit_score: integer 0-100
- reasoning: one short sentence

Example: {{"profile_type": "individual", "role_category": "decision_maker", "seniority_level": "VP", "industry_match": true, "intent_from_comment": "high", "persona_fit_score": 90, "reasoning": "VP Sales at a SaaS company looking for tooling"}}"#,
        name = name,
        headline = headline,
        comment = comment_text,
        industries = list_or_any(&persona.industries),
        titles = list_or_any(&persona.job_titles),
        seniority = list_or_any(&persona.seniority),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_seniority_keywords() {
        let cases = [
            ("CEO at Initech", SeniorityLevel::CLevel),
            ("Co-Founder, Stealth", SeniorityLevel::CLevel),
            ("Vice President of Sales", SeniorityLevel::Vp),
            ("VP Engineering", SeniorityLevel::Vp),
            ("Director of Marketing", SeniorityLevel::Director),
            ("Account Manager", SeniorityLevel::Manager),
            ("Software Engineer", SeniorityLevel::Ic),
            ("ceo of my own life", SeniorityLevel::Ic),
        ];
        for (headline, expected) in cases {
            assert_eq!(
                AiAnalysisService::fallback_evaluation(headline).seniority_level,
                expected,
                "headline: {}",
                headline
            );
        }
    }

    #[test]
    fn test_fallback_excludes_students_and_recruiters() {
        for headline in ["Student at MIT", "Senior Technical RECRUITER", "Marketing Intern"] {
            let eval = AiAnalysisService::fallback_evaluation(headline);
            assert_eq!(eval.role_category, RoleCategory::Irrelevant);
            assert_eq!(eval.persona_fit_score, 0);
        }

        let eval = AiAnalysisService::fallback_evaluation("Head of Growth");
        assert_eq!(eval.role_category, RoleCategory::Influencer);
        assert_eq!(eval.persona_fit_score, 50);
        assert_eq!(eval.intent_from_comment, IntentLevel::Medium);
        assert!(!eval.industry_match);
        assert_eq!(eval.reasoning, FALLBACK_REASONING);
    }

    #[test]
    fn test_fallback_company_detection() {
        assert_eq!(
            AiAnalysisService::fallback_evaluation("Acme Ltd").profile_type,
            ProfileType::Company
        );
        assert_eq!(
            AiAnalysisService::fallback_evaluation("Company page").profile_type,
            ProfileType::Company
        );
        assert_eq!(
            AiAnalysisService::fallback_evaluation("Founder").profile_type,
            ProfileType::Individual
        );
    }

    #[tokio::test]
    async fn test_disabled_service_answers_without_network() {
        let service = AiAnalysisService::disabled();
        assert!(!service.is_enabled());

        let insights = service.analyze_post_content("We need a better CRM", "").await;
        assert_eq!(insights.intent, "unknown");
        assert!(insights.topics.is_empty());
        assert_eq!(insights.relevance_score, 50);
        assert_eq!(insights.summary, None);

        let eval = service
            .evaluate_profile("Ann", "VP Sales", "Interesting!", &PersonaDefinition::default())
            .await;
        assert_eq!(eval.seniority_level, SeniorityLevel::Vp);
    }

    #[test]
    fn test_lenient_evaluation_parsing() {
        let eval: ProfileEvaluation = serde_json::from_str(
            r#"{"profile_type": "Individual", "role_category": "buyer", "seniority_level": "C-Level",
                "industry_match": true, "intent_from_comment": "high", "persona_fit_score": 92.6}"#,
        )
        .unwrap();
        assert_eq!(eval.profile_type, ProfileType::Individual);
        assert_eq!(eval.role_category, RoleCategory::Unknown);
        assert_eq!(eval.seniority_level, SeniorityLevel::CLevel);
        assert_eq!(eval.persona_fit_score, 93);
        assert_eq!(eval.reasoning, "");

        let clamped: ProfileEvaluation =
            serde_json::from_str(r#"{"persona_fit_score": "140"}"#).unwrap();
        assert_eq!(clamped.persona_fit_score, 100);
    }

    #[test]
    fn test_post_insights_defaults() {
        let insights: PostInsights = serde_json::from_str(r#"{"topics": ["CRM"]}"#).unwrap();
        assert_eq!(insights.intent, "unknown");
        assert_eq!(insights.relevance_score, 50);
        assert_eq!(insights.topics, vec!["CRM".to_string()]);
    }

    #[test]
    fn test_prompts_embed_inputs() {
        let persona = PersonaDefinition {
            industries: vec!["SaaS".into(), "Fintech".into()],
            job_titles: vec![],
            seniority: vec!["VP".into()],
        };
        let prompt = profile_prompt("Ann Lee", "VP Sales @ Ledger", "Which tool do you use?", &persona);
        assert!(prompt.contains("Ann Lee"));
        assert!(prompt.contains("Industries: SaaS, Fintech"));
        assert!(prompt.contains("Job titles: any"));

        assert!(post_prompt("hello", "").contains(DEFAULT_CUSTOMER_PRODUCT));
        assert!(post_prompt("hello", "Payroll API").contains("Payroll API"));
    }
}
