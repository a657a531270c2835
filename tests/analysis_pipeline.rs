use std::sync::Arc;

use leadscope::core::config_manager::ServiceConfig;
use leadscope::core::Database;
use leadscope::models::{
    Classification, InteractionType, NewPersona, PersonaDefinition, PostStatus,
};
use leadscope::repositories::{OrganizationRepository, PersonaRepository, PostRepository};
use leadscope::services::{AiAnalysisService, AnalysisService, ApifyService};
use serde_json::{json, Value};
use uuid::Uuid;

fn offline_config() -> ServiceConfig {
    ServiceConfig {
        openai_api_key: None,
        openai_base_url: "http://127.0.0.1:9/v1".into(),
        ai_model: "gpt-4o-mini".into(),
        apify_token: None,
        apify_base_url: "http://127.0.0.1:9".into(),
        post_actor_id: None,
        public_base_url: "http://localhost:8000".into(),
        webhook_secret: None,
        timeout_seconds: 1,
    }
}

fn service(database: &Database) -> AnalysisService {
    service_with(database, offline_config())
}

fn service_with(database: &Database, config: ServiceConfig) -> AnalysisService {
    let apify = Arc::new(ApifyService::new(&config).unwrap());
    AnalysisService::new(
        database.clone(),
        Arc::new(AiAnalysisService::disabled()),
        apify,
        config,
    )
}

fn dataset() -> Vec<Value> {
    vec![json!({
        "postText": "We are hiring SDRs and looking for a better outbound tool",
        "author": { "name": "Pat Poster" },
        "postedAt": "2026-03-01T09:00:00Z",
        "comments": [
            {
                "text": "Interested, we struggle with this too",
                "author": {
                    "name": "Ana Buyer",
                    "headline": "VP Sales at Globex",
                    "profileUrl": "https://www.linkedin.com/in/ana-buyer",
                    "urn": "urn:li:person:ana"
                }
            },
            {
                "text": "Great post!",
                "author": {
                    "name": "Sam Student",
                    "headline": "Student at State University",
                    "profileUrl": "https://www.linkedin.com/in/sam-student"
                }
            }
        ],
        "reactions": [
            {
                "reactionType": "LIKE",
                "actor": {
                    "name": "Globex Company",
                    "headline": "Globex Company page",
                    "profileUrl": "https://www.linkedin.com/company/globex"
                }
            },
            {
                "reactionType": "LIKE",
                "actor": {
                    "name": "Ana Buyer",
                    "headline": "VP Sales at Globex",
                    "profileUrl": "https://www.linkedin.com/in/ana-buyer",
                    "urn": "urn:li:person:ana"
                }
            }
        ]
    })]
}

async fn seeded_post(database: &Database) -> (Uuid, Uuid) {
    let pool = database.pool();
    let org = OrganizationRepository::new(pool)
        .create("Acme", Some("Outbound automation"))
        .await
        .unwrap();
    let persona = PersonaRepository::new(pool)
        .create(
            org.id,
            &NewPersona {
                name: "Sales leaders".into(),
                definition: PersonaDefinition {
                    industries: vec!["SaaS".into()],
                    job_titles: vec!["VP Sales".into()],
                    seniority: vec!["VP".into()],
                },
            },
        )
        .await
        .unwrap();
    let post = PostRepository::new(pool)
        .create_pending("https://www.linkedin.com/posts/pat_123", org.id, Some(persona.id))
        .await
        .unwrap();
    (org.id, post.id)
}

#[tokio::test]
async fn test_process_items_classifies_and_creates_leads() {
    let database = Database::in_memory().await.unwrap();
    let (org_id, post_id) = seeded_post(&database).await;
    let analysis = service(&database);

    let posts = PostRepository::new(database.pool());
    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    let outcome = analysis.process_items(&post, &dataset()).await.unwrap();

    // Two comments plus two likes, each (type, actor) once
    assert_eq!(outcome.interactions, 4);
    // Ana twice (comment and like); the student is irrelevant, the company page is not a person
    assert_eq!(outcome.leads, 2);

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Completed);
    assert_eq!(post.total_comments, 2);
    assert_eq!(post.total_likes, 2);
    assert_eq!(post.author_name.as_deref(), Some("Pat Poster"));
    assert_eq!(post.post_intent.as_deref(), Some("unknown"));

    let interactions = posts.interactions_for(post_id).await.unwrap();
    let student = interactions
        .iter()
        .find(|i| i.actor_name.as_deref() == Some("Sam Student"))
        .unwrap();
    assert_eq!(student.classification, Classification::Irrelevant);
    assert_eq!(student.relevance_score, 0);
    assert!(student.lead_id.is_none());

    let ana: Vec<_> = interactions
        .iter()
        .filter(|i| i.actor_urn.as_deref() == Some("urn:li:person:ana"))
        .collect();
    assert_eq!(ana.len(), 2);
    assert!(ana.iter().all(|i| i.classification == Classification::Medium));
    assert!(ana.iter().all(|i| i.lead_id.is_some()));
    assert_eq!(ana[0].lead_id, ana[1].lead_id);

    let company = interactions
        .iter()
        .find(|i| i.interaction_type == InteractionType::Like && i.actor_name.as_deref() == Some("Globex Company"))
        .unwrap();
    assert_eq!(company.profile_type.as_deref(), Some("company"));
    assert!(company.lead_id.is_none());

    let results = analysis
        .results(org_id, Some(PostStatus::Completed), 20)
        .await
        .unwrap();
    assert_eq!(results.total, 1);
    let result = &results.results[0];
    assert_eq!(result.leads.len(), 1);
    assert_eq!(result.leads[0].profile_url, "https://www.linkedin.com/in/ana-buyer");
    assert_eq!(result.leads[0].source, "linkedin_post");
    assert_eq!(result.high_value_count, 0);
}

#[tokio::test]
async fn test_redelivered_dataset_updates_in_place() {
    let database = Database::in_memory().await.unwrap();
    let (_, post_id) = seeded_post(&database).await;
    let analysis = service(&database);
    let posts = PostRepository::new(database.pool());

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    analysis.process_items(&post, &dataset()).await.unwrap();
    let first = posts.interactions_for(post_id).await.unwrap();

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    analysis.process_items(&post, &dataset()).await.unwrap();
    let second = posts.interactions_for(post_id).await.unwrap();

    assert_eq!(first.len(), second.len());
    let mut first_ids: Vec<Uuid> = first.iter().map(|i| i.id).collect();
    let mut second_ids: Vec<Uuid> = second.iter().map(|i| i.id).collect();
    first_ids.sort();
    second_ids.sort();
    assert_eq!(first_ids, second_ids);

    let lead_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(database.pool())
        .await
        .unwrap();
    assert_eq!(lead_count, 1);
}

#[tokio::test]
async fn test_post_without_text_gets_unknown_intent() {
    let database = Database::in_memory().await.unwrap();
    let (_, post_id) = seeded_post(&database).await;
    let analysis = service(&database);
    let posts = PostRepository::new(database.pool());

    let items = vec![json!({
        "type": "like",
        "name": "Lee Lurker",
        "headline": "Engineer",
        "profileUrl": "https://www.linkedin.com/in/lee"
    })];
    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    let outcome = analysis.process_items(&post, &items).await.unwrap();
    assert_eq!(outcome.interactions, 1);

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.post_intent.as_deref(), Some("unknown"));
    assert_eq!(post.ai_insights.0["relevance_score"], json!(0));
    assert_eq!(post.total_likes, 1);
}

#[tokio::test]
async fn test_failed_run_marks_post_failed() {
    let database = Database::in_memory().await.unwrap();
    let (_, post_id) = seeded_post(&database).await;
    let analysis = service(&database);
    let posts = PostRepository::new(database.pool());

    posts.set_run(post_id, "run-42").await.unwrap();
    assert!(analysis.handle_failed_run("run-42").await.unwrap());
    assert!(!analysis.handle_failed_run("run-unknown").await.unwrap());

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Failed);
}

#[tokio::test]
async fn test_analyze_posts_requires_actor() {
    let database = Database::in_memory().await.unwrap();
    let (org_id, _) = seeded_post(&database).await;
    let analysis = service(&database);
    assert!(analysis.scraper_unavailable_reason().is_some());

    let result = analysis
        .analyze_posts(&["https://www.linkedin.com/posts/other_1".to_string()], org_id, None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_unreachable_scraper_marks_post_failed() {
    let database = Database::in_memory().await.unwrap();
    let (org_id, _) = seeded_post(&database).await;
    let analysis = service_with(
        &database,
        ServiceConfig {
            apify_token: Some("token".into()),
            post_actor_id: Some("someone/post-scraper".into()),
            ..offline_config()
        },
    );

    let ids = analysis
        .analyze_posts(&["https://www.linkedin.com/posts/other_1".to_string()], org_id, None)
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);

    let post = PostRepository::new(database.pool())
        .find_by_id(ids[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.status, PostStatus::Failed);
}

#[tokio::test]
async fn test_webhook_with_unreachable_dataset_marks_post_failed() {
    let database = Database::in_memory().await.unwrap();
    let (_, post_id) = seeded_post(&database).await;
    let analysis = service_with(
        &database,
        ServiceConfig {
            apify_token: Some("token".into()),
            ..offline_config()
        },
    );
    let posts = PostRepository::new(database.pool());
    posts.set_run(post_id, "run-7").await.unwrap();

    analysis.process_webhook("ds-1", "run-7").await;

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Failed);
    assert!(posts.interactions_for(post_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_for_unknown_run_changes_nothing() {
    let database = Database::in_memory().await.unwrap();
    let (_, post_id) = seeded_post(&database).await;
    let analysis = service(&database);

    analysis.process_webhook("ds-1", "run-unknown").await;

    let post = PostRepository::new(database.pool())
        .find_by_id(post_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.status, PostStatus::Pending);
}

#[tokio::test]
async fn test_downgraded_redelivery_unlinks_lead() {
    let database = Database::in_memory().await.unwrap();
    let (org_id, post_id) = seeded_post(&database).await;
    let analysis = service(&database);
    let posts = PostRepository::new(database.pool());

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    analysis.process_items(&post, &dataset()).await.unwrap();
    let linked = posts.interactions_for(post_id).await.unwrap();
    assert_eq!(linked.iter().filter(|i| i.lead_id.is_some()).count(), 2);

    // Same actors, but Ana's headline no longer qualifies
    let mut items = dataset();
    items[0]["comments"][0]["author"]["headline"] = json!("Student at State University");
    items[0]["reactions"][1]["actor"]["headline"] = json!("Student at State University");

    let post = posts.find_by_id(post_id).await.unwrap().unwrap();
    let outcome = analysis.process_items(&post, &items).await.unwrap();
    assert_eq!(outcome.interactions, 4);
    assert_eq!(outcome.leads, 0);

    let interactions = posts.interactions_for(post_id).await.unwrap();
    let ana: Vec<_> = interactions
        .iter()
        .filter(|i| i.actor_urn.as_deref() == Some("urn:li:person:ana"))
        .collect();
    assert_eq!(ana.len(), 2);
    assert!(ana.iter().all(|i| i.classification == Classification::Irrelevant));
    assert!(ana.iter().all(|i| i.lead_id.is_none()));

    let results = analysis.results(org_id, None, 20).await.unwrap();
    assert_eq!(results.results[0].leads_created, 0);
    assert!(results.results[0].leads.is_empty());

    // The lead itself stays on record
    let lead_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(database.pool())
        .await
        .unwrap();
    assert_eq!(lead_count, 1);
}
