use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use leadscope::core::config_manager::ServiceConfig;
use leadscope::core::Database;
use leadscope::models::{Classification, NewPersona, PersonaDefinition, PostStatus};
use leadscope::repositories::{OrganizationRepository, PersonaRepository, PostRepository};
use leadscope::services::ai_analysis::{
    IntentLevel, ProfileType, RoleCategory, SeniorityLevel, FALLBACK_REASONING,
};
use leadscope::services::{AiAnalysisService, AnalysisService, ApifyService, LlmClient};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Requests seen by the mock endpoint: (path, authorization header, body)
type Seen = Arc<Mutex<Vec<(String, String, Value)>>>;

/// Serve chat completions on a random local port. `reply` maps the prompt to (status, message content).
async fn mock_llm<F>(reply: F) -> (SocketAddr, Seen)
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let reply = Arc::new(reply);

    let recorded = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let recorded = recorded.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                serve_one(stream, recorded, reply.as_ref()).await;
            });
        }
    });

    (addr, seen)
}

async fn serve_one<F>(mut stream: TcpStream, seen: Seen, reply: &F)
where
    F: Fn(&str) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let header = |name: &str| {
        head.lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
            })
            .unwrap_or_default()
    };
    let content_length: usize = header("content-length").parse().unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let body: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
    seen.lock().unwrap().push((path, header("authorization"), body));

    let (status, content) = reply(&prompt);
    let payload = if status == 200 {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
    } else {
        json!({ "error": { "message": content } }).to_string()
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        if status == 200 { "OK" } else { "Error" },
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn post_reply() -> String {
    json!({
        "intent": "solution_seeking",
        "topics": ["outbound", "SDR hiring"],
        "relevance_score": 88,
        "summary": "Sales team looking for an outbound tool"
    })
    .to_string()
}

fn buyer_reply() -> String {
    // Fenced, as some models answer even in json mode
    format!(
        "```json\n{}\n```",
        json!({
            "profile_type": "individual",
            "role_category": "decision_maker",
            "seniority_level": "VP",
            "industry_match": true,
            "intent_from_comment": "high",
            "persona_fit_score": 82,
            "reasoning": "VP Sales asking for a tool"
        })
    )
}

fn bystander_reply() -> String {
    json!({
        "profile_type": "individual",
        "role_category": "irrelevant",
        "seniority_level": "Student",
        "industry_match": false,
        "intent_from_comment": "low",
        "persona_fit_score": 5,
        "reasoning": "Not a buyer"
    })
    .to_string()
}

fn route(prompt: &str) -> (u16, String) {
    if !prompt.contains("Target persona") {
        (200, post_reply())
    } else if prompt.contains("Name: Ana Buyer") {
        (200, buyer_reply())
    } else {
        (200, bystander_reply())
    }
}

fn client_for(addr: SocketAddr) -> LlmClient {
    LlmClient::new(
        "sk-test".into(),
        format!("http://{}/v1/", addr),
        "gpt-4o-mini".into(),
        5,
    )
    .unwrap()
}

fn persona() -> PersonaDefinition {
    PersonaDefinition {
        industries: vec!["SaaS".into()],
        job_titles: vec!["VP Sales".into()],
        seniority: vec!["VP".into()],
    }
}

#[tokio::test]
async fn test_llm_answers_are_parsed() {
    let (addr, seen) = mock_llm(route).await;
    let ai = AiAnalysisService::with_client(client_for(addr));
    assert!(ai.is_enabled());

    let insights = ai
        .analyze_post_content("Looking for a better outbound tool", "Outbound automation")
        .await;
    assert_eq!(insights.intent, "solution_seeking");
    assert_eq!(insights.topics, vec!["outbound", "SDR hiring"]);
    assert_eq!(insights.relevance_score, 88);
    assert_eq!(insights.summary.as_deref(), Some("Sales team looking for an outbound tool"));

    let evaluation = ai
        .evaluate_profile("Ana Buyer", "VP Sales at Globex", "Interested", &persona())
        .await;
    assert_eq!(evaluation.profile_type, ProfileType::Individual);
    assert_eq!(evaluation.role_category, RoleCategory::DecisionMaker);
    assert_eq!(evaluation.seniority_level, SeniorityLevel::Vp);
    assert!(evaluation.industry_match);
    assert_eq!(evaluation.intent_from_comment, IntentLevel::High);
    assert_eq!(evaluation.persona_fit_score, 82);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for (path, authorization, body) in seen.iter() {
        assert_eq!(path, "/v1/chat/completions");
        assert_eq!(authorization, "Bearer sk-test");
        assert_eq!(body["model"], json!("gpt-4o-mini"));
        assert_eq!(body["response_format"]["type"], json!("json_object"));
    }
    assert!(seen[1].2["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("Job titles: VP Sales"));
}

#[tokio::test]
async fn test_llm_error_falls_back_to_rules() {
    let (addr, _) = mock_llm(|_| (500, "overloaded".to_string())).await;
    let ai = AiAnalysisService::with_client(client_for(addr));

    let evaluation = ai
        .evaluate_profile("Ana Buyer", "VP Sales at Globex", "Interested", &persona())
        .await;
    assert_eq!(evaluation, AiAnalysisService::fallback_evaluation("VP Sales at Globex"));
    assert_eq!(evaluation.reasoning, FALLBACK_REASONING);

    let insights = ai.analyze_post_content("Any post", "").await;
    assert_eq!(insights.intent, "unknown");
    assert_eq!(insights.relevance_score, 50);
}

#[tokio::test]
async fn test_unparseable_llm_content_falls_back_to_rules() {
    let (addr, _) = mock_llm(|_| (200, "I think this person is a VP".to_string())).await;
    let ai = AiAnalysisService::with_client(client_for(addr));

    let evaluation = ai
        .evaluate_profile("Sam Student", "Student at State University", "", &persona())
        .await;
    assert_eq!(evaluation.role_category, RoleCategory::Irrelevant);
    assert_eq!(evaluation.persona_fit_score, 0);
    assert_eq!(evaluation.reasoning, FALLBACK_REASONING);
}

#[tokio::test]
async fn test_pipeline_uses_llm_scores() {
    let (addr, _) = mock_llm(route).await;
    let database = Database::in_memory().await.unwrap();
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
                definition: persona(),
            },
        )
        .await
        .unwrap();
    let posts = PostRepository::new(pool);
    let post = posts
        .create_pending("https://www.linkedin.com/posts/pat_123", org.id, Some(persona.id))
        .await
        .unwrap();

    let config = ServiceConfig {
        openai_api_key: Some("sk-test".into()),
        openai_base_url: format!("http://{}/v1", addr),
        ai_model: "gpt-4o-mini".into(),
        apify_token: None,
        apify_base_url: "http://127.0.0.1:9".into(),
        post_actor_id: None,
        public_base_url: "http://localhost:8000".into(),
        webhook_secret: None,
        timeout_seconds: 5,
    };
    let analysis = AnalysisService::new(
        database.clone(),
        Arc::new(AiAnalysisService::new(&config).unwrap()),
        Arc::new(ApifyService::new(&config).unwrap()),
        config,
    );

    let items = vec![json!({
        "postText": "We are hiring SDRs and looking for a better outbound tool",
        "author": { "name": "Pat Poster" },
        "comments": [
            {
                "text": "Interested, which tool do you use?",
                "author": {
                    "name": "Ana Buyer",
                    "headline": "VP Sales at Globex",
                    "profileUrl": "https://www.linkedin.com/in/ana-buyer"
                }
            },
            {
                "text": "Nice",
                "author": {
                    "name": "Sam Student",
                    "headline": "Student at State University",
                    "profileUrl": "https://www.linkedin.com/in/sam-student"
                }
            }
        ]
    })];

    let outcome = analysis.process_items(&post, &items).await.unwrap();
    assert_eq!(outcome.interactions, 2);
    assert_eq!(outcome.leads, 1);

    let stored = posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Completed);
    assert_eq!(stored.post_intent.as_deref(), Some("solution_seeking"));
    assert_eq!(stored.ai_insights.0["relevance_score"], json!(88));

    let interactions = posts.interactions_for(post.id).await.unwrap();
    let ana = interactions
        .iter()
        .find(|i| i.actor_name.as_deref() == Some("Ana Buyer"))
        .unwrap();
    // 82 fit plus the high-intent comment bonus
    assert_eq!(ana.relevance_score, 92);
    assert_eq!(ana.classification, Classification::High);
    assert!(ana.lead_id.is_some());

    let sam = interactions
        .iter()
        .find(|i| i.actor_name.as_deref() == Some("Sam Student"))
        .unwrap();
    assert_eq!(sam.classification, Classification::Irrelevant);
    assert!(sam.lead_id.is_none());
}
