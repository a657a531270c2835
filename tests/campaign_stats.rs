use leadscope::core::Database;
use leadscope::models::{CampaignStatus, CampaignType, NewCampaign};
use leadscope::repositories::{CampaignRepository, OrganizationRepository};
use uuid::Uuid;

async fn setup() -> (Database, Uuid) {
    let database = Database::in_memory().await.unwrap();
    let org = OrganizationRepository::new(database.pool())
        .create("Acme", None)
        .await
        .unwrap();
    (database, org.id)
}

fn new_campaign(name: &str, campaign_type: CampaignType, status: CampaignStatus) -> NewCampaign {
    NewCampaign {
        name: name.to_string(),
        campaign_type,
        status: Some(status),
    }
}

async fn set_counts(database: &Database, id: Uuid, leads: i64, contacted: i64, replied: i64) {
    sqlx::query(
        "UPDATE campaigns SET leads_count = ?, contacted_count = ?, replied_count = ? WHERE id = ?",
    )
    .bind(leads)
    .bind(contacted)
    .bind(replied)
    .bind(id)
    .execute(database.pool())
    .await
    .unwrap();
}

#[tokio::test]
async fn test_global_stats_aggregate_per_org() {
    let (database, org_id) = setup().await;
    let repo = CampaignRepository::new(database.pool());

    let social = repo
        .create(org_id, &new_campaign("LinkedIn", CampaignType::Social, CampaignStatus::Active))
        .await
        .unwrap();
    let email = repo
        .create(org_id, &new_campaign("Email", CampaignType::Email, CampaignStatus::Running))
        .await
        .unwrap();
    let calls = repo
        .create(org_id, &new_campaign("Calls", CampaignType::AiCall, CampaignStatus::Paused))
        .await
        .unwrap();

    set_counts(&database, social.id, 40, 30, 10).await;
    set_counts(&database, email.id, 20, 15, 3).await;
    set_counts(&database, calls.id, 5, 5, 0).await;

    // Another organization must not leak into the totals
    let other = OrganizationRepository::new(database.pool())
        .create("Globex", None)
        .await
        .unwrap();
    let foreign = repo
        .create(other.id, &new_campaign("Foreign", CampaignType::Social, CampaignStatus::Active))
        .await
        .unwrap();
    set_counts(&database, foreign.id, 100, 100, 100).await;

    let stats = repo.get_global_stats(org_id).await.unwrap();
    assert_eq!(stats.active_campaigns, 1);
    assert_eq!(stats.total_contacted, 50);
    assert_eq!(stats.total_leads, 65);
    // 13 replies over 50 contacted
    assert_eq!(stats.avg_reply_rate, 26.0);
    assert_eq!(stats.meetings_booked, 3);
    assert_eq!(stats.channels.linkedin, 1);
    assert_eq!(stats.channels.email, 1);
    assert_eq!(stats.channels.ai_call, 0);
}

#[tokio::test]
async fn test_global_stats_empty_org() {
    let (database, org_id) = setup().await;
    let stats = CampaignRepository::new(database.pool())
        .get_global_stats(org_id)
        .await
        .unwrap();

    assert_eq!(stats.active_campaigns, 0);
    assert_eq!(stats.total_contacted, 0);
    assert_eq!(stats.avg_reply_rate, 0.0);
    assert_eq!(stats.meetings_booked, 0);
}

#[tokio::test]
async fn test_pause_and_resume_keep_start_time() {
    let (database, org_id) = setup().await;
    let repo = CampaignRepository::new(database.pool());
    let campaign = repo
        .create(org_id, &new_campaign("Q3", CampaignType::Social, CampaignStatus::Draft))
        .await
        .unwrap();
    assert!(campaign.started_at.is_none());

    let active = repo
        .update_status(campaign.id, CampaignStatus::Active)
        .await
        .unwrap()
        .unwrap();
    let started = active.started_at.unwrap();

    let paused = repo
        .update_status(campaign.id, CampaignStatus::Paused)
        .await
        .unwrap()
        .unwrap();
    assert!(paused.paused_at.is_some());

    let resumed = repo
        .update_status(campaign.id, CampaignStatus::Active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resumed.started_at, Some(started));
    assert!(resumed.paused_at.is_none());
    assert!(resumed.last_resumed_at.is_some());

    let stored = repo.get(campaign.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Active);
    assert_eq!(stored.started_at, Some(started));
}

#[tokio::test]
async fn test_increment_and_delete() {
    let (database, org_id) = setup().await;
    let repo = CampaignRepository::new(database.pool());
    let campaign = repo
        .create(org_id, &new_campaign("Q3", CampaignType::Email, CampaignStatus::Draft))
        .await
        .unwrap();

    assert!(repo.increment_leads_count(campaign.id, 2).await.unwrap());
    assert!(repo.increment_leads_count(campaign.id, 3).await.unwrap());
    let stats = repo.get_stats(campaign.id).await.unwrap().unwrap();
    assert_eq!(stats.leads_count, 5);

    assert!(repo.delete(campaign.id).await.unwrap());
    assert!(!repo.delete(campaign.id).await.unwrap());
    assert!(repo.get(campaign.id).await.unwrap().is_none());
    assert!(!repo.increment_leads_count(campaign.id, 1).await.unwrap());
}
