// src/repositories/mod.rs
//! Repository objects wrapping parameterized queries

pub mod activity_repo;
pub mod campaign_repo;
pub mod lead_repo;
pub mod organization_repo;
pub mod persona_repo;
pub mod post_repo;
pub mod user_repo;

pub use activity_repo::ActivityRepository;
pub use campaign_repo::CampaignRepository;
pub use lead_repo::LeadRepository;
pub use organization_repo::OrganizationRepository;
pub use persona_repo::PersonaRepository;
pub use post_repo::PostRepository;
pub use user_repo::UserRepository;
