// src/services/mod.rs
pub mod ai_analysis;
pub mod analysis;
pub mod apify;
pub mod dataset;
pub mod llm_client;
pub mod scoring;
pub mod user_service;

pub use ai_analysis::AiAnalysisService;
pub use analysis::AnalysisService;
pub use apify::ApifyService;
pub use llm_client::LlmClient;
pub use user_service::UserService;
