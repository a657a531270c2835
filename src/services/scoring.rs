// src/services/scoring.rs
//! Turns a profile evaluation into a relevance score and classification

use super::ai_analysis::{IntentLevel, ProfileEvaluation, ProfileType, RoleCategory};
use crate::models::{Classification, InteractionType};

const INTENT_ADJUSTMENT: i64 = 10;
const HIGH_THRESHOLD: i64 = 75;
const MEDIUM_THRESHOLD: i64 = 50;
const IRRELEVANT_BELOW: i64 = 25;

/// Relevance score (0-100) and bucket for one interaction
pub fn score(evaluation: &ProfileEvaluation, interaction_type: InteractionType) -> (i64, Classification) {
    if evaluation.role_category == RoleCategory::Irrelevant {
        return (0, Classification::Irrelevant);
    }

    let mut score = evaluation.persona_fit_score.clamp(0, 100);
    if interaction_type == InteractionType::Comment {
        score += match evaluation.intent_from_comment {
            IntentLevel::High => INTENT_ADJUSTMENT,
            IntentLevel::Low => -INTENT_ADJUSTMENT,
            IntentLevel::Medium | IntentLevel::Unknown => 0,
        };
    }
    let score = score.clamp(0, 100);

    let classification = if score < IRRELEVANT_BELOW {
        Classification::Irrelevant
    } else if score >= HIGH_THRESHOLD {
        Classification::High
    } else if score >= MEDIUM_THRESHOLD {
        Classification::Medium
    } else {
        Classification::Low
    };

    (score, classification)
}

/// Only high and medium individuals become leads
pub fn qualifies_as_lead(classification: Classification, profile_type: ProfileType) -> bool {
    matches!(classification, Classification::High | Classification::Medium)
        && profile_type == ProfileType::Individual
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_analysis::{AiAnalysisService, SeniorityLevel};

    fn evaluation(fit: i64, intent: IntentLevel, role: RoleCategory) -> ProfileEvaluation {
        ProfileEvaluation {
            profile_type: ProfileType::Individual,
            role_category: role,
            seniority_level: SeniorityLevel::Vp,
            industry_match: true,
            intent_from_comment: intent,
            persona_fit_score: fit,
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_comment_intent_adjusts_score() {
        let high = evaluation(70, IntentLevel::High, RoleCategory::DecisionMaker);
        assert_eq!(score(&high, InteractionType::Comment), (80, Classification::High));
        assert_eq!(score(&high, InteractionType::Like), (70, Classification::Medium));

        let low = evaluation(55, IntentLevel::Low, RoleCategory::EndUser);
        assert_eq!(score(&low, InteractionType::Comment), (45, Classification::Low));
    }

    #[test]
    fn test_bounds_and_irrelevance() {
        let top = evaluation(98, IntentLevel::High, RoleCategory::DecisionMaker);
        assert_eq!(score(&top, InteractionType::Comment).0, 100);

        let weak = evaluation(24, IntentLevel::Medium, RoleCategory::Influencer);
        assert_eq!(score(&weak, InteractionType::Like), (24, Classification::Irrelevant));

        let excluded = evaluation(90, IntentLevel::High, RoleCategory::Irrelevant);
        assert_eq!(score(&excluded, InteractionType::Comment), (0, Classification::Irrelevant));
    }

    #[test]
    fn test_fallback_evaluations_score_as_medium_or_irrelevant() {
        let influencer = AiAnalysisService::fallback_evaluation("Head of Ops");
        assert_eq!(score(&influencer, InteractionType::Comment), (50, Classification::Medium));

        let student = AiAnalysisService::fallback_evaluation("Student at ETH");
        assert_eq!(score(&student, InteractionType::Like).1, Classification::Irrelevant);
    }

    #[test]
    fn test_lead_qualification() {
        assert!(qualifies_as_lead(Classification::High, ProfileType::Individual));
        assert!(qualifies_as_lead(Classification::Medium, ProfileType::Individual));
        assert!(!qualifies_as_lead(Classification::Low, ProfileType::Individual));
        assert!(!qualifies_as_lead(Classification::High, ProfileType::Company));
        assert!(!qualifies_as_lead(Classification::High, ProfileType::Unknown));
    }
}
