use super::common::*;
use serde_json::json;

use crate::store::Repository;
use crate::workflows::matching::criteria_for;

#[tokio::test]
async fn ranked_matches_are_resolved_against_the_catalog() {
    let reasoner = ScriptedReasoner::replying(json!({
        "matches": [
            { "course_id": "crs-2", "fit_score": 70, "reasons": ["Budget fit"] },
            { "course_id": "crs-1", "fit_score": 92, "reasons": ["Field match", "Budget fit"] },
            { "course_id": "crs-9", "fit_score": 99, "reasons": ["Invented"] },
            { "course_id": "crs-1", "fit_score": 50, "reasons": ["Repeated"] }
        ],
        "summary": "Two strong options in Canada and Australia."
    }));
    let (service, _) = build_service(reasoner.clone());

    let result = service.match_courses("stu-1").await.expect("matches");

    assert_eq!(result.candidates_considered, 2);
    let ids: Vec<_> = result.matches.iter().map(|m| m.course_id.as_str()).collect();
    assert_eq!(ids, vec!["crs-1", "crs-2"]);
    assert_eq!(result.matches[0].fit_score, 92);
    assert_eq!(
        result.matches[0].university_name.as_deref(),
        Some("Harbour University")
    );
    assert_eq!(result.matches[1].country, "Australia");

    let prompt = &reasoner.prompts()[0].prompt;
    assert!(prompt.contains("MSc Computer Science"));
    assert!(!prompt.contains("MBA"), "over-budget course must be filtered out");
    assert!(!prompt.contains("MSc Informatics"));
}

#[tokio::test]
async fn no_eligible_courses_skips_the_reasoner() {
    let reasoner = ScriptedReasoner::replying(json!({ "matches": [], "summary": "" }));
    let (service, _) = build_service(reasoner.clone());

    let result = service.match_courses("stu-4").await.expect("empty result");

    assert_eq!(result.candidates_considered, 0);
    assert!(result.matches.is_empty());
    assert_eq!(reasoner.calls(), 0);
}

#[test]
fn criteria_follow_the_student_profile() {
    let student = &students()[0];
    let criteria = criteria_for(student);
    assert_eq!(criteria.max_tuition, Some(30_000));
    assert_eq!(criteria.preferred_countries, vec!["Canada", "Australia"]);
    assert!(criteria.status.is_all());
}

#[tokio::test]
async fn scholarships_ignore_budget_and_drop_unknown_courses() {
    let reasoner = ScriptedReasoner::replying(json!({
        "matches": [
            {
                "name": "Harbour Entrance Award",
                "provider": "Harbour University",
                "course_id": "crs-3",
                "estimated_amount": 10000,
                "fit_score": 64,
                "rationale": "Offsets most of the MBA tuition gap",
                "deadline": null
            },
            {
                "name": "Alpine Merit Grant",
                "provider": "Alpine Institute",
                "course_id": "crs-4",
                "estimated_amount": null,
                "fit_score": 40,
                "rationale": "Outside preferred destinations",
                "deadline": "2025-11-30"
            },
            {
                "name": "Global Talent Scholarship",
                "provider": "Government of Canada",
                "course_id": null,
                "estimated_amount": 15000,
                "fit_score": 88,
                "rationale": "Strong GPA",
                "deadline": null
            }
        ],
        "summary": "Three possible awards."
    }));
    let (service, store) = build_service(reasoner.clone());

    let recommendation = service
        .recommend_scholarships("stu-1")
        .await
        .expect("recommendation");

    let names: Vec<_> = recommendation
        .matches
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Global Talent Scholarship",
            "Harbour Entrance Award",
            "Alpine Merit Grant"
        ]
    );
    assert_eq!(recommendation.matches[1].course_id.as_deref(), Some("crs-3"));
    assert_eq!(recommendation.matches[2].course_id, None);
    assert_eq!(store.scholarships.list(10).expect("stored").len(), 1);

    let prompt = &reasoner.prompts()[0].prompt;
    assert!(prompt.contains("MBA"));
    assert!(!prompt.contains("Master of Data Science"));
}
