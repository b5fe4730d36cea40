//! End-to-end pipeline tests over in-memory tables and a deterministic stub
//! model. No database or model artifact is required.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use post_recommendation_service::services::experiment::{assign_group, ExpGroup};
use post_recommendation_service::services::features::aligner::{FeatureTables, UserFeatureTable};
use post_recommendation_service::services::features::{FeatureFrame, FeatureValue};
use post_recommendation_service::services::ranking::LikeModel;
use post_recommendation_service::services::recommendation::RecommendationService;
use post_recommendation_service::services::{RecsError, Result};

const USER_COLUMNS: &[&str] = &["gender", "age", "country", "city", "exp_group", "os", "source"];

/// Deterministic stand-in for the classifiers: p(like) grows with post id.
struct PostIdScorer;

impl LikeModel for PostIdScorer {
    fn predict_proba(&self, matrix: &FeatureFrame) -> Result<Vec<f32>> {
        Ok(matrix
            .index()
            .iter()
            .map(|&id| (id % 1000) as f32 / 1000.0)
            .collect())
    }
}

fn user_table(user_ids: &[i64], columns: &[&str]) -> UserFeatureTable {
    let mut users = UserFeatureTable::new(columns.iter().map(|c| c.to_string()).collect());
    for &id in user_ids {
        let row = columns
            .iter()
            .map(|column| match *column {
                "gender" => FeatureValue::Int(1),
                "age" => FeatureValue::Int(27),
                "exp_group" => FeatureValue::Int(4),
                _ => FeatureValue::Text(format!("{column}_value")),
            })
            .collect();
        users.insert(id, row);
    }
    users
}

fn posts_frame(group: ExpGroup, post_ids: &[i64], with_text: bool) -> FeatureFrame {
    let feature_columns: Vec<String> = group
        .schema()
        .columns
        .iter()
        .filter(|&&c| !USER_COLUMNS.contains(&c) && c != "hour" && c != "month")
        .map(|&c| c.to_string())
        .collect();

    let mut columns = feature_columns.clone();
    if with_text {
        columns.push("text".into());
    }
    let mut frame = FeatureFrame::new(columns);

    for &post_id in post_ids {
        let mut row: Vec<FeatureValue> = feature_columns
            .iter()
            .map(|column| match column.as_str() {
                "topic" => FeatureValue::Text("movies".into()),
                "TextCluster" => FeatureValue::Int(5),
                _ => FeatureValue::Float(0.5),
            })
            .collect();
        if with_text {
            row.push(FeatureValue::Text(format!("text of {post_id}")));
        }
        frame.push_row(post_id, row);
    }
    frame
}

fn tables(user_ids: &[i64], post_ids: &[i64]) -> FeatureTables {
    FeatureTables {
        users: user_table(user_ids, USER_COLUMNS),
        // Control tables carry raw text, test tables do not.
        posts_control: posts_frame(ExpGroup::Control, post_ids, true),
        posts_test: posts_frame(ExpGroup::Test, post_ids, false),
        liked: HashMap::new(),
    }
}

fn service(tables: FeatureTables, salt: &str) -> RecommendationService {
    RecommendationService::new(tables, Box::new(PostIdScorer), Box::new(PostIdScorer), salt)
}

fn request_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 12, 20)
        .unwrap()
        .and_hms_opt(15, 30, 0)
        .unwrap()
}

// Scenario A: the assignment of a known user under the default salt is pinned.
#[test]
fn user_1000_is_assigned_to_test_under_default_salt() {
    assert_eq!(assign_group(1000, "my_salt"), ExpGroup::Test);
}

// Scenario B: unknown users get an empty list but still learn their arm.
#[test]
fn unknown_user_yields_empty_list_with_group_label() {
    let svc = service(tables(&[], &[100, 101, 102]), "my_salt");

    let response = svc.recommend(1000, request_time(), None).unwrap();
    assert_eq!(response.exp_group, ExpGroup::Test);
    assert!(response.recommendations.is_empty());

    let response = svc.recommend(42, request_time(), None).unwrap();
    assert_eq!(response.exp_group, ExpGroup::Control);
    assert!(response.recommendations.is_empty());
}

// Scenario C: a control-side table with no age column must fail hard and name
// exactly the missing column.
#[test]
fn missing_age_column_fails_hard() {
    let user_columns: Vec<&str> = USER_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != "age")
        .collect();
    let t = FeatureTables {
        users: user_table(&[42], &user_columns),
        posts_control: posts_frame(ExpGroup::Control, &[100, 101], true),
        posts_test: posts_frame(ExpGroup::Test, &[100, 101], false),
        liked: HashMap::new(),
    };
    let svc = service(t, "my_salt");

    // User 42 is in the control arm under "my_salt".
    let err = svc.recommend(42, request_time(), None).unwrap_err();
    match err {
        RecsError::MissingFeatureColumns { group, columns } => {
            assert_eq!(group, ExpGroup::Control);
            assert_eq!(columns, vec!["age".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// Scenario D: limit=5 over 20 candidates with 3 pre-liked leaves exactly 5,
// none of them liked, sorted by score descending.
#[test]
fn limit_and_exclusion_interact_correctly() {
    let post_ids: Vec<i64> = (200..220).collect();
    let mut t = tables(&[42], &post_ids);
    let liked: Vec<i64> = vec![219, 218, 217];
    t.liked.insert(42, liked.iter().copied().collect());
    let svc = service(t, "my_salt");

    let response = svc.recommend(42, request_time(), Some(5)).unwrap();
    let ids: Vec<i64> = response.recommendations.iter().map(|p| p.id).collect();

    assert_eq!(ids.len(), 5);
    for excluded in liked {
        assert!(!ids.contains(&excluded));
    }
    // PostIdScorer scores grow with post id, so the top 5 survivors are the
    // highest non-liked ids in descending order.
    assert_eq!(ids, vec![216, 215, 214, 213, 212]);
}

// Scenario E: changing the salt moves at least one user between arms.
#[test]
fn salt_change_moves_users_between_arms() {
    let moved = (0..500).any(|id| assign_group(id, "my_salt") != assign_group(id, "other_salt"));
    assert!(moved);

    let svc_a = service(tables(&[1000], &[100]), "my_salt");
    let svc_b = service(tables(&[1000], &[100]), "other_salt");
    assert_eq!(
        svc_a.recommend(1000, request_time(), None).unwrap().exp_group,
        ExpGroup::Test
    );
    assert_eq!(
        svc_b.recommend(1000, request_time(), None).unwrap().exp_group,
        ExpGroup::Control
    );
}

#[test]
fn control_response_carries_text_and_test_response_does_not() {
    let svc = service(tables(&[42, 204], &[300, 301]), "my_salt");

    // Control arm: text column exists in the source table.
    let control = svc.recommend(42, request_time(), None).unwrap();
    assert_eq!(control.exp_group, ExpGroup::Control);
    assert_eq!(control.recommendations[0].text, "text of 301");

    // Test arm: no text column; the field renders as an empty string.
    let test = svc.recommend(204, request_time(), None).unwrap();
    assert_eq!(test.exp_group, ExpGroup::Test);
    assert_eq!(test.recommendations[0].text, "");
    assert_eq!(test.recommendations[0].topic, "movies");
}

#[test]
fn response_serializes_to_the_wire_shape() {
    let svc = service(tables(&[42], &[300]), "my_salt");
    let response = svc.recommend(42, request_time(), Some(1)).unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["exp_group"], "control");
    assert_eq!(json["recommendations"][0]["id"], 300);
    assert_eq!(json["recommendations"][0]["topic"], "movies");
    assert!(json["recommendations"][0]["text"].is_string());
}

#[test]
fn repeated_requests_are_identical() {
    let svc = service(tables(&[42], &[100, 101, 102]), "my_salt");
    let first = svc.recommend(42, request_time(), None).unwrap();
    for _ in 0..5 {
        let again = svc.recommend(42, request_time(), None).unwrap();
        assert_eq!(again.exp_group, first.exp_group);
        let a: Vec<i64> = again.recommendations.iter().map(|p| p.id).collect();
        let b: Vec<i64> = first.recommendations.iter().map(|p| p.id).collect();
        assert_eq!(a, b);
    }
}
