use serde::Serialize;

use crate::services::experiment::ExpGroup;

/// One recommended post as rendered in the response body. Display fields a
/// group's table does not carry are empty strings, never null.
#[derive(Debug, Clone, Serialize)]
pub struct PostGet {
    pub id: i64,
    pub text: String,
    pub topic: String,
}

/// Response of `GET /post/recommendations/`. The experiment arm is always
/// present so callers can tell which model served the request, even when the
/// list is empty.
#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub exp_group: ExpGroup,
    pub recommendations: Vec<PostGet>,
}
