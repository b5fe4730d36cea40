use std::sync::Arc;

use actix_web::{get, web, HttpResponse};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::Result;
use crate::services::recommendation::RecommendationService;

pub struct RecommendationHandlerState {
    pub service: Arc<RecommendationService>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub id: i64,
    /// Request timestamp, ISO-8601 (e.g. `2021-12-20T15:30:00`); its calendar
    /// fields feed the hour/month features.
    pub time: NaiveDateTime,
    pub limit: Option<i64>,
}

#[get("/post/recommendations/")]
pub async fn get_post_recommendations(
    query: web::Query<RecommendationsQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let response = state.service.recommend(query.id, query.time, query.limit)?;
    Ok(HttpResponse::Ok().json(response))
}
