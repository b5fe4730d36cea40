//! Per-request recommendation pipeline.
//!
//! The service is built once at startup with all tables and both models and is
//! shared read-only across requests; a request never mutates it. Each call
//! runs assignment, alignment, scoring and ranking in sequence.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::models::{PostGet, RecommendationsResponse};
use crate::services::experiment::{assign_group, ExpGroup};
use crate::services::features::aligner::{align, FeatureTables};
use crate::services::ranking::{effective_limit, rank, LikeModel, ScoredPost};
use crate::services::{RecsError, Result};

pub struct RecommendationService {
    tables: FeatureTables,
    model_control: Box<dyn LikeModel>,
    model_test: Box<dyn LikeModel>,
    salt: String,
}

impl RecommendationService {
    pub fn new(
        tables: FeatureTables,
        model_control: Box<dyn LikeModel>,
        model_test: Box<dyn LikeModel>,
        salt: impl Into<String>,
    ) -> Self {
        Self {
            tables,
            model_control,
            model_test,
            salt: salt.into(),
        }
    }

    fn model_for(&self, group: ExpGroup) -> &dyn LikeModel {
        match group {
            ExpGroup::Control => self.model_control.as_ref(),
            ExpGroup::Test => self.model_test.as_ref(),
        }
    }

    /// Produce the top-`limit` recommendations for a user.
    ///
    /// An unknown user yields an empty list that still carries the resolved
    /// experiment arm; schema mismatches and inference failures are hard
    /// errors.
    pub fn recommend(
        &self,
        user_id: i64,
        time: NaiveDateTime,
        limit: Option<i64>,
    ) -> Result<RecommendationsResponse> {
        let group = assign_group(user_id, &self.salt);
        info!(user_id, group = %group, "serving recommendation request");

        let aligned = match align(&self.tables, user_id, group, time) {
            Ok(aligned) => aligned,
            Err(RecsError::UserNotFound(id)) => {
                warn!(user_id = id, "user has no feature row, returning empty result");
                return Ok(RecommendationsResponse {
                    exp_group: group,
                    recommendations: Vec::new(),
                });
            }
            Err(err) => return Err(err),
        };

        let scores = self.model_for(group).predict_proba(&aligned.matrix)?;
        if scores.len() != aligned.matrix.len() {
            return Err(RecsError::Inference(format!(
                "model returned {} scores for {} rows",
                scores.len(),
                aligned.matrix.len()
            )));
        }

        let scored: Vec<ScoredPost> = aligned
            .matrix
            .index()
            .iter()
            .zip(scores)
            .map(|(&post_id, score)| ScoredPost { post_id, score })
            .collect();

        let no_likes = HashSet::new();
        let excluded = self.tables.liked_by(user_id).unwrap_or(&no_likes);
        let top = rank(scored, excluded, effective_limit(limit));

        let content: HashMap<i64, &_> = aligned
            .content
            .iter()
            .map(|post| (post.post_id, post))
            .collect();
        let recommendations = top
            .iter()
            .filter_map(|candidate| content.get(&candidate.post_id))
            .map(|post| PostGet {
                id: post.post_id,
                text: post.text.clone(),
                topic: post.topic.clone(),
            })
            .collect();

        Ok(RecommendationsResponse {
            exp_group: group,
            recommendations,
        })
    }
}
