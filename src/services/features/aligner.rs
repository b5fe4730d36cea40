//! Per-request feature alignment.
//!
//! Takes the raw tables loaded at startup and produces the matrix the active
//! group's model expects: user row broadcast across all candidate posts, time
//! features injected, columns reordered to the schema contract, categoricals
//! coerced to strings.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;

use super::{FeatureFrame, FeatureValue};
use crate::services::experiment::ExpGroup;
use crate::services::{RecsError, Result};

/// Columns never fed to a model: index artifacts and free text only used for
/// the response body.
const NON_FEATURE_COLUMNS: &[&str] = &["index", "text"];

/// One feature row per user, keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct UserFeatureTable {
    columns: Vec<String>,
    rows: HashMap<i64, Vec<FeatureValue>>,
}

impl UserFeatureTable {
    /// `columns` excludes the user id itself.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: HashMap::new(),
        }
    }

    pub fn insert(&mut self, user_id: i64, values: Vec<FeatureValue>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.insert(user_id, values);
    }

    pub fn get(&self, user_id: i64) -> Option<&[FeatureValue]> {
        self.rows.get(&user_id).map(Vec::as_slice)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All tables loaded once at startup and shared read-only across requests.
#[derive(Debug, Clone, Default)]
pub struct FeatureTables {
    pub users: UserFeatureTable,
    pub posts_control: FeatureFrame,
    pub posts_test: FeatureFrame,
    /// Post ids each user already liked; these are never re-recommended.
    pub liked: HashMap<i64, HashSet<i64>>,
}

impl FeatureTables {
    pub fn posts_for(&self, group: ExpGroup) -> &FeatureFrame {
        match group {
            ExpGroup::Control => &self.posts_control,
            ExpGroup::Test => &self.posts_test,
        }
    }

    pub fn liked_by(&self, user_id: i64) -> Option<&HashSet<i64>> {
        self.liked.get(&user_id)
    }
}

/// Display fields for one candidate post, kept apart from the scoring matrix.
/// Fields a group's table does not carry render as empty strings.
#[derive(Debug, Clone)]
pub struct PostContent {
    pub post_id: i64,
    pub text: String,
    pub topic: String,
}

/// Aligner output: the model-ready matrix plus the content projection used to
/// assemble the response, in the same row order.
#[derive(Debug)]
pub struct AlignedFeatures {
    pub matrix: FeatureFrame,
    pub content: Vec<PostContent>,
}

/// Build the aligned per-user feature matrix for `group`.
///
/// Fails soft with [`RecsError::UserNotFound`] when the user has no feature
/// row, and hard with [`RecsError::MissingFeatureColumns`] when the loaded
/// post table cannot satisfy the group's schema.
pub fn align(
    tables: &FeatureTables,
    user_id: i64,
    group: ExpGroup,
    time: NaiveDateTime,
) -> Result<AlignedFeatures> {
    let user_row = tables
        .users
        .get(user_id)
        .ok_or(RecsError::UserNotFound(user_id))?;

    let posts = tables.posts_for(group);
    let content = content_projection(posts);

    let mut matrix = posts.without_columns(NON_FEATURE_COLUMNS);

    // Broadcast the singular user row across every candidate post.
    for (column, value) in tables.users.columns().iter().zip(user_row) {
        matrix.broadcast(column, value.clone());
    }

    // Time features come from the caller-supplied request timestamp.
    matrix.broadcast("hour", FeatureValue::Int(i64::from(time.hour())));
    matrix.broadcast("month", FeatureValue::Int(i64::from(time.month())));

    let schema = group.schema();
    let mut matrix = matrix
        .select(schema.columns)
        .map_err(|columns| RecsError::MissingFeatureColumns { group, columns })?;
    matrix.stringify_columns(schema.categorical);

    debug!(
        user_id,
        group = %group,
        rows = matrix.len(),
        columns = matrix.columns().len(),
        "feature matrix aligned"
    );

    Ok(AlignedFeatures { matrix, content })
}

fn content_projection(posts: &FeatureFrame) -> Vec<PostContent> {
    (0..posts.len())
        .map(|row| PostContent {
            post_id: posts.index()[row],
            text: display_field(posts, row, "text"),
            topic: display_field(posts, row, "topic"),
        })
        .collect()
}

fn display_field(posts: &FeatureFrame, row: usize, column: &str) -> String {
    match posts.value(row, column) {
        None | Some(FeatureValue::Null) => String::new(),
        Some(value) => value.model_string(),
    }
}
