//! One-shot loading of the feature store tables.
//!
//! All three tables are pulled into memory during startup and never touched
//! again; requests only read the resulting [`FeatureTables`]. The feature
//! tables have a dynamic schema (the column set is whatever the offline
//! feature pipeline produced), so rows are decoded cell by cell from the
//! Postgres type info instead of into fixed structs.

use std::collections::{HashMap, HashSet};

use futures::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tracing::{info, warn};

use crate::config::TablesConfig;
use crate::error::{AppError, Result};
use crate::services::features::aligner::{FeatureTables, UserFeatureTable};
use crate::services::features::{FeatureFrame, FeatureValue};

/// Rows per logged chunk while streaming the engagement log.
const CHUNK_SIZE: usize = 200_000;

pub struct FeatureRepository {
    pool: PgPool,
}

impl FeatureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load every table the pipeline needs. Any failure here aborts startup.
    pub async fn load_all(&self, tables: &TablesConfig) -> Result<FeatureTables> {
        info!("loading liked posts");
        let liked = self.load_liked_posts(&tables.feed_actions).await?;
        info!(users = liked.len(), "liked posts loaded");

        info!(table = %tables.user_features, "loading user features");
        let users = self.load_user_features(&tables.user_features).await?;
        info!(rows = users.len(), "user features loaded");

        info!(table = %tables.posts_features_control, "loading post features (control)");
        let posts_control = self.load_post_features(&tables.posts_features_control).await?;
        info!(rows = posts_control.len(), "control post features loaded");

        info!(table = %tables.posts_features_test, "loading post features (test)");
        let posts_test = self.load_post_features(&tables.posts_features_test).await?;
        info!(rows = posts_test.len(), "test post features loaded");

        Ok(FeatureTables {
            users,
            posts_control,
            posts_test,
            liked,
        })
    }

    /// Distinct (post, user) like pairs, streamed in chunks to bound memory.
    async fn load_liked_posts(&self, table: &str) -> Result<HashMap<i64, HashSet<i64>>> {
        let query =
            format!("SELECT DISTINCT post_id, user_id FROM {table} WHERE action = 'like'");
        let mut rows = sqlx::query(&query).fetch(&self.pool);

        let mut liked: HashMap<i64, HashSet<i64>> = HashMap::new();
        let mut loaded = 0usize;
        while let Some(row) = rows.try_next().await? {
            let post_id = decode_id(&row, "post_id")?;
            let user_id = decode_id(&row, "user_id")?;
            liked.entry(user_id).or_default().insert(post_id);

            loaded += 1;
            if loaded % CHUNK_SIZE == 0 {
                info!(rows = loaded, "received chunk of liked posts");
            }
        }
        info!(rows = loaded, "finished streaming liked posts");
        Ok(liked)
    }

    async fn load_user_features(&self, table: &str) -> Result<UserFeatureTable> {
        let rows = sqlx::query(&format!("SELECT * FROM {table}"))
            .fetch_all(&self.pool)
            .await?;

        let Some(first) = rows.first() else {
            warn!(table, "user feature table is empty");
            return Ok(UserFeatureTable::default());
        };

        let columns: Vec<String> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .filter(|name| name != "user_id")
            .collect();
        let mut users = UserFeatureTable::new(columns.clone());

        for row in &rows {
            let user_id = decode_id(row, "user_id")?;
            let values = decode_named(row, &columns);
            users.insert(user_id, values);
        }
        Ok(users)
    }

    async fn load_post_features(&self, table: &str) -> Result<FeatureFrame> {
        let rows = sqlx::query(&format!("SELECT * FROM {table}"))
            .fetch_all(&self.pool)
            .await?;

        let Some(first) = rows.first() else {
            warn!(table, "post feature table is empty");
            return Ok(FeatureFrame::default());
        };

        let columns: Vec<String> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .filter(|name| name != "post_id")
            .collect();
        let mut frame = FeatureFrame::new(columns.clone());

        for row in &rows {
            let post_id = decode_id(row, "post_id")?;
            frame.push_row(post_id, decode_named(row, &columns));
        }
        Ok(frame)
    }
}

fn decode_named(row: &PgRow, columns: &[String]) -> Vec<FeatureValue> {
    columns
        .iter()
        .map(|name| {
            row.columns()
                .iter()
                .position(|c| c.name() == name)
                .map(|idx| decode_cell(row, idx))
                .unwrap_or(FeatureValue::Null)
        })
        .collect()
}

fn decode_id(row: &PgRow, column: &str) -> Result<i64> {
    let idx = row
        .columns()
        .iter()
        .position(|c| c.name() == column)
        .ok_or_else(|| AppError::Database(format!("column {column} not in result set")))?;
    match decode_cell(row, idx) {
        FeatureValue::Int(id) => Ok(id),
        other => Err(AppError::Database(format!(
            "column {column} is not an integer id: {other:?}"
        ))),
    }
}

/// Decode one cell by its Postgres type. Unknown types fall back to their
/// text form; undecodable cells become nulls so a single bad value cannot
/// take down startup.
fn decode_cell(row: &PgRow, idx: usize) -> FeatureValue {
    match row.column(idx).type_info().name() {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .ok()
            .flatten()
            .map(|v| FeatureValue::Int(v.into()))
            .unwrap_or(FeatureValue::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .ok()
            .flatten()
            .map(|v| FeatureValue::Int(v.into()))
            .unwrap_or(FeatureValue::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(FeatureValue::Int)
            .unwrap_or(FeatureValue::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .map(|v| FeatureValue::Float(v.into()))
            .unwrap_or(FeatureValue::Null),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(FeatureValue::Float)
            .unwrap_or(FeatureValue::Null),
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(|v| FeatureValue::Int(v.into()))
            .unwrap_or(FeatureValue::Null),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(FeatureValue::Text)
            .unwrap_or(FeatureValue::Null),
    }
}
