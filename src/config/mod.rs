use std::env;
use std::path::PathBuf;

use crate::services::experiment::ExpGroup;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub experiment: ExperimentConfig,
    pub model: ModelConfig,
    pub tables: TablesConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Salt mixed into the A/B hash. Changing it redistributes every user
    /// across arms; that is the sanctioned way to re-randomize.
    pub salt: String,
}

/// Where model artifacts are resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    /// Fixed in-container layout: `/models/model_{group}.onnx`.
    Container,
    /// Paths taken from `CONTROL_MODEL_PATH` / `TEST_MODEL_PATH`.
    Local,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub mode: ModelMode,
    pub control_path: PathBuf,
    pub test_path: PathBuf,
}

impl ModelConfig {
    pub fn path_for(&self, group: ExpGroup) -> PathBuf {
        match self.mode {
            ModelMode::Container => PathBuf::from(format!("/models/model_{group}.onnx")),
            ModelMode::Local => match group {
                ExpGroup::Control => self.control_path.clone(),
                ExpGroup::Test => self.test_path.clone(),
            },
        }
    }
}

/// Names of the source tables in the feature store.
#[derive(Debug, Clone)]
pub struct TablesConfig {
    pub user_features: String,
    pub posts_features_control: String,
    pub posts_features_test: String,
    pub feed_actions: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mode = match env::var("MODEL_MODE")
            .unwrap_or_else(|_| "local".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "container" => ModelMode::Container,
            _ => ModelMode::Local,
        };

        Ok(Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .expect("PORT must be a valid u16"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://postgres@localhost:5432/postgres".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("DATABASE_MAX_CONNECTIONS must be a valid u32"),
            },
            experiment: ExperimentConfig {
                salt: env::var("AB_SALT").unwrap_or_else(|_| "my_salt".to_string()),
            },
            model: ModelConfig {
                mode,
                control_path: env::var("CONTROL_MODEL_PATH")
                    .unwrap_or_else(|_| "models/model_control.onnx".to_string())
                    .into(),
                test_path: env::var("TEST_MODEL_PATH")
                    .unwrap_or_else(|_| "models/model_test.onnx".to_string())
                    .into(),
            },
            tables: TablesConfig {
                user_features: env::var("USER_FEATURES_TABLE")
                    .unwrap_or_else(|_| "user_features".to_string()),
                posts_features_control: env::var("POSTS_FEATURES_CONTROL_TABLE")
                    .unwrap_or_else(|_| "posts_features_control".to_string()),
                posts_features_test: env::var("POSTS_FEATURES_TEST_TABLE")
                    .unwrap_or_else(|_| "posts_features_test".to_string()),
                feed_actions: env::var("FEED_ACTIONS_TABLE")
                    .unwrap_or_else(|_| "feed_data".to_string()),
            },
        })
    }
}
