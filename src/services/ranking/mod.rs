pub mod model;
pub mod ranker;

pub use model::{LikeModel, OnnxLikeModel};
pub use ranker::{effective_limit, rank, ScoredPost, DEFAULT_LIMIT};
