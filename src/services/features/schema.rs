//! Per-group feature contracts.
//!
//! Each classifier was trained on a fixed, ordered column list; the order is
//! load-bearing, not cosmetic. The two groups differ in their cluster-distance
//! feature naming and in whether raw text survives into the content projection.

/// Ordered feature contract for one experiment arm.
#[derive(Debug)]
pub struct FeatureSchema {
    /// Exact column order the model expects.
    pub columns: &'static [&'static str],
    /// Columns coerced to strings before scoring, nulls mapped to `"nan"`.
    pub categorical: &'static [&'static str],
}

impl FeatureSchema {
    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical.contains(&column)
    }
}

pub static CONTROL_SCHEMA: FeatureSchema = FeatureSchema {
    columns: &[
        "topic",
        "TotalTfIdf",
        "MaxTfIdf",
        "MeanTfIdf",
        "TextCluster",
        "DistanceTo1thCluster",
        "DistanceTo2thCluster",
        "DistanceTo3thCluster",
        "DistanceTo4thCluster",
        "DistanceTo5thCluster",
        "DistanceTo6thCluster",
        "DistanceTo7thCluster",
        "DistanceTo8thCluster",
        "DistanceTo9thCluster",
        "DistanceTo10thCluster",
        "DistanceTo11thCluster",
        "DistanceTo12thCluster",
        "DistanceTo13thCluster",
        "DistanceTo14thCluster",
        "DistanceTo15thCluster",
        "gender",
        "age",
        "country",
        "city",
        "exp_group",
        "os",
        "source",
        "hour",
        "month",
    ],
    categorical: CATEGORICAL_COLUMNS,
};

pub static TEST_SCHEMA: FeatureSchema = FeatureSchema {
    columns: &[
        "hour",
        "month",
        "gender",
        "age",
        "country",
        "city",
        "exp_group",
        "os",
        "source",
        "topic",
        "TextCluster",
        "DistanceToCluster_0",
        "DistanceToCluster_1",
        "DistanceToCluster_2",
        "DistanceToCluster_3",
        "DistanceToCluster_4",
        "DistanceToCluster_5",
        "DistanceToCluster_6",
        "DistanceToCluster_7",
        "DistanceToCluster_8",
        "DistanceToCluster_9",
        "DistanceToCluster_10",
        "DistanceToCluster_11",
        "DistanceToCluster_12",
        "DistanceToCluster_13",
        "DistanceToCluster_14",
    ],
    categorical: CATEGORICAL_COLUMNS,
};

// Both models share the same categorical set.
const CATEGORICAL_COLUMNS: &[&str] = &[
    "topic",
    "TextCluster",
    "gender",
    "country",
    "city",
    "exp_group",
    "hour",
    "month",
    "os",
    "source",
];
