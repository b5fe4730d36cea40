//! Deterministic A/B assignment.
//!
//! Users are split 50/50 into control/test with consistent hashing so that the
//! same (user_id, salt) pair always lands in the same experiment arm, across
//! restarts and across service instances. Changing the salt is the only
//! sanctioned way to reshuffle the population.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::features::schema::{FeatureSchema, CONTROL_SCHEMA, TEST_SCHEMA};
use super::RecsError;

/// Experiment arm a user is bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpGroup {
    Control,
    Test,
}

impl ExpGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpGroup::Control => "control",
            ExpGroup::Test => "test",
        }
    }

    /// Feature contract the group's classifier was trained against.
    pub fn schema(&self) -> &'static FeatureSchema {
        match self {
            ExpGroup::Control => &CONTROL_SCHEMA,
            ExpGroup::Test => &TEST_SCHEMA,
        }
    }
}

impl fmt::Display for ExpGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpGroup {
    type Err = RecsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "control" => Ok(ExpGroup::Control),
            "test" => Ok(ExpGroup::Test),
            other => Err(RecsError::UnknownGroup(other.to_string())),
        }
    }
}

/// Assign a user to an experiment arm.
///
/// Hashes `"{user_id}{salt}"` with md5, reads the digest as a big-endian
/// unsigned integer and takes it modulo 100: buckets [0,50) are control,
/// [50,100) are test. The mapping is bit-for-bit compatible with the existing
/// `int(md5(...).hexdigest(), 16) % 100` assignment, so already-bucketed users
/// keep their arm.
pub fn assign_group(user_id: i64, salt: &str) -> ExpGroup {
    let digest = md5::compute(format!("{user_id}{salt}"));
    // Modular reduction of the 128-bit digest, byte by byte, is equivalent to
    // reducing the full big-endian integer.
    let bucket = digest
        .0
        .iter()
        .fold(0u64, |acc, &byte| (acc * 256 + u64::from(byte)) % 100);
    if bucket < 50 {
        ExpGroup::Control
    } else {
        ExpGroup::Test
    }
}
