//! Settings that control how budget uploads are applied.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The default size limit for an uploaded file, 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Decides whether an uploaded row updates an existing budget or creates a
/// new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Ignore any `Id` column and match on product, expense category and day
    /// number.
    NaturalKey,
    /// Only rows with an `Id` update a budget, all other rows are created.
    ExplicitId,
    /// Match on `Id` when a row has one, otherwise on the natural key.
    #[default]
    IdThenNaturalKey,
}

impl MatchPolicy {
    /// The name stored alongside each upload.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::NaturalKey => "natural-key",
            MatchPolicy::ExplicitId => "explicit-id",
            MatchPolicy::IdThenNaturalKey => "id-then-natural-key",
        }
    }

    /// Whether a row's explicit budget ID is honoured.
    pub fn uses_id(&self) -> bool {
        matches!(self, MatchPolicy::ExplicitId | MatchPolicy::IdThenNaturalKey)
    }

    /// Whether rows without an explicit ID are matched on the natural key.
    pub fn uses_natural_key(&self) -> bool {
        matches!(self, MatchPolicy::NaturalKey | MatchPolicy::IdThenNaturalKey)
    }
}

/// The config for budget uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    /// How rows are matched against existing budgets.
    pub match_policy: MatchPolicy,
    /// The largest request body accepted by the upload endpoint.
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
