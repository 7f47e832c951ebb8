//! Feature extraction
//!
//! Converts game logs and season aggregates into model-ready feature tables.

pub mod matchup;
pub mod player;
pub mod rolling;
pub mod stat_expr;
pub mod table;

pub use matchup::{matchup_features, matchup_table, MATCHUP_FEATURES};
pub use player::{OverUnderFeatures, AST_TOV_EPSILON, BASE_STATS};
pub use rolling::{rolling_mean, RollingWindow};
pub use stat_expr::StatExpr;
pub use table::{FeatureVector, LabeledTable};
