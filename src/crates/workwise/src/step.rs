//! The workflow step record produced by an analysis run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One business-process step with its efficiency assessment.
///
/// Serializes with exactly the keys `step_summary`, `efficiency_score` and
/// `explanation`; renderers depend on these names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Short (10 to 15 word) description of the step.
    pub step_summary: String,

    /// Efficiency on a 1 to 10 scale, lower is less efficient.
    pub efficiency_score: f64,

    /// Rationale for the score or an improvement suggestion.
    pub explanation: String,
}

impl WorkflowStep {
    pub fn new(
        step_summary: impl Into<String>,
        efficiency_score: f64,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            step_summary: step_summary.into(),
            efficiency_score,
            explanation: explanation.into(),
        }
    }

    /// Display band for this step's score.
    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_score(self.efficiency_score)
    }
}

/// Traffic-light grouping of efficiency scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    /// Below 4.
    Red,
    /// At least 4 and below 7.
    Amber,
    /// 7 and above.
    Green,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score < 4.0 {
            ScoreBand::Red
        } else if score < 7.0 {
            ScoreBand::Amber
        } else {
            ScoreBand::Green
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Red => f.write_str("red"),
            ScoreBand::Amber => f.write_str("amber"),
            ScoreBand::Green => f.write_str("green"),
        }
    }
}
