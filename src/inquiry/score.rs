//! Epistemic balance score.
//!
//! A heuristic, not a validated metric. Each component is normalized by a
//! fixed denominator and clamped to [0, 1]; the score is the mean of the
//! active components rounded to three decimals.

use serde::{Deserialize, Serialize};

use super::{tree_depth, ReasoningLog};

const BASIC_DEPTH_SCALE: f64 = 5.0;
const EXTENDED_DEPTH_SCALE: f64 = 6.0;
const PLURALITY_SCALE: f64 = 3.0;
const REVERSIBILITY_SCALE: f64 = 2.0;
const TRACEABILITY_SCALE: f64 = 12.0;

/// Which set of components to compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreVariant {
    /// Depth, plurality and reformulation count.
    #[default]
    Basic,
    /// Adds traceability and dispute robustness; reversibility follows
    /// state and focus changes instead of the reformulation count.
    Extended,
}

impl std::str::FromStr for ScoreVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(ScoreVariant::Basic),
            "extended" => Ok(ScoreVariant::Extended),
            _ => Err(format!("Unknown score variant: {}", s)),
        }
    }
}

/// Component scores and their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceScore {
    pub variant: ScoreVariant,
    pub depth: f64,
    pub plurality: f64,
    pub reversibility: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_robustness: Option<f64>,
    pub score: f64,
}

impl BalanceScore {
    /// Compute the score for a log snapshot
    pub fn compute(log: &ReasoningLog, variant: ScoreVariant) -> Self {
        let depth = tree_depth(log.inquiry()) as f64;
        let plurality = plurality_score(log);

        match variant {
            ScoreVariant::Basic => {
                let depth_score = normalized(depth, BASIC_DEPTH_SCALE);
                let reversibility = normalized(log.focus().len() as f64, REVERSIBILITY_SCALE);
                Self {
                    variant,
                    depth: depth_score,
                    plurality,
                    reversibility,
                    traceability: None,
                    dispute_robustness: None,
                    score: mean_rounded(&[depth_score, plurality, reversibility]),
                }
            }
            ScoreVariant::Extended => {
                let depth_score = normalized(depth, EXTENDED_DEPTH_SCALE);
                let reversibility =
                    normalized(log.state_or_focus_change_count() as f64 + 1.0, depth + 1.0);
                let traceability = normalized(log.steps().len() as f64, TRACEABILITY_SCALE);
                let dispute_robustness = if log.node_states().is_empty() {
                    0.0
                } else {
                    normalized(
                        log.disputed_count() as f64,
                        log.node_states().len() as f64,
                    )
                };
                Self {
                    variant,
                    depth: depth_score,
                    plurality,
                    reversibility,
                    traceability: Some(traceability),
                    dispute_robustness: Some(dispute_robustness),
                    score: mean_rounded(&[
                        depth_score,
                        plurality,
                        reversibility,
                        traceability,
                        dispute_robustness,
                    ]),
                }
            }
        }
    }
}

fn plurality_score(log: &ReasoningLog) -> f64 {
    let responses = log.responses();
    if responses.is_empty() {
        return 0.0;
    }
    let total: usize = responses.values().map(Vec::len).sum();
    normalized(total as f64 / responses.len() as f64, PLURALITY_SCALE)
}

fn normalized(value: f64, scale: f64) -> f64 {
    (value / scale).clamp(0.0, 1.0)
}

fn mean_rounded(components: &[f64]) -> f64 {
    let mean = components.iter().sum::<f64>() / components.len() as f64;
    (mean * 1000.0).round() / 1000.0
}
