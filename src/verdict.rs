use serde::{Deserialize, Serialize};

/// Three-tier outcome attached to every analyzer report. Verdicts are data,
/// not errors: a report always carries a verdict plus a numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "flag for review")]
    FlagForReview,
    #[serde(rename = "fail")]
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Success => "success",
            Verdict::FlagForReview => "flag for review",
            Verdict::Fail => "fail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Verdict::Success),
            "flag for review" => Some(Verdict::FlagForReview),
            "fail" => Some(Verdict::Fail),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

/// Final accept/deny outcome produced by the decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "accept")]
    Accept,
    #[serde(rename = "deny")]
    Deny,
    #[serde(rename = "flag for review")]
    FlagForReview,
}

impl Decision {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(Decision::Accept),
            "deny" => Some(Decision::Deny),
            "flag for review" => Some(Decision::FlagForReview),
            _ => None,
        }
    }
}
