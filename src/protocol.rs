//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//! Generated text is kept as returned by the completion service in the core;
//! it is trimmed only here, for display.

use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeItem, ChallengeResult, FeedbackTier, GroundedAnswer, UploadOutcome};

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOut {
    pub document_id: String,
    pub summary: String,
    pub message: String,
}

impl From<UploadOutcome> for UploadOut {
    fn from(o: UploadOutcome) -> Self {
        Self {
            document_id: o.document_id,
            summary: o.summary.trim().to_string(),
            message: "File uploaded and processed successfully.".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskIn {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskOut {
    pub question: String,
    pub answer: String,
    pub justification: Option<String>,
}

impl AskOut {
    pub fn new(question: String, a: GroundedAnswer) -> Self {
        Self { question, answer: a.answer.trim().to_string(), justification: a.justification }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeItemOut {
    pub index: usize,
    pub question: String,
    #[serde(rename = "sourceContext")]
    pub source_context: String,
}

impl From<ChallengeItem> for ChallengeItemOut {
    fn from(i: ChallengeItem) -> Self {
        Self { index: i.index, question: i.question_text, source_context: i.source_context }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeOut {
    pub items: Vec<ChallengeItemOut>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResultOut {
    pub index: usize,
    pub your_answer: String,
    pub expected_answer: String,
    pub similarity_score: f64,
    pub tier: String,
    pub feedback: String,
}

impl From<ChallengeResult> for ChallengeResultOut {
    fn from(r: ChallengeResult) -> Self {
        Self {
            index: r.item_index,
            your_answer: r.user_answer,
            expected_answer: r.reference_answer.trim().to_string(),
            similarity_score: r.similarity_score,
            tier: tier_name(r.feedback_tier).into(),
            feedback: r.feedback_tier.message().into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeStateOut {
    pub items: Vec<ChallengeItemOut>,
    pub results: Vec<ChallengeResultOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
    pub kind: String,
}

fn tier_name(t: FeedbackTier) -> &'static str {
    match t {
        FeedbackTier::Correct => "correct",
        FeedbackTier::Partial => "partial",
        FeedbackTier::Incorrect => "incorrect",
    }
}
