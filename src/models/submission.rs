// src/models/submission.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Essay grading state of a submission.
///
/// `none`: the exam had no essay question, the automatic score is final.
/// `on-review`: waiting for manual essay grading.
/// `graded`: essay scores merged in, result finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EssayStatus {
    None,
    OnReview,
    Graded,
}

/// A submitted exam, as stored in 'onReview' (pending essay grading) and
/// 'examResults' (finalized). The two collections share one record shape;
/// finalization fills `essay_scores`, `points` and flips `essay_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub id: String,

    /// Identifier of the submitting user.
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub fullname: String,
    pub exam_id: String,

    /// Answers keyed by question position within the exam.
    #[serde(default)]
    pub answers: BTreeMap<usize, String>,

    /// Sum of points for correct non-essay answers; after finalization,
    /// the combined total.
    pub score: f64,

    pub total_points: i64,

    pub essay_status: EssayStatus,

    /// Manually entered essay scores, aligned to essay-question positions
    /// (i-th entry grades the i-th essay question in exam order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay_scores: Option<Vec<f64>>,

    /// Mirrors the combined score on finalized essay results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub retake_status: bool,
}

/// DTO for a student submitting answers.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Answers keyed by question position.
    #[serde(default)]
    pub answers: BTreeMap<usize, String>,
}

/// DTO for the admin finalizing an essay review.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    /// Entered essay scores, aligned to essay-question positions. Missing
    /// entries count as zero; every entry is re-clamped server-side.
    #[serde(default)]
    pub essay_scores: Vec<f64>,
}
