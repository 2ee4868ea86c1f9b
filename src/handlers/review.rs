// src/handlers/review.rs

use std::collections::BTreeMap;
use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        submission::{EssayStatus, FinalizeRequest, Submission},
    },
    store::{Collection, RecordStore, encode},
};

/// Clamps one entered essay score to the question's point range.
/// Non-finite input counts as zero.
fn clamp_essay_score(value: f64, max_points: i64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, max_points as f64)
}

/// Re-validates a full list of entered essay scores against the essay
/// questions' point values, in exam order. Missing entries count as zero;
/// surplus entries are dropped.
fn clamp_essay_scores(entered: &[f64], essay_points: &[i64]) -> Vec<f64> {
    essay_points
        .iter()
        .enumerate()
        .map(|(i, &max_points)| clamp_essay_score(entered.get(i).copied().unwrap_or(0.0), max_points))
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub points: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub exam_id: String,
    /// Falls back to a placeholder when the source exam was deleted.
    pub exam_name: String,
    pub score: f64,
    pub total_points: i64,
    pub timestamp: DateTime<Utc>,
    pub answers: BTreeMap<usize, String>,
    pub questions: Vec<ReviewQuestion>,
    /// One entry per essay question, zero-filled until graded.
    pub essay_scores: Vec<f64>,
}

/// Lists every submission pending essay review, joined with its source
/// exam for question text and point values.
/// Admin only.
pub async fn list_pending(
    State(store): State<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, AppError> {
    let docs = store.list_all(Collection::OnReview).await.map_err(|e| {
        tracing::error!("Failed to fetch pending reviews: {}", e);
        AppError::from(e)
    })?;

    let mut items = Vec::with_capacity(docs.len());
    for doc in docs {
        let submission: Submission = doc.decode()?;

        let exam = match store.read(Collection::Exams, &submission.exam_id).await? {
            Some(doc) => Some(doc.decode::<Exam>()?),
            None => None,
        };

        let exam_name = exam
            .as_ref()
            .map(|e| e.title.clone())
            .unwrap_or_else(|| "Untitled Exam".to_string());

        let questions: Vec<ReviewQuestion> = exam
            .as_ref()
            .map(|e| {
                e.questions
                    .iter()
                    .map(|q| ReviewQuestion {
                        question: q.text().to_string(),
                        kind: q.kind(),
                        points: q.points(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let essay_count = exam.as_ref().map(|e| e.essay_points().len()).unwrap_or(0);
        let essay_scores = submission
            .essay_scores
            .clone()
            .unwrap_or_else(|| vec![0.0; essay_count]);

        items.push(ReviewItem {
            id: submission.id,
            fullname: submission.fullname,
            email: submission.email,
            exam_id: submission.exam_id,
            exam_name,
            score: submission.score,
            total_points: submission.total_points,
            timestamp: submission.timestamp,
            answers: submission.answers,
            questions,
            essay_scores,
        });
    }

    Ok(Json(items))
}

/// Finalizes a pending submission.
///
/// Clamps the entered essay scores once more, combines them with the
/// stored non-essay score, writes the finalized result, then deletes the
/// pending record. The two store calls are not atomic: a failure between
/// them leaves a duplicate (result plus pending record) rather than data
/// loss, surfaced by the conflicts listing for manual cleanup.
/// Admin only.
pub async fn finalize(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
    Json(payload): Json<FinalizeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission: Submission = store
        .read(Collection::OnReview, &id)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?
        .decode()?;

    // A deleted exam leaves no essay point values; every entered score
    // clamps to zero and the submission finalizes on its automatic score.
    let essay_points = match store.read(Collection::Exams, &submission.exam_id).await? {
        Some(doc) => doc.decode::<Exam>()?.essay_points(),
        None => Vec::new(),
    };

    let essay_scores = clamp_essay_scores(&payload.essay_scores, &essay_points);
    let total: f64 = submission.score + essay_scores.iter().sum::<f64>();

    let result = Submission {
        id: String::new(),
        score: total,
        points: Some(total),
        essay_scores: Some(essay_scores.clone()),
        essay_status: EssayStatus::Graded,
        ..submission
    };

    let result_id = store
        .create(Collection::ExamResults, encode(&result)?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store finalized result: {}", e);
            AppError::from(e)
        })?;

    store.delete(Collection::OnReview, &id).await.map_err(|e| {
        tracing::error!(
            "Finalized result {} stored but pending record {} was not removed; \
             a duplicate remains until reconciled: {}",
            result_id,
            id,
            e
        );
        AppError::from(e)
    })?;

    Ok(Json(json!({
        "id": result_id,
        "score": total,
        "essayScores": essay_scores,
        "essayStatus": EssayStatus::Graded,
        "message": "Exam updated!",
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictItem {
    pub email: String,
    pub exam_id: String,
    pub pending_id: String,
    pub result_id: String,
}

/// Reconciliation listing: (email, exam) pairs present in both the
/// pending-review and results collections. These are the duplicates a
/// failed finalization leaves behind.
/// Admin only.
pub async fn list_conflicts(
    State(store): State<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, AppError> {
    let mut results_by_pair: HashMap<(String, String), String> = HashMap::new();
    for doc in store.list_all(Collection::ExamResults).await? {
        let submission: Submission = doc.decode()?;
        results_by_pair.insert((submission.email, submission.exam_id), submission.id);
    }

    let mut conflicts = Vec::new();
    for doc in store.list_all(Collection::OnReview).await? {
        let submission: Submission = doc.decode()?;
        let pair = (submission.email.clone(), submission.exam_id.clone());
        if let Some(result_id) = results_by_pair.get(&pair) {
            conflicts.push(ConflictItem {
                email: submission.email,
                exam_id: submission.exam_id,
                pending_id: submission.id,
                result_id: result_id.clone(),
            });
        }
    }

    Ok(Json(conflicts))
}
