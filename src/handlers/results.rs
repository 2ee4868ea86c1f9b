use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    config::DEFAULT_PASS_THRESHOLD,
    error::AppError,
    models::{
        exam::Exam,
        submission::{EssayStatus, Submission},
    },
    store::{Collection, RecordStore},
};

/// Pass/fail against a percentage threshold. A zero-point exam never
/// passes.
fn is_passed(score: f64, total_points: i64, threshold: f64) -> bool {
    if total_points <= 0 {
        return false;
    }
    (score / total_points as f64) * 100.0 >= threshold
}

/// Review marker for one answered question.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMarker {
    /// Unanswered, or no correct answer to compare against (essays).
    Neutral,
    Correct,
    Incorrect,
}

fn answer_marker(answer: Option<&str>, correct: Option<&str>) -> AnswerMarker {
    let Some(answer) = answer.filter(|a| !a.is_empty()) else {
        return AnswerMarker::Neutral;
    };
    let Some(correct) = correct else {
        return AnswerMarker::Neutral;
    };
    if answer.to_lowercase() == correct.to_lowercase() {
        AnswerMarker::Correct
    } else {
        AnswerMarker::Incorrect
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub id: String,
    pub email: String,
    pub fullname: String,
    pub exam_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_title: Option<String>,
    pub score: f64,
    pub total_points: i64,
    pub pass_threshold: f64,
    pub passed: bool,
    pub essay_status: EssayStatus,
    pub timestamp: DateTime<Utc>,
}

/// Lists finalized results joined with their exams, with pass/fail
/// computed against each exam's threshold (portal default when the exam
/// carries none, or no longer exists).
/// Admin only.
pub async fn list_results(
    State(store): State<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, AppError> {
    let docs = store.list_all(Collection::ExamResults).await.map_err(|e| {
        tracing::error!("Failed to fetch results: {}", e);
        AppError::from(e)
    })?;

    let mut summaries = Vec::with_capacity(docs.len());
    for doc in docs {
        let submission: Submission = doc.decode()?;

        let exam = match store.read(Collection::Exams, &submission.exam_id).await? {
            Some(doc) => Some(doc.decode::<Exam>()?),
            None => None,
        };

        let pass_threshold = exam
            .as_ref()
            .map(Exam::pass_threshold_or_default)
            .unwrap_or(DEFAULT_PASS_THRESHOLD);

        summaries.push(ResultSummary {
            id: submission.id,
            email: submission.email,
            fullname: submission.fullname,
            exam_id: submission.exam_id,
            exam_title: exam.map(|e| e.title),
            score: submission.score,
            total_points: submission.total_points,
            pass_threshold,
            passed: is_passed(submission.score, submission.total_points, pass_threshold),
            essay_status: submission.essay_status,
            timestamp: submission.timestamp,
        });
    }

    Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub marker: AnswerMarker,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetails {
    pub id: String,
    pub email: String,
    pub fullname: String,
    pub score: f64,
    pub total_points: i64,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_description: Option<String>,
    pub questions: Vec<QuestionReview>,
}

/// One result cross-referenced with its exam, question by question.
/// A deleted exam renders as an empty question list, not an error.
/// Admin only.
pub async fn result_details(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submission: Submission = store
        .read(Collection::ExamResults, &id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?
        .decode()?;

    let exam = match store.read(Collection::Exams, &submission.exam_id).await? {
        Some(doc) => Some(doc.decode::<Exam>()?),
        None => None,
    };

    let pass_threshold = exam
        .as_ref()
        .map(Exam::pass_threshold_or_default)
        .unwrap_or(DEFAULT_PASS_THRESHOLD);

    let questions = exam
        .as_ref()
        .map(|e| {
            e.questions
                .iter()
                .enumerate()
                .map(|(index, question)| {
                    let student_answer = submission.answers.get(&index).cloned();
                    QuestionReview {
                        question: question.text().to_string(),
                        kind: question.kind(),
                        points: question.points(),
                        marker: answer_marker(
                            student_answer.as_deref(),
                            question.correct_answer(),
                        ),
                        student_answer,
                        correct_answer: question.correct_answer().map(str::to_string),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(ResultDetails {
        id: submission.id,
        email: submission.email,
        fullname: submission.fullname,
        score: submission.score,
        total_points: submission.total_points,
        passed: is_passed(submission.score, submission.total_points, pass_threshold),
        exam_title: exam.as_ref().map(|e| e.title.clone()),
        exam_description: exam.as_ref().map(|e| e.description.clone()),
        questions,
    }))
}

/// Deletes a finalized result. Irreversible; also the manual cleanup
/// path for duplicates left by a failed finalization.
/// Admin only.
pub async fn delete_result(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store
        .read(Collection::ExamResults, &id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    store
        .delete(Collection::ExamResults, &id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete result: {}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_threshold_boundary() {
        assert!(is_passed(70.0, 100, 70.0));
        assert!(!is_passed(69.0, 100, 70.0));
    }

    #[test]
    fn zero_point_exam_never_passes() {
        assert!(!is_passed(0.0, 0, 70.0));
    }

    #[test]
    fn marker_neutral_for_unanswered() {
        assert_eq!(answer_marker(None, Some("Paris")), AnswerMarker::Neutral);
        assert_eq!(answer_marker(Some(""), Some("Paris")), AnswerMarker::Neutral);
    }

    #[test]
    fn marker_neutral_without_correct_answer() {
        assert_eq!(answer_marker(Some("my essay text"), None), AnswerMarker::Neutral);
    }

    #[test]
    fn marker_compares_case_insensitively() {
        assert_eq!(
            answer_marker(Some("paris"), Some("Paris")),
            AnswerMarker::Correct
        );
        assert_eq!(
            answer_marker(Some("Lyon"), Some("Paris")),
            AnswerMarker::Incorrect
        );
    }
}
