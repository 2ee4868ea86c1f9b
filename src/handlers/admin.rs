// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{Exam, Question, QuestionDraft, SaveExamRequest},
        user::{RegisterStaffRequest, Role, UserRecord},
    },
    store::{Collection, RecordStore, encode},
    utils::hash::hash_password,
};

use super::auth::find_user_by_email;

/// Registers a staff account. Role is forced to 'admin'.
/// Admin only.
pub async fn register_staff(
    State(store): State<Arc<dyn RecordStore>>,
    Json(payload): Json<RegisterStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if find_user_by_email(store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "An account for '{}' already exists",
            payload.email
        )));
    }

    let hashed_password = hash_password(&payload.password)?;

    let staff = UserRecord {
        id: String::new(),
        role: Role::Admin,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        contact_number: payload.contact_number,
        profile_picture: String::new(),
        password_hash: Some(hashed_password),
    };

    let id = store.create(Collection::Users, encode(&staff)?).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

fn build_questions(drafts: Vec<QuestionDraft>) -> Result<Vec<Question>, AppError> {
    drafts
        .into_iter()
        .map(|draft| draft.build().map_err(AppError::BadRequest))
        .collect()
}

fn exam_fields(exam: &Exam) -> Result<Value, AppError> {
    let questions = serde_json::to_value(&exam.questions)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let pass_threshold = exam
        .pass_threshold
        .map(Value::from)
        .unwrap_or(Value::Null);

    Ok(json!({
        "title": exam.title,
        "description": exam.description,
        "questions": questions,
        "passThreshold": pass_threshold,
    }))
}

/// Lists all exams, answers included.
/// Admin only.
pub async fn list_exams(
    State(store): State<Arc<dyn RecordStore>>,
) -> Result<impl IntoResponse, AppError> {
    let docs = store.list_all(Collection::Exams).await.map_err(|e| {
        tracing::error!("Failed to list exams: {}", e);
        AppError::from(e)
    })?;

    let exams = docs
        .into_iter()
        .map(|doc| doc.decode::<Exam>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(exams))
}

/// Fetches one exam with its full question list, for edit pre-population.
/// Admin only.
pub async fn get_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam: Exam = store
        .read(Collection::Exams, &id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .decode()?;

    Ok(Json(exam))
}

/// Creates a new exam. The title must be non-empty.
/// Admin only.
pub async fn create_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Json(payload): Json<SaveExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = Exam {
        id: String::new(),
        title: payload.title,
        description: payload.description,
        questions: build_questions(payload.questions)?,
        pass_threshold: payload.pass_threshold,
    };

    let id = store
        .create(Collection::Exams, exam_fields(&exam)?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {}", e);
            AppError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Overwrites an existing exam's fields.
/// Admin only.
pub async fn update_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
    Json(payload): Json<SaveExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    store
        .read(Collection::Exams, &id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let exam = Exam {
        id: id.clone(),
        title: payload.title,
        description: payload.description,
        questions: build_questions(payload.questions)?,
        pass_threshold: payload.pass_threshold,
    };

    store
        .update(Collection::Exams, &id, exam_fields(&exam)?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update exam: {}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::OK)
}

/// Deletes an exam.
/// Admin only.
pub async fn delete_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store
        .read(Collection::Exams, &id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    store.delete(Collection::Exams, &id).await.map_err(|e| {
        tracing::error!("Failed to delete exam: {}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// DTO for adding or replacing one question on a persisted exam.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertQuestionRequest {
    #[serde(flatten)]
    pub draft: QuestionDraft,
    /// Position to replace; appends when absent.
    pub edit_index: Option<usize>,
}

/// Adds or replaces a question on an exam and returns the updated list.
/// Admin only.
pub async fn upsert_question(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
    Json(payload): Json<UpsertQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut exam: Exam = store
        .read(Collection::Exams, &id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .decode()?;

    let question = payload.draft.build().map_err(AppError::BadRequest)?;
    exam.upsert_question(question, payload.edit_index)
        .map_err(AppError::BadRequest)?;

    persist_questions(store.as_ref(), &id, &exam).await?;
    Ok(Json(exam.questions))
}

/// Removes the question at a position, shifting later questions down.
/// Admin only.
pub async fn remove_question(
    State(store): State<Arc<dyn RecordStore>>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let mut exam: Exam = store
        .read(Collection::Exams, &id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .decode()?;

    exam.remove_question(index).map_err(AppError::BadRequest)?;

    persist_questions(store.as_ref(), &id, &exam).await?;
    Ok(Json(exam.questions))
}

async fn persist_questions(
    store: &dyn RecordStore,
    id: &str,
    exam: &Exam,
) -> Result<(), AppError> {
    let questions = serde_json::to_value(&exam.questions)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    store
        .update(Collection::Exams, id, json!({ "questions": questions }))
        .await
        .map_err(|e| {
            tracing::error!("Failed to persist questions: {}", e);
            AppError::from(e)
        })
}
