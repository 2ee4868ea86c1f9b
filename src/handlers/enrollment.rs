// src/handlers/enrollment.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    config::ENROLLMENT_PAGE_SIZE,
    error::AppError,
    models::{
        enrollment::{EnrollmentRequest, EnrollmentStatus, SetStatusRequest},
        user::UserRecord,
    },
    store::{Collection, Filter, RecordStore, encode},
    utils::jwt::Claims,
};

/// Student requests access to an exam.
///
/// Idempotent: an existing approved or pending enrollment for the
/// (user, exam) pair short-circuits with a benign status instead of
/// creating a second request. The check-then-insert sequence is not
/// transactional; concurrent requests can still race.
pub async fn request_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user: UserRecord = store
        .read(Collection::Users, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?
        .decode()?;

    // Enrollment snapshots the user's name; an incomplete profile cannot
    // request an exam.
    if !user.has_complete_name() {
        return Err(AppError::BadRequest(
            "Please add your name in your account page before requesting the exam.".to_string(),
        ));
    }

    store
        .read(Collection::Exams, &exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let approved = store
        .query(
            Collection::ExamUsers,
            &[
                Filter::eq("userId", user.id.clone()),
                Filter::eq("examId", exam_id.clone()),
                Filter::eq("status", "approved"),
            ],
        )
        .await?;
    if !approved.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "status": "already-approved",
                "message": "You are already approved for this exam.",
            })),
        ));
    }

    let pending = store
        .query(
            Collection::ExamUsers,
            &[
                Filter::eq("userId", user.id.clone()),
                Filter::eq("examId", exam_id.clone()),
                Filter::eq("status", "pending"),
            ],
        )
        .await?;
    if !pending.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "status": "already-requested",
                "message": "You have already requested this exam. Please wait for approval.",
            })),
        ));
    }

    let contact_number = if user.contact_number.trim().is_empty() {
        "N/A".to_string()
    } else {
        user.contact_number.clone()
    };

    let request = EnrollmentRequest {
        id: String::new(),
        user_id: user.id.clone(),
        exam_id,
        status: EnrollmentStatus::Pending,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        contact_number,
        profile_picture: user.profile_picture.clone(),
        created_at: Utc::now(),
    };

    let id = store
        .create(Collection::ExamUsers, encode(&request)?)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create enrollment request: {}", e);
            AppError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "requested",
            "id": id,
            "message": "You have requested this exam. Please wait for approval.",
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnrollmentsParams {
    pub exam_id: String,
    pub page: Option<usize>,
}

/// Splits a full result set into one page. Pages are 1-based; an
/// out-of-range page clamps to the nearest valid one.
fn paginate<T>(items: Vec<T>, page: usize) -> (Vec<T>, usize, usize) {
    let total_pages = items.len().div_ceil(ENROLLMENT_PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * ENROLLMENT_PAGE_SIZE;
    let page_items = items
        .into_iter()
        .skip(start)
        .take(ENROLLMENT_PAGE_SIZE)
        .collect();
    (page_items, page, total_pages)
}

/// Lists enrollment requests for one exam, most recent first, five rows
/// per page. Filtering, sorting and paging happen here after a full
/// collection fetch.
/// Admin only.
pub async fn list_enrollments(
    State(store): State<Arc<dyn RecordStore>>,
    Query(params): Query<ListEnrollmentsParams>,
) -> Result<impl IntoResponse, AppError> {
    let docs = store.list_all(Collection::ExamUsers).await.map_err(|e| {
        tracing::error!("Failed to list enrollment requests: {}", e);
        AppError::from(e)
    })?;

    let mut requests: Vec<EnrollmentRequest> = docs
        .into_iter()
        .map(|doc| doc.decode::<EnrollmentRequest>())
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|request| request.exam_id == params.exam_id)
        .collect();

    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = requests.len();
    let (page_items, page, total_pages) = paginate(requests, params.page.unwrap_or(1));

    Ok(Json(json!({
        "requests": page_items,
        "page": page,
        "totalPages": total_pages,
        "total": total,
    })))
}

/// Approves or declines a request. Unconditional overwrite of the status
/// field; the lifecycle has no server-side transition guard.
/// Admin only.
pub async fn set_status(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.status == EnrollmentStatus::Pending {
        return Err(AppError::BadRequest(
            "Status must be 'approved' or 'declined'.".to_string(),
        ));
    }

    store
        .read(Collection::ExamUsers, &id)
        .await?
        .ok_or(AppError::NotFound("Enrollment request not found".to_string()))?;

    let status = serde_json::to_value(payload.status)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    store
        .update(Collection::ExamUsers, &id, json!({ "status": status }))
        .await
        .map_err(|e| {
            tracing::error!("Failed to update enrollment status: {}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::OK)
}

/// Deletes an enrollment request. Irreversible.
/// Admin only.
pub async fn delete_request(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store
        .read(Collection::ExamUsers, &id)
        .await?
        .ok_or(AppError::NotFound("Enrollment request not found".to_string()))?;

    store
        .delete(Collection::ExamUsers, &id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete enrollment request: {}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_splits_at_five_rows() {
        let items: Vec<i32> = (1..=12).collect();
        let (page_items, page, total_pages) = paginate(items, 1);
        assert_eq!(page_items, vec![1, 2, 3, 4, 5]);
        assert_eq!(page, 1);
        assert_eq!(total_pages, 3);
    }

    #[test]
    fn paginate_last_page_is_partial() {
        let items: Vec<i32> = (1..=12).collect();
        let (page_items, page, _) = paginate(items, 3);
        assert_eq!(page_items, vec![11, 12]);
        assert_eq!(page, 3);
    }

    #[test]
    fn paginate_clamps_out_of_range_pages() {
        let items: Vec<i32> = (1..=7).collect();
        let (page_items, page, total_pages) = paginate(items.clone(), 9);
        assert_eq!(page, 2);
        assert_eq!(total_pages, 2);
        assert_eq!(page_items, vec![6, 7]);

        let (first, page, _) = paginate(items, 0);
        assert_eq!(page, 1);
        assert_eq!(first, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn paginate_empty_list_has_one_page() {
        let (page_items, page, total_pages) = paginate(Vec::<i32>::new(), 1);
        assert!(page_items.is_empty());
        assert_eq!(page, 1);
        assert_eq!(total_pages, 1);
    }
}
