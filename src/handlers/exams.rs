use std::collections::{BTreeMap, HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        enrollment::{EnrollmentRequest, EnrollmentStatus},
        exam::{Exam, PublicQuestion, Question},
        submission::{EssayStatus, SubmitExamRequest, Submission},
        user::UserRecord,
    },
    store::{Collection, Document, Filter, RecordStore, encode},
    utils::jwt::Claims,
};

/// Outcome of the automatic scoring pass.
struct ScoreSheet {
    score: f64,
    total_points: i64,
    has_essay: bool,
}

/// Scores a submission against the exam's questions, in order.
///
/// Every question contributes its points to the total. Non-essay answers
/// score when they match the correct answer case-insensitively and are
/// non-empty. Essay questions never score here; they mark the submission
/// for manual review.
fn score_answers(questions: &[Question], answers: &BTreeMap<usize, String>) -> ScoreSheet {
    let mut score = 0.0;
    let mut total_points = 0;
    let mut has_essay = false;

    for (index, question) in questions.iter().enumerate() {
        total_points += question.points();

        if question.is_essay() {
            has_essay = true;
            continue;
        }

        let given = answers.get(&index).map(String::as_str).unwrap_or("");
        let correct = question.correct_answer().unwrap_or("");
        if !given.is_empty() && given.to_lowercase() == correct.to_lowercase() {
            score += question.points() as f64;
        }
    }

    ScoreSheet {
        score,
        total_points,
        has_essay,
    }
}

pub(crate) async fn find_submission(
    store: &dyn RecordStore,
    collection: Collection,
    email: &str,
    exam_id: &str,
) -> Result<Option<Document>, AppError> {
    let mut docs = store
        .query(
            collection,
            &[Filter::eq("email", email), Filter::eq("examId", exam_id)],
        )
        .await?;
    Ok(docs.pop())
}

async fn load_user(store: &dyn RecordStore, claims: &Claims) -> Result<UserRecord, AppError> {
    Ok(store
        .read(Collection::Users, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?
        .decode()?)
}

/// Enrollment status for the (user, exam) pair. Any approved record wins;
/// otherwise the first record's status is reported.
async fn enrollment_status(
    store: &dyn RecordStore,
    user_id: &str,
    exam_id: &str,
) -> Result<Option<EnrollmentStatus>, AppError> {
    let docs = store
        .query(
            Collection::ExamUsers,
            &[Filter::eq("userId", user_id), Filter::eq("examId", exam_id)],
        )
        .await?;

    let mut status = None;
    for doc in docs {
        let request: EnrollmentRequest = doc.decode()?;
        if request.status == EnrollmentStatus::Approved {
            return Ok(Some(EnrollmentStatus::Approved));
        }
        status.get_or_insert(request.status);
    }
    Ok(status)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub status: Option<EnrollmentStatus>,
    pub taken: bool,
}

/// Lists all exams with the caller's enrollment status and whether a
/// submission already exists for each.
pub async fn list_exams(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(store.as_ref(), &claims).await?;

    let exams = store
        .list_all(Collection::Exams)
        .await?
        .into_iter()
        .map(|doc| doc.decode::<Exam>())
        .collect::<Result<Vec<_>, _>>()?;

    let enrollments = store
        .query(Collection::ExamUsers, &[Filter::eq("userId", user.id.clone())])
        .await?
        .into_iter()
        .map(|doc| doc.decode::<EnrollmentRequest>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut status_by_exam: HashMap<String, EnrollmentStatus> = HashMap::new();
    for request in enrollments {
        match status_by_exam.get(&request.exam_id) {
            Some(EnrollmentStatus::Approved) => {}
            _ => {
                status_by_exam.insert(request.exam_id.clone(), request.status);
            }
        }
    }

    let mut taken: HashSet<String> = HashSet::new();
    for collection in [Collection::OnReview, Collection::ExamResults] {
        for doc in store
            .query(collection, &[Filter::eq("email", user.email.clone())])
            .await?
        {
            let submission: Submission = doc.decode()?;
            taken.insert(submission.exam_id);
        }
    }

    let summaries: Vec<ExamSummary> = exams
        .into_iter()
        .map(|exam| ExamSummary {
            question_count: exam.questions.len(),
            status: status_by_exam.get(&exam.id).copied(),
            taken: taken.contains(&exam.id),
            id: exam.id,
            title: exam.title,
            description: exam.description,
        })
        .collect();

    Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Not approved (or never requested): no questions are exposed.
    Locked,
    /// Approved with no prior submission: the exam can be taken.
    InProgress,
    /// A submission exists: stored answers and score only.
    Review,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub answers: BTreeMap<usize, String>,
    pub score: f64,
    pub total_points: i64,
    pub essay_status: EssayStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSessionView {
    pub exam_id: String,
    pub title: String,
    pub description: String,
    pub status: Option<EnrollmentStatus>,
    pub mode: SessionMode,
    pub questions: Vec<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewView>,
}

/// The per-(student, exam) session view.
///
/// Approved students with no prior submission get the answer-free exam;
/// a prior submission in either the pending-review or results collection
/// switches the session to review-only.
pub async fn exam_session(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(store.as_ref(), &claims).await?;

    let exam: Exam = store
        .read(Collection::Exams, &exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .decode()?;

    let status = enrollment_status(store.as_ref(), &user.id, &exam_id).await?;

    if status != Some(EnrollmentStatus::Approved) {
        return Ok(Json(ExamSessionView {
            exam_id,
            title: exam.title,
            description: exam.description,
            status,
            mode: SessionMode::Locked,
            questions: Vec::new(),
            review: None,
        }));
    }

    let existing = match find_submission(store.as_ref(), Collection::OnReview, &user.email, &exam_id)
        .await?
    {
        Some(doc) => Some(doc),
        None => {
            find_submission(store.as_ref(), Collection::ExamResults, &user.email, &exam_id).await?
        }
    };

    let questions: Vec<PublicQuestion> = exam.questions.iter().map(PublicQuestion::from).collect();

    let (mode, review) = match existing {
        Some(doc) => {
            let submission: Submission = doc.decode()?;
            (
                SessionMode::Review,
                Some(ReviewView {
                    answers: submission.answers,
                    score: submission.score,
                    total_points: submission.total_points,
                    essay_status: submission.essay_status,
                }),
            )
        }
        None => (SessionMode::InProgress, None),
    };

    Ok(Json(ExamSessionView {
        exam_id,
        title: exam.title,
        description: exam.description,
        status,
        mode,
        questions,
        review,
    }))
}

/// Submits answers and runs the automatic scoring pass.
///
/// Submissions with at least one essay question go to the pending-review
/// collection ('on-review'); the rest become finalized results outright
/// ('none'). An existing record for the (email, exam) pair in the target
/// collection is overwritten, so a re-submission before review replaces
/// the earlier one.
pub async fn submit_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(store.as_ref(), &claims).await?;

    let status = enrollment_status(store.as_ref(), &user.id, &exam_id).await?;
    if status != Some(EnrollmentStatus::Approved) {
        return Err(AppError::Forbidden);
    }

    let exam: Exam = store
        .read(Collection::Exams, &exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?
        .decode()?;

    // A finalized result is immutable; only review remains.
    if find_submission(store.as_ref(), Collection::ExamResults, &user.email, &exam_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "You have already taken this exam. You can only review it.".to_string(),
        ));
    }

    let sheet = score_answers(&exam.questions, &payload.answers);

    let submission = Submission {
        id: String::new(),
        uid: user.id.clone(),
        email: user.email.clone(),
        fullname: user.fullname(),
        exam_id: exam_id.clone(),
        answers: payload.answers,
        score: sheet.score,
        total_points: sheet.total_points,
        essay_status: if sheet.has_essay {
            EssayStatus::OnReview
        } else {
            EssayStatus::None
        },
        essay_scores: None,
        points: None,
        timestamp: Utc::now(),
        retake_status: false,
    };

    let target = if sheet.has_essay {
        Collection::OnReview
    } else {
        Collection::ExamResults
    };

    let essay_status = submission.essay_status;
    let fields = encode(&submission)?;
    match find_submission(store.as_ref(), target, &user.email, &exam_id).await? {
        Some(doc) => store.update(target, &doc.id, fields).await.map_err(|e| {
            tracing::error!("Failed to overwrite submission: {}", e);
            AppError::from(e)
        })?,
        None => {
            store.create(target, fields).await.map_err(|e| {
                tracing::error!("Failed to store submission: {}", e);
                AppError::from(e)
            })?;
        }
    }

    let message = if sheet.has_essay {
        "Exam submitted for review."
    } else {
        "Exam submitted successfully."
    };

    Ok(Json(json!({
        "score": sheet.score,
        "totalPoints": sheet.total_points,
        "essayStatus": essay_status,
        "partial": sheet.has_essay,
        "message": message,
    })))
}
