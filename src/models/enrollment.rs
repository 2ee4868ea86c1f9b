// src/models/enrollment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an access request. `pending` on creation; moved to
/// `approved` or `declined` by an admin only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Declined,
}

/// Represents a record in the 'examUsers' collection.
///
/// Identity fields are a snapshot of the user record at request time, not
/// a live join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    #[serde(default)]
    pub id: String,

    pub user_id: String,
    pub exam_id: String,
    pub status: EnrollmentStatus,

    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub profile_picture: String,

    pub created_at: DateTime<Utc>,
}

/// DTO for the admin approve/decline action.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: EnrollmentStatus,
}
