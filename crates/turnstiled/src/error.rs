use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;
use turnstile_core::checkin::CheckInRefusal;
use turnstile_core::TokenError;
use turnstile_store::StoreError;

/// Every failure a route can surface. Business refusals carry what the
/// kiosk or front desk needs; infrastructure failures stay opaque.
#[derive(Debug, Error)]
pub enum ApiError {
    // One message for forged, malformed, and expired alike.
    #[error("invalid or expired code, rescan")]
    InvalidToken,
    #[error("unknown tenant")]
    UnknownTenant,
    #[error("register number {0} not found")]
    UnknownMember(u32),
    #[error("membership for {name} expired on {due_date}")]
    MembershipExpired {
        name: String,
        reg_no: u32,
        phone: String,
        due_date: NaiveDate,
    },
    #[error("face check-in required for {name}, use the camera")]
    FaceRequired { name: String, reg_no: u32 },
    #[error("already checked in today")]
    AlreadyCheckedIn,
    #[error("face not recognized, please contact staff")]
    NotRecognized,
    #[error("face already enrolled for {name} (reg {reg_no})")]
    DuplicateFace { name: String, reg_no: u32 },
    #[error("face recognition is not enabled for this gym")]
    RecognitionDisabled,
    #[error("remote recognition endpoint is not configured for this gym")]
    RemoteNotConfigured,
    #[error("no face found in image")]
    NoFaceFound,
    #[error("recognition service unavailable: {0}")]
    RemoteService(String),
    #[error("unsupported or corrupt image upload")]
    BadImage,
    #[error("descriptor is malformed")]
    BadDescriptor,
    #[error("storage failure")]
    Store(#[from] StoreError),
}

impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        ApiError::InvalidToken
    }
}

impl From<CheckInRefusal> for ApiError {
    fn from(refusal: CheckInRefusal) -> Self {
        match refusal {
            CheckInRefusal::MembershipExpired {
                name,
                reg_no,
                phone,
                due_date,
            } => ApiError::MembershipExpired {
                name,
                reg_no,
                phone,
                due_date,
            },
            CheckInRefusal::FaceRequired { name, reg_no } => {
                ApiError::FaceRequired { name, reg_no }
            }
            CheckInRefusal::AlreadyCheckedIn { .. } => ApiError::AlreadyCheckedIn,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::UnknownTenant | ApiError::UnknownMember(_) | ApiError::NotRecognized => {
                StatusCode::NOT_FOUND
            }
            ApiError::MembershipExpired { .. } | ApiError::FaceRequired { .. } => {
                StatusCode::FORBIDDEN
            }
            ApiError::AlreadyCheckedIn | ApiError::DuplicateFace { .. } => StatusCode::CONFLICT,
            ApiError::RecognitionDisabled
            | ApiError::RemoteNotConfigured
            | ApiError::NoFaceFound
            | ApiError::BadImage
            | ApiError::BadDescriptor => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RemoteService(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            // Structured payload so the front desk can ring the member.
            ApiError::MembershipExpired {
                name,
                reg_no,
                phone,
                due_date,
            } => json!({
                "error": self.to_string(),
                "name": name,
                "regNo": reg_no,
                "phoneNumber": phone,
                "dueDate": due_date,
            }),
            ApiError::DuplicateFace { name, reg_no } => json!({
                "error": self.to_string(),
                "conflict": { "name": name, "regNo": reg_no },
            }),
            ApiError::Store(e) => {
                // Keep storage detail out of responses.
                tracing::error!(error = %e, "storage failure");
                json!({ "error": "internal error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
