//! HTTP surface of the daemon.
//!
//! Staff routes sit under `/api` and trust the `x-tenant-id` header:
//! staff authentication itself is an upstream collaborator (reverse
//! proxy / session layer), not this daemon's job. Kiosk routes under
//! `/api/public` are unauthenticated and carry a signed access token
//! instead.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use turnstile_core::FaceDescriptor;

use crate::error::ApiError;
use crate::service::App;

pub fn router(app: Arc<App>) -> Router {
    let max_image_bytes = app.max_image_bytes;
    Router::new()
        // staff
        .route("/api/checkin/token", post(issue_token))
        .route("/api/checkin/{reg_no}", post(manual_check_in))
        .route("/api/checkin/{reg_no}/today", delete(undo_check_in))
        .route(
            "/api/members/{reg_no}/face",
            post(enroll_descriptor).delete(remove_face),
        )
        .route("/api/members/{reg_no}/face-image", post(enroll_image))
        // public kiosk
        .route("/api/public/members", get(kiosk_roster))
        .route("/api/public/checkin/qr", post(qr_check_in))
        .route("/api/public/checkin/face", post(face_check_in))
        .route("/api/public/checkin/face-image", post(face_image_check_in))
        .layer(DefaultBodyLimit::max(max_image_bytes + 64 * 1024))
        .with_state(app)
}

fn staff_tenant_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(ApiError::UnknownTenant)
}

// --- staff handlers ---

async fn issue_token(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = staff_tenant_id(&headers)?;
    let issued = app.issue_token(&tenant_id).await?;
    Ok(Json(json!({ "url": issued.url, "token": issued.token })))
}

async fn manual_check_in(
    State(app): State<Arc<App>>,
    Path(reg_no): Path<u32>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = staff_tenant_id(&headers)?;
    let outcome = app.check_in_manual(&tenant_id, reg_no).await?;
    Ok(Json(serde_json::to_value(outcome).unwrap_or_default()))
}

async fn undo_check_in(
    State(app): State<Arc<App>>,
    Path(reg_no): Path<u32>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = staff_tenant_id(&headers)?;
    let removed = app.undo_check_in(&tenant_id, reg_no).await?;
    Ok(Json(json!({ "removed": removed })))
}

#[derive(Deserialize)]
struct EnrollRequest {
    descriptor: Vec<f32>,
}

async fn enroll_descriptor(
    State(app): State<Arc<App>>,
    Path(reg_no): Path<u32>,
    headers: HeaderMap,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = staff_tenant_id(&headers)?;
    app.enroll_descriptor(&tenant_id, reg_no, FaceDescriptor(req.descriptor))
        .await?;
    Ok(Json(json!({ "ok": true })))
}

async fn enroll_image(
    State(app): State<Arc<App>>,
    Path(reg_no): Path<u32>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = staff_tenant_id(&headers)?;
    let (_, image) = read_image_form(multipart).await?;
    app.enroll_image(&tenant_id, reg_no, image).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn remove_face(
    State(app): State<Arc<App>>,
    Path(reg_no): Path<u32>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = staff_tenant_id(&headers)?;
    app.remove_face(&tenant_id, reg_no).await?;
    Ok(Json(json!({ "ok": true })))
}

// --- public kiosk handlers ---

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

async fn kiosk_roster(
    State(app): State<Arc<App>>,
    Query(q): Query<TokenQuery>,
) -> Result<Json<Value>, ApiError> {
    let roster = app.kiosk_roster(&q.token).await?;
    let entries: Vec<Value> = roster
        .into_iter()
        .map(|r| json!({ "regNo": r.reg_no, "name": r.name }))
        .collect();
    Ok(Json(json!(entries)))
}

#[derive(Deserialize)]
struct QrCheckInRequest {
    token: String,
    #[serde(rename = "regNo")]
    reg_no: u32,
}

async fn qr_check_in(
    State(app): State<Arc<App>>,
    Json(req): Json<QrCheckInRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = app.check_in_by_qr(&req.token, req.reg_no).await?;
    Ok(Json(serde_json::to_value(outcome).unwrap_or_default()))
}

#[derive(Deserialize)]
struct FaceCheckInRequest {
    token: String,
    descriptor: Vec<f32>,
}

async fn face_check_in(
    State(app): State<Arc<App>>,
    Json(req): Json<FaceCheckInRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = app
        .check_in_by_descriptor(&req.token, FaceDescriptor(req.descriptor))
        .await?;
    Ok(Json(serde_json::to_value(outcome).unwrap_or_default()))
}

async fn face_image_check_in(
    State(app): State<Arc<App>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (token, image) = read_image_form(multipart).await?;
    let token = token.ok_or(ApiError::InvalidToken)?;
    let outcome = app.check_in_by_image(&token, image).await?;
    Ok(Json(serde_json::to_value(outcome).unwrap_or_default()))
}

/// Pull `token` (optional) and `image` (required) out of a multipart
/// form. Oversized or missing image parts surface as a bad upload.
async fn read_image_form(mut multipart: Multipart) -> Result<(Option<String>, Vec<u8>), ApiError> {
    let mut token = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| ApiError::BadImage)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("token") => {
                token = Some(field.text().await.map_err(|_| ApiError::BadImage)?);
            }
            Some("image") => {
                image = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|_| ApiError::BadImage)?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    Ok((token, image.ok_or(ApiError::BadImage)?))
}
