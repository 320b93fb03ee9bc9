//! turnstile-remote - client for the external face-recognition service.
//!
//! The service owns image decoding and its own matching policy; this
//! adapter only moves bytes and decodes the reply. The two operations it
//! exposes mirror the service API: `encode-image` (enrollment) and
//! `match-image` (check-in).
//!
//! Failure handling differs by path on purpose. Enrollment must keep
//! "no face in the image" distinct from "service broken", since staff fix
//! those differently. The check-in path degrades every failure to "no
//! match" at the call site, so a cold or flaky service never takes the
//! kiosk down.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use turnstile_core::{EnrolledFace, FaceDescriptor};

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service looked at the image and found no face. Actionable by
    /// the person holding the camera, not by an operator.
    #[error("no face found in image")]
    NoFaceFound,
    /// Transport failure, non-JSON reply, or a service-side error.
    #[error("recognition service error: {0}")]
    Service(String),
}

/// Best-match decision returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHit {
    pub reg_no: u32,
    pub name: String,
}

pub struct RemoteRecognizer {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteRecognizer {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Extract a 128-d descriptor from an image, for enrollment.
    pub async fn encode_image(&self, image: Vec<u8>) -> Result<FaceDescriptor, RemoteError> {
        let form = reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(image).file_name("probe.jpg"),
        );

        let response = self
            .http
            .post(format!("{}/encode-image", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteError::Service(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Service(e.to_string()))?;

        decode_encode_response(&body)
    }

    /// Upload a probe image plus the tenant's enrolled descriptors and
    /// receive back a best-match decision. `Ok(None)` is an explicit
    /// "no match"; `Err` is a service problem the caller may degrade.
    pub async fn match_image(
        &self,
        image: Vec<u8>,
        enrolled: &[EnrolledFace],
    ) -> Result<Option<RemoteHit>, RemoteError> {
        let enrolled_json =
            serde_json::to_string(enrolled).map_err(|e| RemoteError::Service(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(image).file_name("probe.jpg"),
            )
            .text("enrolled", enrolled_json);

        let response = self
            .http
            .post(format!("{}/match-image", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteError::Service(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Service(e.to_string()))?;

        Ok(decode_match_response(&body))
    }
}

/// Decode an `/encode-image` reply.
///
/// The service answers `{"descriptor": [...]}` on success and
/// `{"error": "..."}` otherwise, usually with a 200 status either way,
/// so the body is the only signal worth reading.
fn decode_encode_response(body: &Value) -> Result<FaceDescriptor, RemoteError> {
    if let Some(values) = body.get("descriptor").and_then(Value::as_array) {
        let vector: Option<Vec<f32>> = values.iter().map(|v| v.as_f64().map(|f| f as f32)).collect();
        if let Some(vector) = vector {
            return Ok(FaceDescriptor(vector));
        }
        return Err(RemoteError::Service("non-numeric descriptor entry".into()));
    }

    match body.get("error").and_then(Value::as_str) {
        Some(msg) if msg.to_ascii_lowercase().contains("no face") => Err(RemoteError::NoFaceFound),
        Some(msg) => Err(RemoteError::Service(msg.to_string())),
        None => Err(RemoteError::Service(format!("unexpected reply: {body}"))),
    }
}

/// Decode a `/match-image` reply. Anything that is not a clean hit is a
/// non-match; the matching policy lives on the remote side.
fn decode_match_response(body: &Value) -> Option<RemoteHit> {
    let reg_no = body.get("regNo").and_then(Value::as_u64)?;
    let name = body.get("name").and_then(Value::as_str)?;
    Some(RemoteHit {
        reg_no: reg_no as u32,
        name: name.to_string(),
    })
}
