//! Per-tenant identity-resolution strategy.
//!
//! A tenant runs either the in-process matcher over browser-extracted
//! descriptors or the remote image service, never both for one attempt.
//! The strategy is picked here, once per request, from tenant
//! configuration; the rest of the service layer is backend-agnostic.

use std::time::Duration;

use turnstile_core::{FaceDescriptor, MatchDecision, MatchPolicy};
use turnstile_remote::RemoteRecognizer;
use turnstile_store::{RecognitionMode, Store, Tenant};

use crate::error::ApiError;

/// What the kiosk captured for identification.
pub enum FaceProbe {
    /// 128-d descriptor extracted in the member's browser.
    Descriptor(FaceDescriptor),
    /// Raw image bytes for the remote service.
    Image(Vec<u8>),
}

/// A resolved identity: which member the face belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHit {
    pub reg_no: u32,
}

pub enum FaceIdentifier {
    Local {
        policy: MatchPolicy,
        gallery: Vec<turnstile_core::EnrolledFace>,
    },
    Remote {
        client: RemoteRecognizer,
        gallery: Vec<turnstile_core::EnrolledFace>,
    },
}

impl FaceIdentifier {
    /// Build the identifier for a tenant's configured backend, loading
    /// that backend's gallery. Tenants with recognition off get an error
    /// before any gallery is read.
    pub async fn for_tenant(
        store: &Store,
        tenant: &Tenant,
        policy: MatchPolicy,
        remote_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let Some(backend) = tenant.recognition.backend() else {
            return Err(ApiError::RecognitionDisabled);
        };
        let gallery = store.gallery(&tenant.id, backend).await?;

        match tenant.recognition {
            RecognitionMode::Local => Ok(FaceIdentifier::Local { policy, gallery }),
            RecognitionMode::Remote => {
                let endpoint = tenant
                    .remote_endpoint
                    .as_deref()
                    .ok_or(ApiError::RemoteNotConfigured)?;
                Ok(FaceIdentifier::Remote {
                    client: RemoteRecognizer::new(endpoint, remote_timeout),
                    gallery,
                })
            }
            RecognitionMode::Off => Err(ApiError::RecognitionDisabled),
        }
    }

    /// Resolve a probe to at most one member.
    ///
    /// `Ok(None)` covers no-match, ambiguous-match, and (on the remote
    /// path) service failure: the check-in path fails closed rather than
    /// guessing or crashing. A probe of the wrong kind for the backend
    /// is a configuration error, not a non-match.
    pub async fn identify(&self, probe: FaceProbe) -> Result<Option<IdentityHit>, ApiError> {
        match (self, probe) {
            (FaceIdentifier::Local { policy, gallery }, FaceProbe::Descriptor(probe)) => {
                match policy.identify(&probe, gallery) {
                    MatchDecision::Match {
                        reg_no, distance, ..
                    } => {
                        tracing::info!(reg_no, distance, "local face match");
                        Ok(Some(IdentityHit { reg_no }))
                    }
                    MatchDecision::Ambiguous { best, runner_up } => {
                        tracing::info!(best, runner_up, "face match ambiguous, refused");
                        Ok(None)
                    }
                    MatchDecision::NoMatch => Ok(None),
                }
            }
            (FaceIdentifier::Remote { client, gallery }, FaceProbe::Image(image)) => {
                match client.match_image(image, gallery).await {
                    Ok(Some(hit)) => {
                        tracing::info!(reg_no = hit.reg_no, "remote face match");
                        Ok(Some(IdentityHit { reg_no: hit.reg_no }))
                    }
                    Ok(None) => Ok(None),
                    Err(e) => {
                        tracing::warn!(error = %e, "remote recognition failed, treating as no match");
                        Ok(None)
                    }
                }
            }
            (FaceIdentifier::Local { .. }, FaceProbe::Image(_)) => {
                Err(ApiError::RemoteNotConfigured)
            }
            (FaceIdentifier::Remote { .. }, FaceProbe::Descriptor(_)) => {
                Err(ApiError::RecognitionDisabled)
            }
        }
    }
}
