//! Application core: turns resolved identities into attendance events
//! and manages face enrollment, on top of the store and the matcher.
//!
//! Every public method maps storage/business failures into [`ApiError`]
//! here, so the route layer only ever shuttles typed outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use turnstile_core::checkin::{self, CheckInMethod, MemberStanding};
use turnstile_core::{FaceDescriptor, MatchPolicy, TokenCodec};
use turnstile_remote::{RemoteError, RemoteRecognizer};
use turnstile_store::{MemberRecord, RecognitionMode, RosterEntry, Store, Tenant};

use crate::config::Config;
use crate::error::ApiError;
use crate::resolver::{FaceIdentifier, FaceProbe};

/// Seam for external alerting (push, Telegram). The daemon only decides
/// *when* staff should hear about something, never how.
pub trait Notifier: Send + Sync {
    /// An expired member tried to check in; staff may want to call them.
    fn membership_expired(&self, tenant: &Tenant, name: &str, reg_no: u32, phone: &str);
    /// A face probe matched nobody in the gallery.
    fn face_not_recognized(&self, tenant: &Tenant);
}

/// Default notifier: operational visibility only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn membership_expired(&self, tenant: &Tenant, name: &str, reg_no: u32, phone: &str) {
        tracing::info!(tenant = %tenant.id, name, reg_no, phone, "expired member at the door");
    }

    fn face_not_recognized(&self, tenant: &Tenant) {
        tracing::info!(tenant = %tenant.id, "face not recognized");
    }
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub phone_number: String,
    #[serde(rename = "typeofPack")]
    pub typeof_pack: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInOutcome {
    pub success: bool,
    pub name: String,
    pub member_summary: MemberSummary,
    pub check_in_time: DateTime<Utc>,
}

pub struct App {
    store: Store,
    codec: TokenCodec,
    policy: MatchPolicy,
    public_url: String,
    remote_timeout: Duration,
    pub max_image_bytes: usize,
    notifier: Arc<dyn Notifier>,
}

impl App {
    pub fn new(store: Store, config: &Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            codec: TokenCodec::new(&config.token_secret, config.token_ttl()),
            policy: config.match_policy(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            remote_timeout: Duration::from_secs(config.remote_timeout_secs),
            max_image_bytes: config.max_image_bytes,
            notifier,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // --- tokens ---

    /// Mint a kiosk link for a tenant. Staff-side; the tenant id comes
    /// from the caller's session.
    pub async fn issue_token(&self, tenant_id: &str) -> Result<IssuedToken, ApiError> {
        let tenant = self.staff_tenant(tenant_id).await?;
        let token = self.codec.issue(&tenant.id);
        tracing::info!(tenant = %tenant.id, "kiosk token issued");
        Ok(IssuedToken {
            url: format!("{}/checkin?token={token}", self.public_url),
            token,
        })
    }

    /// Verify a kiosk token and load the tenant it names.
    async fn kiosk_tenant(&self, token: &str) -> Result<Tenant, ApiError> {
        let tenant_id = self.codec.verify(token)?;
        // A signed token for a since-deleted tenant is still dead.
        self.store
            .tenant(&tenant_id)
            .await?
            .ok_or(ApiError::InvalidToken)
    }

    async fn staff_tenant(&self, tenant_id: &str) -> Result<Tenant, ApiError> {
        self.store
            .tenant(tenant_id)
            .await?
            .ok_or(ApiError::UnknownTenant)
    }

    // --- kiosk roster ---

    /// Autocomplete list for the public check-in page: only members whose
    /// membership is currently valid (or open-ended).
    pub async fn kiosk_roster(&self, token: &str) -> Result<Vec<RosterEntry>, ApiError> {
        let tenant = self.kiosk_tenant(token).await?;
        let today = Utc::now().with_timezone(&Local).date_naive();
        Ok(self.store.active_roster(&tenant.id, today).await?)
    }

    // --- check-in paths ---

    pub async fn check_in_manual(
        &self,
        tenant_id: &str,
        reg_no: u32,
    ) -> Result<CheckInOutcome, ApiError> {
        let tenant = self.staff_tenant(tenant_id).await?;
        self.check_in(&tenant, reg_no, CheckInMethod::Manual).await
    }

    pub async fn check_in_by_qr(
        &self,
        token: &str,
        reg_no: u32,
    ) -> Result<CheckInOutcome, ApiError> {
        let tenant = self.kiosk_tenant(token).await?;
        self.check_in(&tenant, reg_no, CheckInMethod::QrSelf).await
    }

    pub async fn check_in_by_descriptor(
        &self,
        token: &str,
        descriptor: FaceDescriptor,
    ) -> Result<CheckInOutcome, ApiError> {
        let tenant = self.kiosk_tenant(token).await?;
        self.check_in_by_face(&tenant, FaceProbe::Descriptor(descriptor))
            .await
    }

    pub async fn check_in_by_image(
        &self,
        token: &str,
        image: Vec<u8>,
    ) -> Result<CheckInOutcome, ApiError> {
        let tenant = self.kiosk_tenant(token).await?;
        self.validate_image(&image)?;
        self.check_in_by_face(&tenant, FaceProbe::Image(image)).await
    }

    async fn check_in_by_face(
        &self,
        tenant: &Tenant,
        probe: FaceProbe,
    ) -> Result<CheckInOutcome, ApiError> {
        let identifier =
            FaceIdentifier::for_tenant(&self.store, tenant, self.policy, self.remote_timeout)
                .await?;

        match identifier.identify(probe).await? {
            Some(hit) => self.check_in(tenant, hit.reg_no, CheckInMethod::Face).await,
            None => {
                self.notifier.face_not_recognized(tenant);
                Err(ApiError::NotRecognized)
            }
        }
    }

    /// The convergence point: every identity-resolution path lands here
    /// with a register number and the method that produced it.
    async fn check_in(
        &self,
        tenant: &Tenant,
        reg_no: u32,
        method: CheckInMethod,
    ) -> Result<CheckInOutcome, ApiError> {
        let now = Utc::now();
        let member = self
            .store
            .member(&tenant.id, reg_no)
            .await?
            .ok_or(ApiError::UnknownMember(reg_no))?;

        let standing = self.standing(tenant, &member).await?;

        if let Err(refusal) = checkin::evaluate(&standing, method, now) {
            if let checkin::CheckInRefusal::MembershipExpired {
                name,
                reg_no,
                phone,
                ..
            } = &refusal
            {
                self.notifier
                    .membership_expired(tenant, name, *reg_no, phone);
            }
            return Err(refusal.into());
        }

        self.store
            .record_attendance(&tenant.id, reg_no, now, method)
            .await?;
        tracing::info!(tenant = %tenant.id, reg_no, method = method.as_str(), "checked in");

        Ok(CheckInOutcome {
            success: true,
            name: member.name.clone(),
            member_summary: MemberSummary {
                name: member.name,
                due_date: member.due_date,
                phone_number: member.phone,
                typeof_pack: member.pack_type,
            },
            check_in_time: now,
        })
    }

    async fn standing(
        &self,
        tenant: &Tenant,
        member: &MemberRecord,
    ) -> Result<MemberStanding, ApiError> {
        let last = self.store.last_attendance(&tenant.id, member.reg_no).await?;
        let face_enrolled = match tenant.recognition.backend() {
            Some(backend) => {
                self.store
                    .enrollment_exists(&tenant.id, member.reg_no, backend)
                    .await?
            }
            None => false,
        };
        Ok(MemberStanding {
            reg_no: member.reg_no,
            name: member.name.clone(),
            phone: member.phone.clone(),
            pack_type: member.pack_type.clone(),
            due_date: member.due_date,
            last_check_in: last.map(|e| e.occurred_at),
            face_enrolled,
        })
    }

    /// Staff fixup: remove today's check-in. A check-in from any earlier
    /// day is left alone and `false` is returned.
    pub async fn undo_check_in(&self, tenant_id: &str, reg_no: u32) -> Result<bool, ApiError> {
        let tenant = self.staff_tenant(tenant_id).await?;
        self.store
            .member(&tenant.id, reg_no)
            .await?
            .ok_or(ApiError::UnknownMember(reg_no))?;

        let Some(last) = self.store.last_attendance(&tenant.id, reg_no).await? else {
            return Ok(false);
        };
        if !checkin::undo_allowed(Some(last.occurred_at), Utc::now()) {
            return Ok(false);
        }

        let removed = self.store.delete_attendance(last.id).await?;
        if removed {
            tracing::info!(tenant = %tenant.id, reg_no, "today's check-in removed");
        }
        Ok(removed)
    }

    // --- enrollment ---

    pub async fn enroll_descriptor(
        &self,
        tenant_id: &str,
        reg_no: u32,
        descriptor: FaceDescriptor,
    ) -> Result<(), ApiError> {
        let tenant = self.staff_tenant(tenant_id).await?;
        if tenant.recognition != RecognitionMode::Local {
            return Err(ApiError::RecognitionDisabled);
        }
        if !descriptor.is_well_formed() {
            return Err(ApiError::BadDescriptor);
        }
        self.enroll(&tenant, reg_no, descriptor, turnstile_core::DescriptorBackend::Local)
            .await
    }

    pub async fn enroll_image(
        &self,
        tenant_id: &str,
        reg_no: u32,
        image: Vec<u8>,
    ) -> Result<(), ApiError> {
        let tenant = self.staff_tenant(tenant_id).await?;
        if tenant.recognition != RecognitionMode::Remote {
            return Err(ApiError::RecognitionDisabled);
        }
        let endpoint = tenant
            .remote_endpoint
            .as_deref()
            .ok_or(ApiError::RemoteNotConfigured)?;
        self.validate_image(&image)?;

        let client = RemoteRecognizer::new(endpoint, self.remote_timeout);
        let descriptor = client.encode_image(image).await.map_err(|e| match e {
            RemoteError::NoFaceFound => ApiError::NoFaceFound,
            RemoteError::Service(msg) => ApiError::RemoteService(msg),
        })?;
        if !descriptor.is_well_formed() {
            return Err(ApiError::RemoteService(
                "service returned a malformed descriptor".into(),
            ));
        }

        self.enroll(&tenant, reg_no, descriptor, turnstile_core::DescriptorBackend::Remote)
            .await
    }

    /// Shared enrollment tail: collision scan against every *other*
    /// member in the same backend slot, then replace-style persist.
    async fn enroll(
        &self,
        tenant: &Tenant,
        reg_no: u32,
        descriptor: FaceDescriptor,
        backend: turnstile_core::DescriptorBackend,
    ) -> Result<(), ApiError> {
        self.store
            .member(&tenant.id, reg_no)
            .await?
            .ok_or(ApiError::UnknownMember(reg_no))?;

        // Re-enrollment replaces: the member's own prior descriptor is
        // excluded from the collision scan.
        let mut gallery = self.store.gallery(&tenant.id, backend).await?;
        gallery.retain(|f| f.reg_no != reg_no);

        if let Some(conflict) = self.policy.find_duplicate(&descriptor, &gallery) {
            tracing::warn!(
                tenant = %tenant.id,
                reg_no,
                conflict_reg_no = conflict.reg_no,
                "duplicate face enrollment rejected"
            );
            return Err(ApiError::DuplicateFace {
                name: conflict.name.clone(),
                reg_no: conflict.reg_no,
            });
        }

        self.store
            .save_enrollment(&tenant.id, reg_no, backend, &descriptor, Utc::now())
            .await?;
        tracing::info!(tenant = %tenant.id, reg_no, backend = backend.as_str(), "face enrolled");
        Ok(())
    }

    /// Clear a member's enrollments, restoring register-number check-in.
    pub async fn remove_face(&self, tenant_id: &str, reg_no: u32) -> Result<(), ApiError> {
        let tenant = self.staff_tenant(tenant_id).await?;
        self.store
            .member(&tenant.id, reg_no)
            .await?
            .ok_or(ApiError::UnknownMember(reg_no))?;
        let removed = self.store.remove_enrollments(&tenant.id, reg_no).await?;
        tracing::info!(tenant = %tenant.id, reg_no, removed, "face enrollment removed");
        Ok(())
    }

    fn validate_image(&self, image: &[u8]) -> Result<(), ApiError> {
        if image.is_empty() || image.len() > self.max_image_bytes {
            return Err(ApiError::BadImage);
        }
        image::guess_format(image).map_err(|_| ApiError::BadImage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration as ChronoDuration};
    use turnstile_core::descriptor::DESCRIPTOR_LEN;

    fn test_config() -> Config {
        Config {
            bind_addr: "127.0.0.1:0".into(),
            public_url: "http://kiosk.test".into(),
            db_path: "unused".into(),
            token_secret: b"test-secret".to_vec(),
            token_ttl_hours: 24,
            accept_threshold: 0.38,
            ambiguity_margin: 0.12,
            duplicate_threshold: 0.28,
            remote_timeout_secs: 1,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }

    fn base() -> Vec<f32> {
        (0..DESCRIPTOR_LEN).map(|i| i as f32 * 0.005).collect()
    }

    /// Descriptor at an exact Euclidean distance from `base()`.
    fn at_distance(d: f32) -> FaceDescriptor {
        let mut v = base();
        v[0] += d;
        FaceDescriptor(v)
    }

    async fn app_with_tenant(mode: RecognitionMode) -> (App, Tenant) {
        let store = Store::open_in_memory().await.unwrap();
        let mut tenant = Tenant::new("Iron Temple");
        tenant.recognition = mode;
        store.upsert_tenant(&tenant).await.unwrap();

        for (reg_no, name) in [(1, "Asha Pillai"), (2, "Ravi Menon")] {
            store
                .upsert_member(&MemberRecord {
                    tenant_id: tenant.id.clone(),
                    reg_no,
                    name: name.into(),
                    phone: "9876543210".into(),
                    pack_type: "quarterly".into(),
                    due_date: None,
                })
                .await
                .unwrap();
        }

        let app = App::new(store, &test_config(), Arc::new(LogNotifier));
        (app, tenant)
    }

    fn current_month_count(buckets: &[u32; 12]) -> u32 {
        buckets[Utc::now().with_timezone(&Local).month0() as usize]
    }

    #[tokio::test]
    async fn test_issue_then_qr_check_in_end_to_end() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;

        let issued = app.issue_token(&tenant.id).await.unwrap();
        assert!(issued.url.contains(&issued.token));

        let outcome = app.check_in_by_qr(&issued.token, 1).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.name, "Asha Pillai");
        assert_eq!(outcome.member_summary.typeof_pack, "quarterly");

        let year = Utc::now().with_timezone(&Local).year();
        let buckets = app
            .store()
            .monthly_attendance(&tenant.id, 1, year)
            .await
            .unwrap();
        assert_eq!(current_month_count(&buckets), 1);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (app, _) = app_with_tenant(RecognitionMode::Off).await;
        assert!(matches!(
            app.check_in_by_qr("not-a-token", 1).await,
            Err(ApiError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_unknown_member_distinct_from_expired() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        let token = app.issue_token(&tenant.id).await.unwrap().token;
        assert!(matches!(
            app.check_in_by_qr(&token, 99).await,
            Err(ApiError::UnknownMember(99))
        ));
    }

    #[tokio::test]
    async fn test_expired_member_refused_and_ledger_untouched() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        let yesterday = Utc::now().with_timezone(&Local).date_naive() - ChronoDuration::days(1);
        app.store()
            .upsert_member(&MemberRecord {
                tenant_id: tenant.id.clone(),
                reg_no: 3,
                name: "Lapsed".into(),
                phone: "111".into(),
                pack_type: "monthly".into(),
                due_date: Some(yesterday),
            })
            .await
            .unwrap();

        let token = app.issue_token(&tenant.id).await.unwrap().token;
        match app.check_in_by_qr(&token, 3).await {
            Err(ApiError::MembershipExpired { phone, .. }) => assert_eq!(phone, "111"),
            other => panic!("expected expiry, got {other:?}"),
        }
        assert!(app
            .store()
            .last_attendance(&tenant.id, 3)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_same_day_repeat_refused() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        let token = app.issue_token(&tenant.id).await.unwrap().token;
        app.check_in_by_qr(&token, 1).await.unwrap();
        assert!(matches!(
            app.check_in_by_qr(&token, 1).await,
            Err(ApiError::AlreadyCheckedIn)
        ));

        let year = Utc::now().with_timezone(&Local).year();
        let buckets = app
            .store()
            .monthly_attendance(&tenant.id, 1, year)
            .await
            .unwrap();
        assert_eq!(current_month_count(&buckets), 1);
    }

    #[tokio::test]
    async fn test_face_enrolled_member_cannot_use_qr() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.0))
            .await
            .unwrap();

        let token = app.issue_token(&tenant.id).await.unwrap().token;
        assert!(matches!(
            app.check_in_by_qr(&token, 1).await,
            Err(ApiError::FaceRequired { .. })
        ));

        // Removing the enrollment restores register-number check-in.
        app.remove_face(&tenant.id, 1).await.unwrap();
        assert!(app.check_in_by_qr(&token, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_face_check_in_matches_and_records() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.0))
            .await
            .unwrap();
        app.enroll_descriptor(&tenant.id, 2, at_distance(2.0))
            .await
            .unwrap();

        let token = app.issue_token(&tenant.id).await.unwrap().token;
        let outcome = app
            .check_in_by_descriptor(&token, at_distance(0.05))
            .await
            .unwrap();
        assert_eq!(outcome.name, "Asha Pillai");

        // Second attempt the same day is a repeat, not a new event.
        assert!(matches!(
            app.check_in_by_descriptor(&token, at_distance(0.05)).await,
            Err(ApiError::AlreadyCheckedIn)
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_face_is_not_a_token_error() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.0))
            .await
            .unwrap();

        let token = app.issue_token(&tenant.id).await.unwrap().token;
        assert!(matches!(
            app.check_in_by_descriptor(&token, at_distance(1.5)).await,
            Err(ApiError::NotRecognized)
        ));
    }

    #[tokio::test]
    async fn test_face_check_in_disabled_tenant() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        let token = app.issue_token(&tenant.id).await.unwrap().token;
        assert!(matches!(
            app.check_in_by_descriptor(&token, at_distance(0.0)).await,
            Err(ApiError::RecognitionDisabled)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_names_conflict() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.0))
            .await
            .unwrap();

        match app.enroll_descriptor(&tenant.id, 2, at_distance(0.2)).await {
            Err(ApiError::DuplicateFace { name, reg_no }) => {
                assert_eq!(name, "Asha Pillai");
                assert_eq!(reg_no, 1);
            }
            other => panic!("expected duplicate rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_distinct_faces_both_enroll() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.0))
            .await
            .unwrap();
        app.enroll_descriptor(&tenant.id, 2, at_distance(0.5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_re_enrollment_replaces_own_descriptor() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.0))
            .await
            .unwrap();
        // Within duplicate range of their own prior descriptor: allowed,
        // because enrollment is replace, not add.
        app.enroll_descriptor(&tenant.id, 1, at_distance(0.1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_descriptor_rejected_at_enrollment() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Local).await;
        let flat = FaceDescriptor(vec![0.5; DESCRIPTOR_LEN]);
        assert!(matches!(
            app.enroll_descriptor(&tenant.id, 1, flat).await,
            Err(ApiError::BadDescriptor)
        ));
    }

    #[tokio::test]
    async fn test_enrollment_requires_recognition_enabled() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        assert!(matches!(
            app.enroll_descriptor(&tenant.id, 1, at_distance(0.0)).await,
            Err(ApiError::RecognitionDisabled)
        ));
    }

    #[tokio::test]
    async fn test_undo_today_only() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        let token = app.issue_token(&tenant.id).await.unwrap().token;
        app.check_in_by_qr(&token, 1).await.unwrap();

        assert!(app.undo_check_in(&tenant.id, 1).await.unwrap());
        let year = Utc::now().with_timezone(&Local).year();
        let buckets = app
            .store()
            .monthly_attendance(&tenant.id, 1, year)
            .await
            .unwrap();
        assert_eq!(current_month_count(&buckets), 0);

        // Nothing left to undo.
        assert!(!app.undo_check_in(&tenant.id, 1).await.unwrap());

        // A check-in from yesterday is out of the undo window.
        app.store()
            .record_attendance(
                &tenant.id,
                1,
                Utc::now() - ChronoDuration::days(1),
                CheckInMethod::Manual,
            )
            .await
            .unwrap();
        assert!(!app.undo_check_in(&tenant.id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_roster_hides_expired_members() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Off).await;
        let yesterday = Utc::now().with_timezone(&Local).date_naive() - ChronoDuration::days(1);
        app.store()
            .upsert_member(&MemberRecord {
                tenant_id: tenant.id.clone(),
                reg_no: 3,
                name: "Lapsed".into(),
                phone: String::new(),
                pack_type: String::new(),
                due_date: Some(yesterday),
            })
            .await
            .unwrap();

        let token = app.issue_token(&tenant.id).await.unwrap().token;
        let roster = app.kiosk_roster(&token).await.unwrap();
        let regs: Vec<u32> = roster.iter().map(|r| r.reg_no).collect();
        assert_eq!(regs, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_image_paths_reject_garbage_bytes() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Remote).await;
        let token = app.issue_token(&tenant.id).await.unwrap().token;
        assert!(matches!(
            app.check_in_by_image(&token, b"definitely not an image".to_vec())
                .await,
            Err(ApiError::BadImage)
        ));
    }

    #[tokio::test]
    async fn test_image_enrollment_requires_endpoint() {
        let (app, tenant) = app_with_tenant(RecognitionMode::Remote).await;
        // Remote mode but no endpoint configured.
        assert!(matches!(
            app.enroll_image(&tenant.id, 1, vec![0u8; 10]).await,
            Err(ApiError::RemoteNotConfigured)
        ));
    }
}
