//! turnstile-store - SQLite persistence for the check-in core.
//!
//! Holds tenants, members, per-backend face enrollments, and the
//! append-only attendance ledger. "Last check-in" and monthly totals are
//! derived from the ledger, never stored as mutable counters, so there
//! is no read-modify-write window to lose an increment in.

use std::path::Path;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use thiserror::Error;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use turnstile_core::checkin::{month_index, CheckInMethod};
use turnstile_core::descriptor::DescriptorBackend;
use turnstile_core::{EnrolledFace, FaceDescriptor};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Which identity-resolution strategy a tenant runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Face recognition disabled; register-number check-in only.
    Off,
    /// Browser-extracted descriptors matched in-process.
    Local,
    /// Probe images delegated to the external recognition service.
    Remote,
}

impl RecognitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionMode::Off => "off",
            RecognitionMode::Local => "local",
            RecognitionMode::Remote => "remote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(RecognitionMode::Off),
            "local" => Some(RecognitionMode::Local),
            "remote" => Some(RecognitionMode::Remote),
            _ => None,
        }
    }

    /// The enrollment slot this mode reads and writes.
    pub fn backend(&self) -> Option<DescriptorBackend> {
        match self {
            RecognitionMode::Off => None,
            RecognitionMode::Local => Some(DescriptorBackend::Local),
            RecognitionMode::Remote => Some(DescriptorBackend::Remote),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub recognition: RecognitionMode,
    pub remote_endpoint: Option<String>,
}

impl Tenant {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            recognition: RecognitionMode::Off,
            remote_endpoint: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub tenant_id: String,
    pub reg_no: u32,
    pub name: String,
    pub phone: String,
    pub pack_type: String,
    pub due_date: Option<NaiveDate>,
}

/// Kiosk autocomplete entry: never more than name and register number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub reg_no: u32,
    pub name: String,
}

/// One row of the attendance ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceEvent {
    pub id: i64,
    pub occurred_at: DateTime<Utc>,
    pub method: CheckInMethod,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tenants (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    recognition     TEXT NOT NULL DEFAULT 'off',
    remote_endpoint TEXT
);

CREATE TABLE IF NOT EXISTS members (
    tenant_id TEXT    NOT NULL,
    reg_no    INTEGER NOT NULL,
    name      TEXT    NOT NULL,
    phone     TEXT    NOT NULL DEFAULT '',
    pack_type TEXT    NOT NULL DEFAULT '',
    due_date  TEXT,
    PRIMARY KEY (tenant_id, reg_no)
);

CREATE TABLE IF NOT EXISTS face_enrollments (
    tenant_id   TEXT    NOT NULL,
    reg_no      INTEGER NOT NULL,
    backend     TEXT    NOT NULL,
    descriptor  TEXT    NOT NULL,
    enrolled_at TEXT    NOT NULL,
    PRIMARY KEY (tenant_id, reg_no, backend)
);

CREATE TABLE IF NOT EXISTS attendance (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id   TEXT    NOT NULL,
    reg_no      INTEGER NOT NULL,
    occurred_at TEXT    NOT NULL,
    method      TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attendance_member
    ON attendance (tenant_id, reg_no, occurred_at);
";

/// Handle to the SQLite database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path.to_path_buf()).await?;
        let store = Self { conn };
        store.migrate().await?;
        tracing::info!(path = %path.display(), "store opened");
        Ok(store)
    }

    /// In-memory database, used by tests and diagnostics.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        let store = Self { conn };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // --- tenants ---

    pub async fn upsert_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let t = tenant.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tenants (id, name, recognition, remote_endpoint)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (id) DO UPDATE SET
                         name = excluded.name,
                         recognition = excluded.recognition,
                         remote_endpoint = excluded.remote_endpoint",
                    params![t.id, t.name, t.recognition.as_str(), t.remote_endpoint],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn tenant(&self, id: &str) -> Result<Option<Tenant>, StoreError> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, name, recognition, remote_endpoint
                         FROM tenants WHERE id = ?1",
                        params![id],
                        |r| {
                            Ok((
                                r.get::<_, String>(0)?,
                                r.get::<_, String>(1)?,
                                r.get::<_, String>(2)?,
                                r.get::<_, Option<String>>(3)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(|(id, name, recognition, remote_endpoint)| {
            let recognition = RecognitionMode::parse(&recognition)
                .ok_or_else(|| StoreError::Corrupt(format!("recognition mode {recognition:?}")))?;
            Ok(Tenant {
                id,
                name,
                recognition,
                remote_endpoint,
            })
        })
        .transpose()
    }

    // --- members ---

    pub async fn upsert_member(&self, member: &MemberRecord) -> Result<(), StoreError> {
        let m = member.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO members (tenant_id, reg_no, name, phone, pack_type, due_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (tenant_id, reg_no) DO UPDATE SET
                         name = excluded.name,
                         phone = excluded.phone,
                         pack_type = excluded.pack_type,
                         due_date = excluded.due_date",
                    params![
                        m.tenant_id,
                        m.reg_no,
                        m.name,
                        m.phone,
                        m.pack_type,
                        m.due_date.map(|d| d.to_string()),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn member(
        &self,
        tenant_id: &str,
        reg_no: u32,
    ) -> Result<Option<MemberRecord>, StoreError> {
        let tenant = tenant_id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT tenant_id, reg_no, name, phone, pack_type, due_date
                         FROM members WHERE tenant_id = ?1 AND reg_no = ?2",
                        params![tenant, reg_no],
                        |r| {
                            Ok((
                                r.get::<_, String>(0)?,
                                r.get::<_, u32>(1)?,
                                r.get::<_, String>(2)?,
                                r.get::<_, String>(3)?,
                                r.get::<_, String>(4)?,
                                r.get::<_, Option<String>>(5)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(|(tenant_id, reg_no, name, phone, pack_type, due_date)| {
            let due_date = due_date.map(|d| parse_date(&d)).transpose()?;
            Ok(MemberRecord {
                tenant_id,
                reg_no,
                name,
                phone,
                pack_type,
                due_date,
            })
        })
        .transpose()
    }

    /// Members whose membership is valid today (or has no due date),
    /// for the public kiosk autocomplete. Expired members are never
    /// revealed to the unauthenticated page.
    pub async fn active_roster(
        &self,
        tenant_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<RosterEntry>, StoreError> {
        let tenant = tenant_id.to_string();
        let today = today.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT reg_no, name FROM members
                     WHERE tenant_id = ?1 AND (due_date IS NULL OR due_date >= ?2)
                     ORDER BY reg_no",
                )?;
                let rows = stmt
                    .query_map(params![tenant, today], |r| {
                        Ok(RosterEntry {
                            reg_no: r.get(0)?,
                            name: r.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    // --- face enrollments ---

    pub async fn save_enrollment(
        &self,
        tenant_id: &str,
        reg_no: u32,
        backend: DescriptorBackend,
        descriptor: &FaceDescriptor,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let tenant = tenant_id.to_string();
        let json = serde_json::to_string(descriptor)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO face_enrollments
                         (tenant_id, reg_no, backend, descriptor, enrolled_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![tenant, reg_no, backend.as_str(), json, at.to_rfc3339()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Clear every enrollment slot for a member, returning the member to
    /// non-biometric check-in eligibility. Returns rows removed.
    pub async fn remove_enrollments(
        &self,
        tenant_id: &str,
        reg_no: u32,
    ) -> Result<usize, StoreError> {
        let tenant = tenant_id.to_string();
        let n = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM face_enrollments WHERE tenant_id = ?1 AND reg_no = ?2",
                    params![tenant, reg_no],
                )?;
                Ok(n)
            })
            .await?;
        Ok(n)
    }

    pub async fn enrollment_exists(
        &self,
        tenant_id: &str,
        reg_no: u32,
        backend: DescriptorBackend,
    ) -> Result<bool, StoreError> {
        let tenant = tenant_id.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let exists = conn
                    .query_row(
                        "SELECT 1 FROM face_enrollments
                         WHERE tenant_id = ?1 AND reg_no = ?2 AND backend = ?3",
                        params![tenant, reg_no, backend.as_str()],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    /// A tenant's gallery for one backend, joined with member names.
    /// Rows whose stored JSON no longer parses are skipped with a
    /// warning; the matcher re-validates the vectors themselves.
    pub async fn gallery(
        &self,
        tenant_id: &str,
        backend: DescriptorBackend,
    ) -> Result<Vec<EnrolledFace>, StoreError> {
        let tenant = tenant_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.reg_no, m.name, e.descriptor
                     FROM face_enrollments e
                     JOIN members m ON m.tenant_id = e.tenant_id AND m.reg_no = e.reg_no
                     WHERE e.tenant_id = ?1 AND e.backend = ?2",
                )?;
                let rows = stmt
                    .query_map(params![tenant, backend.as_str()], |r| {
                        Ok((
                            r.get::<_, u32>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut gallery = Vec::with_capacity(rows.len());
        for (reg_no, name, json) in rows {
            match serde_json::from_str::<FaceDescriptor>(&json) {
                Ok(descriptor) => gallery.push(EnrolledFace {
                    reg_no,
                    name,
                    descriptor,
                }),
                Err(e) => {
                    tracing::warn!(reg_no, error = %e, "skipping unparseable stored descriptor");
                }
            }
        }
        Ok(gallery)
    }

    // --- attendance ledger ---

    pub async fn record_attendance(
        &self,
        tenant_id: &str,
        reg_no: u32,
        at: DateTime<Utc>,
        method: CheckInMethod,
    ) -> Result<(), StoreError> {
        let tenant = tenant_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attendance (tenant_id, reg_no, occurred_at, method)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![tenant, reg_no, at.to_rfc3339(), method.as_str()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Most recent ledger row for a member, if any.
    pub async fn last_attendance(
        &self,
        tenant_id: &str,
        reg_no: u32,
    ) -> Result<Option<AttendanceEvent>, StoreError> {
        let tenant = tenant_id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, occurred_at, method FROM attendance
                         WHERE tenant_id = ?1 AND reg_no = ?2
                         ORDER BY occurred_at DESC, id DESC LIMIT 1",
                        params![tenant, reg_no],
                        |r| {
                            Ok((
                                r.get::<_, i64>(0)?,
                                r.get::<_, String>(1)?,
                                r.get::<_, String>(2)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(|(id, occurred_at, method)| {
            Ok(AttendanceEvent {
                id,
                occurred_at: parse_timestamp(&occurred_at)?,
                method: CheckInMethod::parse(&method)
                    .ok_or_else(|| StoreError::Corrupt(format!("check-in method {method:?}")))?,
            })
        })
        .transpose()
    }

    /// Remove one ledger row by id. Returns whether a row was deleted.
    pub async fn delete_attendance(&self, id: i64) -> Result<bool, StoreError> {
        let n = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM attendance WHERE id = ?1", params![id])?;
                Ok(n)
            })
            .await?;
        Ok(n > 0)
    }

    /// Per-calendar-month totals for one member in one local year,
    /// derived from the ledger (bucket 0 = January).
    pub async fn monthly_attendance(
        &self,
        tenant_id: &str,
        reg_no: u32,
        year: i32,
    ) -> Result<[u32; 12], StoreError> {
        let tenant = tenant_id.to_string();
        let stamps = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT occurred_at FROM attendance
                     WHERE tenant_id = ?1 AND reg_no = ?2",
                )?;
                let stamps = stmt
                    .query_map(params![tenant, reg_no], |r| r.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stamps)
            })
            .await?;

        let mut buckets = [0u32; 12];
        for stamp in stamps {
            let at = parse_timestamp(&stamp)?;
            if at.with_timezone(&Local).year() == year {
                buckets[month_index(at)] += 1;
            }
        }
        Ok(buckets)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    s.parse()
        .map_err(|_| StoreError::Corrupt(format!("date {s:?}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("timestamp {s:?}")))
}
