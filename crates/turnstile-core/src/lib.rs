//! turnstile-core - Gym check-in engine.
//!
//! Pure decision logic: face-descriptor comparison and matching,
//! signed kiosk access tokens, and the check-in admission rules.
//! No I/O lives here; storage and clocks are injected by callers.

pub mod checkin;
pub mod descriptor;
pub mod matcher;
pub mod token;

pub use checkin::{CheckInMethod, CheckInRefusal, MemberStanding};
pub use descriptor::{DescriptorBackend, FaceDescriptor, DESCRIPTOR_LEN};
pub use matcher::{EnrolledFace, MatchDecision, MatchPolicy};
pub use token::{TokenCodec, TokenError};
