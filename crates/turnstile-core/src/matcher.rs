use serde::{Deserialize, Serialize};

use crate::descriptor::FaceDescriptor;

/// One member's enrolled descriptor, as loaded from a tenant's gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledFace {
    #[serde(rename = "regNo")]
    pub reg_no: u32,
    pub name: String,
    pub descriptor: FaceDescriptor,
}

/// Outcome of scanning a gallery for a probe descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    /// Exactly one confident match.
    Match {
        reg_no: u32,
        name: String,
        distance: f32,
    },
    /// Two candidates were too close to call. Refusing beats guessing:
    /// a wrong admit is worse than sending the member to the front desk.
    Ambiguous { best: f32, runner_up: f32 },
    /// Nothing under the acceptance threshold.
    NoMatch,
}

/// Tunable matching calibration.
///
/// `duplicate_threshold` is deliberately stricter than `accept_threshold`:
/// enrollment only rejects highly confident duplicates, so legitimately
/// similar-looking members are not locked out of signing up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Candidates at or above this distance are discarded.
    pub accept_threshold: f32,
    /// Best and runner-up closer together than this: refuse to decide.
    pub ambiguity_margin: f32,
    /// Enrollment collision distance. Strictly below rejects.
    pub duplicate_threshold: f32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            accept_threshold: 0.38,
            ambiguity_margin: 0.12,
            duplicate_threshold: 0.28,
        }
    }
}

impl MatchPolicy {
    /// Scan a tenant's gallery for the probe and return at most one
    /// confident match.
    ///
    /// Every entry is visited; malformed stored descriptors are skipped
    /// rather than trusted. Candidates under `accept_threshold` are
    /// ranked by distance, and the best is returned only when the
    /// runner-up is more than `ambiguity_margin` behind it.
    pub fn identify(&self, probe: &FaceDescriptor, gallery: &[EnrolledFace]) -> MatchDecision {
        if !probe.is_well_formed() {
            return MatchDecision::NoMatch;
        }

        let mut candidates: Vec<(f32, &EnrolledFace)> = gallery
            .iter()
            .filter(|f| f.descriptor.is_well_formed())
            .map(|f| (probe.distance(&f.descriptor), f))
            .filter(|(d, _)| *d < self.accept_threshold)
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let Some(&(best, hit)) = candidates.first() else {
            return MatchDecision::NoMatch;
        };

        if let Some(&(runner_up, _)) = candidates.get(1) {
            if runner_up - best <= self.ambiguity_margin {
                tracing::debug!(best, runner_up, "ambiguous face match refused");
                return MatchDecision::Ambiguous { best, runner_up };
            }
        }

        MatchDecision::Match {
            reg_no: hit.reg_no,
            name: hit.name.clone(),
            distance: best,
        }
    }

    /// Check a descriptor being enrolled against every *other* member's
    /// enrolled descriptor, returning the closest conflict, if any.
    ///
    /// Callers must exclude the member being (re-)enrolled from the
    /// gallery, since re-enrollment replaces their own prior descriptor.
    pub fn find_duplicate<'a>(
        &self,
        probe: &FaceDescriptor,
        gallery: &'a [EnrolledFace],
    ) -> Option<&'a EnrolledFace> {
        gallery
            .iter()
            .filter(|f| f.descriptor.is_well_formed())
            .map(|f| (probe.distance(&f.descriptor), f))
            .filter(|(d, _)| *d < self.duplicate_threshold)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, f)| f)
    }
}
