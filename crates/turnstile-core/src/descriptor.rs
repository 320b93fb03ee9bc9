use serde::{Deserialize, Serialize};

/// Dimensionality of a face descriptor (dlib / face-api.js embedding).
pub const DESCRIPTOR_LEN: usize = 128;

/// Minimum L2 norm below which a descriptor is treated as a failed extraction.
const MIN_L2_NORM: f32 = 0.01;

/// Which extraction pipeline produced a stored descriptor.
///
/// The two backends are independent enrollment slots: a member may be
/// enrolled under one, the other, both, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorBackend {
    /// Extracted in the member's browser during enrollment.
    Local,
    /// Extracted by the external recognition service.
    Remote,
}

impl DescriptorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorBackend::Local => "local",
            DescriptorBackend::Remote => "remote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(DescriptorBackend::Local),
            "remote" => Some(DescriptorBackend::Remote),
            _ => None,
        }
    }
}

/// Face embedding vector (128-dimensional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceDescriptor(pub Vec<f32>);

impl FaceDescriptor {
    /// Compute Euclidean distance between two descriptors.
    ///
    /// A descriptor of the wrong length never matches anything: the
    /// distance is `+inf` rather than an error, so corrupt stored rows
    /// degrade to "no match" instead of failing a whole gallery scan.
    pub fn distance(&self, other: &FaceDescriptor) -> f32 {
        if self.0.len() != DESCRIPTOR_LEN || other.0.len() != DESCRIPTOR_LEN {
            return f32::INFINITY;
        }
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Whether this descriptor is trustworthy for comparison.
    ///
    /// Rejects wrong-length vectors, non-finite entries, near-zero
    /// magnitude, and constant vectors. All of these indicate a failed
    /// or corrupt extraction, and historical rows are re-checked through
    /// this before they participate in any distance comparison.
    pub fn is_well_formed(&self) -> bool {
        if self.0.len() != DESCRIPTOR_LEN {
            return false;
        }
        if self.0.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let norm: f32 = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < MIN_L2_NORM {
            return false;
        }
        let first = self.0[0];
        if self.0.iter().all(|v| *v == first) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varied(seed: f32) -> FaceDescriptor {
        FaceDescriptor((0..DESCRIPTOR_LEN).map(|i| seed + i as f32 * 0.01).collect())
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = varied(0.3);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = varied(0.1);
        let b = varied(0.7);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn test_distance_wrong_length_is_infinite() {
        let a = varied(0.1);
        let short = FaceDescriptor(vec![0.5; DESCRIPTOR_LEN - 1]);
        let long = FaceDescriptor(vec![0.5; DESCRIPTOR_LEN + 1]);
        assert_eq!(a.distance(&short), f32::INFINITY);
        assert_eq!(short.distance(&a), f32::INFINITY);
        assert_eq!(a.distance(&long), f32::INFINITY);
    }

    #[test]
    fn test_well_formed_accepts_real_vector() {
        assert!(varied(0.2).is_well_formed());
    }

    #[test]
    fn test_rejects_all_zero() {
        assert!(!FaceDescriptor(vec![0.0; DESCRIPTOR_LEN]).is_well_formed());
    }

    #[test]
    fn test_rejects_constant_nonzero() {
        assert!(!FaceDescriptor(vec![0.5; DESCRIPTOR_LEN]).is_well_formed());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(!FaceDescriptor(vec![0.5; 127]).is_well_formed());
        assert!(!FaceDescriptor(vec![0.5; 129]).is_well_formed());
    }

    #[test]
    fn test_rejects_nan_entry() {
        let mut v = varied(0.2);
        v.0[40] = f32::NAN;
        assert!(!v.is_well_formed());
    }

    #[test]
    fn test_rejects_near_zero_norm() {
        let v = FaceDescriptor((0..DESCRIPTOR_LEN).map(|i| i as f32 * 1e-6).collect());
        assert!(!v.is_well_formed());
    }

    #[test]
    fn test_backend_round_trip() {
        for b in [DescriptorBackend::Local, DescriptorBackend::Remote] {
            assert_eq!(DescriptorBackend::parse(b.as_str()), Some(b));
        }
        assert_eq!(DescriptorBackend::parse("browser"), None);
    }
}
