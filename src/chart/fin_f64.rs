//! Finite binary64 definition, used for tempo values.

/// `f64` but it has only finite value.
///
/// Tempo maps are searched and sorted by these values, so a `NaN` or an infinity read from a
/// chart file must be rejected before it reaches them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct FinF64(f64);

impl Eq for FinF64 {}
impl PartialOrd for FinF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for FinF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl FinF64 {
    /// 120 BPM, the tempo assumed when a chart declares none.
    pub const DEFAULT_BPM: Self = Self(120.0);

    /// Creates a new `FinF64` from `f64` if `float` is finite, otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn new(float: f64) -> Option<Self> {
        float.is_finite().then_some(Self(float))
    }

    /// Creates a new `FinF64` only if `float` is finite and strictly positive, as a playable tempo must be.
    #[inline]
    #[must_use]
    pub fn positive(float: f64) -> Option<Self> {
        Self::new(float).filter(|value| value.0 > 0.0)
    }

    /// Gets the internal value.
    #[inline]
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }
}
