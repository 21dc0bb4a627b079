use std::fmt;

/// Signed pixel offset of the target centroid from the frame center.
/// Positive `dx` is right of center, positive `dy` is below center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelOffset {
    pub dx: i32,
    pub dy: i32,
}

impl PixelOffset {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl fmt::Display for PixelOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}

/// What the locator saw in one frame.
///
/// `Detected` always carries a non-zero magnitude; an empty mask is
/// `Absent`. Use [`TargetEstimate::detected`] to keep that invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetEstimate {
    #[default]
    Absent,
    Detected {
        offset: PixelOffset,
        /// Blob area in mask pixels.
        magnitude: u64,
    },
}

impl TargetEstimate {
    /// A zero magnitude collapses to `Absent`.
    pub fn detected(offset: PixelOffset, magnitude: u64) -> Self {
        if magnitude == 0 {
            return Self::Absent;
        }
        Self::Detected { offset, magnitude }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }

    pub fn offset(&self) -> Option<PixelOffset> {
        match self {
            Self::Absent => None,
            Self::Detected { offset, .. } => Some(*offset),
        }
    }

    pub fn magnitude(&self) -> u64 {
        match self {
            Self::Absent => 0,
            Self::Detected { magnitude, .. } => *magnitude,
        }
    }
}
