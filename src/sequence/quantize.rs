use std::f64::consts::{PI, TAU};

/// How argument columns map to continuous values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantization {
    /// Arguments are integers in `[0, n - 1]`.
    Levels(u32),
    /// Arguments are read as-is.
    Continuous,
}

impl Default for Quantization {
    fn default() -> Self {
        Self::Levels(256)
    }
}

/// How a continuous argument is scaled from its quantized level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Profile coordinates and radii: `q / n`.
    Coordinate,
    /// Arc sweep: `q / n · 2π`.
    Sweep,
    /// Plane orientation angles: `(q / n · 2 − 1) · π`.
    Angle,
    /// Plane origin and extents: `q / n · 2 − 1`.
    Signed,
    /// Sketch scale: `q / n · 2`.
    Scale,
}

impl Quantization {
    /// Maps a configured level count to a quantization; zero means continuous.
    #[must_use]
    pub fn from_levels(levels: u32) -> Self {
        if levels == 0 {
            Self::Continuous
        } else {
            Self::Levels(levels)
        }
    }

    fn levels(self) -> Option<f64> {
        match self {
            Self::Levels(n) => Some(f64::from(n)),
            Self::Continuous => None,
        }
    }

    /// Whether `raw` denotes an absent argument.
    #[must_use]
    pub fn is_missing(self, raw: f64) -> bool {
        match self {
            Self::Levels(_) => !raw.is_finite() || (raw - super::PAD_VALUE).abs() < 1e-6,
            Self::Continuous => !raw.is_finite(),
        }
    }

    /// Whether `raw` is an admissible argument: an integer level in
    /// `[0, n − 1]`, or any finite value when continuous.
    #[must_use]
    pub fn in_range(self, raw: f64) -> bool {
        match self.levels() {
            Some(n) => super::discrete(raw).is_some() && (0.0..=n - 1.0).contains(&raw.round()),
            None => raw.is_finite(),
        }
    }

    /// Converts a stored level to its continuous value.
    #[must_use]
    pub fn dequantize(self, kind: ArgKind, raw: f64) -> f64 {
        let Some(n) = self.levels() else {
            return raw;
        };
        let t = raw / n;
        match kind {
            ArgKind::Coordinate => t,
            ArgKind::Sweep => t * TAU,
            ArgKind::Angle => (t * 2.0 - 1.0) * PI,
            ArgKind::Signed => t * 2.0 - 1.0,
            ArgKind::Scale => t * 2.0,
        }
    }

    /// Converts a continuous value back to the nearest stored level,
    /// clamped to `[0, n − 1]`.
    #[must_use]
    pub fn quantize(self, kind: ArgKind, value: f64) -> f64 {
        let Some(n) = self.levels() else {
            return value;
        };
        let t = match kind {
            ArgKind::Coordinate => value,
            ArgKind::Sweep => value / TAU,
            ArgKind::Angle => (value / PI + 1.0) / 2.0,
            ArgKind::Signed => (value + 1.0) / 2.0,
            ArgKind::Scale => value / 2.0,
        };
        self.snap(t * n)
    }

    /// Rounds a raw level onto the grid. Identity when continuous.
    #[must_use]
    pub fn snap(self, raw: f64) -> f64 {
        match self.levels() {
            Some(n) if raw.is_finite() => raw.round().clamp(0.0, n - 1.0),
            Some(_) => 0.0,
            None => raw,
        }
    }
}
