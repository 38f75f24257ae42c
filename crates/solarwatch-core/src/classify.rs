//! Threshold classification of continuous readings.
//!
//! Two independent tables, both half-open on the lower bound:
//!
//! | probability   | flare class   |   normalised flux | flux letter |
//! |---------------|---------------|-------------------|-------------|
//! | `[0.0, 0.2)`  | Insignificant |   `[0.0, 0.2)`    | B           |
//! | `[0.2, 0.4)`  | C             |   `[0.2, 0.4)`    | C           |
//! | `[0.4, 0.7)`  | M             |   `[0.4, 0.7)`    | M           |
//! | `[0.7, 1.0]`  | X             |   `[0.7, ∞)`      | X           |
//!
//! Flux is normalised by [`FLUX_FULL_SCALE`] before the lookup. Its printed
//! intensity is always the raw value scaled by 10^6 to one decimal place, so
//! `5e-6` W/m² renders as `B5.0`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bounds of the C, M and X bands.
const BAND_EDGES: [f64; 3] = [0.2, 0.4, 0.7];

/// Flux (W/m²) that maps to 1.0 on the normalised scale.
pub const FLUX_FULL_SCALE: f64 = 1e-4;

/// Multiplier from W/m² to the printed intensity suffix.
pub const FLUX_SUFFIX_SCALE: f64 = 1e6;

fn band(value: f64) -> usize {
    BAND_EDGES.iter().take_while(|&&edge| value >= edge).count()
}

// ---------------------------------------------------------------------------
// Flare class (probability domain)
// ---------------------------------------------------------------------------

/// Ordinal severity of a predicted flare. Ordering follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlareClass {
    Insignificant,
    C,
    M,
    X,
}

impl FlareClass {
    /// Classify a probability. Values outside `[0, 1]` are clamped; NaN is
    /// treated as zero.
    pub fn from_probability(p: f64) -> Self {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        match band(p) {
            0 => Self::Insignificant,
            1 => Self::C,
            2 => Self::M,
            _ => Self::X,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Insignificant => "Insignificant (A/B-class)",
            Self::C => "C-Class",
            Self::M => "M-Class",
            Self::X => "X-Class",
        }
    }
}

impl fmt::Display for FlareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Flux class (physical domain)
// ---------------------------------------------------------------------------

/// Letter band of an X-ray flux reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FluxClass {
    B,
    C,
    M,
    X,
}

impl FluxClass {
    /// Classify a flux in W/m². NaN and negative values fall in B; +∞ is X.
    pub fn from_flux(watts: f64) -> Self {
        let normalised = if watts.is_nan() {
            0.0
        } else {
            (watts / FLUX_FULL_SCALE).max(0.0)
        };
        match band(normalised) {
            0 => Self::B,
            1 => Self::C,
            2 => Self::M,
            _ => Self::X,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::B => 'B',
            Self::C => 'C',
            Self::M => 'M',
            Self::X => 'X',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'M' => Some(Self::M),
            'X' => Some(Self::X),
            _ => None,
        }
    }
}

impl fmt::Display for FluxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Letter plus intensity suffix, e.g. `B5.0`.
pub fn format_flux(watts: f64) -> String {
    format!(
        "{}{:.1}",
        FluxClass::from_flux(watts).letter(),
        watts * FLUX_SUFFIX_SCALE
    )
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Confidence bucket reported alongside a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_probability(p: f64) -> Self {
        if p > 0.6 {
            Self::High
        } else if p > 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
