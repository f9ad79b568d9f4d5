/// Mask / face-shield classes and arg-max selection over raw model scores.
///
/// The model itself runs elsewhere; this module only knows the closed class
/// set, in model output order, and how to pick the winner.
use crate::error::{KioskError, Result};

/// Number of model outputs
pub const CLASS_COUNT: usize = 5;

/// Classifier output classes, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskClass {
    FaceMask,
    FaceMaskAndShield,
    FaceShield,
    NoFace,
    None,
}

impl MaskClass {
    pub const ALL: [MaskClass; CLASS_COUNT] = [
        MaskClass::FaceMask,
        MaskClass::FaceMaskAndShield,
        MaskClass::FaceShield,
        MaskClass::NoFace,
        MaskClass::None,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaskClass::FaceMask => "face mask",
            MaskClass::FaceMaskAndShield => "face mask and face shield",
            MaskClass::FaceShield => "face shield",
            MaskClass::NoFace => "no face",
            MaskClass::None => "none",
        }
    }
}

/// Winning class and its score in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: MaskClass,
    pub confidence: f32,
}

/// Pick the highest score. The first maximum wins ties.
///
/// Empty vectors, NaN scores and extra outputs beyond the class set are
/// collaborator failures, not something to guess around.
pub fn arg_max(scores: &[f32]) -> Result<Classification> {
    if scores.is_empty() {
        return Err(KioskError::Peripheral("classifier returned no scores".into()));
    }
    if scores.len() > CLASS_COUNT {
        return Err(KioskError::Peripheral(format!(
            "classifier returned {} scores for {CLASS_COUNT} classes",
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(KioskError::Peripheral("classifier returned NaN".into()));
    }

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }

    let label = MaskClass::from_index(best)
        .ok_or_else(|| KioskError::Peripheral(format!("class index {best} out of range")))?;
    Ok(Classification {
        label,
        confidence: scores[best].clamp(0.0, 1.0),
    })
}
