use serde::{Deserialize, Serialize};

/// A font-level guideline, built from a two-node contour in the SFD `Grid`
/// section.
///
/// Horizontal guides carry only `y`, vertical guides only `x`; anything else
/// carries both coordinates and an angle in degrees.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Guideline {
    pub fn horizontal(y: f64, name: Option<String>) -> Self {
        Guideline {
            y: Some(y),
            name,
            ..Default::default()
        }
    }

    pub fn vertical(x: f64, name: Option<String>) -> Self {
        Guideline {
            x: Some(x),
            name,
            ..Default::default()
        }
    }

    pub fn angled(x: f64, y: f64, angle: f64, name: Option<String>) -> Self {
        Guideline {
            x: Some(x),
            y: Some(y),
            angle: Some(angle),
            name,
        }
    }
}
