use serde::{Deserialize, Serialize};

use crate::error::SfdError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub name: String,
}

/// The role of an SFD `AnchorPoint` record within its anchor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorKind {
    Mark,
    BaseChar,
    BaseMark,
    Entry,
    Exit,
    /// A per-component attachment point on a ligature, disambiguated by index
    Ligature,
}

impl AnchorKind {
    pub(crate) fn parse(word: &str, text: &str) -> Result<Self, SfdError> {
        match word {
            "mark" => Ok(AnchorKind::Mark),
            "basechar" => Ok(AnchorKind::BaseChar),
            "basemark" => Ok(AnchorKind::BaseMark),
            "entry" => Ok(AnchorKind::Entry),
            "exit" => Ok(AnchorKind::Exit),
            "baselig" => Ok(AnchorKind::Ligature),
            _ => Err(SfdError::MalformedRecord {
                key: "AnchorPoint".to_string(),
                text: text.to_string(),
            }),
        }
    }
}
