use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed participant position in the dialogue.
///
/// The slot identity never changes when a different persona is selected
/// into it. Older documents spell the slots `modelA`/`modelB`; both forms
/// are accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slot {
    /// The opening speaker.
    #[default]
    #[serde(alias = "modelA")]
    A,
    /// The responding speaker.
    #[serde(alias = "modelB")]
    B,
}

impl Slot {
    /// Both slots in turn order.
    pub const ALL: [Slot; 2] = [Slot::A, Slot::B];

    /// Returns the slot that speaks after this one.
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::A => "A",
            Slot::B => "B",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "modela" => Ok(Slot::A),
            "b" | "modelb" => Ok(Slot::B),
            other => Err(format!("Unknown slot '{other}', expected A or B")),
        }
    }
}
