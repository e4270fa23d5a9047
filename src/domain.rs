#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MONOLITH_ROLE: &str = "all";
pub const FRONTEND_ROLE: &str = "frontend";

/// Operating mode selected at launch. Fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Aggregator that also serves every part itself.
    Monolith,
    /// Aggregator with no part of its own.
    Frontend,
    /// Leaf service for exactly one body part, named by the role string.
    Part(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("component role must not be empty")]
    Empty,
    #[error("component role `{0}` cannot be used as a path segment")]
    InvalidName(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Monolith => MONOLITH_ROLE,
            Role::Frontend => FRONTEND_ROLE,
            Role::Part(name) => name.as_str(),
        }
    }

    pub fn is_aggregator(&self) -> bool {
        matches!(self, Role::Monolith | Role::Frontend)
    }

    pub fn serves_parts(&self) -> bool {
        !matches!(self, Role::Frontend)
    }

    pub fn mode_label(&self) -> &'static str {
        match self {
            Role::Monolith => "monolith",
            Role::Frontend => "frontend",
            Role::Part(_) => "part",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        match value {
            "" => Err(RoleError::Empty),
            MONOLITH_ROLE => Ok(Role::Monolith),
            FRONTEND_ROLE => Ok(Role::Frontend),
            other if !other.chars().all(is_role_char) => {
                Err(RoleError::InvalidName(other.to_string()))
            }
            other => Ok(Role::Part(other.to_string())),
        }
    }
}

/// Leaf roles are mounted verbatim as a fixed route segment.
fn is_role_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five logical peer services an aggregator collects from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyPart {
    Hat,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BodyPart {
    pub const ALL: [BodyPart; 5] = [
        BodyPart::LeftArm,
        BodyPart::RightArm,
        BodyPart::LeftLeg,
        BodyPart::RightLeg,
        BodyPart::Hat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BodyPart::Hat => "hat",
            BodyPart::LeftArm => "left-arm",
            BodyPart::RightArm => "right-arm",
            BodyPart::LeftLeg => "left-leg",
            BodyPart::RightLeg => "right-leg",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|part| part.as_str() == name)
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload a leaf reports about the variant that answered. The default value means
/// "omit this part" and is never treated as an error by the renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartResult {
    pub image: String,
    #[serde(rename = "servedBy")]
    pub served_by: String,
    pub version: String,
}

impl PartResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty() && self.served_by.is_empty() && self.version.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Daytime {
    Morning,
    Afternoon,
    Evening,
}

impl Daytime {
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            Daytime::Morning
        } else if hour < 18 {
            Daytime::Afternoon
        } else {
            Daytime::Evening
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Daytime::Morning => "morning",
            Daytime::Afternoon => "afternoon",
            Daytime::Evening => "evening",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartSlots {
    pub left_arm: PartResult,
    pub right_arm: PartResult,
    pub left_leg: PartResult,
    pub right_leg: PartResult,
    pub hat: PartResult,
}

impl PartSlots {
    pub fn get(&self, part: BodyPart) -> &PartResult {
        match part {
            BodyPart::Hat => &self.hat,
            BodyPart::LeftArm => &self.left_arm,
            BodyPart::RightArm => &self.right_arm,
            BodyPart::LeftLeg => &self.left_leg,
            BodyPart::RightLeg => &self.right_leg,
        }
    }

    pub fn set(&mut self, part: BodyPart, result: PartResult) {
        let slot = match part {
            BodyPart::Hat => &mut self.hat,
            BodyPart::LeftArm => &mut self.left_arm,
            BodyPart::RightArm => &mut self.right_arm,
            BodyPart::LeftLeg => &mut self.left_leg,
            BodyPart::RightLeg => &mut self.right_leg,
        };
        *slot = result;
    }

    pub fn populated(&self) -> usize {
        BodyPart::ALL
            .into_iter()
            .filter(|part| !self.get(*part).is_empty())
            .count()
    }
}

/// Everything the home page needs for one request. Built fresh every time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedView {
    pub hostname: String,
    pub version: String,
    pub daytime: Daytime,
    pub secret_message: String,
    pub parts: PartSlots,
}
