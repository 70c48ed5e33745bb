use serde::{Deserialize, Serialize};

/// The three troubleshooting intents carried by the reference SOP. The
/// engine treats the SOP catalog as data and must not hard-code step
/// identifiers, but the intent tags themselves are part of the stable
/// flag vocabulary (`active_intent`, `queued_complaints`, keyword
/// detection) and are therefore a closed Rust enum rather than a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Mati,
    Bau,
    Bunyi,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Mati => "mati",
            Intent::Bau => "bau",
            Intent::Bunyi => "bunyi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mati" => Some(Intent::Mati),
            "bau" => Some(Intent::Bau),
            "bunyi" => Some(Intent::Bunyi),
            _ => None,
        }
    }

    pub const ALL: [Intent; 3] = [Intent::Mati, Intent::Bau, Intent::Bunyi];
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse turn status returned to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Open,
    Pending,
    Resolved,
    Blocked,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::Open => "open",
            TurnStatus::Pending => "pending",
            TurnStatus::Resolved => "resolved",
            TurnStatus::Blocked => "blocked",
        }
    }
}

/// Role of a history entry / chat-log direction participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

/// Three-valued gender slot, per the identity slots in the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

/// A rule-based or inferred yes/no/frequency answer classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    Sering,
    Jarang,
    Unclear,
}
