use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::PrimitiveDateTime;

macro_rules! server_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

server_id!(
    /// Server-assigned user identifier.
    UserId
);
server_id!(
    /// Server-assigned court identifier.
    CourtId
);
server_id!(
    /// Server-assigned match identifier.
    MatchId
);
server_id!(
    /// Server-assigned challenge lobby identifier.
    LobbyId
);
server_id!(
    /// Server-assigned tournament identifier.
    TournamentId
);

/// Ranked match format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Singles,
    Doubles,
}

impl MatchType {
    /// Number of players each side fields in this format.
    pub fn players_per_team(self) -> usize {
        match self {
            MatchType::Singles => 1,
            MatchType::Doubles => 2,
        }
    }

    /// Capitalised label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            MatchType::Singles => "Singles",
            MatchType::Doubles => "Doubles",
        }
    }
}

/// Public user projection embedded in most ranked payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub elo_rating: Option<f64>,
}

impl UserSummary {
    /// Name shown on cards: the display name when set, the username otherwise.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Minimal court projection attached to matches and lobbies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtSummary {
    pub id: CourtId,
    #[serde(default)]
    pub name: Option<String>,
}

/// Error body returned by the backend on non-success statuses.
///
/// Besides `error` some endpoints attach context such as `scheduled_for`,
/// `seconds_until_start` or `missing_player_ids`; those are kept in `details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ErrorBody {
    /// Service-provided message, preferring `error` over `message`.
    pub fn into_message(self) -> (Option<String>, Map<String, Value>) {
        (self.error.or(self.message), self.details)
    }
}

/// Acknowledgement body for endpoints that only return a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Serde adapters for the backend's naive ISO-8601 timestamps (`2025-03-01T18:30:00.123456`).
pub mod naive_iso {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use time::{PrimitiveDateTime, format_description::FormatItem, macros::format_description};

    const PARSE_FORMAT: &[FormatItem<'static>] = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    const WRITE_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

    /// Parse a timestamp, tolerating a trailing `Z` or a numeric UTC offset of zero.
    pub fn parse(raw: &str) -> Option<PrimitiveDateTime> {
        let trimmed = raw
            .trim()
            .trim_end_matches('Z')
            .trim_end_matches("+00:00");
        PrimitiveDateTime::parse(trimmed, PARSE_FORMAT).ok()
    }

    /// Format a timestamp the way the backend accepts it.
    pub fn format(value: &PrimitiveDateTime) -> String {
        value
            .format(WRITE_FORMAT)
            .unwrap_or_else(|_| "invalid-timestamp".into())
    }

    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`")))
    }

    /// Optional variant; `null`, a missing field and unparsable text all read as `None`.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::PrimitiveDateTime;

        pub fn serialize<S>(
            value: &Option<PrimitiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PrimitiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            Ok(raw.as_deref().and_then(super::parse))
        }
    }
}

/// Current UTC wall-clock time in the backend's naive representation.
pub fn utc_now() -> PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}
