use std::fmt;

use serde::{Deserialize, Serialize};

/// Rooms hold at most this many players.
pub const MAX_USER_COUNT: i64 = 4;

#[derive(Debug)]
pub struct InvalidEnumValue {
    pub kind: &'static str,
    pub value: i64,
}

impl fmt::Display for InvalidEnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a valid {}", self.value, self.kind)
    }
}

impl std::error::Error for InvalidEnumValue {}

// The client protocol and the store both carry these enums as integer codes.
macro_rules! int_enum {
    ($T:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl From<$T> for i64 {
            fn from(value: $T) -> i64 {
                value as i64
            }
        }

        impl TryFrom<i64> for $T {
            type Error = InvalidEnumValue;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($T::$variant),)+
                    _ => Err(InvalidEnumValue { kind: stringify!($T), value }),
                }
            }
        }
    };
}

/// Per-player difficulty choice, independent of the other members'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum LiveDifficulty {
    Normal = 1,
    Hard = 2,
}

int_enum!(LiveDifficulty { Normal = 1, Hard = 2 });

/// Outcome of a join attempt. `RoomFull` and `Disbanded` are normal control
/// flow for the caller, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum JoinRoomResult {
    Ok = 1,
    RoomFull = 2,
    Disbanded = 3,
    OtherError = 4,
}

int_enum!(JoinRoomResult { Ok = 1, RoomFull = 2, Disbanded = 3, OtherError = 4 });

/// Room lifecycle. Transitions run forward only:
/// Waiting -> InProgress -> Dissolved, or Waiting -> Dissolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum RoomStatus {
    Waiting = 1,
    InProgress = 2,
    Dissolved = 3,
}

int_enum!(RoomStatus { Waiting = 1, InProgress = 2, Dissolved = 3 });

/// A discovery listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: i64,
    pub live_id: i64,
    pub joined_user_count: i64,
    pub max_user_count: i64,
}

/// A member as seen from the wait screen, annotated for the polling caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUser {
    pub user_id: i64,
    pub name: String,
    pub leader_card_id: i64,
    pub select_difficulty: LiveDifficulty,
    pub is_me: bool,
    pub is_host: bool,
}

/// One member's final tally, in judge order perfect/great/good/bad/miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultUser {
    pub user_id: i64,
    pub judge_count_list: [i64; 5],
    pub score: i64,
}

/// Hit-accuracy tally submitted with a score at the end of a live.
#[derive(Debug, Clone, Copy)]
pub struct JudgeCounts {
    pub perfect: i64,
    pub great: i64,
    pub good: i64,
    pub bad: i64,
    pub miss: i64,
}

impl From<[i64; 5]> for JudgeCounts {
    fn from([perfect, great, good, bad, miss]: [i64; 5]) -> Self {
        Self {
            perfect,
            great,
            good,
            bad,
            miss,
        }
    }
}
