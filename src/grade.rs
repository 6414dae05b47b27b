//! Grade ladder shown at the end of a game: `9` (lowest) up through `1`,
//! then `S1`..`S9`, then `GM`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Grade(u8);

impl Grade {
    pub const LOWEST: Grade = Grade(0);
    pub const S1: Grade = Grade(9);
    pub const S5: Grade = Grade(13);
    pub const S9: Grade = Grade(17);
    pub const GM: Grade = Grade(18);

    pub fn new(tier: u8) -> Option<Self> {
        (tier <= Self::GM.0).then_some(Grade(tier))
    }

    pub fn is_max(self) -> bool {
        self == Self::GM
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0..=8 => write!(f, "{}", 9 - self.0),
            9..=17 => write!(f, "S{}", self.0 - 8),
            _ => f.write_str("GM"),
        }
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("gm") {
            return Ok(Self::GM);
        }
        if let Some(rest) = trimmed.strip_prefix(['S', 's']) {
            return match rest.parse::<u8>() {
                Ok(n @ 1..=9) => Ok(Grade(n + 8)),
                _ => Err(format!("unknown grade {raw:?}")),
            };
        }
        match trimmed.parse::<u8>() {
            Ok(n @ 1..=9) => Ok(Grade(9 - n)),
            _ => Err(format!("unknown grade {raw:?}")),
        }
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
