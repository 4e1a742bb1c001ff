//! RGB colors in the `r:g:b` notation the engine and batch commands use.

use crate::error::SceneError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0, self.1, self.2)
    }
}

/// Standard named colors accepted by display commands.
const NAMED: &[(&str, Rgb)] = &[
    ("white", Rgb(255, 255, 255)),
    ("black", Rgb(0, 0, 0)),
    ("red", Rgb(255, 0, 0)),
    ("green", Rgb(0, 255, 0)),
    ("blue", Rgb(0, 0, 255)),
    ("yellow", Rgb(255, 255, 0)),
    ("magenta", Rgb(255, 0, 255)),
    ("cyan", Rgb(0, 255, 255)),
    ("aqua", Rgb(100, 128, 255)),
    ("grey", Rgb(128, 128, 128)),
    ("gray", Rgb(128, 128, 128)),
    ("orange", Rgb(255, 128, 0)),
    ("brown", Rgb(180, 77, 25)),
    ("purple", Rgb(128, 0, 255)),
    ("violet", Rgb(128, 0, 255)),
    ("indigo", Rgb(0, 128, 255)),
];

impl FromStr for Rgb {
    type Err = SceneError;

    /// Parses `r:g:b` or a standard color name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((_, rgb)) = NAMED.iter().find(|(name, _)| name.eq_ignore_ascii_case(s)) {
            return Ok(*rgb);
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(SceneError::Precondition(format!("invalid color '{s}'")));
        }
        let channel = |p: &str| {
            p.trim()
                .parse::<u8>()
                .map_err(|_| SceneError::Precondition(format!("invalid color '{s}'")))
        };
        Ok(Rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triplet_and_name() {
        assert_eq!("10:20:30".parse::<Rgb>().unwrap(), Rgb(10, 20, 30));
        assert_eq!("Red".parse::<Rgb>().unwrap(), Rgb(255, 0, 0));
        assert!("300:0:0".parse::<Rgb>().is_err());
        assert!("chartreuse".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_display_uses_colons() {
        assert_eq!(Rgb(136, 136, 136).to_string(), "136:136:136");
    }
}
