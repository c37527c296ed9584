//! Channel mask: which of red, green, blue and alpha an operation may modify.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-channel enable flags.
///
/// Disabled channels keep their pre-operation value for every pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelMask {
    /// Red channel enabled.
    pub red: bool,
    /// Green channel enabled.
    pub green: bool,
    /// Blue channel enabled.
    pub blue: bool,
    /// Alpha channel enabled.
    pub alpha: bool,
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl ChannelMask {
    /// Every channel enabled.
    pub const ALL: Self = Self {
        red: true,
        green: true,
        blue: true,
        alpha: true,
    };

    /// Every channel disabled.
    pub const NONE: Self = Self {
        red: false,
        green: false,
        blue: false,
        alpha: false,
    };

    /// Color channels only, alpha preserved.
    pub const RGB: Self = Self {
        alpha: false,
        ..Self::ALL
    };

    /// Parse the compact notation: each of `r`, `g`, `b`, `a` present in
    /// the string enables that channel; every other character is ignored.
    #[must_use]
    pub fn parse(notation: &str) -> Self {
        Self {
            red: notation.contains('r'),
            green: notation.contains('g'),
            blue: notation.contains('b'),
            alpha: notation.contains('a'),
        }
    }

    /// Flags in `[r, g, b, a]` order.
    #[must_use]
    pub const fn as_array(self) -> [bool; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// Number of enabled channels.
    #[must_use]
    pub fn count(self) -> usize {
        self.as_array().iter().filter(|&&on| on).count()
    }
}

impl FromStr for ChannelMask {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, c) in self.as_array().into_iter().zip(['r', 'g', 'b', 'a']) {
            if on {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_all() {
        assert_eq!(ChannelMask::default(), ChannelMask::ALL);
        assert_eq!(ChannelMask::ALL.count(), 4);
    }

    #[test]
    fn parse_single_channel() {
        let mask = ChannelMask::parse("r");
        assert_eq!(
            mask,
            ChannelMask {
                red: true,
                green: false,
                blue: false,
                alpha: false
            }
        );
    }

    #[test]
    fn parse_is_order_independent() {
        assert_eq!(ChannelMask::parse("bg"), ChannelMask::parse("gb"));
        assert_eq!(ChannelMask::parse("argb"), ChannelMask::ALL);
        assert_eq!(ChannelMask::parse("rgb"), ChannelMask::RGB);
    }

    #[test]
    fn empty_string_disables_everything() {
        assert_eq!(ChannelMask::parse(""), ChannelMask::NONE);
        assert_eq!(ChannelMask::NONE.count(), 0);
    }

    #[test]
    fn unrelated_characters_are_ignored() {
        assert_eq!(ChannelMask::parse("x-y-z"), ChannelMask::NONE);
        assert_eq!(ChannelMask::parse("red"), ChannelMask::parse("r"));
    }

    #[test]
    fn display_uses_compact_notation() {
        assert_eq!(ChannelMask::ALL.to_string(), "rgba");
        assert_eq!(ChannelMask::parse("br").to_string(), "rb");
        assert_eq!(ChannelMask::NONE.to_string(), "");
    }

    #[test]
    fn from_str_matches_parse() {
        let mask: ChannelMask = "ga".parse().unwrap();
        assert_eq!(mask, ChannelMask::parse("ga"));
    }

    #[test]
    fn partial_struct_deserializes_with_defaults() {
        let mask: ChannelMask = serde_json::from_str(r#"{"blue": false}"#).unwrap();
        assert_eq!(
            mask,
            ChannelMask {
                blue: false,
                ..ChannelMask::ALL
            }
        );
    }
}
