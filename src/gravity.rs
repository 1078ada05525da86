//! The nine-direction gravity vocabulary.
//!
//! A gravity names which region of the source image a crop or extent
//! operation anchors against: the eight compass points plus `Center`. The
//! set is closed — ImageMagick's `-gravity` argument takes exactly these
//! names, and output filenames embed the lowercase form.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown gravity ({0}), expected one of North, NorthEast, East, SouthEast, South, SouthWest, West, NorthWest, Center")]
pub struct GravityError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Center,
}

impl Gravity {
    /// Every gravity, in the order slices are generated.
    pub const ALL: [Gravity; 9] = [
        Gravity::North,
        Gravity::NorthEast,
        Gravity::East,
        Gravity::SouthEast,
        Gravity::South,
        Gravity::SouthWest,
        Gravity::West,
        Gravity::NorthWest,
        Gravity::Center,
    ];

    /// The name ImageMagick expects after `-gravity`.
    pub fn as_str(self) -> &'static str {
        match self {
            Gravity::North => "North",
            Gravity::NorthEast => "NorthEast",
            Gravity::East => "East",
            Gravity::SouthEast => "SouthEast",
            Gravity::South => "South",
            Gravity::SouthWest => "SouthWest",
            Gravity::West => "West",
            Gravity::NorthWest => "NorthWest",
            Gravity::Center => "Center",
        }
    }

    /// Lowercase form embedded in output filenames.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Gravity::North => "north",
            Gravity::NorthEast => "northeast",
            Gravity::East => "east",
            Gravity::SouthEast => "southeast",
            Gravity::South => "south",
            Gravity::SouthWest => "southwest",
            Gravity::West => "west",
            Gravity::NorthWest => "northwest",
            Gravity::Center => "center",
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gravity {
    type Err = GravityError;

    // Matching is exact: `pick` takes the enumerated spelling, not a
    // case-folded variant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gravity::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| GravityError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_has_nine_distinct_gravities() {
        assert_eq!(Gravity::ALL.len(), 9);
        for (i, a) in Gravity::ALL.iter().enumerate() {
            for b in &Gravity::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn every_name_parses_back() {
        for gravity in Gravity::ALL {
            assert_eq!(gravity.as_str().parse::<Gravity>().unwrap(), gravity);
        }
    }

    #[test]
    fn file_suffix_is_lowercased_name() {
        for gravity in Gravity::ALL {
            assert_eq!(gravity.file_suffix(), gravity.as_str().to_lowercase());
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert!("north".parse::<Gravity>().is_err());
        assert!("NORTHEAST".parse::<Gravity>().is_err());
        assert!("Northeast".parse::<Gravity>().is_err());
    }

    #[test]
    fn parse_rejects_unknown_name() {
        let err = "Middle".parse::<Gravity>().unwrap_err();
        assert!(err.to_string().contains("Middle"));
    }
}
