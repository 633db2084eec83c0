use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version `{input}`: {reason}")]
    InvalidVersion { input: String, reason: &'static str },

    #[error("invalid version range `{input}`: {reason}")]
    InvalidRange { input: String, reason: &'static str },
}

/// An OSGi version: `major.minor.micro.qualifier`.
///
/// Numeric parts compare numerically, the qualifier lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = |reason| VersionError::InvalidVersion {
            input: input.to_owned(),
            reason,
        };

        let text = input.trim();
        if text.is_empty() {
            return Err(invalid("empty version"));
        }

        let mut parts = text.splitn(4, '.');
        let mut numbers = [0u32; 3];
        for (i, slot) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(part) => {
                    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(invalid("version parts must be non-negative numbers"));
                    }
                    *slot = part.parse().map_err(|_| invalid("version part out of range"))?;
                }
                None if i == 0 => return Err(invalid("missing major version")),
                None => break,
            }
        }

        // Only reachable after all three numeric parts.
        let qualifier = parts.next().unwrap_or("");
        if !qualifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(invalid("invalid character in qualifier"));
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier: qualifier.to_owned(),
        })
    }

    /// The same version without qualifier.
    pub fn without_qualifier(&self) -> Self {
        Self::new(self.major, self.minor, self.micro)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro, self.qualifier.as_str()).cmp(&(
            other.major,
            other.minor,
            other.micro,
            other.qualifier.as_str(),
        ))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An OSGi version range.
///
/// `[1.0,2.0)` style intervals, or a bare version meaning "at least".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    left: Version,
    left_closed: bool,
    right: Option<Version>,
    right_closed: bool,
}

impl VersionRange {
    pub fn at_least(left: Version) -> Self {
        Self {
            left,
            left_closed: true,
            right: None,
            right_closed: false,
        }
    }

    pub fn interval(left: Version, left_closed: bool, right: Version, right_closed: bool) -> Self {
        Self {
            left,
            left_closed,
            right: Some(right),
            right_closed,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = |reason| VersionError::InvalidRange {
            input: input.to_owned(),
            reason,
        };
        let version = |text: &str| Version::parse(text).map_err(|_| invalid("invalid version bound"));

        let text = input.trim();
        let left_closed = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            Some(_) => return version(text).map(Self::at_least),
            None => return Err(invalid("empty range")),
        };
        let right_closed = match text.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("missing closing `]` or `)`")),
        };
        let body = &text[1..text.len() - 1];
        let Some((left, right)) = body.split_once(',') else {
            return Err(invalid("expected `left,right`"));
        };
        let left = version(left)?;
        let right = version(right)?;
        if right < left {
            return Err(invalid("right bound is lower than left bound"));
        }
        Ok(Self::interval(left, left_closed, right, right_closed))
    }

    pub fn left(&self) -> &Version {
        &self.left
    }

    pub fn is_left_closed(&self) -> bool {
        self.left_closed
    }

    /// `None` for an unbounded range.
    pub fn right(&self) -> Option<&Version> {
        self.right.as_ref()
    }

    pub fn is_right_closed(&self) -> bool {
        self.right_closed
    }

    pub fn includes(&self, version: &Version) -> bool {
        let above_left = if self.left_closed {
            version >= &self.left
        } else {
            version > &self.left
        };
        let below_right = match &self.right {
            None => true,
            Some(right) if self.right_closed => version <= right,
            Some(right) => version < right,
        };
        above_left && below_right
    }

    /// This range with a new closed floor, keeping the right bound as is.
    pub fn with_floor(&self, floor: Version) -> Self {
        Self {
            left: floor,
            left_closed: true,
            right: self.right.clone(),
            right_closed: self.right_closed,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(right) = &self.right else {
            return write!(f, "{}", self.left);
        };
        write!(
            f,
            "{}{},{}{}",
            if self.left_closed { '[' } else { '(' },
            self.left,
            right,
            if self.right_closed { ']' } else { ')' }
        )
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
