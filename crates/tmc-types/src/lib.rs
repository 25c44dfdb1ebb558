/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The score was outside the accepted 0–100 range
    #[error("Compatibility score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(f64),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TypeError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A compatibility score guaranteed to lie in the inclusive range [0, 100].
///
/// The score is produced by an external matching collaborator and treated as
/// opaque advisory input: it is validated at the boundary and never recomputed
/// or used as an ordering key inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CompatibilityScore(f64);

impl CompatibilityScore {
    /// Creates a new `CompatibilityScore` from a raw value.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CompatibilityScore)` when `value` is within [0, 100],
    /// or `Err(TypeError::ScoreOutOfRange)` otherwise (NaN is rejected).
    pub fn new(value: f64) -> Result<Self, TypeError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(TypeError::ScoreOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw score value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for CompatibilityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for CompatibilityScore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for CompatibilityScore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        CompatibilityScore::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Dr Okafor  ").unwrap();
        assert_eq!(text.as_str(), "Dr Okafor");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace_only() {
        assert!(matches!(NonEmptyText::new("   "), Err(TypeError::Empty)));
    }

    #[test]
    fn test_score_accepts_bounds() {
        assert!(CompatibilityScore::new(0.0).is_ok());
        assert!(CompatibilityScore::new(100.0).is_ok());
        assert_eq!(CompatibilityScore::new(87.5).unwrap().value(), 87.5);
    }

    #[test]
    fn test_score_rejects_out_of_range() {
        assert!(CompatibilityScore::new(-0.1).is_err());
        assert!(CompatibilityScore::new(100.1).is_err());
        assert!(CompatibilityScore::new(f64::NAN).is_err());
    }
}
