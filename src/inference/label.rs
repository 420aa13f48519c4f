//! The canonical prediction label.
//!
//! The prediction service has historically answered with both `POSITIVE`
//! and `TEST POSITIVE` (sometimes with stray whitespace). Every variant
//! parses into [`Label`]; wording for display is chosen separately by
//! [`Label::report_text`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Binary classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    /// Label for a predicted class index (1 = positive).
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    /// Canonical wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "POSITIVE",
            Label::Negative => "NEGATIVE",
        }
    }

    /// Presentation form for reports.
    pub fn report_text(&self) -> &'static str {
        match self {
            Label::Positive => "TEST POSITIVE",
            Label::Negative => "TEST NEGATIVE",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a label string that matches no known wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl std::fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown prediction label: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let word = normalized
            .strip_prefix("TEST")
            .map(str::trim_start)
            .unwrap_or(&normalized);
        match word {
            "POSITIVE" => Ok(Label::Positive),
            "NEGATIVE" => Ok(Label::Negative),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Tally of labels in a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
}

impl LabelCounts {
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }

    /// Share of positives, 0.0 for an empty batch.
    pub fn positive_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.positive as f64 / self.total() as f64
        }
    }
}

impl<'a> FromIterator<&'a Label> for LabelCounts {
    fn from_iter<I: IntoIterator<Item = &'a Label>>(iter: I) -> Self {
        let mut counts = LabelCounts::default();
        for label in iter {
            match label {
                Label::Positive => counts.positive += 1,
                Label::Negative => counts.negative += 1,
            }
        }
        counts
    }
}

impl std::fmt::Display for LabelCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}, {}: {} ({:.1}% positive)",
            Label::Positive.report_text(),
            self.positive,
            Label::Negative.report_text(),
            self.negative,
            self.positive_ratio() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_variants() {
        assert_eq!("POSITIVE".parse::<Label>(), Ok(Label::Positive));
        assert_eq!(" TEST POSITIVE".parse::<Label>(), Ok(Label::Positive));
        assert_eq!("TEST NEGATIVE".parse::<Label>(), Ok(Label::Negative));
        assert_eq!("negative".parse::<Label>(), Ok(Label::Negative));
        assert!("MAYBE".parse::<Label>().is_err());
        assert!("TESTPOSITIVEX".parse::<Label>().is_err());
    }

    #[test]
    fn test_wire_and_report_forms() {
        assert_eq!(serde_json::to_string(&Label::Positive).unwrap(), "\"POSITIVE\"");
        assert_eq!(Label::Negative.to_string(), "NEGATIVE");
        assert_eq!(Label::Positive.report_text(), "TEST POSITIVE");
        let parsed: Vec<Label> = serde_json::from_str(r#"["NEGATIVE", " TEST POSITIVE"]"#).unwrap();
        assert_eq!(parsed, vec![Label::Negative, Label::Positive]);
    }

    #[test]
    fn test_from_class() {
        assert_eq!(Label::from_class(1), Label::Positive);
        assert_eq!(Label::from_class(0), Label::Negative);
    }

    #[test]
    fn test_counts() {
        let labels = [Label::Positive, Label::Negative, Label::Negative, Label::Positive];
        let counts: LabelCounts = labels.iter().collect();
        assert_eq!(counts.positive, 2);
        assert_eq!(counts.negative, 2);
        assert_eq!(counts.positive_ratio(), 0.5);
        assert!(counts.to_string().contains("50.0% positive"));
    }
}
