//! Assets - the data worth protecting
//!
//! An asset rates the data it represents on the three classic protection
//! goals. Components process and store assets; data flows transfer them.

use crate::element::ElementInfo;
use crate::score::Score;

/// A piece of data that traverses or rests in the modeled system
#[derive(Debug, Clone)]
pub struct Asset {
    /// Shared element state (name, description, scope, tags)
    pub info: ElementInfo,
    /// Confidentiality protection requirement
    pub confidentiality: Score,
    /// Integrity protection requirement
    pub integrity: Score,
    /// Availability protection requirement
    pub availability: Score,
    /// Whether the asset contains personally identifiable information
    pub is_pii: bool,
}

impl Asset {
    /// Create an asset with the given protection scores
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        confidentiality: Score,
        integrity: Score,
        availability: Score,
    ) -> Self {
        Self {
            info: ElementInfo::new(name),
            confidentiality,
            integrity,
            availability,
            is_pii: false,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    /// Mark the asset as personally identifiable information
    #[must_use]
    pub const fn pii(mut self) -> Self {
        self.is_pii = true;
        self
    }

    /// Mean of the three protection scores
    #[must_use]
    pub fn average_score(&self) -> f64 {
        f64::from(
            self.confidentiality.value() + self.integrity.value() + self.availability.value(),
        ) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_the_mean_of_the_three_scores() {
        let asset = Asset::new(
            "Foo",
            Score::new(20).unwrap(),
            Score::new(10).unwrap(),
            Score::new(60).unwrap(),
        );
        assert!((asset.average_score() - 30.0).abs() < f64::EPSILON);
    }
}
