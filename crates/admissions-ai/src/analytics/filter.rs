//! Declarative predicate chains: every present criterion must hold (AND), an
//! absent criterion or the literal `"all"` is a no-op, and list-valued fields
//! match by inclusion.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{Application, Course, DegreeLevel, StudentProfile, University};

/// Either every value (`"all"`, `null` or a missing key) or one specific value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T> Selector<T> {
    pub fn as_only(&self) -> Option<&T> {
        match self {
            Selector::All => None,
            Selector::Only(value) => Some(value),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }
}

impl<T: Serialize> Serialize for Selector<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selector::All => serializer.serialize_str("all"),
            Selector::Only(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Selector<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        enum Keyword {
            #[serde(rename = "all")]
            All,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            Keyword(Keyword),
            Null(()),
            Value(T),
        }

        Ok(match Raw::<T>::deserialize(deserializer)? {
            Raw::Keyword(Keyword::All) | Raw::Null(()) => Selector::All,
            Raw::Value(value) => Selector::Only(value),
        })
    }
}

/// Read-only view a record exposes to the filter engine. A record that cannot
/// answer a constrained question does not match it.
pub trait Candidate {
    fn status_label(&self) -> Option<&str> {
        None
    }

    /// Countries the record is associated with; single-valued records return one.
    fn countries(&self) -> Vec<&str> {
        Vec::new()
    }

    fn degree_level(&self) -> Option<DegreeLevel> {
        None
    }

    fn profile_completeness(&self) -> Option<u8> {
        None
    }

    fn tuition(&self) -> Option<u32> {
        None
    }

    fn minimum_gpa(&self) -> Option<f32> {
        None
    }

    fn minimum_english_score(&self) -> Option<f32> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub status: Selector<String>,
    #[serde(default)]
    pub country: Selector<String>,
    #[serde(default, alias = "degreeLevel")]
    pub degree_level: Selector<DegreeLevel>,
    #[serde(default, alias = "minProfileCompleteness")]
    pub min_profile_completeness: Option<u8>,
    #[serde(default, alias = "preferredCountries")]
    pub preferred_countries: Vec<String>,
    #[serde(default, alias = "maxTuition")]
    pub max_tuition: Option<u32>,
    /// Applicant GPA checked against each candidate's minimum, when it has one.
    #[serde(default)]
    pub applicant_gpa: Option<f32>,
    #[serde(default)]
    pub applicant_english_score: Option<f32>,
}

impl Criteria {
    pub fn is_unconstrained(&self) -> bool {
        self == &Criteria::default()
    }

    pub fn matches<C: Candidate + ?Sized>(&self, candidate: &C) -> bool {
        if let Some(status) = self.status.as_only() {
            if candidate.status_label() != Some(status.as_str()) {
                return false;
            }
        }

        if let Some(country) = self.country.as_only() {
            if !candidate.countries().contains(&country.as_str()) {
                return false;
            }
        }

        if let Some(level) = self.degree_level.as_only() {
            if candidate.degree_level() != Some(*level) {
                return false;
            }
        }

        if let Some(minimum) = self.min_profile_completeness {
            match candidate.profile_completeness() {
                Some(completeness) if completeness >= minimum => {}
                _ => return false,
            }
        }

        if !self.preferred_countries.is_empty() {
            let countries = candidate.countries();
            let included = self
                .preferred_countries
                .iter()
                .any(|preferred| countries.contains(&preferred.as_str()));
            if !included {
                return false;
            }
        }

        if let Some(budget) = self.max_tuition {
            match candidate.tuition() {
                Some(tuition) if tuition <= budget => {}
                _ => return false,
            }
        }

        if let (Some(gpa), Some(minimum)) = (self.applicant_gpa, candidate.minimum_gpa()) {
            if gpa < minimum {
                return false;
            }
        }

        if let (Some(score), Some(minimum)) = (
            self.applicant_english_score,
            candidate.minimum_english_score(),
        ) {
            if score < minimum {
                return false;
            }
        }

        true
    }
}

/// Keep the records matching `criteria`, preserving input order.
pub fn apply<T: Candidate>(items: Vec<T>, criteria: &Criteria) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| criteria.matches(item))
        .collect()
}

impl Candidate for StudentProfile {
    fn status_label(&self) -> Option<&str> {
        Some(self.lead_status.label())
    }

    fn countries(&self) -> Vec<&str> {
        self.preferred_countries.iter().map(String::as_str).collect()
    }

    fn degree_level(&self) -> Option<DegreeLevel> {
        Some(self.degree_level)
    }

    fn profile_completeness(&self) -> Option<u8> {
        Some(self.profile_completeness)
    }
}

impl Candidate for Application {
    fn status_label(&self) -> Option<&str> {
        Some(self.status.label())
    }
}

impl Candidate for University {
    fn countries(&self) -> Vec<&str> {
        vec![self.country.as_str()]
    }
}

impl Candidate for Course {
    fn countries(&self) -> Vec<&str> {
        vec![self.country.as_str()]
    }

    fn degree_level(&self) -> Option<DegreeLevel> {
        Some(self.degree_level)
    }

    fn tuition(&self) -> Option<u32> {
        Some(self.tuition_fee)
    }

    fn minimum_gpa(&self) -> Option<f32> {
        self.min_gpa
    }

    fn minimum_english_score(&self) -> Option<f32> {
        self.min_english_score
    }
}
