use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "#3b82f6";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A grade is either a known mark or a plausible range pending correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GradeValue {
    Exact { value: f64 },
    Range { min: f64, max: f64 },
}

impl GradeValue {
    /// Most likely value: the mark itself, or the middle of the range.
    pub fn expected(&self) -> f64 {
        match *self {
            GradeValue::Exact { value } => value,
            GradeValue::Range { min, max } => (min + max) / 2.0,
        }
    }

    pub fn worst(&self) -> f64 {
        match *self {
            GradeValue::Exact { value } => value,
            GradeValue::Range { min, .. } => min,
        }
    }

    pub fn best(&self) -> f64 {
        match *self {
            GradeValue::Exact { value } => value,
            GradeValue::Range { max, .. } => max,
        }
    }
}

impl std::fmt::Display for GradeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeValue::Exact { value } => write!(f, "{value}/20"),
            GradeValue::Range { min, max } => write!(f, "{min}-{max}/20"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub name: String,
    pub value: GradeValue,
    pub coefficient: f64,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub coefficient: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

/// Teaching unit (EU): subjects plus optional grades recorded directly on the unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingUnit {
    pub id: String,
    pub name: String,
    pub coefficient: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grades: Option<Vec<Grade>>,
}

impl TeachingUnit {
    pub fn direct_grades(&self) -> &[Grade] {
        self.grades.as_deref().unwrap_or(&[])
    }

    /// Looks a subject up by id, falling back to a case-insensitive name match.
    pub fn resolve_subject(&self, key: &str) -> Option<&Subject> {
        self.subjects
            .iter()
            .find(|subject| subject.id == key)
            .or_else(|| {
                self.subjects
                    .iter()
                    .find(|subject| subject.name.eq_ignore_ascii_case(key.trim()))
            })
    }

    /// Every grade under the unit: subject grades first, then direct grades.
    pub fn all_grades(&self) -> impl Iterator<Item = &Grade> {
        self.subjects
            .iter()
            .flat_map(|subject| subject.grades.iter())
            .chain(self.direct_grades().iter())
    }
}

/// Weighted averages over a subtree. `total == 0.0` means no data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradeStats {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub total: f64,
}

impl GradeStats {
    pub fn has_data(&self) -> bool {
        self.total > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskScore {
    pub score: u8,
    pub level: RiskLevel,
    pub message: &'static str,
}
