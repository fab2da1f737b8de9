// ditteau-core/src/domain/governance/condition.rs

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

use super::value::{AttributeType, Value};

/// Maps a reference date to the start year of its academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicCalendar {
    start_month: u32,
}

impl AcademicCalendar {
    pub const DEFAULT_START_MONTH: u32 = 8;

    pub fn new(start_month: u32) -> Option<Self> {
        (1..=12).contains(&start_month).then_some(Self { start_month })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn current_start_year(&self, as_of: NaiveDate) -> i32 {
        if as_of.month() >= self.start_month {
            as_of.year()
        } else {
            as_of.year() - 1
        }
    }
}

impl Default for AcademicCalendar {
    fn default() -> Self {
        Self {
            start_month: Self::DEFAULT_START_MONTH,
        }
    }
}

/// A predicate over a single attribute value.
///
/// `Null` satisfies only `Always`, `IsNull`, and combinators built from them.
#[derive(Debug, Clone)]
pub enum Condition {
    Always,
    IsNull,
    Equals(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Inclusive on both ends; a missing bound is open.
    Between {
        min: Option<Value>,
        max: Option<Value>,
    },
    Matches(Regex),
    /// The value's academic year lies within `years_back` years of the current one.
    AcademicYearWindow {
        years_back: u32,
        calendar: AcademicCalendar,
    },
    AnyOf(Vec<Condition>),
    AllOf(Vec<Condition>),
}

impl Condition {
    /// Widest academic-year window a policy may declare.
    pub const MAX_YEARS_BACK: u32 = 100;

    pub fn name(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::IsNull => "is_null",
            Self::Equals(_) => "equals",
            Self::In(_) => "in",
            Self::NotIn(_) => "not_in",
            Self::Between { .. } => "between",
            Self::Matches(_) => "matches",
            Self::AcademicYearWindow { .. } => "academic_year_window",
            Self::AnyOf(_) => "any_of",
            Self::AllOf(_) => "all_of",
        }
    }

    /// Checks that the condition can be evaluated against values of `ty`.
    pub fn check_type(&self, ty: AttributeType) -> Result<(), String> {
        let literal_ok = |v: &Value| v.attribute_type().is_none_or(|t| t == ty);
        match self {
            Self::Always | Self::IsNull => Ok(()),
            Self::Equals(v) if literal_ok(v) => Ok(()),
            Self::In(vs) | Self::NotIn(vs) if vs.iter().all(literal_ok) => Ok(()),
            Self::Between { min, max } => {
                if ty == AttributeType::Boolean {
                    return Err("ranges are not defined over booleans".to_string());
                }
                if min.is_none() && max.is_none() {
                    return Err("at least one of min/max is required".to_string());
                }
                if min.iter().chain(max.iter()).all(literal_ok) {
                    Ok(())
                } else {
                    Err(format!("bounds must be {} literals", ty))
                }
            }
            Self::Matches(_) if ty == AttributeType::String => Ok(()),
            Self::Matches(_) => Err("patterns only apply to strings".to_string()),
            Self::AcademicYearWindow { years_back, .. } if *years_back > Self::MAX_YEARS_BACK => {
                Err(format!(
                    "years_back must be at most {}, got {}",
                    Self::MAX_YEARS_BACK,
                    years_back
                ))
            }
            Self::AcademicYearWindow { .. }
                if matches!(ty, AttributeType::String | AttributeType::Integer) =>
            {
                Ok(())
            }
            Self::AcademicYearWindow { .. } => {
                Err("academic years are strings or integers".to_string())
            }
            Self::AnyOf(cs) | Self::AllOf(cs) => {
                if cs.is_empty() {
                    return Err("combinator needs at least one condition".to_string());
                }
                cs.iter().try_for_each(|c| c.check_type(ty))
            }
            _ => Err(format!("literals must be {} values", ty)),
        }
    }

    /// Evaluates the predicate. `as_of` is the reference date of the request.
    pub fn holds(&self, value: &Value, as_of: NaiveDate) -> bool {
        match self {
            Self::Always => true,
            Self::IsNull => value.is_null(),
            Self::AnyOf(cs) => cs.iter().any(|c| c.holds(value, as_of)),
            Self::AllOf(cs) => cs.iter().all(|c| c.holds(value, as_of)),
            _ if value.is_null() => false,
            Self::Equals(expected) => value == expected,
            Self::In(set) => set.contains(value),
            Self::NotIn(set) => !set.contains(value),
            Self::Between { min, max } => {
                let above = min.as_ref().is_none_or(|m| {
                    matches!(value.compare(m), Some(Ordering::Greater | Ordering::Equal))
                });
                let below = max.as_ref().is_none_or(|m| {
                    matches!(value.compare(m), Some(Ordering::Less | Ordering::Equal))
                });
                above && below
            }
            Self::Matches(re) => match value {
                Value::String(s) => re.is_match(s),
                _ => false,
            },
            Self::AcademicYearWindow {
                years_back,
                calendar,
            } => match academic_start_year(value) {
                Some(start) => {
                    let current = i64::from(calendar.current_start_year(as_of));
                    let oldest = current.saturating_sub(i64::from(*years_back));
                    (oldest..=current).contains(&i64::from(start))
                }
                None => false,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "equals {}", v),
            Self::In(vs) => write!(f, "in [{}]", join(vs)),
            Self::NotIn(vs) => write!(f, "not_in [{}]", join(vs)),
            Self::Matches(re) => write!(f, "matches /{}/", re.as_str()),
            Self::AcademicYearWindow { years_back, .. } => {
                write!(f, "academic_year_window({})", years_back)
            }
            other => write!(f, "{}", other.name()),
        }
    }
}

fn join(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"2023-2024"`, `"2023-24"` and `2023` all start in 2023.
fn academic_start_year(value: &Value) -> Option<i32> {
    match value {
        Value::Int(y) => i32::try_from(*y).ok(),
        Value::String(s) => {
            let digits: String = s.trim().chars().take(4).collect();
            if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
                digits.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}
