// ditteau-core/src/domain/governance/masking.rs

use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write};
use std::str::FromStr;

use super::value::{AttributeType, Value};
use crate::domain::error::ConfigError;

pub const REDACTED: &str = "REDACTED";

/// A pure, total transform from an attribute value to its masked form.
///
/// `Null` is returned unchanged by every strategy except `Constant`.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskingStrategy {
    Identity,
    Nullify,
    Redact,
    Hash,
    MaskEmail,
    /// Keeps the first `keep` characters and appends `***`.
    Partial { keep: usize },
    /// Replaces every non-separator character except the last `keep` with `mask_char`.
    /// Values with `keep` or fewer maskable characters are masked entirely.
    KeepLast {
        keep: usize,
        mask_char: char,
        separators: Vec<char>,
    },
    /// Projects a date to January 1 of the same year.
    YearOnly,
    /// Truncates toward zero to a multiple of `multiple`.
    RoundTo { multiple: f64 },
    EntityPreserving,
    Constant(Value),
}

impl MaskingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Nullify => "nullify",
            Self::Redact => "redact",
            Self::Hash => "hash",
            Self::MaskEmail => "mask_email",
            Self::Partial { .. } => "partial",
            Self::KeepLast { .. } => "keep_last",
            Self::YearOnly => "year_only",
            Self::RoundTo { .. } => "round_to",
            Self::EntityPreserving => "entity_preserving",
            Self::Constant(_) => "constant",
        }
    }

    /// The last-four mask used for SSNs and account numbers: `XXX-XX-6789`.
    pub fn last_four() -> Self {
        Self::KeepLast {
            keep: 4,
            mask_char: 'X',
            separators: vec!['-', ' '],
        }
    }

    /// Whether the strategy is defined for values of `ty` and yields the same type.
    pub fn accepts(&self, ty: AttributeType) -> bool {
        match self {
            Self::Identity | Self::Nullify => true,
            Self::Redact
            | Self::Hash
            | Self::MaskEmail
            | Self::Partial { .. }
            | Self::KeepLast { .. }
            | Self::EntityPreserving => ty == AttributeType::String,
            Self::YearOnly => ty == AttributeType::Date,
            Self::RoundTo { .. } => matches!(ty, AttributeType::Integer | AttributeType::Float),
            Self::Constant(v) => v.attribute_type().is_none_or(|t| t == ty),
        }
    }

    /// Applies the transform. Values of a type the strategy does not accept are
    /// returned as `Null` so that nothing unmasked leaks.
    pub fn apply(&self, value: &Value) -> Value {
        if let Self::Constant(c) = self {
            return c.clone();
        }
        if value.is_null() {
            return Value::Null;
        }

        match (self, value) {
            (Self::Identity, v) => v.clone(),
            (Self::Nullify, _) => Value::Null,
            (Self::Redact, Value::String(_)) => Value::String(REDACTED.to_string()),
            (Self::Hash, Value::String(s)) => Value::String(sha256_hex(s)),
            (Self::MaskEmail, Value::String(s)) => Value::String(mask_email(s)),
            (Self::Partial { keep }, Value::String(s)) => {
                let prefix: String = s.chars().take(*keep).collect();
                Value::String(format!("{}***", prefix))
            }
            (
                Self::KeepLast {
                    keep,
                    mask_char,
                    separators,
                },
                Value::String(s),
            ) => Value::String(keep_last(s, *keep, *mask_char, separators)),
            (Self::YearOnly, Value::Date(d)) => {
                Value::Date(NaiveDate::from_ymd_opt(d.year(), 1, 1).unwrap_or(*d))
            }
            (Self::RoundTo { multiple }, Value::Int(i)) => {
                let m = *multiple as i64;
                if m <= 0 { Value::Int(*i) } else { Value::Int((i / m) * m) }
            }
            (Self::RoundTo { multiple }, Value::Float(x)) => {
                Value::Float((x / multiple).trunc() * multiple)
            }
            (Self::EntityPreserving, Value::String(s)) => {
                Value::String(format!("[PRESERVED_{}]", s.chars().count()))
            }
            _ => Value::Null,
        }
    }
}

impl fmt::Display for MaskingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial { keep } => write!(f, "partial({})", keep),
            Self::KeepLast { keep, mask_char, .. } => write!(f, "keep_last({}, '{}')", keep, mask_char),
            Self::RoundTo { multiple } => write!(f, "round_to({})", multiple),
            Self::Constant(v) => write!(f, "constant({})", v),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Parses a strategy name with default parameters.
impl FromStr for MaskingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity" | "clear" => Ok(Self::Identity),
            "nullify" | "null" => Ok(Self::Nullify),
            "redact" => Ok(Self::Redact),
            "hash" | "sha256" => Ok(Self::Hash),
            "mask_email" | "email" => Ok(Self::MaskEmail),
            "partial" => Ok(Self::Partial { keep: 2 }),
            "keep_last" | "last_four" => Ok(Self::last_four()),
            "year_only" => Ok(Self::YearOnly),
            "round_to" => Ok(Self::RoundTo { multiple: 1.0 }),
            "entity_preserving" => Ok(Self::EntityPreserving),
            "constant" => Ok(Self::Constant(Value::Null)),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

fn sha256_hex(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// `john@example.com` -> `j****@example.com`; anything without a local part and domain -> `****`.
fn mask_email(text: &str) -> String {
    match text.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}****@{}", first, domain)
        }
        _ => "****".to_string(),
    }
}

fn keep_last(text: &str, keep: usize, mask_char: char, separators: &[char]) -> String {
    let maskable = text.chars().filter(|c| !separators.contains(c)).count();
    // Short values are masked entirely rather than passed through.
    let visible_from = if maskable <= keep { maskable } else { maskable - keep };

    let mut seen = 0;
    text.chars()
        .map(|c| {
            if separators.contains(&c) {
                return c;
            }
            seen += 1;
            if seen > visible_from { c } else { mask_char }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_last_four_ssn() {
        let mask = MaskingStrategy::last_four();
        assert_eq!(mask.apply(&s("123-45-6789")), s("XXX-XX-6789"));
        assert_eq!(mask.apply(&s("123456789")), s("XXXXX6789"));
    }

    #[test]
    fn test_last_four_short_input_is_fully_masked() {
        let mask = MaskingStrategy::last_four();
        assert_eq!(mask.apply(&s("6789")), s("XXXX"));
        assert_eq!(mask.apply(&s("12-3")), s("XX-X"));
        assert_eq!(mask.apply(&s("")), s(""));
    }

    #[test]
    fn test_year_only() {
        assert_eq!(MaskingStrategy::YearOnly.apply(&date(2000, 1, 15)), date(2000, 1, 1));
        assert_eq!(MaskingStrategy::YearOnly.apply(&date(1999, 12, 31)), date(1999, 1, 1));
    }

    #[test]
    fn test_round_to_truncates_preserving_sign() {
        let mask = MaskingStrategy::RoundTo { multiple: 100.0 };
        assert_eq!(mask.apply(&Value::Int(1234)), Value::Int(1200));
        assert_eq!(mask.apply(&Value::Int(-1234)), Value::Int(-1200));
        assert_eq!(mask.apply(&Value::Int(99)), Value::Int(0));
        assert_eq!(mask.apply(&Value::Float(-1299.5)), Value::Float(-1200.0));
    }

    #[test]
    fn test_email_and_partial() {
        assert_eq!(MaskingStrategy::MaskEmail.apply(&s("jane@ditteau.edu")), s("j****@ditteau.edu"));
        assert_eq!(MaskingStrategy::MaskEmail.apply(&s("not-an-email")), s("****"));
        assert_eq!(MaskingStrategy::Partial { keep: 2 }.apply(&s("Jonathan")), s("Jo***"));
        assert_eq!(MaskingStrategy::EntityPreserving.apply(&s("Jane")), s("[PRESERVED_4]"));
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let hashed = MaskingStrategy::Hash.apply(&s("abc"));
        assert_eq!(
            hashed,
            s("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_null_passes_through_every_strategy_but_constant() {
        for strategy in [
            MaskingStrategy::Identity,
            MaskingStrategy::Redact,
            MaskingStrategy::Hash,
            MaskingStrategy::last_four(),
            MaskingStrategy::YearOnly,
            MaskingStrategy::RoundTo { multiple: 10.0 },
        ] {
            assert_eq!(strategy.apply(&Value::Null), Value::Null, "{}", strategy);
        }
        assert_eq!(MaskingStrategy::Constant(s("***")).apply(&Value::Null), s("***"));
    }

    #[test]
    fn test_type_acceptance() {
        assert!(MaskingStrategy::YearOnly.accepts(AttributeType::Date));
        assert!(!MaskingStrategy::YearOnly.accepts(AttributeType::String));
        assert!(!MaskingStrategy::Redact.accepts(AttributeType::Integer));
        assert!(MaskingStrategy::RoundTo { multiple: 1.0 }.accepts(AttributeType::Float));
        assert!(MaskingStrategy::Constant(Value::Null).accepts(AttributeType::Date));
        assert!(!MaskingStrategy::Constant(s("x")).accepts(AttributeType::Date));
    }

    #[test]
    fn test_parse_strategy_names() {
        assert_eq!("REDACT".parse::<MaskingStrategy>().unwrap(), MaskingStrategy::Redact);
        assert_eq!(
            "keep_last".parse::<MaskingStrategy>().unwrap(),
            MaskingStrategy::last_four()
        );
        assert!(matches!(
            "scramble".parse::<MaskingStrategy>(),
            Err(ConfigError::UnknownStrategy(s)) if s == "scramble"
        ));
    }
}
