//! Field validation run before anything is submitted to the store.
//!
//! Each collection has a fixed rule table. Validation returns only the columns
//! the table knows about, so stray form keys never reach the backend.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use shared::{
    domain::{DealStage, Fields, LeadStatus},
    error::ValidationFailure,
};

use crate::collection::CollectionSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every required column must be present.
    Create,
    /// Only the columns present are checked.
    Update,
}

pub trait Schema: Send + Sync {
    fn validate(&self, fields: &Fields, mode: ValidationMode)
        -> Result<Fields, Vec<ValidationFailure>>;
}

/// Passes every field through untouched.
pub struct AcceptAll;

impl Schema for AcceptAll {
    fn validate(
        &self,
        fields: &Fields,
        _mode: ValidationMode,
    ) -> Result<Fields, Vec<ValidationFailure>> {
        Ok(fields.clone())
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Text {
        min_len: usize,
        message: &'static str,
    },
    OptionalText,
    NullableText,
    Email,
    OneOf(&'static [&'static str]),
    Number {
        min: f64,
        max: Option<f64>,
        message: &'static str,
    },
    TextList,
    HexColor,
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    required: bool,
    rule: Rule,
}

const fn required(name: &'static str, rule: Rule) -> FieldRule {
    FieldRule {
        name,
        required: true,
        rule,
    }
}

const fn optional(name: &'static str, rule: Rule) -> FieldRule {
    FieldRule {
        name,
        required: false,
        rule,
    }
}

const LEAD_STATUS_NAMES: &[&str] = &[
    LeadStatus::New.as_str(),
    LeadStatus::Contacted.as_str(),
    LeadStatus::Qualified.as_str(),
    LeadStatus::Proposal.as_str(),
    LeadStatus::Negotiation.as_str(),
];

const DEAL_STAGE_NAMES: &[&str] = &[
    DealStage::Discovery.as_str(),
    DealStage::Proposal.as_str(),
    DealStage::Negotiation.as_str(),
    DealStage::ClosedWon.as_str(),
    DealStage::ClosedLost.as_str(),
];

const LEAD_RULES: &[FieldRule] = &[
    required(
        "name",
        Rule::Text {
            min_len: 2,
            message: "Name must be at least 2 characters",
        },
    ),
    required(
        "company",
        Rule::Text {
            min_len: 2,
            message: "Company must be at least 2 characters",
        },
    ),
    required("email", Rule::Email),
    optional("phone", Rule::OptionalText),
    required("status", Rule::OneOf(LEAD_STATUS_NAMES)),
    required(
        "value",
        Rule::Number {
            min: 0.0,
            max: None,
            message: "Value must be positive",
        },
    ),
    required("assigned_to", Rule::NullableText),
];

const STATUS_RULES: &[FieldRule] = &[
    required(
        "status_name",
        Rule::Text {
            min_len: 1,
            message: "Status name is required",
        },
    ),
    required("status_color", Rule::HexColor),
];

const DEAL_RULES: &[FieldRule] = &[
    required(
        "lead_id",
        Rule::Text {
            min_len: 1,
            message: "Lead is required",
        },
    ),
    required(
        "amount",
        Rule::Number {
            min: 0.0,
            max: None,
            message: "Amount must be positive",
        },
    ),
    required("stage", Rule::OneOf(DEAL_STAGE_NAMES)),
    required(
        "probability",
        Rule::Number {
            min: 0.0,
            max: Some(100.0),
            message: "Probability must be between 0 and 100",
        },
    ),
    required(
        "expected_close_date",
        Rule::Text {
            min_len: 0,
            message: "Expected close date is required",
        },
    ),
    optional("owner_id", Rule::OptionalText),
    optional("products", Rule::TextList),
    optional("lost_reason", Rule::OptionalText),
    optional("won_date", Rule::OptionalText),
];

/// Rule-table schema for one collection.
pub struct FieldSchema {
    rules: &'static [FieldRule],
    /// Updates carry a fresh `updated_at`; the table has no trigger for it.
    stamps_updated_at: bool,
}

impl FieldSchema {
    pub const LEADS: FieldSchema = FieldSchema {
        rules: LEAD_RULES,
        stamps_updated_at: false,
    };
    pub const LEAD_STATUSES: FieldSchema = FieldSchema {
        rules: STATUS_RULES,
        stamps_updated_at: true,
    };
    pub const DEALS: FieldSchema = FieldSchema {
        rules: DEAL_RULES,
        stamps_updated_at: false,
    };
}

impl Schema for FieldSchema {
    fn validate(
        &self,
        fields: &Fields,
        mode: ValidationMode,
    ) -> Result<Fields, Vec<ValidationFailure>> {
        let mut accepted = Fields::new();
        let mut failures = Vec::new();

        for field in self.rules {
            match fields.get(field.name) {
                Some(value) => match check(field, value) {
                    Ok(()) => {
                        accepted.insert(field.name.to_string(), value.clone());
                    }
                    Err(message) => failures.push(ValidationFailure::new(field.name, message)),
                },
                None if field.required && mode == ValidationMode::Create => {
                    failures.push(ValidationFailure::new(field.name, "Required"));
                }
                None => {}
            }
        }

        if failures.is_empty() {
            if self.stamps_updated_at && mode == ValidationMode::Update {
                accepted.insert(
                    "updated_at".to_string(),
                    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
            }
            Ok(accepted)
        } else {
            Err(failures)
        }
    }
}

/// Built-in schema for a collection, or [`AcceptAll`] when none is known.
pub fn schema_for(spec: &CollectionSpec) -> Arc<dyn Schema> {
    match spec.table {
        "leads" => Arc::new(FieldSchema::LEADS),
        "lead_statuses" => Arc::new(FieldSchema::LEAD_STATUSES),
        "deals" => Arc::new(FieldSchema::DEALS),
        _ => Arc::new(AcceptAll),
    }
}

fn check(field: &FieldRule, value: &Value) -> Result<(), String> {
    match field.rule {
        Rule::Text { min_len, message } => {
            let text = expect_text(value)?;
            if text.chars().count() < min_len {
                return Err(message.to_string());
            }
            Ok(())
        }
        Rule::OptionalText | Rule::NullableText => {
            if value.is_null() {
                return Ok(());
            }
            expect_text(value).map(|_| ())
        }
        Rule::Email => {
            let text = expect_text(value)?;
            if is_email(text) {
                Ok(())
            } else {
                Err("Invalid email address".to_string())
            }
        }
        Rule::OneOf(allowed) => {
            let text = expect_text(value)?;
            if allowed.contains(&text) {
                Ok(())
            } else {
                Err(format!(
                    "Invalid option: expected one of {}",
                    allowed.join(", ")
                ))
            }
        }
        Rule::Number { min, max, message } => {
            let number = value
                .as_f64()
                .ok_or_else(|| "Expected number".to_string())?;
            if number < min || max.is_some_and(|max| number > max) {
                return Err(message.to_string());
            }
            Ok(())
        }
        Rule::TextList => {
            if value.is_null() {
                return Ok(());
            }
            let items = value
                .as_array()
                .ok_or_else(|| "Expected array".to_string())?;
            if items.iter().all(Value::is_string) {
                Ok(())
            } else {
                Err("Expected array of strings".to_string())
            }
        }
        Rule::HexColor => {
            let text = expect_text(value)?;
            if is_hex_color(text) {
                Ok(())
            } else {
                Err("Color must be a #rrggbb value".to_string())
            }
        }
    }
}

fn expect_text(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "Expected string".to_string())
}

fn is_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2
}

fn is_hex_color(text: &str) -> bool {
    text.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
