//! Validation of the new cycle form.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const MIN_MINUTES: i64 = 1;
pub const MAX_MINUTES: i64 = 60;

/// The fields of the new cycle form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Task,
    MinutesAmount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Task => f.write_str("task"),
            Field::MinutesAmount => f.write_str("minutesAmount"),
        }
    }
}

/// Field level messages of a rejected form, ordered by field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("invalid form: {}", summary(.0))]
pub struct FormErrors(BTreeMap<Field, String>);

fn summary(errors: &BTreeMap<Field, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl FormErrors {
    fn add(&mut self, field: Field, message: impl Into<String>) {
        // first failing rule of a field wins
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[cfg(test)]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCycleData {
    pub task: String,
    pub minutes_amount: u32,
}

/// Raw values of the new cycle form. The minutes are kept as typed so
/// that a non numeric input is reported next to its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCycleForm {
    pub task: String,
    pub minutes_amount: String,
}

impl Default for NewCycleForm {
    fn default() -> Self {
        Self {
            task: String::new(),
            minutes_amount: "0".to_string(),
        }
    }
}

impl NewCycleForm {
    pub fn new(task: impl Into<String>, minutes_amount: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            minutes_amount: minutes_amount.into(),
        }
    }

    /// The submit control is disabled while the task is empty, whatever
    /// the validation result.
    pub fn is_submit_disabled(&self) -> bool {
        self.task.is_empty()
    }

    /// Back to the default values, as after a successful submit.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self) -> Result<NewCycleData, FormErrors> {
        let mut errors = FormErrors::default();

        let task = self.task.trim();
        if task.is_empty() {
            errors.add(Field::Task, "Enter the task");
        }

        let minutes = match self.minutes_amount.trim().parse::<i64>() {
            Ok(minutes) => Some(minutes),
            Err(_) => {
                errors.add(Field::MinutesAmount, "Expected a number");
                None
            }
        };
        if let Some(minutes) = minutes {
            if minutes < MIN_MINUTES {
                errors.add(
                    Field::MinutesAmount,
                    format!("The cycle must be at least {} minute", MIN_MINUTES),
                );
            } else if minutes > MAX_MINUTES {
                errors.add(
                    Field::MinutesAmount,
                    format!("The cycle must be at most {} minutes", MAX_MINUTES),
                );
            }
        }

        match minutes {
            Some(minutes) if errors.is_empty() => Ok(NewCycleData {
                task: task.to_string(),
                minutes_amount: minutes as u32,
            }),
            _ => Err(errors),
        }
    }
}
