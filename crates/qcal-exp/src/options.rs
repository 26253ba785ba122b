//! Flat, named experiment options.
//!
//! Every experiment declares its options with defaults up front. Setting a
//! name that was never declared fails with [`ExpError::UnknownOption`], and
//! a value of the wrong shape fails with [`ExpError::InvalidOption`].
//! Integers are accepted where floats are expected.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExpError, ExpResult};

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// List of integers.
    IntList(Vec<i64>),
    /// List of floats.
    FloatList(Vec<f64>),
    /// Unset.
    None,
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Float(_) => "float",
            OptionValue::IntList(_) => "int list",
            OptionValue::FloatList(_) => "float list",
            OptionValue::None => "none",
        }
    }

    /// Parse a command-line value (YAML scalar or flow sequence).
    pub fn parse(text: &str) -> ExpResult<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Convert `self` to the shape of `declared`, if compatible.
    fn coerce_to(self, declared: &OptionValue) -> Option<OptionValue> {
        use OptionValue as V;
        match (declared, self) {
            (V::None, v) => Some(v),
            (_, V::None) => Some(V::None),
            (V::Bool(_), v @ V::Bool(_)) => Some(v),
            (V::Int(_), v @ V::Int(_)) => Some(v),
            (V::Float(_), v @ V::Float(_)) => Some(v),
            (V::Float(_), V::Int(i)) => Some(V::Float(i as f64)),
            (V::IntList(_), v @ V::IntList(_)) => Some(v),
            (V::FloatList(_), v @ V::FloatList(_)) => Some(v),
            (V::FloatList(_), V::IntList(l)) => {
                Some(V::FloatList(l.into_iter().map(|i| i as f64).collect()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Float(x) => write!(f, "{x}"),
            OptionValue::IntList(l) => write!(f, "{l:?}"),
            OptionValue::FloatList(l) => write!(f, "{l:?}"),
            OptionValue::None => write!(f, "none"),
        }
    }
}

/// Declared options of one experiment with their current values.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOptions {
    experiment: String,
    values: BTreeMap<String, OptionValue>,
}

impl ExperimentOptions {
    /// Options with the shared run options (`shots`, `rep_delay`,
    /// `use_measure_esp`) declared.
    pub fn new(experiment: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            values: BTreeMap::new(),
        }
        .declare("shots", OptionValue::Int(1024))
        .declare("rep_delay", OptionValue::Float(300e-6))
        .declare("use_measure_esp", OptionValue::Bool(false))
    }

    /// Declare an option with its default.
    pub fn declare(mut self, name: impl Into<String>, default: OptionValue) -> Self {
        self.values.insert(name.into(), default);
        self
    }

    /// Experiment these options belong to.
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Set a declared option.
    pub fn set(&mut self, name: &str, value: OptionValue) -> ExpResult<()> {
        let coerced = self.checked(name, value)?;
        self.values.insert(name.to_string(), coerced);
        Ok(())
    }

    fn checked(&self, name: &str, value: OptionValue) -> ExpResult<OptionValue> {
        let Some(declared) = self.values.get(name) else {
            return Err(ExpError::UnknownOption {
                experiment: self.experiment.clone(),
                name: name.to_string(),
            });
        };
        let kind = value.kind();
        let coerced = value.coerce_to(declared).ok_or_else(|| ExpError::InvalidOption {
            name: name.to_string(),
            reason: format!("expected {}, got {kind}", declared.kind()),
        })?;
        Ok(coerced)
    }

    /// Apply a YAML mapping of option names to values. Nothing is applied
    /// unless every entry names a declared option with a compatible value.
    pub fn apply_yaml(&mut self, text: &str) -> ExpResult<()> {
        let parsed: BTreeMap<String, OptionValue> = serde_yaml_ng::from_str(text)?;
        let checked = parsed
            .into_iter()
            .map(|(name, value)| Ok((name.clone(), self.checked(&name, value)?)))
            .collect::<ExpResult<Vec<(String, OptionValue)>>>()?;
        self.values.extend(checked);
        Ok(())
    }

    /// Current value.
    pub fn get(&self, name: &str) -> ExpResult<&OptionValue> {
        self.values.get(name).ok_or_else(|| ExpError::UnknownOption {
            experiment: self.experiment.clone(),
            name: name.to_string(),
        })
    }

    /// All options, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn invalid(name: &str, reason: impl Into<String>) -> ExpError {
        ExpError::InvalidOption {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Float value.
    pub fn float(&self, name: &str) -> ExpResult<f64> {
        match self.get(name)? {
            OptionValue::Float(x) => Ok(*x),
            OptionValue::Int(i) => Ok(*i as f64),
            other => Err(Self::invalid(name, format!("{} is not a number", other.kind()))),
        }
    }

    /// Non-negative integer value.
    pub fn count(&self, name: &str) -> ExpResult<u64> {
        match self.get(name)? {
            OptionValue::Int(i) => {
                u64::try_from(*i).map_err(|_| Self::invalid(name, "must not be negative"))
            }
            other => Err(Self::invalid(name, format!("{} is not an integer", other.kind()))),
        }
    }

    /// Boolean value.
    pub fn flag(&self, name: &str) -> ExpResult<bool> {
        match self.get(name)? {
            OptionValue::Bool(b) => Ok(*b),
            other => Err(Self::invalid(name, format!("{} is not a bool", other.kind()))),
        }
    }

    /// List of non-negative integers.
    pub fn counts(&self, name: &str) -> ExpResult<Vec<u32>> {
        match self.get(name)? {
            OptionValue::IntList(l) => l
                .iter()
                .map(|&i| {
                    u32::try_from(i).map_err(|_| Self::invalid(name, format!("{i} out of range")))
                })
                .collect(),
            other => Err(Self::invalid(name, format!("{} is not an int list", other.kind()))),
        }
    }

    /// List of floats.
    pub fn floats(&self, name: &str) -> ExpResult<Vec<f64>> {
        match self.get(name)? {
            OptionValue::FloatList(l) => Ok(l.clone()),
            OptionValue::IntList(l) => Ok(l.iter().map(|&i| i as f64).collect()),
            other => Err(Self::invalid(name, format!("{} is not a float list", other.kind()))),
        }
    }

    /// Check if an option is unset.
    pub fn is_none(&self, name: &str) -> ExpResult<bool> {
        Ok(matches!(self.get(name)?, OptionValue::None))
    }
}
