//! Hyperparameter values, parameter sets and search grids

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Expected shape of a hyperparameter for a given model kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamType {
    /// Non-negative integer
    Count,
    /// Non-negative integer, or the string "none" for unbounded
    OptionalCount,
    /// Real number (integers are accepted)
    Real,
    /// Boolean flag
    Flag,
    /// One of a fixed set of lowercase strings
    Choice(&'static [&'static str]),
}

impl ParamType {
    /// Check whether `value` has this type
    pub fn accepts(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ParamType::Count, ParamValue::Int(v)) => *v >= 0,
            (ParamType::OptionalCount, ParamValue::Int(v)) => *v >= 0,
            (ParamType::OptionalCount, ParamValue::Text(s)) => s.eq_ignore_ascii_case("none"),
            (ParamType::Real, ParamValue::Int(_)) | (ParamType::Real, ParamValue::Float(_)) => true,
            (ParamType::Flag, ParamValue::Bool(_)) => true,
            (ParamType::Choice(options), ParamValue::Text(s)) => {
                options.iter().any(|o| o.eq_ignore_ascii_case(s))
            }
            _ => false,
        }
    }
}

/// One concrete hyperparameter assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set a parameter, returning the updated set
    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a count parameter
    pub fn count(&self, name: &str) -> Result<Option<usize>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(Some(*v as usize)),
            Some(other) => Err(PipelineError::invalid_param(name, other, "expected a non-negative integer")),
        }
    }

    /// Read an optional count; `Some(None)` means the parameter was set to "none"
    pub fn optional_count(&self, name: &str) -> Result<Option<Option<usize>>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(Some(Some(*v as usize))),
            Some(ParamValue::Text(s)) if s.eq_ignore_ascii_case("none") => Ok(Some(None)),
            Some(other) => Err(PipelineError::invalid_param(name, other, "expected a non-negative integer or \"none\"")),
        }
    }

    /// Read a real-valued parameter
    pub fn real(&self, name: &str) -> Result<Option<f64>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Float(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(PipelineError::invalid_param(name, other, "expected a number")),
        }
    }

    pub fn flag(&self, name: &str) -> Result<Option<bool>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(PipelineError::invalid_param(name, other, "expected true or false")),
        }
    }

    /// Read a string choice, lowercased
    pub fn choice(&self, name: &str) -> Result<Option<String>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Text(s)) => Ok(Some(s.to_lowercase())),
            Some(other) => Err(PipelineError::invalid_param(name, other, "expected a string")),
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Search grid: parameter name to the list of values to try
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid(BTreeMap<String, Vec<ParamValue>>);

impl ParamGrid {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a parameter axis, returning the updated grid
    pub fn with(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.0.insert(name.to_string(), values);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<ParamValue>)> {
        self.0.iter()
    }

    /// Number of candidates the grid expands to
    pub fn n_candidates(&self) -> usize {
        self.0.values().map(|v| v.len()).product()
    }

    /// Expand into the Cartesian product of all axes.
    ///
    /// An empty grid yields a single empty parameter set (model defaults);
    /// an axis with no values yields no candidates at all.
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut out = vec![ParamSet::new()];
        for (name, values) in &self.0 {
            let mut next = Vec::with_capacity(out.len() * values.len());
            for partial in &out {
                for value in values {
                    next.push(partial.clone().with(name, value.clone()));
                }
            }
            out = next;
        }
        out
    }
}
