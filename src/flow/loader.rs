//! Rule loader - YAML/JSON file loading and parsing
//!
//! This module handles loading step maps, selectors, field sets and field
//! values from YAML or JSON files. JSON is a subset of YAML, so every entry
//! point reads both.

use super::graph::StepMap;
use super::selector::{FieldSet, Selector};
use super::state::FieldValues;
use crate::error::{FlowError, Result};
use std::fs;
use std::path::Path;

/// Loads rule definitions from files
pub struct RuleLoader;

impl RuleLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a step map from a YAML or JSON file
    pub fn load_steps<P: AsRef<Path>>(&self, path: P) -> Result<StepMap> {
        let content = fs::read_to_string(path)?;
        Self::parse_steps(&content)
    }

    /// Load a selector from a YAML or JSON file
    pub fn load_selector<P: AsRef<Path>>(&self, path: P) -> Result<Selector> {
        let content = fs::read_to_string(path)?;
        Self::parse_selector(&content)
    }

    /// Load form fields and their content keys from a YAML or JSON file
    pub fn load_fields<P: AsRef<Path>>(&self, path: P) -> Result<FieldSet> {
        let content = fs::read_to_string(path)?;
        Self::parse_fields(&content)
    }

    /// Load field values from a YAML or JSON file
    pub fn load_values<P: AsRef<Path>>(&self, path: P) -> Result<FieldValues> {
        let content = fs::read_to_string(path)?;
        Self::parse_values(&content)
    }

    /// Parse a step map; anything but a mapping at the root is rejected
    pub fn parse_steps(content: &str) -> Result<StepMap> {
        let root: serde_yaml::Value = serde_yaml::from_str(content)?;
        if !root.is_mapping() {
            return Err(FlowError::InvalidDefinition);
        }
        let steps: StepMap = serde_yaml::from_value(root)?;
        log::debug!("Loaded {} steps", steps.len());
        Ok(steps)
    }

    pub fn parse_selector(content: &str) -> Result<Selector> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn parse_fields(content: &str) -> Result<FieldSet> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse field values; an empty document yields no values
    pub fn parse_values(content: &str) -> Result<FieldValues> {
        let values: Option<FieldValues> = serde_yaml::from_str(content)?;
        Ok(values.unwrap_or_default())
    }
}

impl Default for RuleLoader {
    fn default() -> Self {
        Self::new()
    }
}
