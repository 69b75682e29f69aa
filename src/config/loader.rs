//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration and policy rules from YAML files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{PolicyPeriod, PolicyRule};
use crate::store::PolicyRuleStore;

use super::types::{
    BatchSettings, EngineConfig, EngineSettings, ReferenceYearTable, ReferenceYearsFile,
};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── engine.yaml           # Jurisdiction and batch settings
/// ├── reference_years.yaml  # Category A reference-year table
/// └── policies/
///     └── 2023-H1.yaml      # One policy rule per half-year
/// ```
///
/// # Example
///
/// ```no_run
/// use contribution_engine::config::ConfigLoader;
/// use contribution_engine::models::{Half, PolicyPeriod};
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// let rule = loader.get_policy_rule(PolicyPeriod::new(2023, Half::H1)).unwrap();
/// println!("Pension rate: {}", rule.pension.rate);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if any required file is missing, contains invalid
    /// YAML, or describes an inconsistent policy rule.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let engine_path = path.join("engine.yaml");
        let settings = Self::load_yaml::<EngineSettings>(&engine_path)?;
        settings
            .batch
            .validate(&engine_path.display().to_string())?;

        let reference_path = path.join("reference_years.yaml");
        let reference_file = Self::load_yaml::<ReferenceYearsFile>(&reference_path)?;
        let reference_years = ReferenceYearTable::from_file(reference_file)?;

        let policies = Self::load_policies(&path.join("policies"))?;

        tracing::debug!(
            jurisdiction = %settings.jurisdiction,
            policies = policies.len(),
            "Loaded engine configuration"
        );

        Ok(Self {
            config: EngineConfig::new(settings, reference_years, policies),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads every policy file from the policies directory.
    fn load_policies(policies_dir: &Path) -> EngineResult<BTreeMap<PolicyPeriod, PolicyRule>> {
        let dir_str = policies_dir.display().to_string();

        let entries = fs::read_dir(policies_dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut policies = BTreeMap::new();

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;

            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "yaml") {
                continue;
            }

            let rule = Self::load_yaml::<PolicyRule>(&path)?;
            rule.validate()?;
            let period = rule.period;
            if policies.insert(period, rule).is_some() {
                return Err(EngineError::ConfigParseError {
                    path: path.display().to_string(),
                    message: format!("duplicate policy rule for {period}"),
                });
            }
        }

        if policies.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{dir_str} (no policy files found)"),
            });
        }

        Ok(policies)
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the batch settings.
    pub fn batch_settings(&self) -> &BatchSettings {
        &self.config.settings().batch
    }

    /// Returns the reference year table.
    pub fn reference_years(&self) -> &ReferenceYearTable {
        self.config.reference_years()
    }

    /// Returns the periods that have a policy rule, in order.
    pub fn periods(&self) -> Vec<PolicyPeriod> {
        self.config.policies().keys().copied().collect()
    }

    /// Gets the policy rule for a half-year.
    ///
    /// Returns `MissingPolicyRule` when the period is not configured.
    pub fn get_policy_rule(&self, period: PolicyPeriod) -> EngineResult<&PolicyRule> {
        self.config
            .policies()
            .get(&period)
            .ok_or(EngineError::MissingPolicyRule { period })
    }
}

impl PolicyRuleStore for ConfigLoader {
    fn get(&self, period: PolicyPeriod) -> Result<PolicyRule, StoreError> {
        self.config
            .policies()
            .get(&period)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("policy rule {period}"),
            })
    }
}
