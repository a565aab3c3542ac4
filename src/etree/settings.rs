use crate::settings::SettingsError;
use derive_builder::Builder;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selects the coarsening strategy of a [`TreeBuilder`](crate::etree::TreeBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TreeStrategyTag {
    HeavyEdgeMatching,
    PartitionBased,
    NestedDissection,
}

impl FromStr for TreeStrategyTag {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "heavyedgematching" | "hem" => Ok(TreeStrategyTag::HeavyEdgeMatching),
            "partitionbased" | "partition" => Ok(TreeStrategyTag::PartitionBased),
            "nesteddissection" | "nd" => Ok(TreeStrategyTag::NestedDissection),
            _ => Err(SettingsError::BadFieldValue("strategy")),
        }
    }
}

/// Configuration of an elimination tree build.

#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeSettings {
    ///coarsening strategy
    #[builder(default = "TreeStrategyTag::NestedDissection")]
    pub strategy: TreeStrategyTag,

    ///largest number of elements in a leaf of a partitioned tree
    #[builder(default = "32")]
    pub leaf_size: usize,

    ///parts per partitioning step
    #[builder(default = "2")]
    pub num_parts: usize,

    ///heavy-edge matching stops at this many vertices
    #[builder(default = "1")]
    pub min_coarse_size: usize,

    ///verbose printing of the built tree summary
    #[builder(default = "false")]
    pub verbose: bool,
}

impl Default for TreeSettings {
    fn default() -> TreeSettings {
        TreeSettingsBuilder::default().build().unwrap()
    }
}

impl TreeSettings {
    /// Checks that the settings are valid
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_leaf_size(self.leaf_size)?;
        validate_num_parts(self.num_parts)?;
        validate_min_coarse_size(self.min_coarse_size)?;
        Ok(())
    }
}

// pre-build validation returns a builder error
impl From<SettingsError> for TreeSettingsBuilderError {
    fn from(e: SettingsError) -> Self {
        TreeSettingsBuilderError::ValidationError(e.to_string())
    }
}

/// Automatic pre-build settings validation
impl TreeSettingsBuilder {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(n) = self.leaf_size {
            validate_leaf_size(n)?;
        }
        if let Some(k) = self.num_parts {
            validate_num_parts(k)?;
        }
        if let Some(n) = self.min_coarse_size {
            validate_min_coarse_size(n)?;
        }
        Ok(())
    }
}

fn validate_leaf_size(n: usize) -> Result<(), SettingsError> {
    if n == 0 {
        return Err(SettingsError::BadFieldValue("leaf_size"));
    }
    Ok(())
}

fn validate_num_parts(k: usize) -> Result<(), SettingsError> {
    if k < 2 {
        return Err(SettingsError::BadFieldValue("num_parts"));
    }
    Ok(())
}

fn validate_min_coarse_size(n: usize) -> Result<(), SettingsError> {
    if n == 0 {
        return Err(SettingsError::BadFieldValue("min_coarse_size"));
    }
    Ok(())
}

#[test]
fn test_settings_validate() {
    TreeSettingsBuilder::default().build().unwrap();

    assert!(TreeSettingsBuilder::default().leaf_size(0).build().is_err());
    assert!(TreeSettingsBuilder::default().num_parts(1).build().is_err());
    assert!(TreeSettingsBuilder::default()
        .min_coarse_size(0)
        .build()
        .is_err());

    let settings = TreeSettings {
        num_parts: 0,
        ..TreeSettings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_strategy_from_str() {
    assert_eq!(
        "heavy-edge-matching".parse::<TreeStrategyTag>(),
        Ok(TreeStrategyTag::HeavyEdgeMatching)
    );
    assert_eq!(
        "PartitionBased".parse::<TreeStrategyTag>(),
        Ok(TreeStrategyTag::PartitionBased)
    );
    assert_eq!("nd".parse::<TreeStrategyTag>(), Ok(TreeStrategyTag::NestedDissection));
    assert_eq!(
        "metis".parse::<TreeStrategyTag>(),
        Err(SettingsError::BadFieldValue("strategy"))
    );
}
