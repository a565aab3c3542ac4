use crate::settings::SettingsError;
use derive_builder::Builder;
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which ready tasks are handed to idle workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SortingPolicy {
    /// submission order
    Fifo,
    /// earliest algorithm level first, diagonal tasks before panel tasks
    /// before trailing updates
    CriticalPath,
}

/// Memoization of tile task results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CachingPolicy {
    Disabled,
    /// skip a kernel call when the same operation is submitted again on
    /// operand tiles with unchanged contents
    Memoize,
}

impl FromStr for SortingPolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "fifo" => Ok(SortingPolicy::Fifo),
            "criticalpath" | "priority" => Ok(SortingPolicy::CriticalPath),
            _ => Err(SettingsError::BadFieldValue("sorting")),
        }
    }
}

impl FromStr for CachingPolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(CachingPolicy::Disabled),
            "memoize" | "on" => Ok(CachingPolicy::Memoize),
            _ => Err(SettingsError::BadFieldValue("caching")),
        }
    }
}

/// Configuration of a [`TileScheduler`](crate::scheduler::TileScheduler).

#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerSettings {
    ///number of worker threads (0 = number of available cores)
    #[builder(default = "0")]
    pub max_threads: usize,

    ///ready task ordering
    #[builder(default = "SortingPolicy::Fifo")]
    pub sorting: SortingPolicy,

    ///tile result caching
    #[builder(default = "CachingPolicy::Disabled")]
    pub caching: CachingPolicy,

    ///in-memory cache budget in bytes
    #[builder(default = "64 << 20")]
    pub cache_capacity: usize,

    ///directory for cache entries evicted from memory.  Eviction drops
    ///entries when unset.
    #[builder(default = "None", setter(strip_option))]
    pub out_of_core_dir: Option<PathBuf>,

    ///verbose printing of run summaries
    #[builder(default = "false")]
    pub verbose: bool,
}

impl Default for SchedulerSettings {
    fn default() -> SchedulerSettings {
        SchedulerSettingsBuilder::default().build().unwrap()
    }
}

impl SchedulerSettings {
    /// Checks that the settings are valid
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_cache_capacity(self.caching, self.cache_capacity, &self.out_of_core_dir)?;
        validate_out_of_core_dir(self.caching, &self.out_of_core_dir)?;
        Ok(())
    }

    pub(crate) fn caching_enabled(&self) -> bool {
        self.caching != CachingPolicy::Disabled
    }
}

// pre-build validation returns a builder error
impl From<SettingsError> for SchedulerSettingsBuilderError {
    fn from(e: SettingsError) -> Self {
        SchedulerSettingsBuilderError::ValidationError(e.to_string())
    }
}

/// Automatic pre-build settings validation
impl SchedulerSettingsBuilder {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let caching = self.caching.unwrap_or(CachingPolicy::Disabled);
        if let Some(capacity) = self.cache_capacity {
            let dir = self.out_of_core_dir.clone().flatten();
            validate_cache_capacity(caching, capacity, &dir)?;
        }
        if let Some(ref dir) = self.out_of_core_dir {
            validate_out_of_core_dir(caching, dir)?;
        }
        Ok(())
    }
}

// zero capacity keeps nothing in memory, so it needs somewhere to spill
fn validate_cache_capacity(
    caching: CachingPolicy,
    capacity: usize,
    dir: &Option<PathBuf>,
) -> Result<(), SettingsError> {
    if caching != CachingPolicy::Disabled && capacity == 0 && dir.is_none() {
        return Err(SettingsError::BadFieldValue("cache_capacity"));
    }
    Ok(())
}

fn validate_out_of_core_dir(
    caching: CachingPolicy,
    dir: &Option<PathBuf>,
) -> Result<(), SettingsError> {
    match dir {
        Some(_) if caching == CachingPolicy::Disabled => {
            Err(SettingsError::BadFieldValue("out_of_core_dir"))
        }
        Some(path) if path.is_file() => Err(SettingsError::BadFieldValue("out_of_core_dir")),
        _ => Ok(()),
    }
}

#[test]
fn test_settings_validate() {
    // all standard settings
    SchedulerSettingsBuilder::default().build().unwrap();

    // zero capacity is fine without caching
    SchedulerSettingsBuilder::default()
        .cache_capacity(0)
        .build()
        .unwrap();

    // fail on zero capacity with caching
    assert!(SchedulerSettingsBuilder::default()
        .caching(CachingPolicy::Memoize)
        .cache_capacity(0)
        .build()
        .is_err());

    // unless everything can spill
    SchedulerSettingsBuilder::default()
        .caching(CachingPolicy::Memoize)
        .cache_capacity(0)
        .out_of_core_dir(std::env::temp_dir())
        .build()
        .unwrap();

    // fail on spill directory without caching
    assert!(SchedulerSettingsBuilder::default()
        .out_of_core_dir(std::env::temp_dir())
        .build()
        .is_err());

    // check that the direct validation works
    let settings = SchedulerSettings {
        caching: CachingPolicy::Memoize,
        cache_capacity: 0,
        ..SchedulerSettings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_policy_from_str() {
    assert_eq!("fifo".parse::<SortingPolicy>(), Ok(SortingPolicy::Fifo));
    assert_eq!(
        "critical-path".parse::<SortingPolicy>(),
        Ok(SortingPolicy::CriticalPath)
    );
    assert_eq!("Memoize".parse::<CachingPolicy>(), Ok(CachingPolicy::Memoize));
    assert!("lifo".parse::<SortingPolicy>().is_err());
}
