//! Farm layout and scheduler configuration structures.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, CycleStatus};
use crate::util::serde::{FarmId, ShelfRef};

/// Environment variable naming the JSON config file read by [`SchedulerConfig::from_env`].
pub const CONFIG_PATH_ENV: &str = "RACK_SCHEDULER_CONFIG";

/// One rack and its shelves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackLayout {
    /// Rack identifier, unique within the farm.
    pub rack_id: String,
    /// Shelf identifiers, unique within the rack.
    pub shelves: Vec<String>,
}

/// Fixed inventory of one farm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmLayout {
    /// Farm identifier.
    pub farm_id: FarmId,
    /// Racks in the farm.
    pub racks: Vec<RackLayout>,
}

impl FarmLayout {
    /// Build a layout of `racks` racks with `shelves_per_rack` shelves each,
    /// named `R1..` and `S1..`.
    pub fn uniform(farm_id: impl Into<FarmId>, racks: usize, shelves_per_rack: usize) -> Self {
        Self {
            farm_id: farm_id.into(),
            racks: (1..=racks)
                .map(|r| RackLayout {
                    rack_id: format!("R{r}"),
                    shelves: (1..=shelves_per_rack).map(|s| format!("S{s}")).collect(),
                })
                .collect(),
        }
    }

    /// Every shelf address in the layout.
    pub fn shelf_refs(&self) -> impl Iterator<Item = ShelfRef> + '_ {
        self.racks.iter().flat_map(|rack| {
            rack.shelves
                .iter()
                .map(move |shelf| ShelfRef::new(rack.rack_id.clone(), shelf.clone()))
        })
    }

    /// Reject empty farms/racks and duplicate identifiers.
    pub fn validate(&self) -> Result<(), String> {
        if self.farm_id.as_str().is_empty() {
            return Err("farm_id must not be empty".into());
        }
        if self.racks.is_empty() {
            return Err("at least one rack must be defined".into());
        }
        let mut racks = HashSet::new();
        for rack in &self.racks {
            if !racks.insert(rack.rack_id.as_str()) {
                return Err(format!("duplicate rack `{}`", rack.rack_id));
            }
            if rack.shelves.is_empty() {
                return Err(format!("rack `{}` has no shelves", rack.rack_id));
            }
            let mut shelves = HashSet::new();
            for shelf in &rack.shelves {
                if !shelves.insert(shelf.as_str()) {
                    return Err(format!("duplicate shelf `{shelf}` in rack `{}`", rack.rack_id));
                }
            }
        }
        Ok(())
    }
}

/// Wait-queue behaviour shared by every farm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Maximum waiters per shelf before `QueueFull`.
    pub max_depth_per_shelf: usize,
    /// Age after which a queued cycle is cancelled. `None` waits indefinitely.
    pub entry_timeout_secs: Option<u64>,
    /// Stage granted cycles resume at.
    pub will_start_from: CycleStatus,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            max_depth_per_shelf: 64,
            entry_timeout_secs: None,
            will_start_from: CycleStatus::Transplant,
        }
    }
}

impl QueuePolicy {
    /// Configured timeout, if any.
    #[must_use]
    pub fn entry_timeout(&self) -> Option<Duration> {
        self.entry_timeout_secs.map(Duration::from_secs)
    }

    /// Validate policy values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth_per_shelf == 0 {
            return Err("max_depth_per_shelf must be greater than 0".into());
        }
        if self.entry_timeout_secs == Some(0) {
            return Err("entry_timeout_secs must be greater than 0 when set".into());
        }
        if !matches!(
            self.will_start_from,
            CycleStatus::Transplant | CycleStatus::Growing
        ) {
            return Err(format!(
                "will_start_from must be TRANSPLANT or GROWING, got {}",
                self.will_start_from
            ));
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Farms to provision.
    pub farms: Vec<FarmLayout>,
    /// Queue policy.
    #[serde(default)]
    pub queue: QueuePolicy,
}

impl SchedulerConfig {
    /// Validate all farms and ensure at least one farm exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.farms.is_empty() {
            return Err("at least one farm must be defined".into());
        }
        let mut ids = HashSet::new();
        for farm in &self.farms {
            if !ids.insert(&farm.farm_id) {
                return Err(format!("duplicate farm `{}`", farm.farm_id));
            }
            farm.validate()
                .map_err(|e| format!("farm `{}` invalid: {e}", farm.farm_id))?;
        }
        self.queue
            .validate()
            .map_err(|e| format!("queue policy invalid: {e}"))
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading config {}", path.display()))
    }

    /// Load `.env` if present, then read the file named by [`CONFIG_PATH_ENV`].
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV)
            .with_context(|| format!("{CONFIG_PATH_ENV} is not set"))?;
        Self::from_file(path)
    }
}
