//! Per-cell PUCCH resource configuration
//!
//! Immutable input of the PUCCH resource manager, built once at cell
//! bring-up from the DU cell configuration.

use super::index_mapper::{PucchResourceLayout, ResourceClass};
use super::period::{gcd, PeriodLayout};
use crate::LayerError;
use common::types::DuplexMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on the SR/CSI shared cycle, in slots
pub const MAX_SHARED_CYCLE_SLOTS: u32 = 1 << 16;

/// (pool index, slot offset) pair of a periodic PUCCH occasion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceOffset {
    /// DU pool index of the PUCCH resource
    pub res_idx: u32,
    /// Slot offset within the period
    pub offset: u32,
}

impl ResourceOffset {
    pub fn new(res_idx: u32, offset: u32) -> Self {
        Self { res_idx, offset }
    }
}

/// PUCCH format of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PucchFormat {
    Format1,
    Format2,
}

/// Entry of the cell PUCCH resource list.
///
/// Only the payload is read by the resource manager; the rest of the
/// resource definition belongs to the PUCCH config builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PucchResourceDescriptor {
    pub format: PucchFormat,
    /// UCI bits carried by an occasion of this resource
    pub payload_bits: u32,
}

/// How a free pool is populated at cell bring-up
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourcePool {
    /// Every resource at every uplink offset of the period
    #[default]
    AllOffsets,
    /// Fixed list of pairs, in the given order
    Explicit(Vec<ResourceOffset>),
}

/// Whether the SR and CSI occasions of one UE may share a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrCsiCollisionPolicy {
    /// SR and CSI of a UE never land in the same slot
    #[default]
    Forbid,
    /// SR may be multiplexed into the CSI report slot
    Allow,
}

/// How the SR pair of a new allocation is picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrSelectionPolicy {
    /// Only the SR pair under the rotation counter is tried; if no CSI pair
    /// fits it, the allocation fails
    #[default]
    Rotation,
    /// Free SR pairs are tried in rotation order until one fits
    FirstFit,
}

/// PUCCH resource configuration of one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PucchCellConfig {
    /// Layout of the UE PUCCH resource list
    pub layout: PucchResourceLayout,
    /// Resource list, indexed by UE PUCCH resource id
    pub resources: Vec<PucchResourceDescriptor>,
    /// SR period in slots
    pub sr_period_slots: u32,
    /// CSI report period in slots, `None` if CSI reporting is not configured
    pub csi_period_slots: Option<u32>,
    /// PUCCH grants per slot, including the one kept for HARQ-ACK
    pub max_pucch_grants_per_slot: u32,
    /// Maximum UCI payload of a combined SR + CSI report
    pub max_payload_bits: u32,
    /// Duplex mode, used to skip non-uplink offsets
    pub duplex_mode: DuplexMode,
    #[serde(default)]
    pub sr_pool: ResourcePool,
    #[serde(default)]
    pub csi_pool: ResourcePool,
    #[serde(default)]
    pub sr_csi_policy: SrCsiCollisionPolicy,
    #[serde(default)]
    pub sr_selection: SrSelectionPolicy,
}

/// Build a resource list for `layout` with one payload size per block
pub fn generate_resource_list(
    layout: &PucchResourceLayout,
    sr_payload_bits: u32,
    csi_payload_bits: u32,
) -> Vec<PucchResourceDescriptor> {
    // HARQ-ACK entries are never allocated here; 2 bits is the F1 maximum.
    let f1 = |payload_bits| PucchResourceDescriptor { format: PucchFormat::Format1, payload_bits };
    let f2 = |payload_bits| PucchResourceDescriptor { format: PucchFormat::Format2, payload_bits };

    let mut list = Vec::with_capacity(layout.nof_resources() as usize);
    list.extend((0..layout.nof_harq_f1_resources).map(|_| f1(2)));
    list.extend((0..layout.nof_sr_resources).map(|_| f1(sr_payload_bits)));
    list.extend((0..layout.nof_harq_f2_resources).map(|_| f2(csi_payload_bits)));
    list.extend((0..layout.nof_csi_resources).map(|_| f2(csi_payload_bits)));
    list
}

impl PucchCellConfig {
    /// Check the configuration before cell bring-up
    pub fn validate(&self) -> Result<(), LayerError> {
        if self.sr_period_slots == 0 {
            return Err(LayerError::InvalidConfiguration("SR period must be non-zero".into()));
        }
        if self.layout.nof_sr_resources == 0 {
            return Err(LayerError::InvalidConfiguration(
                "at least one PUCCH SR resource is required".into()
            ));
        }
        if let Some(csi_period) = self.csi_period_slots {
            if csi_period == 0 {
                return Err(LayerError::InvalidConfiguration("CSI report period must be non-zero".into()));
            }
            if self.layout.nof_csi_resources == 0 {
                return Err(LayerError::InvalidConfiguration(
                    "CSI reporting configured without PUCCH CSI resources".into()
                ));
            }
            let cycle = (self.sr_period_slots / gcd(self.sr_period_slots, csi_period)) as u64 * csi_period as u64;
            if cycle > MAX_SHARED_CYCLE_SLOTS as u64 {
                return Err(LayerError::InvalidConfiguration(format!(
                    "SR/CSI shared cycle of {} slots exceeds {}", cycle, MAX_SHARED_CYCLE_SLOTS
                )));
            }
        } else if self.sr_period_slots > MAX_SHARED_CYCLE_SLOTS {
            return Err(LayerError::InvalidConfiguration(format!(
                "SR period of {} slots exceeds {}", self.sr_period_slots, MAX_SHARED_CYCLE_SLOTS
            )));
        }
        if let DuplexMode::Tdd { pattern } = &self.duplex_mode {
            self.check_tdd_periods(pattern.period_slots())?;
        }
        if self.max_pucch_grants_per_slot == 0 {
            return Err(LayerError::InvalidConfiguration(
                "max PUCCH grants per slot must be non-zero".into()
            ));
        }
        if self.resources.len() != self.layout.nof_resources() as usize {
            return Err(LayerError::InvalidConfiguration(format!(
                "PUCCH resource list has {} entries, layout expects {}",
                self.resources.len(),
                self.layout.nof_resources()
            )));
        }
        self.check_formats(ResourceClass::Sr, PucchFormat::Format1)?;
        if self.csi_period_slots.is_some() {
            self.check_formats(ResourceClass::Csi, PucchFormat::Format2)?;
        }
        if let ResourcePool::Explicit(pairs) = &self.sr_pool {
            self.check_explicit_pool(ResourceClass::Sr, pairs)?;
        }
        if let ResourcePool::Explicit(pairs) = &self.csi_pool {
            self.check_explicit_pool(ResourceClass::Csi, pairs)?;
        }
        Ok(())
    }

    /// Occasions only stay in uplink slots if every period is a multiple of
    /// the TDD pattern period.
    fn check_tdd_periods(&self, pattern_period: u32) -> Result<(), LayerError> {
        if pattern_period == 0 {
            return Err(LayerError::InvalidConfiguration("empty TDD pattern".into()));
        }
        let periods = [("SR", Some(self.sr_period_slots)), ("CSI report", self.csi_period_slots)];
        for (name, period) in periods {
            if let Some(period) = period {
                if period % pattern_period != 0 {
                    return Err(LayerError::InvalidConfiguration(format!(
                        "{} period of {} slots is not a multiple of the {} slot TDD period",
                        name, period, pattern_period
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_formats(&self, class: ResourceClass, format: PucchFormat) -> Result<(), LayerError> {
        for res_idx in 0..self.layout.nof_class_resources(class) {
            let descriptor = self.descriptor(class, res_idx);
            if descriptor.map(|d| d.format) != Some(format) {
                return Err(LayerError::InvalidConfiguration(format!(
                    "{:?} resource {} is not a {:?} resource", class, res_idx, format
                )));
            }
        }
        Ok(())
    }

    fn check_explicit_pool(&self, class: ResourceClass, pairs: &[ResourceOffset]) -> Result<(), LayerError> {
        let period = match self.class_period(class) {
            Some(period) => period,
            None => {
                return Err(LayerError::InvalidConfiguration(format!(
                    "explicit {:?} pool given but {:?} is not configured", class, class
                )))
            }
        };
        let nof_res = self.layout.nof_class_resources(class);
        let mut seen = HashSet::with_capacity(pairs.len());
        for pair in pairs {
            if pair.res_idx >= nof_res || pair.offset >= period {
                return Err(LayerError::InvalidConfiguration(format!(
                    "{:?} pool entry {:?} out of range ({} resources, period {})", class, pair, nof_res, period
                )));
            }
            if !self.duplex_mode.is_ul_slot(pair.offset) {
                return Err(LayerError::InvalidConfiguration(format!(
                    "{:?} pool entry {:?} is not in an uplink slot", class, pair
                )));
            }
            if !seen.insert(*pair) {
                return Err(LayerError::InvalidConfiguration(format!(
                    "duplicate {:?} pool entry {:?}", class, pair
                )));
            }
        }
        Ok(())
    }

    /// Period of a resource class, in slots
    pub fn class_period(&self, class: ResourceClass) -> Option<u32> {
        match class {
            ResourceClass::Sr => Some(self.sr_period_slots),
            ResourceClass::Csi => self.csi_period_slots,
        }
    }

    /// SR/CSI period layout of the cell
    pub fn period_layout(&self) -> PeriodLayout {
        PeriodLayout::new(self.sr_period_slots, self.csi_period_slots)
    }

    /// Resource list entry of a pool index
    pub fn descriptor(&self, class: ResourceClass, res_idx: u32) -> Option<&PucchResourceDescriptor> {
        let res_id = self.layout.to_external(class, res_idx)?;
        self.resources.get(res_id as usize)
    }

    /// UCI payload of a pool index; zero for an unknown index
    pub fn payload_bits(&self, class: ResourceClass, res_idx: u32) -> u32 {
        self.descriptor(class, res_idx).map_or(0, |d| d.payload_bits)
    }

    /// Every (resource, offset) pair of a class, in pool order.
    ///
    /// Enumerated pools are offset-major so that consecutive UEs spread over
    /// slots before stacking on resources of the same slot.
    pub fn pool_universe(&self, class: ResourceClass) -> Vec<ResourceOffset> {
        let period = match self.class_period(class) {
            Some(period) => period,
            None => return Vec::new(),
        };
        let pool = match class {
            ResourceClass::Sr => &self.sr_pool,
            ResourceClass::Csi => &self.csi_pool,
        };
        match pool {
            ResourcePool::Explicit(pairs) => pairs.clone(),
            ResourcePool::AllOffsets => {
                let nof_res = self.layout.nof_class_resources(class);
                (0..period)
                    .filter(|offset| self.duplex_mode.is_ul_slot(*offset))
                    .flat_map(|offset| (0..nof_res).map(move |res_idx| ResourceOffset::new(res_idx, offset)))
                    .collect()
            }
        }
    }
}
