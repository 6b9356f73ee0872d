//! Mapping between DU pool indices and UE PUCCH resource ids
//!
//! Inside the DU, the SR (Format 1) and CSI (Format 2) resources of a cell are
//! indexed `0..nof_sr_resources` and `0..nof_csi_resources`. In the UE's
//! PUCCH-Config the resources are listed as
//!
//! ```text
//! [ HARQ F1 sets | SR F1 | HARQ F2 sets | CSI F2 ]
//! ```
//!
//! so the resource id seen by the UE is the pool index shifted by the size of
//! the blocks before it.

use serde::{Deserialize, Serialize};

/// Resource class managed by the PUCCH resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Scheduling Request, PUCCH Format 1
    Sr,
    /// CSI report, PUCCH Format 2
    Csi,
}

/// Sizes of the blocks in the UE PUCCH resource list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PucchResourceLayout {
    /// Format 1 HARQ-ACK resources, all cell sets together
    pub nof_harq_f1_resources: u32,
    /// Format 1 SR resources of the cell
    pub nof_sr_resources: u32,
    /// Format 2 HARQ-ACK resources, all cell sets together
    pub nof_harq_f2_resources: u32,
    /// Format 2 CSI resources of the cell
    pub nof_csi_resources: u32,
}

impl PucchResourceLayout {
    /// Total length of the resource list
    pub fn nof_resources(&self) -> u32 {
        self.nof_harq_f1_resources + self.nof_sr_resources + self.nof_harq_f2_resources + self.nof_csi_resources
    }

    /// Number of pool indices for a class
    pub fn nof_class_resources(&self, class: ResourceClass) -> u32 {
        match class {
            ResourceClass::Sr => self.nof_sr_resources,
            ResourceClass::Csi => self.nof_csi_resources,
        }
    }

    fn block_start(&self, class: ResourceClass) -> u32 {
        match class {
            ResourceClass::Sr => self.nof_harq_f1_resources,
            ResourceClass::Csi => self.nof_harq_f1_resources + self.nof_sr_resources + self.nof_harq_f2_resources,
        }
    }

    /// Pool index to UE PUCCH resource id
    pub fn to_external(&self, class: ResourceClass, res_idx: u32) -> Option<u32> {
        if res_idx < self.nof_class_resources(class) {
            Some(self.block_start(class) + res_idx)
        } else {
            None
        }
    }

    /// UE PUCCH resource id to pool index
    pub fn to_internal(&self, class: ResourceClass, res_id: u32) -> Option<u32> {
        let start = self.block_start(class);
        let idx = res_id.checked_sub(start)?;
        if idx < self.nof_class_resources(class) {
            Some(idx)
        } else {
            None
        }
    }
}
