//! PUCCH SR/CSI Resource Management
//!
//! Assigns periodic Scheduling Request (PUCCH Format 1) and CSI report
//! (PUCCH Format 2) occasions to UEs, per cell, without collisions and
//! within the per-slot PUCCH grant budget.

pub mod cell_context;
pub mod config;
pub mod csi_search;
pub mod index_mapper;
pub mod manager;
pub mod period;
pub mod ue_config;

pub use cell_context::{CellResourceContext, FreePool, PoolHandle};
pub use config::{
    generate_resource_list, PucchCellConfig, PucchFormat, PucchResourceDescriptor, ResourceOffset,
    ResourcePool, SrCsiCollisionPolicy, SrSelectionPolicy,
};
pub use csi_search::{CsiCandidate, CsiSearch};
pub use index_mapper::{PucchResourceLayout, ResourceClass};
pub use manager::{CellIndex, CellPucchAllocator, PucchResourceManager, MAX_NOF_DU_CELLS};
pub use period::PeriodLayout;
pub use ue_config::{CsiReportConfig, PucchReporting, SrResourceConfig, UeCellGroupConfig};
