//! DU PUCCH resource manager
//!
//! Hands out SR and CSI PUCCH resources to UEs so that no two UEs of a cell
//! share an SR or CSI occasion and no slot exceeds the PUCCH grant limit.
//! HARQ-ACK PUCCH collisions are left to the MAC scheduler.
//!
//! Every cell is driven by a single control task. [`PucchResourceManager`]
//! can be split with [`PucchResourceManager::into_cells`] so that each task
//! owns the [`CellPucchAllocator`] of its cell.

use super::cell_context::{CellResourceContext, PoolHandle};
use super::config::{PucchCellConfig, ResourceOffset, SrSelectionPolicy};
use super::csi_search::{CsiCandidate, CsiSearch};
use super::index_mapper::ResourceClass;
use super::ue_config::{CsiReportConfig, PucchReporting, SrResourceConfig, UeCellGroupConfig};
use crate::LayerError;
use tracing::{debug, info};

/// Maximum number of cells served by one DU
pub const MAX_NOF_DU_CELLS: usize = 16;

/// Index of a cell within the DU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex(u8);

impl CellIndex {
    /// Create a cell index, rejecting values beyond the DU cell limit
    pub fn new(value: usize) -> Option<Self> {
        if value < MAX_NOF_DU_CELLS {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(&self) -> usize {
        self.0 as usize
    }
}

/// PUCCH SR/CSI allocator of one cell
#[derive(Debug, Clone)]
pub struct CellPucchAllocator {
    cell_index: CellIndex,
    cfg: PucchCellConfig,
    ctx: CellResourceContext,
}

impl CellPucchAllocator {
    /// Validate the configuration and populate the free pools
    pub fn new(cell_index: CellIndex, cfg: PucchCellConfig) -> Result<Self, LayerError> {
        cfg.validate()?;
        let ctx = CellResourceContext::new(&cfg);
        info!(
            "Cell {}: PUCCH pools ready: {} SR pairs, {} CSI pairs, SR/CSI cycle {} slots",
            cell_index.value(),
            ctx.sr_free().len(),
            ctx.csi_free().len(),
            ctx.periods().cycle_len
        );
        Ok(Self { cell_index, cfg, ctx })
    }

    pub fn cell_index(&self) -> CellIndex {
        self.cell_index
    }

    pub fn config(&self) -> &PucchCellConfig {
        &self.cfg
    }

    pub fn context(&self) -> &CellResourceContext {
        &self.ctx
    }

    /// Allocate SR and CSI resources and store them in the UE config.
    ///
    /// On pool exhaustion the UE is left with periodic PUCCH disabled and
    /// `false` is returned.
    pub fn allocate(&mut self, ue: &mut UeCellGroupConfig) -> bool {
        assert!(
            !ue.has_pucch_resources(),
            "rnti={:#x}: PUCCH resources must be released before a new allocation",
            ue.rnti.value()
        );

        let (sr_handle, csi) = match self.find_sr_csi_pair() {
            Some(found) => found,
            None => {
                self.disable_pucch_cfg(ue);
                return false;
            }
        };

        let (sr, csi_pair) = self.ctx.commit(sr_handle, csi.map(|c| c.handle));
        ue.sr_resource = Some(SrResourceConfig {
            pucch_res_id: self.external_id(ResourceClass::Sr, sr.res_idx),
            offset: sr.offset,
            period_slots: self.cfg.sr_period_slots,
        });
        ue.csi_report = match (csi_pair, self.cfg.csi_period_slots) {
            (Some(pair), Some(period_slots)) => Some(CsiReportConfig {
                pucch_res_id: self.external_id(ResourceClass::Csi, pair.res_idx),
                report_slot_offset: pair.offset,
                period_slots,
            }),
            _ => None,
        };
        ue.pucch_reporting = PucchReporting::Configured;

        debug!(
            "Cell {}: rnti={:#x} SR res={:?} CSI res={:?}, {} UEs with PUCCH",
            self.cell_index.value(),
            ue.rnti.value(),
            ue.sr_resource,
            ue.csi_report,
            self.ctx.nof_active()
        );
        true
    }

    /// Return the UE's SR and CSI resources to the pools. No-op if the UE
    /// holds none.
    pub fn deallocate(&mut self, ue: &mut UeCellGroupConfig) {
        let sr = match ue.sr_resource {
            Some(sr) => sr,
            None => {
                assert!(
                    ue.csi_report.is_none(),
                    "rnti={:#x}: CSI report without SR resource", ue.rnti.value()
                );
                return;
            }
        };
        assert_eq!(
            sr.period_slots, self.cfg.sr_period_slots,
            "rnti={:#x}: SR period does not match cell {}", ue.rnti.value(), self.cell_index.value()
        );
        let sr_pair = ResourceOffset::new(self.internal_index(ResourceClass::Sr, sr.pucch_res_id), sr.offset);

        let csi_pair = match (ue.csi_report, self.cfg.csi_period_slots) {
            (Some(csi), Some(period_slots)) => {
                assert_eq!(
                    csi.period_slots, period_slots,
                    "rnti={:#x}: CSI period does not match cell {}", ue.rnti.value(), self.cell_index.value()
                );
                Some(ResourceOffset::new(
                    self.internal_index(ResourceClass::Csi, csi.pucch_res_id),
                    csi.report_slot_offset,
                ))
            }
            (None, None) => None,
            (csi, _) => panic!(
                "rnti={:#x}: CSI report {:?} inconsistent with cell {} configuration",
                ue.rnti.value(), csi, self.cell_index.value()
            ),
        };

        self.ctx.release(sr_pair, csi_pair);
        ue.clear_periodic_pucch();
        debug!(
            "Cell {}: rnti={:#x} released SR {:?} CSI {:?}",
            self.cell_index.value(), ue.rnti.value(), sr_pair, csi_pair
        );
    }

    /// SR pair and matching CSI pair for a new allocation.
    ///
    /// With [`SrSelectionPolicy::Rotation`] only the SR pair under the
    /// rotation counter is considered; if it has no compatible CSI pair it is
    /// dropped without touching the pools.
    fn find_sr_csi_pair(&self) -> Option<(PoolHandle, Option<CsiCandidate>)> {
        match self.cfg.sr_selection {
            SrSelectionPolicy::Rotation => {
                let (sr_handle, sr) = self.ctx.take_sr_candidate()?;
                let found = self.match_sr_candidate(sr_handle, sr);
                if found.is_none() {
                    debug!("Cell {}: SR candidate {:?} has no compatible CSI pair", self.cell_index.value(), sr);
                }
                found
            }
            SrSelectionPolicy::FirstFit => self
                .ctx
                .sr_candidates()
                .find_map(|(sr_handle, sr)| self.match_sr_candidate(sr_handle, sr)),
        }
    }

    /// Check the grant limit and payload of an SR pair and pick its CSI pair
    fn match_sr_candidate(&self, sr_handle: PoolHandle, sr: ResourceOffset) -> Option<(PoolHandle, Option<CsiCandidate>)> {
        let periods = self.ctx.periods();
        let max_grants = self.cfg.max_pucch_grants_per_slot;
        if !self.ctx.has_room(periods.sr_slots(sr.offset), max_grants) {
            return None;
        }
        let sr_payload_bits = self.cfg.payload_bits(ResourceClass::Sr, sr.res_idx);
        if periods.csi_period.is_none() {
            return (sr_payload_bits <= self.cfg.max_payload_bits).then_some((sr_handle, None));
        }

        let search = CsiSearch {
            periods,
            grants: self.ctx.grants(),
            max_grants,
            max_payload_bits: self.cfg.max_payload_bits,
            policy: self.cfg.sr_csi_policy,
        };
        let csi = search.find(sr.offset, sr_payload_bits, self.ctx.csi_candidates(), |res_idx| {
            self.cfg.payload_bits(ResourceClass::Csi, res_idx)
        })?;
        Some((sr_handle, Some(csi)))
    }

    /// Called when no SR/CSI resources could be found for the UE
    fn disable_pucch_cfg(&self, ue: &mut UeCellGroupConfig) {
        ue.disable_periodic_pucch();
        info!(
            "Cell {}: rnti={:#x} no PUCCH SR/CSI resources left ({} SR, {} CSI pairs free), periodic reporting disabled",
            self.cell_index.value(),
            ue.rnti.value(),
            self.ctx.sr_free().len(),
            self.ctx.csi_free().len()
        );
    }

    fn external_id(&self, class: ResourceClass, res_idx: u32) -> u32 {
        match self.cfg.layout.to_external(class, res_idx) {
            Some(id) => id,
            None => panic!("{:?} pool index {} outside the PUCCH resource layout", class, res_idx),
        }
    }

    fn internal_index(&self, class: ResourceClass, res_id: u32) -> u32 {
        match self.cfg.layout.to_internal(class, res_id) {
            Some(idx) => idx,
            None => panic!(
                "PUCCH resource id {} is not a {:?} resource of cell {}",
                res_id, class, self.cell_index.value()
            ),
        }
    }
}

/// PUCCH SR/CSI resource manager of all DU cells
#[derive(Debug, Clone)]
pub struct PucchResourceManager {
    cells: Vec<CellPucchAllocator>,
}

impl PucchResourceManager {
    /// Bring up one allocator per cell configuration, in cell index order
    pub fn new<I>(cell_cfgs: I) -> Result<Self, LayerError>
    where
        I: IntoIterator<Item = PucchCellConfig>,
    {
        let mut cells = Vec::new();
        for (i, cfg) in cell_cfgs.into_iter().enumerate() {
            let cell_index = CellIndex::new(i).ok_or_else(|| {
                LayerError::InvalidConfiguration(format!("more than {} DU cells", MAX_NOF_DU_CELLS))
            })?;
            cells.push(CellPucchAllocator::new(cell_index, cfg)?);
        }
        if cells.is_empty() {
            return Err(LayerError::InvalidConfiguration("no DU cell configured".into()));
        }
        Ok(Self { cells })
    }

    pub fn nof_cells(&self) -> usize {
        self.cells.len()
    }

    /// Allocate SR/CSI resources of `cell_index` to a UE
    pub fn allocate(&mut self, cell_index: CellIndex, ue: &mut UeCellGroupConfig) -> bool {
        self.cell_mut(cell_index).allocate(ue)
    }

    /// Return a UE's SR/CSI resources of `cell_index`
    pub fn deallocate(&mut self, cell_index: CellIndex, ue: &mut UeCellGroupConfig) {
        self.cell_mut(cell_index).deallocate(ue)
    }

    pub fn cell(&self, cell_index: CellIndex) -> &CellPucchAllocator {
        match self.cells.get(cell_index.value()) {
            Some(cell) => cell,
            None => panic!("cell index {} not configured", cell_index.value()),
        }
    }

    pub fn cell_mut(&mut self, cell_index: CellIndex) -> &mut CellPucchAllocator {
        match self.cells.get_mut(cell_index.value()) {
            Some(cell) => cell,
            None => panic!("cell index {} not configured", cell_index.value()),
        }
    }

    /// Split into per-cell allocators, one per cell control task
    pub fn into_cells(self) -> Vec<CellPucchAllocator> {
        self.cells
    }
}
