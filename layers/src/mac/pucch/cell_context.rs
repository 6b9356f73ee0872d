//! Per-cell PUCCH resource state
//!
//! Free pools of SR and CSI (resource, offset) pairs plus the number of PUCCH
//! grants already reserved in every slot of the shared cycle.

use super::config::{PucchCellConfig, ResourceOffset};
use super::index_mapper::ResourceClass;
use super::period::PeriodLayout;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Position of a pair in its pool universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(usize);

/// Ordered pool of free (resource, offset) pairs.
///
/// The universe of pairs is fixed at construction. The free set is kept in
/// universe order, so a released pair goes back to the position it was
/// taken from.
#[derive(Debug, Clone)]
pub struct FreePool {
    class: ResourceClass,
    universe: Vec<ResourceOffset>,
    rank: HashMap<ResourceOffset, usize>,
    free: BTreeSet<usize>,
}

impl FreePool {
    fn new(class: ResourceClass, universe: Vec<ResourceOffset>) -> Self {
        let rank = universe.iter().enumerate().map(|(i, pair)| (*pair, i)).collect();
        let free = (0..universe.len()).collect();
        Self { class, universe, rank, free }
    }

    /// Number of free pairs
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// All pairs of the pool, free or not
    pub fn universe(&self) -> &[ResourceOffset] {
        &self.universe
    }

    pub fn contains(&self, pair: &ResourceOffset) -> bool {
        self.rank.get(pair).is_some_and(|r| self.free.contains(r))
    }

    /// Pair behind a handle, if it is still free
    pub fn get(&self, handle: PoolHandle) -> Option<ResourceOffset> {
        if self.free.contains(&handle.0) {
            self.universe.get(handle.0).copied()
        } else {
            None
        }
    }

    /// Free pairs in pool order
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, ResourceOffset)> + '_ {
        self.free.iter().map(move |&r| (PoolHandle(r), self.universe[r]))
    }

    /// Free pairs in pool order, starting at the `start`-th one and wrapping
    fn iter_rotated(&self, start: usize) -> impl Iterator<Item = (PoolHandle, ResourceOffset)> + '_ {
        let start = if self.free.is_empty() { 0 } else { start % self.free.len() };
        self.iter().skip(start).chain(self.iter().take(start))
    }

    /// Free pairs in pool order, as a plain list
    pub fn snapshot(&self) -> Vec<ResourceOffset> {
        self.iter().map(|(_, pair)| pair).collect()
    }

    fn take(&mut self, handle: PoolHandle) -> ResourceOffset {
        assert!(
            self.free.remove(&handle.0),
            "{:?} pool handle {:?} is not free", self.class, handle
        );
        self.universe[handle.0]
    }

    /// Handle of a pair that can be put back
    fn release_handle(&self, pair: &ResourceOffset) -> PoolHandle {
        let rank = match self.rank.get(pair) {
            Some(rank) => *rank,
            None => panic!("{:?} pair {:?} does not belong to the cell pool", self.class, pair),
        };
        assert!(
            !self.free.contains(&rank),
            "{:?} pair {:?} released while already free", self.class, pair
        );
        PoolHandle(rank)
    }

    fn put_back(&mut self, handle: PoolHandle) {
        self.free.insert(handle.0);
    }
}

/// PUCCH resource state of one cell
#[derive(Debug, Clone)]
pub struct CellResourceContext {
    periods: PeriodLayout,
    sr_free: FreePool,
    csi_free: FreePool,
    /// Advanced on every commit to spread UEs over the SR pool
    rotation: usize,
    /// PUCCH grants reserved per slot of the shared cycle
    grants: Vec<u32>,
    nof_active: usize,
}

impl CellResourceContext {
    /// Create the context with every pair of the cell free
    pub fn new(cfg: &PucchCellConfig) -> Self {
        let periods = cfg.period_layout();
        let sr_free = FreePool::new(ResourceClass::Sr, cfg.pool_universe(ResourceClass::Sr));
        let csi_free = FreePool::new(ResourceClass::Csi, cfg.pool_universe(ResourceClass::Csi));
        trace!(
            "PUCCH cell context: cycle={} slots, {} SR pairs, {} CSI pairs",
            periods.cycle_len, sr_free.len(), csi_free.len()
        );
        Self {
            periods,
            sr_free,
            csi_free,
            rotation: 0,
            grants: vec![0; periods.cycle_len as usize],
            nof_active: 0,
        }
    }

    pub fn periods(&self) -> &PeriodLayout {
        &self.periods
    }

    pub fn sr_free(&self) -> &FreePool {
        &self.sr_free
    }

    pub fn csi_free(&self) -> &FreePool {
        &self.csi_free
    }

    pub fn rotation(&self) -> usize {
        self.rotation
    }

    /// PUCCH grants per slot of the shared cycle
    pub fn grants(&self) -> &[u32] {
        &self.grants
    }

    /// Number of UEs holding resources in this cell
    pub fn nof_active(&self) -> usize {
        self.nof_active
    }

    /// Next SR pair in rotation order. Nothing is reserved until `commit`.
    pub fn take_sr_candidate(&self) -> Option<(PoolHandle, ResourceOffset)> {
        self.sr_candidates().next()
    }

    /// Every free SR pair, in rotation order
    pub fn sr_candidates(&self) -> impl Iterator<Item = (PoolHandle, ResourceOffset)> + '_ {
        self.sr_free.iter_rotated(self.rotation)
    }

    /// Every free CSI pair, in pool order
    pub fn csi_candidates(&self) -> impl Iterator<Item = (PoolHandle, ResourceOffset)> + '_ {
        self.csi_free.iter()
    }

    /// Whether one more grant fits in each of the given slots.
    ///
    /// A slot is full once adding a grant would reach `max_grants`; the last
    /// grant of every slot is left to HARQ-ACK.
    pub fn has_room<I>(&self, slots: I, max_grants: u32) -> bool
    where
        I: IntoIterator<Item = u32>,
    {
        slots.into_iter().all(|slot| self.grants[slot as usize] + 1 < max_grants)
    }

    /// Reserve an SR pair and, with CSI configured, a CSI pair
    pub fn commit(&mut self, sr: PoolHandle, csi: Option<PoolHandle>) -> (ResourceOffset, Option<ResourceOffset>) {
        assert_eq!(
            csi.is_some(),
            self.periods.csi_period.is_some(),
            "CSI pair must be given iff CSI reporting is configured"
        );
        // Validate both handles before touching either pool.
        let sr_pair = match self.sr_free.get(sr) {
            Some(pair) => pair,
            None => panic!("SR handle {:?} is not free", sr),
        };
        if let Some(csi) = csi {
            assert!(self.csi_free.get(csi).is_some(), "CSI handle {:?} is not free", csi);
        }

        self.sr_free.take(sr);
        let csi_pair = csi.map(|h| self.csi_free.take(h));

        for slot in self.periods.occupied_slots(sr_pair.offset, csi_pair.map(|p| p.offset)) {
            self.grants[slot as usize] += 1;
        }
        self.rotation = self.rotation.wrapping_add(1);
        self.nof_active += 1;
        (sr_pair, csi_pair)
    }

    /// Return pairs taken by `commit`.
    ///
    /// Releasing a pair that is already free is a bookkeeping bug in the
    /// caller and panics.
    pub fn release(&mut self, sr: ResourceOffset, csi: Option<ResourceOffset>) {
        assert_eq!(
            csi.is_some(),
            self.periods.csi_period.is_some(),
            "CSI pair must be given iff CSI reporting is configured"
        );
        let sr_handle = self.sr_free.release_handle(&sr);
        let csi_handle = csi.map(|pair| self.csi_free.release_handle(&pair));

        for slot in self.periods.occupied_slots(sr.offset, csi.map(|p| p.offset)) {
            let cnt = &mut self.grants[slot as usize];
            assert!(*cnt > 0, "PUCCH grant counter underflow in slot {}", slot);
            *cnt -= 1;
        }
        self.sr_free.put_back(sr_handle);
        if let Some(h) = csi_handle {
            self.csi_free.put_back(h);
        }
        self.nof_active -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::pucch::config::{generate_resource_list, ResourcePool, SrCsiCollisionPolicy, SrSelectionPolicy};
    use crate::mac::pucch::index_mapper::PucchResourceLayout;
    use common::types::DuplexMode;

    fn test_config() -> PucchCellConfig {
        let layout = PucchResourceLayout {
            nof_harq_f1_resources: 2,
            nof_sr_resources: 2,
            nof_harq_f2_resources: 2,
            nof_csi_resources: 2,
        };
        PucchCellConfig {
            resources: generate_resource_list(&layout, 1, 4),
            layout,
            sr_period_slots: 4,
            csi_period_slots: Some(8),
            max_pucch_grants_per_slot: 4,
            max_payload_bits: 11,
            duplex_mode: DuplexMode::Fdd,
            sr_pool: ResourcePool::AllOffsets,
            csi_pool: ResourcePool::AllOffsets,
            sr_csi_policy: SrCsiCollisionPolicy::Forbid,
            sr_selection: SrSelectionPolicy::Rotation,
        }
    }

    #[test]
    fn test_new_context() {
        let ctx = CellResourceContext::new(&test_config());
        assert_eq!(ctx.sr_free().len(), 8);
        assert_eq!(ctx.csi_free().len(), 16);
        assert_eq!(ctx.grants().len(), 8);
        assert!(ctx.grants().iter().all(|g| *g == 0));
    }

    #[test]
    fn test_sr_candidate_rotation() {
        let mut ctx = CellResourceContext::new(&test_config());
        let (h, pair) = ctx.take_sr_candidate().unwrap();
        assert_eq!(pair, ResourceOffset::new(0, 0));

        let (csi, _) = ctx.csi_candidates().nth(2).unwrap();
        ctx.commit(h, Some(csi));
        assert_eq!(ctx.rotation(), 1);

        // Rotation skips one entry of the remaining pool.
        let (_, pair) = ctx.take_sr_candidate().unwrap();
        assert_eq!(pair, ResourceOffset::new(0, 1));
    }

    #[test]
    fn test_commit_and_release() {
        let mut ctx = CellResourceContext::new(&test_config());
        let sr_before = ctx.sr_free().snapshot();
        let csi_before = ctx.csi_free().snapshot();

        let (sr_h, _) = ctx.sr_candidates().nth(3).unwrap();
        let (csi_h, _) = ctx.csi_candidates().nth(5).unwrap();
        let (sr, csi) = ctx.commit(sr_h, Some(csi_h));
        assert_eq!(sr, ResourceOffset::new(1, 1));
        assert_eq!(csi, Some(ResourceOffset::new(1, 2)));
        assert!(!ctx.sr_free().contains(&sr));
        // SR at 1 and 5, CSI at 2.
        assert_eq!(ctx.grants(), &[0, 1, 1, 0, 0, 1, 0, 0]);
        assert_eq!(ctx.nof_active(), 1);

        ctx.release(sr, csi);
        assert_eq!(ctx.sr_free().snapshot(), sr_before);
        assert_eq!(ctx.csi_free().snapshot(), csi_before);
        assert!(ctx.grants().iter().all(|g| *g == 0));
        assert_eq!(ctx.nof_active(), 0);
    }

    #[test]
    fn test_has_room() {
        let mut ctx = CellResourceContext::new(&test_config());
        let (sr_h, _) = ctx.take_sr_candidate().unwrap();
        let (csi_h, _) = ctx.csi_candidates().nth(2).unwrap();
        ctx.commit(sr_h, Some(csi_h));
        assert!(ctx.has_room([0, 4], 3));
        assert!(!ctx.has_room([0, 4], 2));
        assert!(ctx.has_room([3], 2));
    }

    #[test]
    #[should_panic(expected = "already free")]
    fn test_double_release_panics() {
        let mut ctx = CellResourceContext::new(&test_config());
        ctx.release(ResourceOffset::new(0, 0), Some(ResourceOffset::new(0, 1)));
    }
}
