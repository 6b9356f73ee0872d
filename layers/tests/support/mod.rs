//! Helpers shared by the PUCCH resource manager integration tests

#![allow(dead_code)]

use common::types::{DuplexMode, Rnti};
use layers::mac::pucch::{
    generate_resource_list, CellPucchAllocator, PucchCellConfig, PucchResourceLayout, ResourceClass,
    ResourceOffset, ResourcePool, SrCsiCollisionPolicy, SrSelectionPolicy, UeCellGroupConfig,
};
use std::collections::HashSet;

pub const SR_PAYLOAD_BITS: u32 = 1;
pub const CSI_PAYLOAD_BITS: u32 = 4;

/// Cell with 2 SR and 2 CSI resources behind 2 HARQ F1 and 2 HARQ F2 ones
pub fn cell_config(sr_period: u32, csi_period: Option<u32>, max_grants: u32) -> PucchCellConfig {
    let layout = PucchResourceLayout {
        nof_harq_f1_resources: 2,
        nof_sr_resources: 2,
        nof_harq_f2_resources: 2,
        nof_csi_resources: 2,
    };
    PucchCellConfig {
        resources: generate_resource_list(&layout, SR_PAYLOAD_BITS, CSI_PAYLOAD_BITS),
        layout,
        sr_period_slots: sr_period,
        csi_period_slots: csi_period,
        max_pucch_grants_per_slot: max_grants,
        max_payload_bits: 11,
        duplex_mode: DuplexMode::Fdd,
        sr_pool: ResourcePool::AllOffsets,
        csi_pool: ResourcePool::AllOffsets,
        sr_csi_policy: SrCsiCollisionPolicy::Forbid,
        sr_selection: SrSelectionPolicy::Rotation,
    }
}

pub fn pairs(list: &[(u32, u32)]) -> Vec<ResourceOffset> {
    list.iter().map(|(res_idx, offset)| ResourceOffset::new(*res_idx, *offset)).collect()
}

pub fn ues(n: u16) -> Vec<UeCellGroupConfig> {
    (0..n).map(|i| UeCellGroupConfig::new(Rnti(Rnti::MIN_CRNTI.value() + i))).collect()
}

/// SR and CSI pairs held by a UE, as pool indices
pub fn held_pairs(cell: &CellPucchAllocator, ue: &UeCellGroupConfig) -> Option<(ResourceOffset, Option<ResourceOffset>)> {
    let layout = &cell.config().layout;
    let sr = ue.sr_resource?;
    let sr_pair = ResourceOffset::new(layout.to_internal(ResourceClass::Sr, sr.pucch_res_id).unwrap(), sr.offset);
    let csi_pair = ue.csi_report.map(|csi| {
        ResourceOffset::new(
            layout.to_internal(ResourceClass::Csi, csi.pucch_res_id).unwrap(),
            csi.report_slot_offset,
        )
    });
    Some((sr_pair, csi_pair))
}

/// Check pool partition, grant counters, UL placement, uniqueness and SR/CSI
/// separation
pub fn check_invariants(cell: &CellPucchAllocator, ues: &[UeCellGroupConfig]) {
    let ctx = cell.context();
    let cfg = cell.config();
    let periods = ctx.periods();

    let held: Vec<(ResourceOffset, Option<ResourceOffset>)> =
        ues.iter().filter_map(|ue| held_pairs(cell, ue)).collect();
    assert_eq!(ctx.nof_active(), held.len());

    // No two UEs share a pair.
    let mut sr_held = HashSet::new();
    let mut csi_held = HashSet::new();
    for (sr, csi) in &held {
        assert!(sr_held.insert(*sr), "SR pair {:?} held twice", sr);
        if let Some(csi) = csi {
            assert!(csi_held.insert(*csi), "CSI pair {:?} held twice", csi);
        }
        assert_eq!(csi.is_some(), cfg.csi_period_slots.is_some());
    }

    // Free pool and held pairs partition the universe.
    for (pool, held_set) in [(ctx.sr_free(), &sr_held), (ctx.csi_free(), &csi_held)] {
        let mut all: Vec<ResourceOffset> = pool.snapshot();
        for pair in held_set.iter() {
            assert!(!pool.contains(pair), "held pair {:?} is also free", pair);
        }
        all.extend(held_set.iter().copied());
        all.sort();
        let mut universe = pool.universe().to_vec();
        universe.sort();
        assert_eq!(all, universe);
    }

    // Grant counters match the held occasions and stay under the limit.
    let mut grants = vec![0u32; periods.cycle_len as usize];
    for (sr, csi) in &held {
        for slot in periods.occupied_slots(sr.offset, csi.map(|c| c.offset)) {
            grants[slot as usize] += 1;
        }
    }
    assert_eq!(ctx.grants(), grants.as_slice());
    for (slot, count) in grants.iter().enumerate() {
        assert!(*count == 0 || cfg.duplex_mode.is_ul_slot(slot as u32), "PUCCH occasion in non-UL slot {}", slot);
    }
    assert!(ctx.grants().iter().all(|g| *g < cfg.max_pucch_grants_per_slot));

    if cfg.sr_csi_policy == SrCsiCollisionPolicy::Forbid {
        for (sr, csi) in &held {
            if let Some(csi) = csi {
                assert!(!periods.sr_csi_collide(sr.offset, csi.offset), "SR {:?} collides with CSI {:?}", sr, csi);
            }
        }
    }
}
