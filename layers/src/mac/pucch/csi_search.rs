//! CSI report resource selection
//!
//! Given the SR occasion picked for a UE, choose the CSI (resource, offset)
//! pair that keeps every slot under the PUCCH grant limit, does not collide
//! with the SR (unless the cell allows it) and minimizes the combined UCI
//! payload.

use super::cell_context::PoolHandle;
use super::config::{ResourceOffset, SrCsiCollisionPolicy};
use super::period::PeriodLayout;
use tracing::trace;

/// Selected CSI pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiCandidate {
    pub handle: PoolHandle,
    pub pair: ResourceOffset,
    /// SR + CSI payload in bits
    pub combined_payload_bits: u32,
}

/// Cell state and limits the search runs against
#[derive(Debug, Clone, Copy)]
pub struct CsiSearch<'a> {
    pub periods: &'a PeriodLayout,
    /// PUCCH grants per slot of the shared cycle
    pub grants: &'a [u32],
    pub max_grants: u32,
    pub max_payload_bits: u32,
    pub policy: SrCsiCollisionPolicy,
}

impl CsiSearch<'_> {
    /// Best CSI candidate for an SR occasion at `sr_offset`.
    ///
    /// Ties on payload go to the candidate seen first, so the result only
    /// depends on the candidate order.
    pub fn find<I, F>(
        &self,
        sr_offset: u32,
        sr_payload_bits: u32,
        candidates: I,
        csi_payload_bits: F,
    ) -> Option<CsiCandidate>
    where
        I: IntoIterator<Item = (PoolHandle, ResourceOffset)>,
        F: Fn(u32) -> u32,
    {
        let mut best: Option<CsiCandidate> = None;

        for (handle, pair) in candidates {
            if !self.fits_grant_limit(sr_offset, pair.offset) {
                trace!("CSI {:?} rejected: slot grant limit", pair);
                continue;
            }
            if self.policy == SrCsiCollisionPolicy::Forbid && self.periods.sr_csi_collide(sr_offset, pair.offset) {
                trace!("CSI {:?} rejected: collides with SR offset {}", pair, sr_offset);
                continue;
            }
            let combined_payload_bits = sr_payload_bits + csi_payload_bits(pair.res_idx);
            if combined_payload_bits > self.max_payload_bits {
                trace!("CSI {:?} rejected: payload {} bits", pair, combined_payload_bits);
                continue;
            }
            if best.map_or(true, |b| combined_payload_bits < b.combined_payload_bits) {
                best = Some(CsiCandidate { handle, pair, combined_payload_bits });
            }
        }
        best
    }

    /// Every slot of the SR + CSI occasions can take one more grant.
    /// A slot shared by SR and CSI is counted once.
    fn fits_grant_limit(&self, sr_offset: u32, csi_offset: u32) -> bool {
        let periods = self.periods;
        periods
            .sr_slots(sr_offset)
            .chain(periods.csi_slots(csi_offset).filter(|slot| !periods.is_sr_slot(sr_offset, *slot)))
            .all(|slot| self.grants[slot as usize] + 1 < self.max_grants)
    }
}
