//! Common Utilities
//!
//! Provides utility functions used across the GNodeB implementation

/// Time utilities for slot/frame calculations
pub mod time {
    use crate::types::SubcarrierSpacing;
    use tracing::trace;

    /// Slot duration in microseconds for different SCS
    pub fn slot_duration_us(scs: SubcarrierSpacing) -> u32 {
        match scs {
            SubcarrierSpacing::Scs15 => 1000,    // 1 ms
            SubcarrierSpacing::Scs30 => 500,     // 0.5 ms
            SubcarrierSpacing::Scs60 => 250,     // 0.25 ms
            SubcarrierSpacing::Scs120 => 125,    // 0.125 ms
            SubcarrierSpacing::Scs240 => 62,     // 0.0625 ms (approximated)
        }
    }

    /// Convert a periodicity in whole milliseconds into slots, `None` on overflow
    pub fn ms_to_slots(period_ms: u32, scs: SubcarrierSpacing) -> Option<u32> {
        let slots = period_ms.checked_mul(scs.slots_per_subframe())?;
        trace!("{} ms -> {} slots at {:?}", period_ms, slots, scs);
        Some(slots)
    }
}
