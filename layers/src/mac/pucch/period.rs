//! SR/CSI period reconciliation
//!
//! SR and CSI occasions recur with independent periods. Both patterns repeat
//! jointly over the least common multiple of the two periods (the shared
//! cycle), which is the window used for grant accounting and collision checks.

use std::collections::BTreeSet;

/// Greatest common divisor
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple of two periods.
///
/// Both periods must be non-zero.
pub fn shared_cycle(period_a: u32, period_b: u32) -> u32 {
    assert!(period_a > 0 && period_b > 0, "PUCCH periods must be non-zero");
    period_a / gcd(period_a, period_b) * period_b
}

/// All slots of one shared cycle at which an occasion with the given offset
/// and period recurs, in ascending order.
pub fn expand(offset: u32, period: u32, cycle_len: u32) -> impl Iterator<Item = u32> {
    debug_assert!(cycle_len % period == 0, "cycle must be a multiple of the period");
    ((offset % period)..cycle_len).step_by(period as usize)
}

/// Whether two periodic occasions ever land on the same slot.
///
/// Two sequences `a + k*Pa` and `b + m*Pb` meet iff `a ≡ b (mod gcd(Pa, Pb))`,
/// so no expansion is needed. The cycle length only has to be a common
/// multiple of both periods.
pub fn collides(sr_offset: u32, csi_offset: u32, sr_period: u32, csi_period: u32, cycle_len: u32) -> bool {
    debug_assert!(cycle_len % sr_period == 0 && cycle_len % csi_period == 0);
    let g = gcd(sr_period, csi_period);
    sr_offset % g == csi_offset % g
}

/// Period layout of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodLayout {
    /// SR period in slots
    pub sr_period: u32,
    /// CSI report period in slots, if CSI is configured
    pub csi_period: Option<u32>,
    /// Shared cycle length in slots
    pub cycle_len: u32,
}

impl PeriodLayout {
    pub fn new(sr_period: u32, csi_period: Option<u32>) -> Self {
        let cycle_len = match csi_period {
            Some(csi_period) => shared_cycle(sr_period, csi_period),
            None => sr_period,
        };
        Self { sr_period, csi_period, cycle_len }
    }

    /// Slots occupied by an SR occasion
    pub fn sr_slots(&self, sr_offset: u32) -> impl Iterator<Item = u32> {
        expand(sr_offset, self.sr_period, self.cycle_len)
    }

    /// Slots occupied by a CSI report occasion
    pub fn csi_slots(&self, csi_offset: u32) -> impl Iterator<Item = u32> {
        // Without CSI the iterator is empty.
        let period = self.csi_period.unwrap_or(self.cycle_len);
        let end = if self.csi_period.is_some() { self.cycle_len } else { 0 };
        ((csi_offset % period)..end).step_by(period as usize)
    }

    /// Whether `slot` is one of the SR occasions at `sr_offset`
    pub fn is_sr_slot(&self, sr_offset: u32, slot: u32) -> bool {
        slot % self.sr_period == sr_offset % self.sr_period
    }

    /// Whether the SR and CSI occasions of one device share a slot
    pub fn sr_csi_collide(&self, sr_offset: u32, csi_offset: u32) -> bool {
        match self.csi_period {
            Some(csi_period) => collides(sr_offset, csi_offset, self.sr_period, csi_period, self.cycle_len),
            None => false,
        }
    }

    /// Union of the SR and CSI slots of one device. Shared slots appear once.
    pub fn occupied_slots(&self, sr_offset: u32, csi_offset: Option<u32>) -> BTreeSet<u32> {
        let mut slots: BTreeSet<u32> = self.sr_slots(sr_offset).collect();
        if let Some(csi_offset) = csi_offset {
            slots.extend(self.csi_slots(csi_offset));
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_cycle() {
        assert_eq!(shared_cycle(40, 80), 80);
        assert_eq!(shared_cycle(20, 20), 20);
        assert_eq!(shared_cycle(10, 40), 40);
        assert_eq!(shared_cycle(40, 320), 320);
        assert_eq!(shared_cycle(5, 8), 40);
    }

    #[test]
    fn test_expand() {
        let slots: Vec<u32> = expand(3, 20, 80).collect();
        assert_eq!(slots, vec![3, 23, 43, 63]);

        let slots: Vec<u32> = expand(5, 80, 80).collect();
        assert_eq!(slots, vec![5]);
    }

    #[test]
    fn test_collides_matches_expansion() {
        let (sr_period, csi_period) = (10, 16);
        let cycle = shared_cycle(sr_period, csi_period);
        for sr in 0..sr_period {
            for csi in 0..csi_period {
                let sr_slots: BTreeSet<u32> = expand(sr, sr_period, cycle).collect();
                let brute = expand(csi, csi_period, cycle).any(|s| sr_slots.contains(&s));
                assert_eq!(collides(sr, csi, sr_period, csi_period, cycle), brute, "sr={} csi={}", sr, csi);
            }
        }
    }

    #[test]
    fn test_layout_without_csi() {
        let layout = PeriodLayout::new(40, None);
        assert_eq!(layout.cycle_len, 40);
        assert_eq!(layout.csi_slots(3).count(), 0);
        assert!(!layout.sr_csi_collide(3, 3));
        assert_eq!(layout.occupied_slots(7, None).into_iter().collect::<Vec<_>>(), vec![7]);
        assert!(layout.is_sr_slot(7, 7));
        assert!(!layout.is_sr_slot(7, 8));
    }

    #[test]
    fn test_occupied_slots_union() {
        let layout = PeriodLayout::new(40, Some(80));
        let slots: Vec<u32> = layout.occupied_slots(0, Some(2)).into_iter().collect();
        assert_eq!(slots, vec![0, 2, 40]);

        // Colliding offsets count once.
        let slots: Vec<u32> = layout.occupied_slots(0, Some(40)).into_iter().collect();
        assert_eq!(slots, vec![0, 40]);
    }
}
