//! Common Types for 5G GNodeB
//!
//! Defines fundamental types used throughout the protocol stack

use serde::{Deserialize, Serialize};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Radio Network Temporary Identifier (RNTI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rnti(pub u16);

impl Rnti {
    /// First C-RNTI handed out by the DU
    pub const MIN_CRNTI: Self = Self(0x4601);

    /// Create a new RNTI
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the RNTI value
    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Physical Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pci(pub u16);

impl Pci {
    /// Maximum valid PCI value (0-1007)
    pub const MAX: u16 = 1007;

    /// Create a new PCI with validation
    pub fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }
}

/// Subcarrier spacing values in kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive, Serialize, Deserialize)]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
    /// 240 kHz
    Scs240 = 240,
}

impl SubcarrierSpacing {
    /// Parse from a value in kHz
    pub fn from_khz(khz: u32) -> Option<Self> {
        Self::from_u32(khz)
    }

    /// Numerology index (mu)
    pub fn numerology(&self) -> u8 {
        match self {
            SubcarrierSpacing::Scs15 => 0,
            SubcarrierSpacing::Scs30 => 1,
            SubcarrierSpacing::Scs60 => 2,
            SubcarrierSpacing::Scs120 => 3,
            SubcarrierSpacing::Scs240 => 4,
        }
    }

    /// Number of slots in one 1 ms subframe
    pub fn slots_per_subframe(&self) -> u32 {
        1 << self.numerology()
    }
}

/// TDD UL/DL pattern
///
/// Slots of one pattern period are laid out as `dl_slots` downlink slots,
/// then `special_slots` mixed slots, then `ul_slots` uplink slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TddPattern {
    pub dl_slots: u8,
    pub special_slots: u8,
    pub ul_slots: u8,
}

impl TddPattern {
    /// Pattern periodicity in slots
    pub fn period_slots(&self) -> u32 {
        self.dl_slots as u32 + self.special_slots as u32 + self.ul_slots as u32
    }

    /// Whether every symbol of the given slot is uplink
    pub fn is_full_ul_slot(&self, slot: u32) -> bool {
        let period = self.period_slots();
        if period == 0 {
            return false;
        }
        let slot_in_period = slot % period;
        slot_in_period >= self.dl_slots as u32 + self.special_slots as u32
    }
}

/// Duplex mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplexMode {
    /// Frequency Division Duplex
    Fdd,
    /// Time Division Duplex
    Tdd { pattern: TddPattern },
}

impl DuplexMode {
    /// Whether PUCCH can be placed in the given slot
    pub fn is_ul_slot(&self, slot: u32) -> bool {
        match self {
            DuplexMode::Fdd => true,
            DuplexMode::Tdd { pattern } => pattern.is_full_ul_slot(slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_validation() {
        assert!(Pci::new(0).is_some());
        assert!(Pci::new(1007).is_some());
        assert!(Pci::new(1008).is_none());
    }

    #[test]
    fn test_scs_slots_per_subframe() {
        assert_eq!(SubcarrierSpacing::Scs15.slots_per_subframe(), 1);
        assert_eq!(SubcarrierSpacing::Scs30.slots_per_subframe(), 2);
        assert_eq!(SubcarrierSpacing::Scs120.slots_per_subframe(), 8);
        assert_eq!(SubcarrierSpacing::from_khz(60), Some(SubcarrierSpacing::Scs60));
        assert_eq!(SubcarrierSpacing::from_khz(45), None);
    }

    #[test]
    fn test_tdd_ul_slots() {
        // DDDSU
        let pattern = TddPattern { dl_slots: 3, special_slots: 1, ul_slots: 1 };
        assert_eq!(pattern.period_slots(), 5);
        let tdd = DuplexMode::Tdd { pattern };
        let ul: Vec<u32> = (0..10).filter(|s| tdd.is_ul_slot(*s)).collect();
        assert_eq!(ul, vec![4, 9]);
        assert!(DuplexMode::Fdd.is_ul_slot(3));
    }
}
