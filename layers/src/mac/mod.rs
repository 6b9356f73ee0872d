//! Medium Access Control (MAC) Layer Implementation
//!
//! Implements the DU side of the 5G NR MAC according to 3GPP TS 38.321.
//! The uplink control resources of each UE (SR and periodic CSI on PUCCH,
//! TS 38.213 clause 9) are reserved by [`pucch::PucchResourceManager`].

pub mod pucch;

pub use pucch::{CellIndex, CellPucchAllocator, PucchCellConfig, PucchResourceManager, UeCellGroupConfig};
