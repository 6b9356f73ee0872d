//! UE-side view of the periodic PUCCH resources
//!
//! Part of the UE cell group configuration owned by the DU UE resource
//! manager. The PUCCH resource manager fills and clears the SR and CSI
//! entries; the RRC layer later encodes them into the CellGroupConfig.

use common::types::Rnti;

/// SR resource of the UE PUCCH-Config (SchedulingRequestResourceConfig)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrResourceConfig {
    /// PUCCH resource id in the UE resource list
    pub pucch_res_id: u32,
    /// Slot offset within the SR period
    pub offset: u32,
    /// SR period in slots
    pub period_slots: u32,
}

/// Periodic CSI report on PUCCH (CSI-ReportConfig)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiReportConfig {
    /// PUCCH resource id in the UE resource list
    pub pucch_res_id: u32,
    /// Slot offset within the report period
    pub report_slot_offset: u32,
    /// Report period in slots
    pub period_slots: u32,
}

/// Periodic PUCCH reporting state of a UE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PucchReporting {
    /// No allocation attempted yet, or resources were returned
    #[default]
    NotConfigured,
    /// SR (and CSI, if the cell uses it) are reserved
    Configured,
    /// Allocation failed; the UE only gets HARQ-ACK PUCCH resources
    Disabled,
}

/// Cell group configuration entries touched by the PUCCH resource manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeCellGroupConfig {
    /// C-RNTI of the UE, for logging only
    pub rnti: Rnti,
    pub sr_resource: Option<SrResourceConfig>,
    pub csi_report: Option<CsiReportConfig>,
    pub pucch_reporting: PucchReporting,
}

impl UeCellGroupConfig {
    pub fn new(rnti: Rnti) -> Self {
        Self {
            rnti,
            sr_resource: None,
            csi_report: None,
            pucch_reporting: PucchReporting::NotConfigured,
        }
    }

    /// Whether the UE holds any periodic PUCCH resource
    pub fn has_pucch_resources(&self) -> bool {
        self.sr_resource.is_some() || self.csi_report.is_some()
    }

    /// Drop SR and CSI reporting; HARQ-ACK PUCCH is unaffected
    pub fn disable_periodic_pucch(&mut self) {
        self.sr_resource = None;
        self.csi_report = None;
        self.pucch_reporting = PucchReporting::Disabled;
    }

    pub(crate) fn clear_periodic_pucch(&mut self) {
        self.sr_resource = None;
        self.csi_report = None;
        self.pucch_reporting = PucchReporting::NotConfigured;
    }
}
