//! YAML Configuration Structures for srsRAN-compatible format
//!
//! Only the DU cell parameters that drive PUCCH SR/CSI resource allocation
//! are modelled here.

use anyhow::{anyhow, bail};
use common::types::{DuplexMode, Pci, SubcarrierSpacing, TddPattern};
use common::utils::time;
use layers::mac::pucch::{
    generate_resource_list, PucchCellConfig, PucchResourceLayout, ResourcePool, SrCsiCollisionPolicy,
    SrSelectionPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// SR periodicities allowed by TS 38.331 SchedulingRequestResourceConfig, in slots
const VALID_SR_PERIODS_SLOTS: [u32; 13] = [1, 2, 4, 5, 8, 10, 16, 20, 40, 80, 160, 320, 640];

/// CSI-ReportPeriodicityAndOffset values, in slots
const VALID_CSI_PERIODS_SLOTS: [u32; 10] = [4, 5, 8, 10, 16, 20, 40, 80, 160, 320];

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DuConfig {
    /// Cells served by the DU, in cell index order
    pub cells: Vec<CellConfig>,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Cell configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CellConfig {
    /// Physical Cell ID
    pub pci: u16,
    /// Common subcarrier spacing in kHz
    pub common_scs: u32,
    /// TDD pattern; FDD when absent
    #[serde(default)]
    pub tdd_ul_dl_cfg: Option<TddUlDlConfig>,
    /// PUCCH configuration
    #[serde(default)]
    pub pucch: PucchConfig,
}

/// TDD UL/DL pattern configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TddUlDlConfig {
    /// Pattern period in slots
    pub dl_ul_tx_period: u8,
    /// Full DL slots at the start of the period
    pub nof_dl_slots: u8,
    /// Full UL slots at the end of the period
    pub nof_ul_slots: u8,
}

/// PUCCH configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PucchConfig {
    /// SR period in milliseconds
    #[serde(default = "default_sr_period_ms")]
    pub sr_period_ms: u32,
    /// CSI report period in milliseconds; no periodic CSI when null
    #[serde(default = "default_csi_report_period_ms")]
    pub csi_report_period_ms: Option<u32>,
    /// PUCCH F1 resources for SR in the cell
    #[serde(default = "default_f1_nof_cell_res_sr")]
    pub f1_nof_cell_res_sr: u32,
    /// PUCCH F2 resources for CSI in the cell
    #[serde(default = "default_f2_nof_cell_res_csi")]
    pub f2_nof_cell_res_csi: u32,
    /// PUCCH F1 HARQ-ACK resources per UE resource set
    #[serde(default = "default_nof_ue_res_harq")]
    pub nof_ue_pucch_f1_res_harq: u32,
    /// PUCCH F2 HARQ-ACK resources per UE resource set
    #[serde(default = "default_nof_ue_res_harq")]
    pub nof_ue_pucch_f2_res_harq: u32,
    /// HARQ-ACK resource sets of the cell
    #[serde(default = "default_nof_cell_harq_pucch_res_sets")]
    pub nof_cell_harq_pucch_res_sets: u32,
    /// PUCCH grants per slot, HARQ-ACK included
    #[serde(default = "default_max_pucchs_per_slot")]
    pub max_pucchs_per_slot: u32,
    /// Maximum UCI payload of a PUCCH F2 resource
    #[serde(default = "default_f2_max_payload_bits")]
    pub f2_max_payload_bits: u32,
    /// SR payload in bits
    #[serde(default = "default_sr_payload_bits")]
    pub sr_payload_bits: u32,
    /// CSI report payload in bits
    #[serde(default = "default_csi_payload_bits")]
    pub csi_payload_bits: u32,
    /// Whether SR may share a slot with the UE's CSI report
    #[serde(default)]
    pub sr_csi_collision: SrCsiCollisionPolicy,
    /// How the SR resource of a new UE is picked
    #[serde(default)]
    pub sr_selection: SrSelectionPolicy,
}

impl Default for PucchConfig {
    fn default() -> Self {
        Self {
            sr_period_ms: default_sr_period_ms(),
            csi_report_period_ms: default_csi_report_period_ms(),
            f1_nof_cell_res_sr: default_f1_nof_cell_res_sr(),
            f2_nof_cell_res_csi: default_f2_nof_cell_res_csi(),
            nof_ue_pucch_f1_res_harq: default_nof_ue_res_harq(),
            nof_ue_pucch_f2_res_harq: default_nof_ue_res_harq(),
            nof_cell_harq_pucch_res_sets: default_nof_cell_harq_pucch_res_sets(),
            max_pucchs_per_slot: default_max_pucchs_per_slot(),
            f2_max_payload_bits: default_f2_max_payload_bits(),
            sr_payload_bits: default_sr_payload_bits(),
            csi_payload_bits: default_csi_payload_bits(),
            sr_csi_collision: SrCsiCollisionPolicy::default(),
            sr_selection: SrSelectionPolicy::default(),
        }
    }
}

fn default_sr_period_ms() -> u32 {
    20
}

fn default_csi_report_period_ms() -> Option<u32> {
    Some(40)
}

fn default_f1_nof_cell_res_sr() -> u32 {
    10
}

fn default_f2_nof_cell_res_csi() -> u32 {
    7
}

fn default_nof_ue_res_harq() -> u32 {
    6
}

fn default_nof_cell_harq_pucch_res_sets() -> u32 {
    2
}

fn default_max_pucchs_per_slot() -> u32 {
    31
}

fn default_f2_max_payload_bits() -> u32 {
    11
}

fn default_sr_payload_bits() -> u32 {
    1
}

fn default_csi_payload_bits() -> u32 {
    4
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// All layers log level
    #[serde(default = "default_log_level")]
    pub all_level: String,
    /// MAC layer log level
    #[serde(default = "default_log_level")]
    pub mac_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            all_level: default_log_level(),
            mac_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LogConfig {
    /// EnvFilter directive built from the per-layer levels
    pub fn filter_directive(&self) -> String {
        format!("{},layers::mac={}", self.all_level, self.mac_level)
    }
}

impl DuConfig {
    /// Load configuration from a YAML or TOML file, picked by extension
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: DuConfig = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)?,
            "toml" => toml::from_str(&contents)?,
            _ => bail!("Unsupported configuration format: {}", path),
        };
        if config.cells.is_empty() {
            bail!("No cell configured in {}", path);
        }
        Ok(config)
    }
}

impl CellConfig {
    /// Validated PCI
    pub fn pci(&self) -> anyhow::Result<Pci> {
        Pci::new(self.pci).ok_or_else(|| anyhow!("Invalid PCI: {}", self.pci))
    }

    /// Validated subcarrier spacing
    pub fn scs(&self) -> anyhow::Result<SubcarrierSpacing> {
        SubcarrierSpacing::from_khz(self.common_scs)
            .ok_or_else(|| anyhow!("Invalid subcarrier spacing: {} kHz", self.common_scs))
    }

    /// Duplex mode derived from the TDD pattern
    pub fn duplex_mode(&self) -> anyhow::Result<DuplexMode> {
        let tdd = match &self.tdd_ul_dl_cfg {
            Some(tdd) => tdd,
            None => return Ok(DuplexMode::Fdd),
        };
        let full_slots = tdd.nof_dl_slots as u32 + tdd.nof_ul_slots as u32;
        if full_slots > tdd.dl_ul_tx_period as u32 {
            bail!(
                "TDD pattern with {} DL + {} UL slots does not fit a {} slot period",
                tdd.nof_dl_slots, tdd.nof_ul_slots, tdd.dl_ul_tx_period
            );
        }
        Ok(DuplexMode::Tdd {
            pattern: TddPattern {
                dl_slots: tdd.nof_dl_slots,
                special_slots: tdd.dl_ul_tx_period - tdd.nof_dl_slots - tdd.nof_ul_slots,
                ul_slots: tdd.nof_ul_slots,
            },
        })
    }

    /// Translate into the PUCCH resource manager cell configuration
    pub fn to_pucch_cell_config(&self) -> anyhow::Result<PucchCellConfig> {
        let scs = self.scs()?;
        let pucch = &self.pucch;

        let sr_period_slots = match time::ms_to_slots(pucch.sr_period_ms, scs) {
            Some(slots) if VALID_SR_PERIODS_SLOTS.contains(&slots) => slots,
            _ => bail!("SR period of {} ms is not supported at {} kHz", pucch.sr_period_ms, self.common_scs),
        };
        let csi_period_slots = match pucch.csi_report_period_ms {
            Some(ms) => match time::ms_to_slots(ms, scs) {
                Some(slots) if VALID_CSI_PERIODS_SLOTS.contains(&slots) => Some(slots),
                _ => bail!("CSI report period of {} ms is not supported at {} kHz", ms, self.common_scs),
            },
            None => None,
        };

        let layout = PucchResourceLayout {
            nof_harq_f1_resources: pucch.nof_ue_pucch_f1_res_harq * pucch.nof_cell_harq_pucch_res_sets,
            nof_sr_resources: pucch.f1_nof_cell_res_sr,
            nof_harq_f2_resources: pucch.nof_ue_pucch_f2_res_harq * pucch.nof_cell_harq_pucch_res_sets,
            nof_csi_resources: if csi_period_slots.is_some() { pucch.f2_nof_cell_res_csi } else { 0 },
        };

        let cfg = PucchCellConfig {
            resources: generate_resource_list(&layout, pucch.sr_payload_bits, pucch.csi_payload_bits),
            layout,
            sr_period_slots,
            csi_period_slots,
            max_pucch_grants_per_slot: pucch.max_pucchs_per_slot,
            max_payload_bits: pucch.f2_max_payload_bits,
            duplex_mode: self.duplex_mode()?,
            sr_pool: ResourcePool::AllOffsets,
            csi_pool: ResourcePool::AllOffsets,
            sr_csi_policy: pucch.sr_csi_collision,
            sr_selection: pucch.sr_selection,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
cells:
  - pci: 1
    common_scs: 30
    tdd_ul_dl_cfg:
      dl_ul_tx_period: 10
      nof_dl_slots: 6
      nof_ul_slots: 3
    pucch:
      sr_period_ms: 20
      csi_report_period_ms: 40
      max_pucchs_per_slot: 8
      sr_selection: first_fit
  - pci: 2
    common_scs: 15
    pucch:
      csi_report_period_ms: null
log:
  mac_level: debug
"#;

    #[test]
    fn test_parse_yaml() {
        let config: DuConfig = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(config.cells.len(), 2);
        assert_eq!(config.cells[0].pucch.max_pucchs_per_slot, 8);
        assert_eq!(config.cells[0].pucch.f1_nof_cell_res_sr, 10);
        assert!(config.cells[1].pucch.csi_report_period_ms.is_none());
        assert_eq!(config.log.all_level, "info");
        assert_eq!(config.log.filter_directive(), "info,layers::mac=debug");
    }

    #[test]
    fn test_translate_tdd_cell() {
        let config: DuConfig = serde_yaml::from_str(YAML).unwrap();
        let cfg = config.cells[0].to_pucch_cell_config().unwrap();
        assert_eq!(cfg.sr_period_slots, 40);
        assert_eq!(cfg.csi_period_slots, Some(80));
        assert_eq!(cfg.layout.nof_harq_f1_resources, 12);
        assert_eq!(cfg.sr_selection, SrSelectionPolicy::FirstFit);
        assert_eq!(cfg.resources.len(), 12 + 10 + 12 + 7);
        assert_eq!(
            cfg.duplex_mode,
            DuplexMode::Tdd { pattern: TddPattern { dl_slots: 6, special_slots: 1, ul_slots: 3 } }
        );
    }

    #[test]
    fn test_translate_fdd_cell_without_csi() {
        let config: DuConfig = serde_yaml::from_str(YAML).unwrap();
        let cfg = config.cells[1].to_pucch_cell_config().unwrap();
        assert_eq!(cfg.sr_period_slots, 20);
        assert_eq!(cfg.csi_period_slots, None);
        assert_eq!(cfg.layout.nof_csi_resources, 0);
        assert_eq!(cfg.duplex_mode, DuplexMode::Fdd);
        assert_eq!(cfg.sr_selection, SrSelectionPolicy::Rotation);
    }

    #[test]
    fn test_reject_bad_periods() {
        let mut cell: CellConfig = serde_yaml::from_str("pci: 1\ncommon_scs: 15\n").unwrap();
        cell.pucch.sr_period_ms = 3;
        assert!(cell.to_pucch_cell_config().is_err());

        cell.pucch.sr_period_ms = u32::MAX;
        assert!(cell.to_pucch_cell_config().is_err());

        cell.pucch.sr_period_ms = 20;
        cell.pucch.csi_report_period_ms = Some(1);
        assert!(cell.to_pucch_cell_config().is_err());

        cell.pucch.csi_report_period_ms = Some(u32::MAX);
        assert!(cell.to_pucch_cell_config().is_err());

        cell.common_scs = 45;
        assert!(cell.to_pucch_cell_config().is_err());
    }

    #[test]
    fn test_reject_tdd_period_mismatch() {
        // 5 ms SR at 30 kHz is 10 slots against an 8 slot TDD period.
        let yaml = "pci: 1\ncommon_scs: 30\ntdd_ul_dl_cfg:\n  dl_ul_tx_period: 8\n  nof_dl_slots: 5\n  nof_ul_slots: 2\npucch:\n  sr_period_ms: 5\n  csi_report_period_ms: null\n";
        let mut cell: CellConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cell.to_pucch_cell_config().is_err());

        cell.pucch.sr_period_ms = 4;
        assert_eq!(cell.to_pucch_cell_config().unwrap().sr_period_slots, 8);
    }

    #[test]
    fn test_parse_toml() {
        let toml_cfg = r#"
[[cells]]
pci = 3
common_scs = 30

[cells.pucch]
sr_period_ms = 10
"#;
        let config: DuConfig = toml::from_str(toml_cfg).unwrap();
        let cfg = config.cells[0].to_pucch_cell_config().unwrap();
        assert_eq!(cfg.sr_period_slots, 20);
        assert_eq!(cfg.csi_period_slots, Some(80));
    }
}
