//! Albor Space DU PUCCH Resource Simulator
//!
//! Brings up the DU PUCCH SR/CSI resource manager from a cell configuration
//! file and drives a deterministic UE attach/reconfigure/detach workload,
//! one control task per cell.

mod config;

use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use common::types::{Rnti, SubcarrierSpacing};
use common::utils::time;
use config::DuConfig;
use layers::mac::pucch::{CellPucchAllocator, PucchReporting, PucchResourceManager, UeCellGroupConfig};

/// Albor Space DU PUCCH resource simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, default_value = "configs/du_pucch.yml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// UEs attached to every cell
    #[arg(long, default_value = "256")]
    ues_per_cell: u16,

    /// Detach every N-th UE after the attach phase (0 disables)
    #[arg(long, default_value = "4")]
    detach_every: u16,

    /// Reconfigure every N-th UE after the detach phase (0 disables)
    #[arg(long, default_value = "3")]
    reconfigure_every: u16,
}

/// Events handled by a cell control task
#[derive(Debug, Clone, Copy)]
enum UeEvent {
    Attach(Rnti),
    Reconfigure(Rnti),
    Detach(Rnti),
}

/// Per-cell outcome of the workload
#[derive(Debug)]
struct CellReport {
    cell_index: usize,
    scs: SubcarrierSpacing,
    nof_ues: usize,
    pucch_configured: usize,
    pucch_disabled: usize,
    sr_free: usize,
    csi_free: usize,
    cycle_len: u32,
    peak_grants: u32,
}

/// Control task of one cell. Owns the cell allocator and the UE configs.
async fn run_cell(
    mut cell: CellPucchAllocator,
    scs: SubcarrierSpacing,
    mut rx: mpsc::Receiver<UeEvent>,
) -> CellReport {
    let cell_index = cell.cell_index().value();
    let mut ues: HashMap<Rnti, UeCellGroupConfig> = HashMap::new();

    while let Some(event) = rx.recv().await {
        match event {
            UeEvent::Attach(rnti) => {
                let mut ue = UeCellGroupConfig::new(rnti);
                cell.allocate(&mut ue);
                ues.insert(rnti, ue);
            }
            UeEvent::Reconfigure(rnti) => {
                if let Some(ue) = ues.get_mut(&rnti) {
                    cell.deallocate(ue);
                    cell.allocate(ue);
                }
            }
            UeEvent::Detach(rnti) => {
                if let Some(mut ue) = ues.remove(&rnti) {
                    cell.deallocate(&mut ue);
                }
            }
        }
    }
    debug!("Cell {}: event channel closed", cell_index);

    let ctx = cell.context();
    CellReport {
        cell_index,
        scs,
        nof_ues: ues.len(),
        pucch_configured: ues.values().filter(|ue| ue.pucch_reporting == PucchReporting::Configured).count(),
        pucch_disabled: ues.values().filter(|ue| ue.pucch_reporting == PucchReporting::Disabled).count(),
        sr_free: ctx.sr_free().len(),
        csi_free: ctx.csi_free().len(),
        cycle_len: ctx.periods().cycle_len,
        peak_grants: ctx.grants().iter().copied().max().unwrap_or(0),
    }
}

/// Deterministic workload for one cell
fn workload(args: &Args, cell_index: usize) -> Vec<UeEvent> {
    // RNTIs only need to be unique within a cell.
    let base = Rnti::MIN_CRNTI.value().wrapping_add((cell_index as u16).wrapping_mul(args.ues_per_cell));
    let rntis: Vec<Rnti> = (0..args.ues_per_cell).map(|i| Rnti(base.wrapping_add(i))).collect();

    let mut events: Vec<UeEvent> = rntis.iter().map(|r| UeEvent::Attach(*r)).collect();
    if args.detach_every > 0 {
        events.extend(rntis.iter().step_by(args.detach_every as usize).map(|r| UeEvent::Detach(*r)));
    }
    if args.reconfigure_every > 0 {
        events.extend(rntis.iter().skip(1).step_by(args.reconfigure_every as usize).map(|r| UeEvent::Reconfigure(*r)));
    }
    events
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let du_config = DuConfig::from_file(&args.config)?;

    // Initialize logging
    let directive = args.log_level.clone().unwrap_or_else(|| du_config.log.filter_directive());
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&directive));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Albor Space DU PUCCH resource simulator");
    info!("Configuration file: {}", args.config);

    let mut cell_cfgs = Vec::with_capacity(du_config.cells.len());
    let mut cell_scs = Vec::with_capacity(du_config.cells.len());
    for (i, cell) in du_config.cells.iter().enumerate() {
        let pci = cell.pci()?;
        let scs = cell.scs()?;
        let pucch_cfg = cell.to_pucch_cell_config()?;
        info!("Cell {} configuration:", i);
        info!("  PCI: {}", pci.0);
        info!("  Subcarrier spacing: {} kHz", cell.common_scs);
        info!("  Duplex mode: {:?}", pucch_cfg.duplex_mode);
        info!("  SR period: {} slots", pucch_cfg.sr_period_slots);
        info!("  CSI report period: {:?} slots", pucch_cfg.csi_period_slots);
        info!("  Max PUCCH grants per slot: {}", pucch_cfg.max_pucch_grants_per_slot);
        cell_cfgs.push(pucch_cfg);
        cell_scs.push(scs);
    }

    let manager = PucchResourceManager::new(cell_cfgs)?;
    info!("PUCCH resource manager initialized for {} cells", manager.nof_cells());

    let mut handles = Vec::new();
    for (cell, scs) in manager.into_cells().into_iter().zip(cell_scs) {
        let events = workload(&args, cell.cell_index().value());
        let (tx, rx) = mpsc::channel(64);
        handles.push(tokio::spawn(run_cell(cell, scs, rx)));
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    error!("Cell control task stopped before the workload completed");
                    break;
                }
            }
        });
    }

    for handle in handles {
        let report = handle.await?;
        let cycle_ms = report.cycle_len as u64 * time::slot_duration_us(report.scs) as u64 / 1000;
        info!("Cell {} PUCCH statistics:", report.cell_index);
        info!("  UEs: {}, periodic PUCCH: {}, disabled: {}",
              report.nof_ues, report.pucch_configured, report.pucch_disabled);
        info!("  Free SR pairs: {}, free CSI pairs: {}", report.sr_free, report.csi_free);
        info!("  SR/CSI cycle: {} slots ({} ms), peak grants per slot: {}",
              report.cycle_len, cycle_ms, report.peak_grants);
    }

    info!("Simulation complete");
    Ok(())
}
