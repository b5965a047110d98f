//! Canopy unit cube: the reference adaptive run.
//!
//! Builds a level-2 mesh of the unit cube, refines the spherical shell
//! `0.08 < r^2 < 0.2` about its center down to cells of 0.02, balances,
//! and partitions it over an in-process rank group. Each step reduces the
//! CFL timestep, tags boundary faces, and writes `solution_NN` VTK files;
//! between steps every cell is split once.
//!
//! Run with:
//!   cargo run --example unit_cube -- [RANKS] [STEPS] [OUTPUT_DIR]
//!
//! Set `RUST_LOG=debug` to see per-phase detail.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use canopy_comm::{Communicator, ProcessGroup};
use canopy_engine::{IdealGas, Simulation, SimulationConfig, SolveError};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_args() -> Result<(usize, SimulationConfig), String> {
    let mut args = std::env::args().skip(1);
    let ranks = match args.next() {
        Some(s) => s.parse().map_err(|e| format!("bad rank count {s:?}: {e}"))?,
        None => 2,
    };
    let mut config = SimulationConfig::default();
    if let Some(s) = args.next() {
        config.steps = s.parse().map_err(|e| format!("bad step count {s:?}: {e}"))?;
    }
    if let Some(dir) = args.next() {
        config.output_dir = PathBuf::from(dir);
    }
    Ok((ranks, config))
}

fn report(err: &dyn Error) {
    error!("{err}");
    let mut source = err.source();
    while let Some(cause) = source {
        error!("  caused by: {cause}");
        source = cause.source();
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_thread_names(true))
        .init();

    let (ranks, config) = match parse_args() {
        Ok(parsed) => parsed,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::from(2);
        }
    };
    let group = match ProcessGroup::new(ranks) {
        Ok(group) => group,
        Err(e) => {
            report(&e);
            return ExitCode::FAILURE;
        }
    };

    let results = group.run(|comm| {
        let root = comm.is_root();
        let writer = config.vtk_writer();
        let mut sim = Simulation::new(config.clone(), comm, IdealGas::new(config.cfl), writer)?;
        for outcome in sim.run()? {
            if root {
                info!(
                    step = %outcome.step,
                    dt = outcome.global_timestep,
                    cells = outcome.global_cells,
                    total_us = outcome.metrics.total_us,
                    "step done"
                );
            }
        }
        Ok::<_, SolveError>(())
    });

    let mut failed = false;
    match results {
        Ok(per_rank) => {
            for (rank, r) in per_rank.into_iter().enumerate() {
                if let Err(e) = r {
                    error!(rank, "rank failed");
                    report(&e);
                    failed = true;
                }
            }
        }
        Err(e) => {
            report(&e);
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        info!(dir = %config.output_dir.display(), "done");
        ExitCode::SUCCESS
    }
}
