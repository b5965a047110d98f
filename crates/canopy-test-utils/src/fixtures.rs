//! Reusable solve-step fixtures.
//!
//! - [`CountingPhysics`]: counts hook calls, with a tunable stability bound.
//! - [`RecordingWriter`]: keeps every frame in memory.
//! - [`FailingWriter`]: fails deterministically after N frames.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use canopy_core::{CellState, SolverFields};
use canopy_engine::{DomainContext, Physics};
use canopy_mesh::CellGeometry;
use canopy_output::{OutputError, OutputFrame, SolutionWriter, WriteStage};

/// Physics whose stability bound is `scale * edge_length` and whose flux
/// hook only counts.
pub struct CountingPhysics {
    pub scale: f64,
    bound_calls: AtomicUsize,
    flux_calls: AtomicUsize,
    self_fluxes: AtomicUsize,
}

impl CountingPhysics {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            bound_calls: AtomicUsize::new(0),
            flux_calls: AtomicUsize::new(0),
            self_fluxes: AtomicUsize::new(0),
        }
    }

    pub fn bound_calls(&self) -> usize {
        self.bound_calls.load(Ordering::Relaxed)
    }

    pub fn flux_calls(&self) -> usize {
        self.flux_calls.load(Ordering::Relaxed)
    }

    /// Flux calls where the neighbour state equalled the cell state before
    /// the call, as at a domain boundary.
    pub fn self_fluxes(&self) -> usize {
        self.self_fluxes.load(Ordering::Relaxed)
    }
}

impl Physics for CountingPhysics {
    fn name(&self) -> &str {
        "counting"
    }

    fn initial_state(&self, geometry: &CellGeometry, _ctx: &DomainContext) -> SolverFields {
        let [x, y, z] = geometry.midpoint;
        [1.0, x, y, z, f64::from(geometry.level)]
    }

    fn stability_bound(
        &self,
        _fields: &SolverFields,
        edge_length: f64,
        _ctx: &DomainContext,
    ) -> f64 {
        self.bound_calls.fetch_add(1, Ordering::Relaxed);
        self.scale * edge_length
    }

    fn exchange_flux(
        &self,
        cell: &mut CellState,
        neighbor: &CellState,
        _normal: [f64; 3],
        _ctx: &DomainContext,
    ) {
        self.flux_calls.fetch_add(1, Ordering::Relaxed);
        if cell.fields == neighbor.fields {
            self.self_fluxes.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Writer keeping every frame in memory. Clones share the same storage.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    frames: Arc<Mutex<Vec<OutputFrame>>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<OutputFrame> {
        self.frames.lock().expect("recording writer poisoned").clone()
    }

    pub fn stems(&self) -> Vec<String> {
        self.frames().into_iter().map(|f| f.stem).collect()
    }
}

impl SolutionWriter for RecordingWriter {
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
        frame.validate()?;
        self.frames
            .lock()
            .expect("recording writer poisoned")
            .push(frame.clone());
        Ok(())
    }
}

/// Writer that accepts `succeed` frames, then fails every later one at
/// `stage`.
pub struct FailingWriter {
    stage: WriteStage,
    remaining: usize,
}

impl FailingWriter {
    pub fn new(stage: WriteStage, succeed: usize) -> Self {
        Self {
            stage,
            remaining: succeed,
        }
    }
}

impl SolutionWriter for FailingWriter {
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(());
        }
        Err(OutputError::Stage {
            stage: self.stage,
            path: PathBuf::from(format!("{}_{:04}.vtu", frame.stem, frame.rank.0)),
            source: io::Error::other("injected failure"),
        })
    }
}
