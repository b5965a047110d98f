//! The physics layer: initial state, stability bound, and flux hook.

use canopy_core::{CellState, SolverFields};
use canopy_mesh::CellGeometry;

use crate::context::DomainContext;

/// Cell-local physics plugged into the solve step.
///
/// # Contract
///
/// - [`stability_bound`](Self::stability_bound) is finite and positive for
///   any state produced by this physics, grows with `edge_length`, and
///   never grows when a cell is refined.
/// - [`exchange_flux`](Self::exchange_flux) is called once per
///   (cell, face-neighbour) pair in the neighbour pass. At a domain
///   boundary the neighbour is the cell itself.
pub trait Physics {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Solver fields of a freshly created cell.
    fn initial_state(&self, geometry: &CellGeometry, ctx: &DomainContext) -> SolverFields;

    /// Largest stable timestep for a cell of `edge_length` holding
    /// `fields`.
    fn stability_bound(
        &self,
        fields: &SolverFields,
        edge_length: f64,
        ctx: &DomainContext,
    ) -> f64;

    /// Update `cell` with the flux across the face with outward `normal`
    /// shared with `neighbor`, over the step's global timestep.
    fn exchange_flux(
        &self,
        cell: &mut CellState,
        neighbor: &CellState,
        normal: [f64; 3],
        ctx: &DomainContext,
    );
}

/// Compressible ideal gas with conserved variables
/// `[rho, rho*u, rho*v, rho*w, E]`.
///
/// The stability bound is `cfl * h / (|u| + c)` with sound speed
/// `c = sqrt(gamma * p / rho)`. The flux exchange is a placeholder that
/// leaves the state untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct IdealGas {
    cfl: f64,
}

impl IdealGas {
    /// Ideal gas with Courant number `cfl`.
    pub fn new(cfl: f64) -> Self {
        Self { cfl }
    }

    /// Courant number.
    pub fn cfl(&self) -> f64 {
        self.cfl
    }

    /// Velocity magnitude and pressure of `fields`.
    pub fn primitives(fields: &SolverFields, gamma: f64) -> (f64, f64) {
        let [rho, mx, my, mz, e] = *fields;
        let speed = (mx * mx + my * my + mz * mz).sqrt() / rho;
        let pressure = (gamma - 1.0) * (e - 0.5 * rho * speed * speed);
        (speed, pressure)
    }
}

impl Default for IdealGas {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Physics for IdealGas {
    fn name(&self) -> &str {
        "ideal-gas"
    }

    fn initial_state(&self, _geometry: &CellGeometry, ctx: &DomainContext) -> SolverFields {
        let (rho, p) = (1.0, 1.0);
        [rho, 0.0, 0.0, 0.0, p / (ctx.adiabatic_index - 1.0)]
    }

    fn stability_bound(
        &self,
        fields: &SolverFields,
        edge_length: f64,
        ctx: &DomainContext,
    ) -> f64 {
        let gamma = ctx.adiabatic_index;
        let (speed, pressure) = Self::primitives(fields, gamma);
        let sound = (gamma * pressure / fields[0]).sqrt();
        self.cfl * edge_length / (speed + sound)
    }

    fn exchange_flux(
        &self,
        _cell: &mut CellState,
        _neighbor: &CellState,
        _normal: [f64; 3],
        _ctx: &DomainContext,
    ) {
        // TODO: finite-volume flux across the face.
    }
}
