//! The simulation driver.
//!
//! [`Simulation`] owns one rank's share of the run: it builds the initial
//! adapted mesh, runs solve steps, and regrids between them.

use std::time::Instant;

use canopy_comm::Communicator;
use canopy_core::{CellState, StepIndex};
use canopy_mesh::{Forest, MeshError, Octant};
use canopy_output::{SolutionWriter, TimingRecord};
use tracing::info;

use crate::config::SimulationConfig;
use crate::context::DomainContext;
use crate::error::SolveError;
use crate::physics::Physics;
use crate::policy::{BandRefinement, RefineAlways, RefinementPolicy};
use crate::step::{mesh_frame, SolveStepCoordinator, StepOutcome};

/// Stem of the frame written after mesh construction.
pub const INIT_STEM: &str = "init";

/// One rank of a running simulation.
///
/// Construction and every step are collective: all ranks of `comm` must
/// build their `Simulation` from the same configuration and step it the
/// same number of times.
pub struct Simulation<C, P, W> {
    config: SimulationConfig,
    ctx: DomainContext,
    forest: Forest<CellState>,
    comm: C,
    physics: P,
    writer: W,
    steps_done: u32,
}

impl<C, P, W> Simulation<C, P, W>
where
    C: Communicator,
    P: Physics,
    W: SolutionWriter,
{
    /// Build the initial mesh and write the `init` frame.
    ///
    /// Starts from a uniform mesh at `min_level`, refines the band about
    /// the center recursively, balances, and repartitions. Rank 0 records
    /// the elapsed time in `init.time`.
    pub fn new(
        config: SimulationConfig,
        comm: C,
        physics: P,
        mut writer: W,
    ) -> Result<Self, SolveError> {
        config.validate()?;
        let start = Instant::now();
        let ctx = DomainContext::from_config(&config);
        let domain = config.domain;
        let mut init =
            |o: &Octant| CellState::new(physics.initial_state(&domain.geometry(o), &ctx));

        let mut forest = Forest::new_uniform(&comm, domain, config.min_level, &mut init)
            .map_err(SolveError::Setup)?;
        let band = BandRefinement::from_context(&ctx);
        let split = forest
            .refine(
                &comm,
                true,
                |o: &Octant| band.should_refine(&domain.geometry(o)),
                &mut init,
            )
            .map_err(SolveError::Setup)?;
        let rounds = forest
            .balance(&comm, config.balance, &mut init)
            .map_err(SolveError::Setup)?;
        let moved = forest.partition(&comm).map_err(SolveError::Setup)?;

        writer
            .write_frame(&mesh_frame(&forest, INIT_STEM))
            .map_err(|source| SolveError::Output {
                stem: INIT_STEM.to_owned(),
                source,
            })?;
        if comm.is_root() {
            TimingRecord::Init
                .write(&config.output_dir, start.elapsed())
                .map_err(SolveError::Timing)?;
        }
        info!(
            rank = comm.rank().0,
            physics = physics.name(),
            split,
            balance_rounds = rounds,
            moved,
            local_cells = forest.local_count(),
            global_cells = forest.global_count(),
            "initial mesh ready"
        );

        Ok(Self {
            config,
            ctx,
            forest,
            comm,
            physics,
            writer,
            steps_done: 0,
        })
    }

    /// Run the next solve step.
    ///
    /// Rank 0 records the step's elapsed time. Unless this was the last
    /// configured step, every leaf is then split once and the forest is
    /// repartitioned.
    pub fn step(&mut self) -> Result<StepOutcome, SolveError> {
        let step = StepIndex(self.steps_done);
        let start = Instant::now();
        let outcome = SolveStepCoordinator::new(&self.comm, &self.physics).run(
            step,
            &mut self.forest,
            &mut self.ctx,
            &mut self.writer,
        )?;
        if self.comm.is_root() {
            TimingRecord::Solution(step)
                .write(&self.config.output_dir, start.elapsed())
                .map_err(SolveError::Timing)?;
        }
        self.steps_done += 1;

        if self.steps_done < self.config.steps {
            self.regrid()
                .map_err(|source| SolveError::Regrid { step, source })?;
        }
        Ok(outcome)
    }

    /// Run every remaining configured step.
    pub fn run(&mut self) -> Result<Vec<StepOutcome>, SolveError> {
        let mut outcomes = Vec::new();
        while self.steps_done < self.config.steps {
            outcomes.push(self.step()?);
        }
        Ok(outcomes)
    }

    fn regrid(&mut self) -> Result<(), MeshError> {
        let domain = *self.forest.domain();
        let physics = &self.physics;
        let ctx = &self.ctx;
        let before = self.forest.global_count();
        self.forest.refine(
            &self.comm,
            false,
            |o: &Octant| RefineAlways.should_refine(&domain.geometry(o)),
            |o: &Octant| CellState::new(physics.initial_state(&domain.geometry(o), ctx)),
        )?;
        self.forest.partition(&self.comm)?;
        info!(
            rank = self.comm.rank().0,
            before,
            after = self.forest.global_count(),
            "regridded"
        );
        Ok(())
    }

    /// The validated configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Shared parameters and the most recent global timestep.
    pub fn context(&self) -> &DomainContext {
        &self.ctx
    }

    /// This rank's forest.
    pub fn forest(&self) -> &Forest<CellState> {
        &self.forest
    }

    /// The communicator.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// The output writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Number of solve steps completed.
    pub fn steps_done(&self) -> u32 {
        self.steps_done
    }

    /// Consume the simulation, returning its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_comm::SerialComm;
    use canopy_output::{OutputError, OutputFrame};

    use crate::physics::IdealGas;

    #[derive(Default)]
    struct Stems(Vec<(String, usize)>);

    impl SolutionWriter for Stems {
        fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
            self.0.push((frame.stem.clone(), frame.cells.len()));
            Ok(())
        }
    }

    fn config(dir: &std::path::Path) -> SimulationConfig {
        SimulationConfig {
            min_cell_size: 0.1,
            output_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_config_fails_before_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SimulationConfig {
            cfl: 2.0,
            ..config(dir.path())
        };
        let r = Simulation::new(cfg, SerialComm::new(), IdealGas::default(), Stems::default());
        assert!(matches!(r, Err(SolveError::Config(_))));
        assert!(!dir.path().join("init.time").exists());
    }

    #[test]
    fn two_steps_split_every_leaf_once() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SimulationConfig {
            steps: 2,
            ..config(dir.path())
        };
        let mut sim =
            Simulation::new(cfg, SerialComm::new(), IdealGas::default(), Stems::default())
                .unwrap();
        let initial = sim.forest().global_count();
        let outcomes = sim.run().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].global_cells, initial);
        assert_eq!(outcomes[1].global_cells, initial * 8);
        assert!(outcomes[1].global_timestep < outcomes[0].global_timestep);
        assert_eq!(sim.steps_done(), 2);

        let stems: Vec<_> = sim.writer().0.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(stems, ["init", "solution_00", "solution_01"]);
        assert!(dir.path().join("init.time").exists());
        assert!(dir.path().join("solution_01.time").exists());
    }

    #[test]
    fn last_step_does_not_regrid() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = Simulation::new(
            config(dir.path()),
            SerialComm::new(),
            IdealGas::default(),
            Stems::default(),
        )
        .unwrap();
        let before = sim.forest().global_count();
        sim.step().unwrap();
        assert_eq!(sim.forest().global_count(), before);
        assert!(sim.run().unwrap().is_empty());
    }
}
