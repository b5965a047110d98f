//! Integration tests: the solve step across in-process rank groups.
//!
//! Each rank builds the same randomly adapted mesh, runs one step through
//! the coordinator, and reports what it saw; the assertions compare the
//! reports across ranks.

use canopy_comm::{CommError, Communicator, GroupComm, ProcessGroup};
use canopy_core::{CellState, Face, StepIndex};
use canopy_engine::{
    DomainContext, Physics, SolveError, SolveStepCoordinator, StepOutcome, StepPhase,
    BOUNDARY_FIELD,
};
use canopy_mesh::{Connectivity, CubeDomain, Forest, MeshError, Octant};
use canopy_output::WriteStage;
use canopy_test_utils::{CountingPhysics, FailingWriter, RandomRefinement, RecordingWriter};

fn run<R: Send>(ranks: usize, f: impl Fn(GroupComm) -> R + Sync) -> Vec<R> {
    ProcessGroup::new(ranks).unwrap().run(f).unwrap()
}

fn adapted_forest(
    comm: &GroupComm,
    physics: &CountingPhysics,
    seed: u64,
) -> Result<Forest<CellState>, MeshError> {
    let ctx = DomainContext::default();
    let domain = CubeDomain::unit();
    let mut init =
        |o: &Octant| CellState::new(physics.initial_state(&domain.geometry(o), &ctx));
    let rr = RandomRefinement::new(seed, 0.3, 4);
    let mut f = Forest::new_uniform(comm, domain, 2, &mut init)?;
    f.refine(comm, true, |o: &Octant| rr.select(o), &mut init)?;
    f.balance(comm, Connectivity::Full, &mut init)?;
    f.partition(comm)?;
    Ok(f)
}

struct Report {
    outcome: StepOutcome,
    flux_calls: usize,
    self_fluxes: usize,
    masks_match: bool,
    frame_cells: usize,
    field_values: Vec<[f64; 8]>,
    local_count: usize,
}

fn one_step(comm: GroupComm, seed: u64) -> Result<Report, SolveError> {
    let physics = CountingPhysics::new(1.0 + comm.rank().0 as f64);
    let mut forest = adapted_forest(&comm, &physics, seed).map_err(SolveError::Setup)?;
    let mut ctx = DomainContext::default();
    let mut writer = RecordingWriter::new();
    let outcome = SolveStepCoordinator::new(&comm, &physics).run(
        StepIndex(0),
        &mut forest,
        &mut ctx,
        &mut writer,
    )?;

    let domain = *forest.domain();
    let masks_match = forest.leaves().iter().all(|leaf| {
        Face::ALL.iter().all(|&face| {
            leaf.data.boundary.contains(face) == domain.is_boundary_face(leaf.octant(), face)
        })
    });
    let frames = writer.frames();
    let field = frames[0]
        .corner_fields
        .iter()
        .find(|f| f.name == BOUNDARY_FIELD)
        .map(|f| f.values.clone())
        .unwrap_or_default();
    Ok(Report {
        outcome,
        flux_calls: physics.flux_calls(),
        self_fluxes: physics.self_fluxes(),
        masks_match,
        frame_cells: frames[0].cells.len(),
        field_values: field,
        local_count: forest.local_count(),
    })
}

#[test]
fn global_timestep_is_the_minimum_of_local_bounds() {
    let reports: Vec<Report> = run(4, |comm| one_step(comm, 17))
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let dt = reports[0].outcome.global_timestep;
    let smallest_local = reports
        .iter()
        .map(|r| r.outcome.metrics.local_timestep)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(dt, smallest_local);
    for r in &reports {
        assert_eq!(r.outcome.global_timestep, dt);
        assert!(dt <= r.outcome.metrics.local_timestep);
    }
}

#[test]
fn boundary_masks_match_geometry_on_every_rank() {
    for r in run(3, |comm| one_step(comm, 29)) {
        let r = r.unwrap();
        assert!(r.masks_match);
        assert_eq!(r.outcome.metrics.boundary_tags, r.self_fluxes);
    }
}

#[test]
fn flux_hook_runs_once_per_neighbour_entry() {
    let reports: Vec<Report> = run(4, |comm| one_step(comm, 3))
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let mut ghosts = 0;
    for r in &reports {
        assert_eq!(r.outcome.metrics.flux_calls, r.flux_calls);
        // at least one entry per face
        assert!(r.flux_calls >= 6 * r.local_count);
        ghosts += r.outcome.metrics.ghost_cells;
    }
    assert!(ghosts > 0);
}

#[test]
fn each_rank_writes_its_own_cells() {
    let reports: Vec<Report> = run(4, |comm| one_step(comm, 41))
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let total: usize = reports.iter().map(|r| r.frame_cells).sum();
    assert_eq!(total as u64, reports[0].outcome.global_cells);
    for r in &reports {
        assert_eq!(r.frame_cells, r.local_count);
        assert_eq!(r.field_values.len(), r.local_count);
        for v in &r.field_values {
            assert!(v.iter().all(|&x| x == v[0]));
            assert!(v[0] == -1.0 || (1.0..64.0).contains(&v[0]));
        }
    }
}

#[test]
fn writer_failure_names_the_stage() {
    let results = run(2, |comm| {
        let physics = CountingPhysics::new(1.0);
        let mut forest = adapted_forest(&comm, &physics, 5).map_err(SolveError::Setup)?;
        let mut ctx = DomainContext::default();
        let mut writer = FailingWriter::new(WriteStage::PointData, 0);
        SolveStepCoordinator::new(&comm, &physics).run(
            StepIndex(0),
            &mut forest,
            &mut ctx,
            &mut writer,
        )
    });
    for r in results {
        let err = r.unwrap_err();
        assert!(matches!(err, SolveError::Output { ref stem, .. } if stem == "solution_00"));
        assert!(err.to_string().contains("point data"), "{err}");
    }
}

#[test]
fn departed_rank_fails_the_step() {
    let results = run(2, |comm| {
        let physics = CountingPhysics::new(1.0);
        let domain = CubeDomain::unit();
        let mut forest = Forest::new_uniform(&comm, domain, 2, |_: &Octant| CellState::default())
            .map_err(SolveError::Setup)?;
        if comm.rank().0 == 1 {
            return Ok(None);
        }
        let mut ctx = DomainContext::default();
        let mut writer = RecordingWriter::new();
        SolveStepCoordinator::new(&comm, &physics)
            .run(StepIndex(0), &mut forest, &mut ctx, &mut writer)
            .map(Some)
    });
    assert!(matches!(results[1], Ok(None)));
    assert!(matches!(
        results[0],
        Err(SolveError::Comm {
            phase: StepPhase::BuildGhostLayer,
            source: CommError::PeerDisconnected { .. },
        })
    ));
}
