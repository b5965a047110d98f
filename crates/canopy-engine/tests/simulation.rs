//! End-to-end: build, step, and regrid a simulation on several ranks,
//! writing real files into a temporary directory.

use std::fs;

use canopy_comm::{Communicator, ProcessGroup};
use canopy_engine::{IdealGas, Simulation, SimulationConfig, SolveError};
use canopy_output::WriteStage;
use canopy_test_utils::{small_config, FailingWriter, RecordingWriter};

#[test]
fn two_steps_on_three_ranks() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig {
        steps: 2,
        ..small_config(dir.path())
    };
    let group = ProcessGroup::new(3).unwrap();
    let results = group
        .run(|comm| {
            let writer = config.vtk_writer();
            let mut sim = Simulation::new(config.clone(), comm, IdealGas::default(), writer)?;
            let local_init = sim.forest().local_count() as u64;
            let global_init = sim.forest().global_count();
            let outcomes = sim.run()?;
            let local_after = sim.forest().local_count() as u64;
            Ok::<_, SolveError>((local_init, global_init, outcomes, local_after))
        })
        .unwrap();

    let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    let global_init = results[0].1;
    assert_eq!(results.iter().map(|r| r.0).sum::<u64>(), global_init);
    for (_, g, outcomes, _) in &results {
        assert_eq!(*g, global_init);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].global_cells, global_init);
        assert_eq!(outcomes[1].global_cells, global_init * 8);
    }
    assert_eq!(
        results.iter().map(|r| r.3).sum::<u64>(),
        global_init * 8,
        "partition after regrid keeps every leaf"
    );
    let dt0 = results[0].2[0].global_timestep;
    assert!(results.iter().all(|r| r.2[0].global_timestep == dt0));

    for stem in ["init", "solution_00", "solution_01"] {
        assert!(dir.path().join(format!("{stem}.pvtu")).is_file(), "{stem}");
        for rank in 0..3 {
            let piece = dir.path().join(format!("{stem}_{rank:04}.vtu"));
            assert!(piece.is_file(), "{}", piece.display());
        }
    }
    let init_piece = fs::read_to_string(dir.path().join("init_0000.vtu")).unwrap();
    assert!(!init_piece.contains("Name=\"boundary\""));
    let step_piece = fs::read_to_string(dir.path().join("solution_00_0000.vtu")).unwrap();
    assert!(step_piece.contains("Name=\"boundary\""));

    let init_time = fs::read_to_string(dir.path().join("init.time")).unwrap();
    assert!(init_time.starts_with("Init took ") && init_time.ends_with(" seconds\n"));
    for step in ["solution_00.time", "solution_01.time"] {
        let line = fs::read_to_string(dir.path().join(step)).unwrap();
        assert!(line.starts_with("Solution took "), "{line}");
    }
}

#[test]
fn band_refinement_is_balanced_and_deeper_than_min_level() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let group = ProcessGroup::new(2).unwrap();
    let results = group
        .run(|comm| {
            let sim = Simulation::new(
                config.clone(),
                comm,
                IdealGas::default(),
                RecordingWriter::new(),
            )?;
            let octants = sim.forest().gather_octants(sim.comm()).map_err(SolveError::Setup)?;
            Ok::<_, SolveError>(octants)
        })
        .unwrap();
    let octants = results.into_iter().next().unwrap().unwrap();
    let deepest = octants.iter().map(|o| o.level()).max().unwrap();
    let shallowest = octants.iter().map(|o| o.level()).min().unwrap();
    assert!(shallowest >= config.min_level);
    assert_eq!(deepest, 4);
}

#[test]
fn init_write_failure_aborts_construction() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let group = ProcessGroup::new(2).unwrap();
    let results = group
        .run(|comm| {
            let writer = FailingWriter::new(WriteStage::Header, 0);
            Simulation::new(config.clone(), comm, IdealGas::default(), writer).map(|_| ())
        })
        .unwrap();
    for r in results {
        let err = r.unwrap_err();
        assert!(matches!(err, SolveError::Output { ref stem, .. } if stem == "init"));
    }
    assert!(!dir.path().join("init.time").exists());
}

#[test]
fn root_alone_writes_timing_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    let group = ProcessGroup::new(2).unwrap();
    let roots = group
        .run(|comm| {
            let root = comm.is_root();
            let mut sim = Simulation::new(
                config.clone(),
                comm,
                IdealGas::default(),
                RecordingWriter::new(),
            )?;
            sim.step()?;
            Ok::<_, SolveError>(root)
        })
        .unwrap();
    assert_eq!(roots.into_iter().filter(|r| *r.as_ref().unwrap()).count(), 1);
    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    let mut timing: Vec<_> = names.iter().filter(|n| n.ends_with(".time")).collect();
    timing.sort();
    assert_eq!(timing, ["init.time", "solution_00.time"]);
}
