//! Integration tests: forest operations across in-process rank groups.
//!
//! Every test runs the same collective program on each rank of a
//! `ProcessGroup` and checks properties of the resulting global mesh.

use canopy_comm::{CommError, Communicator, GroupComm, ProcessGroup};
use canopy_core::Face;
use canopy_mesh::{
    Connectivity, CubeDomain, Forest, GhostLayer, MeshError, MeshIndex, NeighborSlot, Octant,
};
use canopy_test_utils::RandomRefinement;

fn run<R: Send>(ranks: usize, f: impl Fn(GroupComm) -> R + Sync) -> Vec<R> {
    ProcessGroup::new(ranks).unwrap().run(f).unwrap()
}

fn blank(_: &Octant) {}

/// Uniform level 2, randomly refined to level 4, balanced and partitioned.
fn adapted_forest(comm: &GroupComm, seed: u64) -> Result<Forest<()>, MeshError> {
    let rr = RandomRefinement::new(seed, 0.3, 4);
    let mut f = Forest::new_uniform(comm, CubeDomain::unit(), 2, blank)?;
    f.refine(comm, true, |o| rr.select(o), blank)?;
    f.balance(comm, Connectivity::Full, blank)?;
    f.partition(comm)?;
    Ok(f)
}

fn assert_linear(octants: &[Octant]) {
    for w in octants.windows(2) {
        assert!(w[0].last_position() < w[1].morton(), "{} overlaps {}", w[0], w[1]);
    }
    let volume: u64 = octants
        .iter()
        .map(|o| {
            let len = u64::from(o.len());
            len * len * len
        })
        .sum();
    assert_eq!(volume, 1 << 57, "leaves must tile the root");
}

// ── Partition ──────────────────────────────────────────────────

#[test]
fn partition_neither_drops_nor_duplicates() {
    let results = run(3, |comm| {
        let rr = RandomRefinement::new(7, 0.25, 4);
        let mut f = Forest::new_uniform(&comm, CubeDomain::unit(), 2, blank)?;
        f.refine(&comm, true, |o| rr.select(o), blank)?;
        let before = f.gather_octants(&comm)?;
        f.partition(&comm)?;
        let after = f.gather_octants(&comm)?;
        Ok::<_, MeshError>((before, after, f.rank_counts().to_vec()))
    });
    for r in results {
        let (before, after, counts) = r.unwrap();
        assert_eq!(before, after);
        assert_linear(&after);
        let max = counts.iter().max().unwrap();
        let min = counts.iter().min().unwrap();
        assert!(max - min <= 1, "unbalanced counts {counts:?}");
    }
}

#[test]
fn payload_moves_with_its_leaf() {
    let results = run(4, |comm| {
        let mut f = Forest::new_uniform(&comm, CubeDomain::unit(), 2, |o: &Octant| o.morton())?;
        // all refinement lands on rank 0's share
        f.refine(&comm, false, |o| o.morton() < 1 << 54, |o: &Octant| o.morton())?;
        f.partition(&comm)?;
        let ok = f.leaves().iter().all(|l| l.data == l.octant().morton());
        Ok::<_, MeshError>((ok, f.local_count()))
    });
    let total: usize = results
        .into_iter()
        .map(|r| {
            let (ok, n) = r.unwrap();
            assert!(ok);
            n
        })
        .sum();
    assert_eq!(total, 64 - 8 + 64);
}

// ── Regrid cycle ───────────────────────────────────────────────

#[test]
fn refine_always_multiplies_global_count_by_eight() {
    let results = run(4, |comm| {
        let mut f = Forest::new_uniform(&comm, CubeDomain::unit(), 2, blank)?;
        let first = f.global_count();
        f.partition(&comm)?;
        f.refine(&comm, false, |_| true, blank)?;
        f.partition(&comm)?;
        Ok::<_, MeshError>((first, f.global_count(), f.local_count()))
    });
    for r in results {
        let (first, second, local) = r.unwrap();
        assert_eq!(first, 64);
        assert_eq!(second, 512);
        assert_eq!(local, 128);
    }
}

#[test]
fn balance_enforces_two_to_one_across_ranks() {
    let results = run(4, |comm| {
        let f = adapted_forest(&comm, 11)?;
        f.gather_octants(&comm)
    });
    for r in results {
        let all = r.unwrap();
        assert_linear(&all);
        for a in &all {
            for b in &all {
                if a.contact(b).is_some() {
                    assert!(a.level().abs_diff(b.level()) <= 1, "{a} touches {b}");
                }
            }
        }
    }
}

#[test]
fn every_rank_sees_the_same_mesh() {
    let results = run(3, |comm| {
        let f = adapted_forest(&comm, 5)?;
        f.gather_octants(&comm)
    });
    let meshes: Vec<Vec<Octant>> = results.into_iter().map(|r| r.unwrap()).collect();
    assert!(meshes.windows(2).all(|w| w[0] == w[1]));
}

// ── Ghosts and adjacency ──────────────────────────────────────

#[test]
fn ghost_exchange_delivers_owner_payload() {
    let results = run(4, |comm| {
        let mut f: Forest<(Octant, usize)> =
            Forest::new_uniform(&comm, CubeDomain::unit(), 3, |o: &Octant| (*o, usize::MAX))?;
        let me = comm.rank().0;
        for leaf in f.leaves_mut() {
            leaf.data.1 = me;
        }
        let ghost = GhostLayer::build(&f, &comm, Connectivity::Face)?;
        let mut buffer = Vec::new();
        ghost.exchange(&f, &comm, &mut buffer)?;
        // exchanging twice without changes is idempotent
        let mut again = Vec::new();
        ghost.exchange(&f, &comm, &mut again)?;
        let ok = buffer.len() == ghost.len()
            && buffer == again
            && ghost
                .ghosts()
                .iter()
                .zip(&buffer)
                .all(|(g, (o, owner))| g.octant() == o && g.owner() == *owner && *owner != me);
        Ok::<_, MeshError>((ok, ghost.is_empty()))
    });
    for r in results {
        let (ok, empty) = r.unwrap();
        assert!(ok);
        assert!(!empty);
    }
}

#[test]
fn face_adjacency_is_symmetric_across_ranks() {
    let results = run(3, |comm| {
        let f = adapted_forest(&comm, 23)?;
        let ghost = GhostLayer::build(&f, &comm, Connectivity::Face)?;
        let index = MeshIndex::build(&f, &ghost)?;
        let mut pairs = Vec::new();
        for (cell, leaf) in f.leaves().iter().enumerate() {
            for n in index.face_neighbors(cell) {
                let other = match n.slot {
                    NeighborSlot::Local(i) => *f.leaves()[i].octant(),
                    NeighborSlot::Ghost(g) => *ghost.ghosts()[g].octant(),
                    NeighborSlot::DomainBoundary => {
                        assert!(leaf.octant().is_on_root_face(n.face));
                        continue;
                    }
                };
                pairs.push((*leaf.octant(), n.face, other));
            }
        }
        let all: Vec<(Octant, Face, Octant)> =
            comm.all_gather(pairs)?.into_iter().flatten().collect();
        Ok::<_, MeshError>(all)
    });
    for r in results {
        let all = r.unwrap();
        for (a, face, b) in &all {
            assert!(
                all.contains(&(*b, face.opposite(), *a)),
                "{a} -> {b} across {face} has no reverse entry"
            );
        }
    }
}

#[test]
fn boundary_entries_match_geometry() {
    let results = run(2, |comm| {
        let f = adapted_forest(&comm, 3)?;
        let ghost = GhostLayer::build(&f, &comm, Connectivity::Face)?;
        let index = MeshIndex::build(&f, &ghost)?;
        let domain = f.domain();
        let ok = f.leaves().iter().enumerate().all(|(cell, leaf)| {
            Face::ALL.iter().all(|&face| {
                let tagged = index
                    .face_neighbors(cell)
                    .iter()
                    .any(|n| n.face == face && n.slot == NeighborSlot::DomainBoundary);
                tagged == domain.is_boundary_face(leaf.octant(), face)
            })
        });
        Ok::<_, MeshError>(ok)
    });
    assert!(results.into_iter().all(|r| r.unwrap()));
}

#[test]
fn departed_rank_fails_the_collective() {
    let results = run(2, |comm| {
        if comm.rank().0 == 1 {
            return Ok(0);
        }
        Forest::new_uniform(&comm, CubeDomain::unit(), 1, blank).map(|f| f.global_count())
    });
    assert!(matches!(
        results[0],
        Err(MeshError::Comm(CommError::PeerDisconnected { .. }))
    ));
}
