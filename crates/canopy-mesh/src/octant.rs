//! Octree cells addressed by integer anchor coordinates and level.
//!
//! Coordinates are measured in units of the finest representable cell:
//! the root cube spans `[0, ROOT_LEN)` on every axis and an octant of
//! level `l` has edge length `ROOT_LEN >> l`. Octants are totally ordered
//! by the Morton (z-order) position of their anchor, ties broken by level
//! so that an ancestor sorts before its descendants. Leaves of a linear
//! octree never overlap, so their anchors alone already order them.

use std::cmp::Ordering;
use std::fmt;

use canopy_core::Face;

/// Deepest refinement level an octant can reach.
pub const MAX_LEVEL: u8 = 19;

/// Edge length of the root cube in finest-level units.
pub const ROOT_LEN: u32 = 1 << MAX_LEVEL;

/// Number of finest-level positions in the root cube (`ROOT_LEN³`).
pub const ROOT_POSITIONS: u64 = 1 << (3 * MAX_LEVEL as u32);

/// How two leaves touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Contact {
    /// They share a two-dimensional patch of a face.
    Face,
    /// They share a segment of an edge but no face area.
    Edge,
    /// They share only a corner point.
    Corner,
}

/// A cube of the octree: anchor (lowest corner) plus level.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Octant {
    x: u32,
    y: u32,
    z: u32,
    level: u8,
}

impl Octant {
    /// The root cube.
    pub const fn root() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            level: 0,
        }
    }

    /// Build an octant from its anchor and level.
    ///
    /// Returns `None` if the level exceeds [`MAX_LEVEL`], the anchor lies
    /// outside the root, or the anchor is not aligned to the level's
    /// edge length.
    pub fn new(x: u32, y: u32, z: u32, level: u8) -> Option<Self> {
        if level > MAX_LEVEL {
            return None;
        }
        let len = Self::len_at(level);
        let valid = |c: u32| c < ROOT_LEN && c % len == 0;
        if valid(x) && valid(y) && valid(z) {
            Some(Self { x, y, z, level })
        } else {
            None
        }
    }

    /// The `index`-th octant of `level` in Morton order.
    ///
    /// # Panics
    ///
    /// Panics if `level > MAX_LEVEL` or `index >= 8^level`.
    pub fn from_morton_index(index: u64, level: u8) -> Self {
        assert!(level <= MAX_LEVEL, "level {level} exceeds {MAX_LEVEL}");
        assert!(
            index < 1u64 << (3 * u32::from(level)),
            "index {index} out of range for level {level}"
        );
        let shift = u32::from(MAX_LEVEL - level);
        Self {
            x: compact(index) << shift,
            y: compact(index >> 1) << shift,
            z: compact(index >> 2) << shift,
            level,
        }
    }

    /// Edge length of an octant at `level`, in finest-level units.
    pub const fn len_at(level: u8) -> u32 {
        1 << (MAX_LEVEL - level)
    }

    /// Refinement level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Anchor coordinates.
    pub fn anchor(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }

    /// Edge length in finest-level units.
    pub fn len(&self) -> u32 {
        Self::len_at(self.level)
    }

    /// Morton position of the anchor at the finest level. This is also the
    /// position of the first finest-level descendant.
    pub fn morton(&self) -> u64 {
        interleave(self.x, self.y, self.z)
    }

    /// Morton position of the last finest-level descendant.
    pub fn last_position(&self) -> u64 {
        let d = self.len() - 1;
        interleave(self.x + d, self.y + d, self.z + d)
    }

    /// The eight children in Morton order (x varies fastest).
    ///
    /// Returns `None` at [`MAX_LEVEL`].
    pub fn children(&self) -> Option<[Octant; 8]> {
        if self.level >= MAX_LEVEL {
            return None;
        }
        let level = self.level + 1;
        let h = Self::len_at(level);
        Some(std::array::from_fn(|i| Octant {
            x: self.x + if i & 1 != 0 { h } else { 0 },
            y: self.y + if i & 2 != 0 { h } else { 0 },
            z: self.z + if i & 4 != 0 { h } else { 0 },
            level,
        }))
    }

    /// The containing octant one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Octant> {
        if self.level == 0 {
            return None;
        }
        let level = self.level - 1;
        let mask = !(Self::len_at(level) - 1);
        Some(Octant {
            x: self.x & mask,
            y: self.y & mask,
            z: self.z & mask,
            level,
        })
    }

    /// Same-level octant displaced by `offset` cells on each axis, or
    /// `None` if it would leave the root cube.
    pub fn neighbor(&self, offset: [i32; 3]) -> Option<Octant> {
        let len = i64::from(self.len());
        let shift = |c: u32, d: i32| -> Option<u32> {
            let n = i64::from(c) + i64::from(d) * len;
            if (0..i64::from(ROOT_LEN)).contains(&n) {
                u32::try_from(n).ok()
            } else {
                None
            }
        };
        Some(Octant {
            x: shift(self.x, offset[0])?,
            y: shift(self.y, offset[1])?,
            z: shift(self.z, offset[2])?,
            level: self.level,
        })
    }

    /// Same-level octant across `face`, or `None` on the domain boundary.
    pub fn face_neighbor(&self, face: Face) -> Option<Octant> {
        let mut offset = [0; 3];
        offset[face.axis()] = if face.is_positive() { 1 } else { -1 };
        self.neighbor(offset)
    }

    /// Whether `face` of this octant lies on the root cube's surface.
    ///
    /// Exact at every level: the test is integer arithmetic on the
    /// anchor.
    pub fn is_on_root_face(&self, face: Face) -> bool {
        let c = self.anchor()[face.axis()];
        if face.is_positive() {
            c + self.len() == ROOT_LEN
        } else {
            c == 0
        }
    }

    /// Whether `other` is this octant or lies inside it.
    pub fn contains(&self, other: &Octant) -> bool {
        if other.level < self.level {
            return false;
        }
        let mask = !(self.len() - 1);
        other.x & mask == self.x && other.y & mask == self.y && other.z & mask == self.z
    }

    /// How this octant touches `other`, if their closed cubes meet
    /// without overlapping.
    pub fn contact(&self, other: &Octant) -> Option<Contact> {
        let a = self.anchor();
        let b = other.anchor();
        let (la, lb) = (self.len(), other.len());
        let mut degenerate = 0;
        for k in 0..3 {
            let lo = a[k].max(b[k]);
            let hi = (a[k] + la).min(b[k] + lb);
            match hi.cmp(&lo) {
                Ordering::Less => return None,
                Ordering::Equal => degenerate += 1,
                Ordering::Greater => {}
            }
        }
        match degenerate {
            1 => Some(Contact::Face),
            2 => Some(Contact::Edge),
            3 => Some(Contact::Corner),
            _ => None,
        }
    }

    /// The face of this octant through which it shares face area with
    /// `other`, if any.
    pub fn shared_face(&self, other: &Octant) -> Option<Face> {
        if self.contact(other) != Some(Contact::Face) {
            return None;
        }
        let a = self.anchor();
        let b = other.anchor();
        (0..3).find_map(|k| {
            if a[k] + self.len() == b[k] {
                Some(Face::on_axis(k, true))
            } else if b[k] + other.len() == a[k] {
                Some(Face::on_axis(k, false))
            } else {
                None
            }
        })
    }
}

impl Ord for Octant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.morton()
            .cmp(&other.morton())
            .then(self.level.cmp(&other.level))
    }
}

impl PartialOrd for Octant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Octant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Octant(L{} @ {},{},{})",
            self.level, self.x, self.y, self.z
        )
    }
}

impl fmt::Display for Octant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Spread the low 21 bits of `v` so that bit `i` lands on bit `3i`.
fn spread(v: u32) -> u64 {
    let mut x = u64::from(v) & 0x1f_ffff;
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of [`spread`]: gather every third bit starting at bit 0.
fn compact(v: u64) -> u32 {
    let mut x = v & 0x1249_2492_4924_9249;
    x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x >> 32)) & 0x1f_ffff;
    x as u32
}

fn interleave(x: u32, y: u32, z: u32) -> u64 {
    spread(x) | spread(y) << 1 | spread(z) << 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_octant() -> impl Strategy<Value = Octant> {
        (0u8..=8).prop_flat_map(|level| {
            let cells = 1u64 << (3 * u32::from(level));
            (0..cells).prop_map(move |i| Octant::from_morton_index(i, level))
        })
    }

    #[test]
    fn spread_compact_round_trip() {
        for v in [0u32, 1, 2, 3, 0x7ffff, 0x55555, 12345] {
            assert_eq!(compact(spread(v)), v);
        }
    }

    #[test]
    fn children_follow_morton_order() {
        let kids = Octant::root().children().unwrap();
        let h = ROOT_LEN / 2;
        assert_eq!(kids[0].anchor(), [0, 0, 0]);
        assert_eq!(kids[1].anchor(), [h, 0, 0]);
        assert_eq!(kids[2].anchor(), [0, h, 0]);
        assert_eq!(kids[7].anchor(), [h, h, h]);
        for w in kids.windows(2) {
            assert!(w[0] < w[1]);
        }
        for (i, k) in kids.iter().enumerate() {
            assert_eq!(*k, Octant::from_morton_index(i as u64, 1));
            assert_eq!(k.parent(), Some(Octant::root()));
        }
    }

    #[test]
    fn max_level_has_no_children() {
        let finest = Octant::from_morton_index(5, MAX_LEVEL);
        assert!(finest.children().is_none());
        assert_eq!(finest.len(), 1);
    }

    #[test]
    fn ancestor_sorts_before_descendants() {
        let parent = Octant::from_morton_index(3, 2);
        let kids = parent.children().unwrap();
        assert!(parent < kids[0]);
        assert_eq!(parent.morton(), kids[0].morton());
        assert!(parent.contains(&kids[5]));
        assert!(!kids[5].contains(&parent));
    }

    #[test]
    fn face_neighbor_leaves_root_at_boundary() {
        let corner = Octant::from_morton_index(0, 2);
        assert!(corner.face_neighbor(Face::NegX).is_none());
        assert!(corner.face_neighbor(Face::NegY).is_none());
        let east = corner.face_neighbor(Face::PosX).unwrap();
        assert_eq!(east.anchor(), [corner.len(), 0, 0]);
        assert_eq!(corner.shared_face(&east), Some(Face::PosX));
        assert_eq!(east.shared_face(&corner), Some(Face::NegX));
    }

    #[test]
    fn contact_classification() {
        let a = Octant::new(0, 0, 0, 2).unwrap();
        let len = a.len();
        let face = Octant::new(len, 0, 0, 2).unwrap();
        let edge = Octant::new(len, len, 0, 2).unwrap();
        let corner = Octant::new(len, len, len, 2).unwrap();
        let far = Octant::new(2 * len, 0, 0, 2).unwrap();
        assert_eq!(a.contact(&face), Some(Contact::Face));
        assert_eq!(a.contact(&edge), Some(Contact::Edge));
        assert_eq!(a.contact(&corner), Some(Contact::Corner));
        assert_eq!(a.contact(&far), None);
        assert_eq!(a.contact(&a), None);
    }

    #[test]
    fn finer_neighbor_shares_face_with_coarse() {
        let coarse = Octant::new(0, 0, 0, 1).unwrap();
        let fine = Octant::new(ROOT_LEN / 2, ROOT_LEN / 4, 0, 2).unwrap();
        assert_eq!(coarse.shared_face(&fine), Some(Face::PosX));
        assert_eq!(fine.shared_face(&coarse), Some(Face::NegX));
    }

    #[test]
    fn new_rejects_unaligned_anchor() {
        assert!(Octant::new(1, 0, 0, 2).is_none());
        assert!(Octant::new(ROOT_LEN, 0, 0, 2).is_none());
        assert!(Octant::new(0, 0, 0, MAX_LEVEL + 1).is_none());
    }

    proptest! {
        #[test]
        fn morton_index_round_trip(o in arb_octant()) {
            let level = o.level();
            let shift = u32::from(MAX_LEVEL - level);
            let index = o.morton() >> (3 * shift);
            prop_assert_eq!(Octant::from_morton_index(index, level), o);
        }

        #[test]
        fn descendant_range_matches_volume(o in arb_octant()) {
            let len = u64::from(o.len());
            prop_assert_eq!(o.last_position() - o.morton() + 1, len * len * len);
        }

        #[test]
        fn root_face_iff_neighbor_missing(o in arb_octant(), f in 0usize..6) {
            let face = Face::ALL[f];
            prop_assert_eq!(o.is_on_root_face(face), o.face_neighbor(face).is_none());
        }

        #[test]
        fn children_tile_parent(o in arb_octant()) {
            if let Some(kids) = o.children() {
                for k in kids {
                    prop_assert!(o.contains(&k));
                    prop_assert_eq!(k.parent(), Some(o));
                    prop_assert!(o.morton() <= k.morton());
                    prop_assert!(k.last_position() <= o.last_position());
                }
            }
        }
    }
}
