use glam::DVec2;

use crate::{
    connectivity::{ConnectivityIndex, FaceSlot},
    delaunay::GhostVertex,
    geometry::face_midpoint_measure,
    relation::RelationClass,
};

/// The right endpoint of a face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceNeighbour {
    /// Local generator index.
    Local(usize),
    /// Index in the halo of ghost generators.
    Foreign(usize),
}

/// The right endpoint of a candidate face, as discovered by a ring walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RightVertex {
    Local { local_idx: usize, active: bool },
    Ghost(GhostVertex),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    left: usize,
    right: FaceNeighbour,
    relation: RelationClass,
    /// Delaunay vertex indices of the left and right endpoint.
    endpoints: [usize; 2],
    area: f64,
    midpoint: DVec2,
    vertices: Option<[DVec2; 2]>,
}

impl Face {
    pub fn left(&self) -> usize {
        self.left
    }

    pub fn right(&self) -> FaceNeighbour {
        self.right
    }

    pub fn relation(&self) -> RelationClass {
        self.relation
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn midpoint(&self) -> DVec2 {
        self.midpoint
    }

    /// The boundary vertices, only stored when requested at construction of the registry.
    pub fn vertices(&self) -> Option<[DVec2; 2]> {
        self.vertices
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Surface measure below the configured minimum.
    Degenerate,
    /// The pair is already present in the open span.
    Duplicate,
    /// The already walked right endpoint has no matching face.
    Unmatched,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceOutcome {
    Rejected(RejectReason),
    Reused(FaceSlot),
    New(FaceSlot),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub new: usize,
    pub reused: usize,
    pub degenerate: usize,
    pub duplicate: usize,
    pub unmatched: usize,
}

/// Materializes, deduplicates and classifies the faces of a tessellation.
///
/// Faces are stored in one bucket per [`RelationClass`]. A face between two
/// local generators is created by the first of the two ring walks that
/// encounters it and looked up by the second one.
#[derive(Debug)]
pub struct FaceRegistry {
    buckets: Vec<Vec<Face>>,
    min_face_area: f64,
    store_faces: bool,
    stats: RegistryStats,
}

impl FaceRegistry {
    pub fn new(min_face_area: f64, store_faces: bool) -> Self {
        Self {
            buckets: vec![vec![]; RelationClass::COUNT],
            min_face_area,
            store_faces,
            stats: RegistryStats::default(),
        }
    }

    /// Forget all faces, keeping the allocations.
    pub fn reset(&mut self, min_face_area: f64) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.min_face_area = min_face_area;
        self.stats = RegistryStats::default();
    }

    pub fn min_face_area(&self) -> f64 {
        self.min_face_area
    }

    /// Register the face between the local generator `left`, whose span is
    /// currently open in `connectivity`, and `right`.
    ///
    /// Ring walks must happen in ascending local index: a local active right
    /// endpoint with a lower index than `left` has already been walked and
    /// must contain this face already.
    pub fn add_or_find(
        &mut self,
        connectivity: &mut ConnectivityIndex,
        left: usize,
        left_del_idx: usize,
        right: RightVertex,
        right_del_idx: usize,
        vertices: [DVec2; 2],
    ) -> FaceOutcome {
        debug_assert_eq!(connectivity.open_generator(), Some(left));

        let duplicate = connectivity
            .open_entries()
            .iter()
            .any(|entry| self.face(*entry).endpoints.contains(&right_del_idx));
        if duplicate {
            self.stats.duplicate += 1;
            return FaceOutcome::Rejected(RejectReason::Duplicate);
        }

        let (relation, right_ref) = match right {
            RightVertex::Local { local_idx, active } if active && local_idx < left => {
                let entry = connectivity.span(local_idx).iter().copied().find(|entry| {
                    entry.relation.is_local()
                        && self.face(*entry).right == FaceNeighbour::Local(left)
                });
                return match entry {
                    Some(entry) => {
                        connectivity.push(entry);
                        self.stats.reused += 1;
                        FaceOutcome::Reused(entry)
                    }
                    None => {
                        self.stats.unmatched += 1;
                        FaceOutcome::Rejected(RejectReason::Unmatched)
                    }
                };
            }
            RightVertex::Local { local_idx, .. } => {
                (RelationClass::Local, FaceNeighbour::Local(local_idx))
            }
            RightVertex::Ghost(ghost) => (ghost.relation, FaceNeighbour::Foreign(ghost.foreign_idx)),
        };

        let (midpoint, area) = face_midpoint_measure(vertices[0], vertices[1]);
        if !(area >= self.min_face_area) || area == 0. {
            self.stats.degenerate += 1;
            return FaceOutcome::Rejected(RejectReason::Degenerate);
        }

        let bucket = &mut self.buckets[relation.code() as usize];
        bucket.push(Face {
            left,
            right: right_ref,
            relation,
            endpoints: [left_del_idx, right_del_idx],
            area,
            midpoint,
            vertices: self.store_faces.then_some(vertices),
        });
        let entry = FaceSlot {
            slot: bucket.len() - 1,
            relation,
        };
        connectivity.push(entry);
        self.stats.new += 1;
        FaceOutcome::New(entry)
    }

    pub fn face(&self, entry: FaceSlot) -> &Face {
        &self.buckets[entry.relation.code() as usize][entry.slot]
    }

    pub fn bucket(&self, relation: RelationClass) -> &[Face] {
        &self.buckets[relation.code() as usize]
    }

    /// All faces, bucket by bucket.
    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.buckets.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }
}
