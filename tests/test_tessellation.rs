use common::{generator, get_config, get_space, lattice};
use float_cmp::assert_approx_eq;
use glam::{DVec2, DVec3};
use mvmm_tessellation::{
    connectivity::ConnectivityIndex,
    errors::MeshError,
    face_registry::{FaceOutcome, FaceRegistry, RejectReason, RightVertex},
    initial_conditions::Halo,
    relation::RelationClass,
    Space,
};

mod common;

#[test]
fn test_five_cells() {
    let generators = vec![
        generator(DVec2::new(0.25, 0.25), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.75, 0.25), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.5, 0.5), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.25, 0.75), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.75, 0.75), 1., DVec3::ZERO, 1., 0.),
    ];
    let mut space = get_space(generators, DVec2::ONE);
    let stats = space.rebuild(&[true; 5], 0.5).unwrap();
    assert_eq!(stats.cells_built, 5);
    assert_eq!(stats.cells_skipped, 0);

    let voronoi = space.voronoi();
    let volumes: Vec<f64> = (0..5).map(|idx| voronoi.cell(idx).unwrap().volume()).collect();
    assert_approx_eq!(f64, volumes.iter().sum::<f64>(), 1., epsilon = 1e-12);
    assert_approx_eq!(f64, volumes[2], 0.125, epsilon = 1e-12);
    for idx in [0, 1, 3, 4] {
        assert_approx_eq!(f64, volumes[idx], 0.21875, epsilon = 1e-12);
    }

    // The central cell is a diamond
    let center = voronoi.cell(2).unwrap();
    assert_eq!(center.face_count(), 4);
    assert_approx_eq!(f64, center.centroid().length(), 0., epsilon = 1e-12);
    for face in voronoi.cell_faces(2) {
        assert_eq!(face.relation(), RelationClass::Local);
        assert_approx_eq!(f64, face.area(), 0.125f64.sqrt(), epsilon = 1e-12);
        assert!(face.vertices().is_some());
    }
}

#[test]
fn test_generators_in_corners() {
    let generators = vec![
        generator(DVec2::new(0., 0.), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(1., 0.), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0., 1.), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(1., 1.), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.5, 0.5), 1., DVec3::ZERO, 1., 0.),
    ];
    let mut space = get_space(generators, DVec2::ONE);
    let stats = space.rebuild(&[true; 5], 0.5).unwrap();
    assert_eq!(stats.cells_built, 5);

    let voronoi = space.voronoi();
    let volumes: Vec<f64> = (0..5).map(|idx| voronoi.cell(idx).unwrap().volume()).collect();
    assert_approx_eq!(f64, volumes.iter().sum::<f64>(), 1., epsilon = 1e-12);
    assert_approx_eq!(f64, volumes[4], 0.5, epsilon = 1e-12);
    for (idx, corner) in [(0, DVec2::ZERO), (1, DVec2::X), (2, DVec2::Y), (3, DVec2::ONE)] {
        let cell = voronoi.cell(idx).unwrap();
        assert_approx_eq!(f64, cell.volume(), 0.125, epsilon = 1e-12);
        // A triangle in the corner of the box
        let centroid = corner + cell.centroid();
        let expected = (2. * corner + DVec2::splat(0.5)) / 3.;
        assert_approx_eq!(f64, (centroid - expected).length(), 0., epsilon = 1e-12);
        assert_eq!(cell.face_count(), 1);
    }

    let center = voronoi.cell(4).unwrap();
    assert_eq!(center.face_count(), 4);
    for face in voronoi.cell_faces(4) {
        assert_eq!(face.relation(), RelationClass::Local);
        assert_approx_eq!(f64, face.area(), 0.5f64.sqrt(), epsilon = 1e-12);
    }
}

#[test]
fn test_shared_faces() {
    let generators = lattice(4, DVec3::ZERO, |_| 1.);
    let mut space = get_space(generators, DVec2::ONE);
    space.rebuild(&[true; 16], 0.25).unwrap();

    let voronoi = space.voronoi();
    let connectivity = voronoi.connectivity();
    let local_faces = voronoi.registry().bucket(RelationClass::Local);
    // 2 * 4 * 3 interior faces in a 4x4 lattice
    assert_eq!(local_faces.len(), 24);
    for (slot, face) in local_faces.iter().enumerate() {
        let in_span = |generator: usize| {
            connectivity
                .span(generator)
                .iter()
                .filter(|entry| entry.relation == RelationClass::Local && entry.slot == slot)
                .count()
        };
        let spans: usize = (0..16).map(in_span).sum();
        assert_eq!(spans, 2);
        assert_eq!(in_span(face.left()), 1);
    }
    // Boundary faces are never shared
    let boundary_faces = voronoi.registry().bucket(RelationClass::Boundary);
    assert_eq!(boundary_faces.len(), 16);
    assert_eq!(connectivity.len(), 2 * local_faces.len() + boundary_faces.len());
}

#[test]
fn test_third_insertion_rejected() {
    let mut registry = FaceRegistry::new(1e-10, false);
    let mut connectivity = ConnectivityIndex::new();
    connectivity.reset(2);
    let vertices = [DVec2::new(0.5, -0.5), DVec2::new(0.5, 0.5)];

    connectivity.open_span(0).unwrap();
    let first = registry.add_or_find(
        &mut connectivity,
        0,
        3,
        RightVertex::Local {
            local_idx: 1,
            active: true,
        },
        4,
        vertices,
    );
    assert!(matches!(first, FaceOutcome::New(_)));
    connectivity.close_span();

    connectivity.open_span(1).unwrap();
    let left = RightVertex::Local {
        local_idx: 0,
        active: true,
    };
    let second = registry.add_or_find(&mut connectivity, 1, 4, left, 3, vertices);
    assert!(matches!(second, FaceOutcome::Reused(_)));
    let third = registry.add_or_find(&mut connectivity, 1, 4, left, 3, vertices);
    assert_eq!(third, FaceOutcome::Rejected(RejectReason::Duplicate));
    connectivity.close_span();

    assert_eq!(registry.len(), 1);
    assert_eq!(connectivity.span(0).len(), 1);
    assert_eq!(connectivity.span(1).len(), 1);
}

#[test]
fn test_zero_length_faces() {
    // All lattice squares have 4 cocircular generators
    let generators = lattice(4, DVec3::ZERO, |_| 1.);
    let mut space = get_space(generators, DVec2::ONE);
    let stats = space.rebuild(&[true; 16], 0.25).unwrap();
    assert!(stats.faces.degenerate > 0);

    let voronoi = space.voronoi();
    let min_face_area = voronoi.registry().min_face_area();
    assert!(voronoi.faces().all(|f| f.area() >= min_face_area && f.area() > 0.));
    assert_eq!(
        voronoi.registry().len(),
        stats.faces.new,
        "Rejected faces are not materialized"
    );
    let mut total = 0.;
    for idx in 0..16 {
        let cell = voronoi.cell(idx).unwrap();
        assert_eq!(cell.face_count(), 4);
        assert_approx_eq!(f64, cell.volume(), 1. / 16., epsilon = 1e-12);
        total += cell.volume();
    }
    assert_approx_eq!(f64, total, 1., epsilon = 1e-12);
}

#[test]
fn test_inactive_neighbours() {
    let generators = lattice(4, DVec3::ZERO, |_| 1.);
    let mut space = get_space(generators, DVec2::ONE);
    let mut active = [false; 16];
    active[5] = true;
    active[6] = true;
    let stats = space.rebuild(&active, 0.25).unwrap();
    assert_eq!(stats.cells_built, 2);
    assert_eq!(stats.faces.reused, 1);

    let voronoi = space.voronoi();
    assert!(voronoi.cell(0).is_none());
    // Faces with inactive generators are stored once, under the local class
    assert_eq!(voronoi.registry().bucket(RelationClass::Local).len(), 7);
    assert!(voronoi.registry().bucket(RelationClass::Boundary).is_empty());
}

#[test]
fn test_placeholder_in_ring() {
    let generators = vec![
        generator(DVec2::new(0.2, 0.2), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.8, 0.3), 1., DVec3::ZERO, 1., 0.),
        generator(DVec2::new(0.5, 0.7), 1., DVec3::ZERO, 1., 0.),
    ];
    let mut space = Space::new(get_config(), generators);
    space.retessellate(Halo::default()).unwrap();
    let result = space.rebuild(&[true; 3], 0.3);
    assert!(matches!(result, Err(MeshError::PlaceholderInRing { .. })));
    assert!(space.voronoi().registry().is_empty());
}

#[test]
fn test_grid_dump() {
    let generators = lattice(2, DVec3::ZERO, |_| 1.);
    let mut space = get_space(generators, DVec2::ONE);
    space.rebuild(&[true; 4], 0.5).unwrap();

    let mut buffer = vec![];
    space.dump(&mut buffer).unwrap();
    let dump = String::from_utf8(buffer).unwrap();
    let records: Vec<Vec<&str>> = dump.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(records.iter().filter(|r| r[0] == "G").count(), 4);
    let cells: Vec<_> = records.iter().filter(|r| r[0] == "C").collect();
    assert_eq!(cells.len(), 4);
    for cell in cells {
        assert_approx_eq!(f64, cell[3].parse::<f64>().unwrap(), 0.25, epsilon = 1e-12);
        assert_eq!(cell[4], "4");
    }
    // Faces are stored with their vertices
    let faces: Vec<_> = records.iter().filter(|r| r[0] == "F").collect();
    assert_eq!(faces.len(), 12);
    assert!(faces.iter().all(|f| f.len() == 9));
}
