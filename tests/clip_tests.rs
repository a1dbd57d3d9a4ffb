use csgbsp::float_types::Real;
use csgbsp::{CsgBspTree, FragmentSide, TriangleSplit};
use nalgebra::Point3;

const EPS: Real = 1e-6;

fn pt(x: Real, y: Real, z: Real) -> Point3<Real> {
    Point3::new(x, y, z)
}

fn single_plane_tree() -> CsgBspTree {
    let mut tree = CsgBspTree::with_tolerance(EPS);
    tree.add_triangle(0, pt(0.0, 0.0, 0.0), pt(1.0, 0.0, 0.0), pt(0.0, 1.0, 0.0));
    tree
}

/// Outward-wound tetrahedron: corners at the origin and at 2 along each
/// axis. Outward normals put the enclosed volume on the BACK side of every
/// face plane.
fn tetrahedron_tree() -> CsgBspTree {
    let a = pt(0.0, 0.0, 0.0);
    let b = pt(2.0, 0.0, 0.0);
    let c = pt(0.0, 2.0, 0.0);
    let d = pt(0.0, 0.0, 2.0);
    let faces = [[a, c, b], [a, d, c], [a, b, d], [b, c, d]];

    let mut tree = CsgBspTree::with_tolerance(EPS);
    for (id, face) in faces.iter().enumerate() {
        tree.add_triangle(id, face[0], face[1], face[2]);
    }
    tree
}

fn assert_split_vertices_reconstruct(split: &TriangleSplit) {
    for vertex in &split.vertices {
        let rebuilt = vertex.reinterpolate(&split.vertices);
        assert!(
            (rebuilt - vertex.pos).norm() < EPS,
            "vertex {:?} does not reproduce from its source record",
            vertex
        );
    }
}

#[test]
fn straddling_triangle_splits_front_and_back() {
    // the worked example: a single plane through the origin, normal +Z,
    // probed with a triangle crossing it
    let tree = single_plane_tree();
    let split = tree
        .test_triangle(pt(0.2, 0.2, -1.0), pt(0.2, 0.2, 1.0), pt(0.8, 0.1, 0.0))
        .unwrap();

    assert!(split.was_split());
    assert!(split.fragments.len() >= 2);
    assert!(split.fragments.iter().any(|f| f.side == FragmentSide::Front));
    assert!(split.fragments.iter().any(|f| f.side == FragmentSide::Back));

    // the crossing on the long vertical edge is a brand new vertex at z = 0
    let interpolated: Vec<_> =
        split.vertices.iter().filter(|v| v.source.is_some()).collect();
    assert_eq!(interpolated.len(), 1);
    let source = interpolated[0].source.unwrap();
    assert_eq!((source.start, source.end), (0, 1));
    assert!((source.alpha - 0.5).abs() < EPS);
    assert!(interpolated[0].pos.z.abs() < EPS);
    assert_split_vertices_reconstruct(&split);

    // the third corner already sat on the plane, so one sliver of the fan
    // collapsed and was dropped
    assert_eq!(split.degenerate_dropped, 1);
    assert_eq!(split.ambiguous, 0);
}

#[test]
fn untouched_triangle_is_a_single_fragment() {
    let tree = single_plane_tree();
    let split = tree
        .test_triangle(pt(0.0, 0.0, 1.0), pt(1.0, 0.0, 1.0), pt(0.0, 1.0, 1.0))
        .unwrap();

    assert!(!split.was_split());
    assert_eq!(split.fragments.len(), 1);
    assert_eq!(split.fragments[0].side, FragmentSide::Front);
    assert_eq!(split.fragments[0].vertices, [0, 1, 2]);
    assert_eq!(split.vertices.len(), 3);
    assert!(split.vertices.iter().all(|v| v.source.is_none()));
}

#[test]
fn inside_triangle_classifies_back() {
    let tree = tetrahedron_tree();
    let split = tree
        .test_triangle(pt(0.4, 0.4, 0.4), pt(0.6, 0.4, 0.4), pt(0.4, 0.6, 0.4))
        .unwrap();

    assert!(!split.was_split());
    assert!(split.fragments.iter().all(|f| f.side == FragmentSide::Back));
}

#[test]
fn outside_triangles_classify_front() {
    let tree = tetrahedron_tree();

    // beyond the slanted face
    let above = tree
        .test_triangle(pt(0.2, 0.2, 3.0), pt(0.8, 0.2, 3.0), pt(0.2, 0.8, 3.0))
        .unwrap();
    assert!(above.fragments.iter().all(|f| f.side == FragmentSide::Front));

    // below the bottom face
    let below = tree
        .test_triangle(pt(0.2, 0.2, -1.0), pt(0.8, 0.2, -1.0), pt(0.2, 0.8, -1.0))
        .unwrap();
    assert!(below.fragments.iter().all(|f| f.side == FragmentSide::Front));
}

#[test]
fn poking_triangle_splits_across_a_face() {
    let tree = tetrahedron_tree();
    // pokes out through the bottom face, well inside its footprint
    let split = tree
        .test_triangle(pt(0.3, 0.3, -0.4), pt(0.3, 0.3, 0.4), pt(0.7, 0.3, 0.3))
        .unwrap();

    assert!(split.was_split());
    let fronts = split
        .fragments
        .iter()
        .filter(|f| f.side == FragmentSide::Front)
        .count();
    let backs = split
        .fragments
        .iter()
        .filter(|f| f.side == FragmentSide::Back)
        .count();
    assert!(fronts >= 1, "no fragment outside the volume");
    assert!(backs >= 1, "no fragment inside the volume");

    // every interpolated vertex sits on the crossed plane (z = 0)
    for vertex in split.vertices.iter().filter(|v| v.source.is_some()) {
        assert!(vertex.pos.z.abs() < EPS);
    }
    assert_split_vertices_reconstruct(&split);
}

#[test]
fn fragments_do_not_split_again() {
    let tree = tetrahedron_tree();
    let split = tree
        .test_triangle(pt(0.3, 0.3, -0.4), pt(0.3, 0.3, 0.4), pt(0.7, 0.3, 0.3))
        .unwrap();
    assert!(split.was_split());

    for fragment in &split.fragments {
        let [i0, i1, i2] = fragment.vertices;
        let again = tree
            .test_triangle(
                split.vertices[i0].pos,
                split.vertices[i1].pos,
                split.vertices[i2].pos,
            )
            .unwrap();
        assert!(
            !again.was_split(),
            "fragment {:?} split again into {} pieces",
            fragment,
            again.fragments.len()
        );
        assert_eq!(again.fragments[0].side, fragment.side);
    }
}

#[test]
fn batch_matches_individual_calls() {
    let tree = tetrahedron_tree();
    let triangles = [
        [pt(0.4, 0.4, 0.4), pt(0.6, 0.4, 0.4), pt(0.4, 0.6, 0.4)],
        [pt(0.2, 0.2, 3.0), pt(0.8, 0.2, 3.0), pt(0.2, 0.8, 3.0)],
        [pt(0.3, 0.3, -0.4), pt(0.3, 0.3, 0.4), pt(0.7, 0.3, 0.3)],
    ];

    let batch = tree.test_triangles(&triangles).unwrap();
    assert_eq!(batch.len(), 3);
    for (tri, split) in triangles.iter().zip(&batch) {
        let single = tree.test_triangle(tri[0], tri[1], tri[2]).unwrap();
        assert_eq!(split.fragments, single.fragments);
        assert_eq!(split.vertices.len(), single.vertices.len());
    }
}

#[test]
fn crossing_far_from_stored_geometry_settles_conservatively() {
    // crosses the root plane but nowhere near its registered triangle, so
    // no intersection segment exists and the verification pass decides:
    // its samples disagree and the fragment falls back to Back
    let tree = single_plane_tree();
    let split = tree
        .test_triangle(pt(10.0, 10.0, -1.0), pt(10.0, 10.0, 1.0), pt(11.0, 10.0, -1.0))
        .unwrap();

    assert!(!split.was_split());
    assert_eq!(split.fragments.len(), 1);
    assert_eq!(split.fragments[0].side, FragmentSide::Back);
    assert_eq!(split.ambiguous, 1);
}

#[test]
fn coplanar_triangle_reports_its_side_consistently() {
    let tree = single_plane_tree();
    // lies exactly in the tree's only plane
    let split = tree
        .test_triangle(pt(2.0, 2.0, 0.0), pt(3.0, 2.0, 0.0), pt(2.0, 3.0, 0.0))
        .unwrap();

    assert!(!split.was_split());
    // all four verification samples land on the plane: defaults to front
    assert_eq!(split.fragments[0].side, FragmentSide::Front);
    assert_eq!(split.ambiguous, 0);
}
