//! Subdomain classification on a structured cube.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use pv_core::SubdomainId;
use pv_mesh::{MeshStore, PlaneDef, PlaneRole, SubdomainClassifier, TetMesh};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn cube() -> TetMesh {
    TetMesh::structured_box([0.0; 3], [1.0; 3], [2, 2, 2]).expect("box mesh")
}

fn bottom_inflow(number: u32, normal: [f64; 3]) -> PlaneDef {
    PlaneDef {
        number,
        normal,
        center: [0.5, 0.5, 0.0],
        role: PlaneRole::Inflow {
            radius: 0.5,
            reference_radius: 0.5,
        },
    }
}

#[test]
fn exactly_one_face_is_inflow() {
    let mesh = cube();
    let classifier = SubdomainClassifier::new(vec![bottom_inflow(2, [0.0, 0.0, -1.0])]).unwrap();
    let out = classifier.classify(&mesh).unwrap();

    let inflow = SubdomainId::plane(2).unwrap();
    // 4 squares x 2 triangles on the z = 0 face
    assert_eq!(out.tags.count(inflow), 8);
    assert_eq!(out.tags.count(SubdomainId::WALL), 40);
    for facet in out.tags.tagged(inflow) {
        for &v in &facet.vertices {
            assert_eq!(mesh.vertices[v][2], 0.0);
        }
    }
    for (facet, id) in out.tags.facets.iter().zip(&out.tags.ids) {
        let on_bottom = facet.vertices.iter().all(|&v| mesh.vertices[v][2] == 0.0);
        assert_eq!(*id == inflow, on_bottom);
    }

    assert!((out.tolerance - 0.05).abs() < 1e-12);
    assert!((out.volume - 1.0).abs() < 1e-12);
    assert!((out.subdomain(inflow).unwrap().area - 1.0).abs() < 1e-12);
    assert!((out.subdomain(SubdomainId::WALL).unwrap().area - 5.0).abs() < 1e-12);
}

#[test]
fn facets_touching_the_plane_with_one_edge_stay_wall() {
    let mesh = cube();
    let out = SubdomainClassifier::new(vec![bottom_inflow(2, [0.0, 0.0, 1.0])])
        .unwrap()
        .classify(&mesh)
        .unwrap();
    // side faces share vertices with z = 0 but are not contained in it
    let inflow = SubdomainId::plane(2).unwrap();
    assert_eq!(out.tags.count(inflow), 8);
}

#[test]
fn overlapping_planes_resolve_in_declared_order() {
    let mesh = cube();
    // nearly parallel planes that both contain the whole z = 0 face
    let tilted = [0.0, 0.001, 1.0];
    let flat = [0.0, 0.0, 1.0];

    let first = SubdomainClassifier::new(vec![bottom_inflow(2, flat), bottom_inflow(3, tilted)])
        .unwrap()
        .classify(&mesh)
        .unwrap();
    assert_eq!(first.tags.count(SubdomainId::plane(2).unwrap()), 8);
    assert_eq!(first.tags.count(SubdomainId::plane(3).unwrap()), 0);

    let swapped = SubdomainClassifier::new(vec![bottom_inflow(3, tilted), bottom_inflow(2, flat)])
        .unwrap()
        .classify(&mesh)
        .unwrap();
    assert_eq!(swapped.tags.count(SubdomainId::plane(3).unwrap()), 8);
    assert_eq!(swapped.tags.count(SubdomainId::plane(2).unwrap()), 0);
}

#[test]
fn store_and_sidecar_roundtrip() {
    let dir = unique_temp_dir("pv_mesh_store");
    let mesh = cube();
    let out = SubdomainClassifier::new(vec![
        bottom_inflow(2, [0.0, 0.0, -1.0]),
        PlaneDef {
            number: 3,
            normal: [0.0, 0.0, 1.0],
            center: [0.5, 0.5, 1.0],
            role: PlaneRole::Outflow,
        },
    ])
    .unwrap()
    .classify(&mesh)
    .unwrap();

    let store = MeshStore {
        name: "cube".to_string(),
        mesh,
        facet_tags: out.tags.clone(),
    };
    store.save(&dir).expect("save mesh store");
    MeshStore::save_sidecar(&dir, "cube", &out.sidecar()).expect("save sidecar");

    let loaded = MeshStore::load(&dir, "cube").expect("load mesh store");
    assert_eq!(loaded, store);

    let sidecar = MeshStore::load_sidecar(&dir, "cube").expect("load sidecar");
    assert!((sidecar.volume - 1.0).abs() < 1e-12);
    assert_eq!(sidecar.inflows.len(), 1);
    assert!((sidecar.outflow(3).unwrap().area - 1.0).abs() < 1e-12);

    assert!(MeshStore::load(&dir, "missing").is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
