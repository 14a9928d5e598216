use std::fs;
use std::path::Path;

use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};
use sgraph_viewer::primitives;
use sgraph_viewer::resources::{load_scene, ObjMeshLoader};
use sgraph_viewer::sgraph::raycast::{RaycastConfig, RaycastRenderer};
use sgraph_viewer::sgraph::visitors::{collect_lights, TextRenderer};
use sgraph_viewer::sgraph::{MeshError, ParseError, PolygonMesh, SceneNode, ScenegraphImporter};

fn primitive_loader(path: &Path) -> Result<PolygonMesh, MeshError> {
    if path.to_string_lossy().contains("box") {
        Ok(primitives::box_mesh())
    } else {
        Ok(primitives::sphere_mesh(1.0, 16, 8))
    }
}

#[test]
fn bundled_spheres_scene_loads() {
    let scenegraph = load_scene(Path::new("scenes/spheres.txt")).unwrap();
    assert_eq!(scenegraph.root().name(), "scene");
    assert!(scenegraph.meshes().contains_key("sphere"));
    assert!(scenegraph.meshes().contains_key("box"));

    // The copied subtree keeps the node names of its source
    let dump = TextRenderer::render(scenegraph.root());
    assert_eq!(dump.matches("- red-sphere").count(), 2);
    assert!(dump.starts_with("- scene\n    - red-translate\n"));

    let lights = collect_lights(scenegraph.root(), Matrix4::identity());
    assert_eq!(lights.len(), 2);
}

#[test]
fn bundled_textured_scene_imports_snowman() {
    let scenegraph = load_scene(Path::new("scenes/textured.txt")).unwrap();
    let snowman = scenegraph.get_node("snowman").unwrap();
    assert_eq!(snowman.children().len(), 3);
    assert!(scenegraph.texture_paths().contains_key("checker"));

    let crate_leaf = scenegraph
        .get_node("crate-box")
        .and_then(SceneNode::as_leaf)
        .unwrap();
    assert_eq!(crate_leaf.texture(), "checker");
}

#[test]
fn obj_loader_reads_bundled_meshes() {
    use sgraph_viewer::sgraph::MeshLoader;

    let cube = ObjMeshLoader.load(Path::new("scenes/models/box.obj")).unwrap();
    assert_eq!(cube.primitive_count(), 12);
    let (min, max) = cube.bounds();
    assert_eq!(min, Vector3::new(-0.5, -0.5, -0.5));
    assert_eq!(max, Vector3::new(0.5, 0.5, 0.5));

    let sphere = ObjMeshLoader.load(Path::new("scenes/models/sphere.obj")).unwrap();
    let (min, max) = sphere.bounds();
    assert!((max.y - 1.0).abs() < 1e-4 && (min.y + 1.0).abs() < 1e-4);
}

#[test]
fn import_resolves_relative_to_the_importing_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("parts")).unwrap();
    fs::write(
        dir.path().join("parts/arm.txt"),
        "instance box box.obj
         leaf hand hand instanceof box
         translate t arm 0 1 0
         add-child hand t
         assign-root t",
    )
    .unwrap();
    fs::write(
        dir.path().join("main.txt"),
        "import arm parts/arm.txt
         group root body
         add-child arm root
         assign-root root",
    )
    .unwrap();

    let scenegraph = ScenegraphImporter::new(&primitive_loader)
        .parse_file(&dir.path().join("main.txt"))
        .unwrap();
    assert_eq!(
        TextRenderer::render(scenegraph.root()),
        "- body\n    - arm\n        - hand\n"
    );
    // Meshes of the imported file stay with it
    assert!(scenegraph.meshes().is_empty());
}

#[test]
fn broken_import_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.txt"), "frobnicate everything").unwrap();
    fs::write(
        dir.path().join("main.txt"),
        "import part bad.txt
         group root root
         assign-root root",
    )
    .unwrap();

    let err = ScenegraphImporter::new(&primitive_loader)
        .parse_file(&dir.path().join("main.txt"))
        .unwrap_err();
    match err {
        ParseError::Import { source, .. } => {
            assert!(matches!(*source, ParseError::UnknownCommand(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn raycast_of_parsed_scene_sees_geometry() {
    let scenegraph = ScenegraphImporter::new(&primitive_loader)
        .parse(
            "instance sphere sphere.obj
             material white
                 ambient 0.2 0.2 0.2
                 diffuse 0.8 0.8 0.8
             end-material
             leaf ball ball instanceof sphere
             assign-material ball white
             scale big big 10 10 10
             add-child ball big
             assign-root big",
        )
        .unwrap();

    let config = RaycastConfig {
        width: 9,
        height: 9,
        background: Vector3::new(0.0, 0.0, 1.0),
        ..Default::default()
    };
    let view = Matrix4::look_at_rh(Point3::new(0.0, 0.0, 100.0), Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());
    let image = RaycastRenderer::new(config).render(scenegraph.root(), view);

    // Center pixel hits the sphere, corners see the background
    let center = image.get(4, 4);
    assert!(center.x > 0.2 && center.z < 1.0);
    assert_eq!(image.get(0, 0), Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(image.get(8, 8), Vector3::new(0.0, 0.0, 1.0));
}

#[test]
fn headless_raycast_writes_ppm() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("frame.ppm");
    let root: SceneNode = sgraph_viewer::sgraph::GroupNode::new("empty").into();
    let config = RaycastConfig {
        width: 2,
        height: 2,
        ..Default::default()
    };

    sgraph_viewer::raycast_to_file(&root, Matrix4::identity(), config, &output).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "P3\n2 2\n255\n0 0 0  0 0 0\n0 0 0  0 0 0\n");
}
