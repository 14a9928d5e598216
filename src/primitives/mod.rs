//! Procedurally generated meshes matching the raycaster's primitives: a
//! unit sphere and a unit box centered at the origin.
pub mod cube;
pub mod sphere;

pub use cube::box_mesh;
pub use sphere::sphere_mesh;
