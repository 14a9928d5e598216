use cgmath::{Vector3, Vector4, Zero};

/// Surface properties of a leaf, shared by the rasterizer and the raycaster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub emission: Vector3<f32>,
    pub shininess: f32,
    // Raycaster only: how much of the locally lit color survives
    pub absorption: f32,
    // Raycaster only: weight of the recursively traced reflection
    pub reflection: f32,
    pub transparency: f32,
    pub refractive_index: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vector3::zero(),
            diffuse: Vector3::zero(),
            specular: Vector3::zero(),
            emission: Vector3::zero(),
            shininess: 0.0,
            absorption: 1.0,
            reflection: 0.0,
            transparency: 0.0,
            refractive_index: 1.0,
        }
    }
}

/// A light source attached to a parent node.
///
/// `position.w` selects the kind of light: `1.0` for a point light and `0.0`
/// for a directional light, in which case `xyz` is the direction *towards*
/// the light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub position: Vector4<f32>,
    pub spot_direction: Vector3<f32>,
    /// Half-angle of the spot cone in degrees, 180 disables the cone.
    pub spot_cutoff: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            ambient: Vector3::zero(),
            diffuse: Vector3::zero(),
            specular: Vector3::zero(),
            position: Vector4::new(0.0, 0.0, 0.0, 1.0),
            spot_direction: Vector3::new(0.0, 0.0, -1.0),
            spot_cutoff: 180.0,
        }
    }
}

impl Light {
    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    pub fn is_spot(&self) -> bool {
        self.spot_cutoff < 180.0
    }
}
