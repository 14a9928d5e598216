//! Offline recursive raycaster over the scene tree.
//!
//! Leaves are matched to analytic primitives by their instance name, so the
//! raycaster never touches mesh data. Rays live in world space; each leaf
//! moves the ray into its own frame with the inverse modelview.

mod image_buffer;
mod ray;

pub use image_buffer::{ImageBuffer, ImageError};
pub use ray::{intersect_box, intersect_sphere, HitRecord, LocalHit, Primitive, Ray};

use cgmath::{
    Deg, ElementWise, EuclideanSpace, InnerSpace, Matrix, Matrix4, Point3, Rad, SquareMatrix,
    Transform, Vector3, Vector4, Zero,
};

use super::visitors::collect_lights;
use super::{GroupNode, LeafNode, Light, MatrixStack, NodeVisitor, ParentNode, SceneNode, TransformNode};

/// Offset applied along the normal before casting shadow rays
const SHADOW_EPSILON: f32 = 1e-3;
/// Offset applied along the normal before casting reflection rays
const REFLECTION_EPSILON: f32 = 1e-2;

#[derive(Debug, Clone, Copy)]
pub struct RaycastConfig {
    pub width: u32,
    pub height: u32,
    pub max_bounces: u32,
    pub background: Vector3<f32>,
    /// Vertical field of view
    pub fovy: Deg<f32>,
}

impl Default for RaycastConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            max_bounces: 5,
            background: Vector3::zero(),
            fovy: Deg(60.0),
        }
    }
}

/// Lights used when the scene does not define any
pub fn default_lights() -> Vec<Light> {
    let intensity = Vector3::new(0.5, 0.5, 0.5);
    [Vector4::new(0.0, 0.0, 30.0, 1.0), Vector4::new(0.0, 10.0, 0.0, 1.0)]
        .into_iter()
        .map(|position| Light {
            diffuse: intensity,
            specular: intensity,
            position,
            ..Default::default()
        })
        .collect()
}

pub struct RaycastRenderer {
    config: RaycastConfig,
}

impl RaycastRenderer {
    pub fn new(config: RaycastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RaycastConfig {
        &self.config
    }

    /// Renders the tree as seen through `view` (world to eye)
    pub fn render(&self, root: &SceneNode, view: Matrix4<f32>) -> ImageBuffer {
        let RaycastConfig { width, height, .. } = self.config;
        let mut image = ImageBuffer::new(width, height);
        let inv_view = match view.invert() {
            Some(inv) => inv,
            None => {
                log::error!("View matrix is not invertible, raycast left blank");
                return image;
            }
        };

        let tracer = Tracer::new(root, self.config.background);
        let eye = inv_view.transform_point(Point3::origin());
        let half_height = (Rad::from(self.config.fovy).0 * 0.5).tan();
        let aspect = width as f32 / height.max(1) as f32;

        log::info!(
            "Raycasting {}x{} with {} light(s)",
            width,
            height,
            tracer.lights.len()
        );
        for y in 0..height {
            for x in 0..width {
                // Pixel centers, y up in normalized device coordinates
                let ndc_x = (2.0 * (x as f32 + 0.5)) / width as f32 - 1.0;
                let ndc_y = 1.0 - (2.0 * (y as f32 + 0.5)) / height as f32;
                let on_plane = Point3::new(ndc_x * half_height * aspect, ndc_y * half_height, -1.0);
                let target = inv_view.transform_point(on_plane);
                let ray = Ray::new(eye, target - eye);
                image.set(x, y, tracer.cast(&ray, self.config.max_bounces));
            }
        }
        image
    }
}

/// Shading state shared by all rays of one render
struct Tracer<'a> {
    root: &'a SceneNode,
    lights: Vec<Light>,
    background: Vector3<f32>,
}

impl<'a> Tracer<'a> {
    fn new(root: &'a SceneNode, background: Vector3<f32>) -> Self {
        let mut lights = collect_lights(root, Matrix4::identity());
        if lights.is_empty() {
            lights = default_lights();
        }
        Self {
            root,
            lights,
            background,
        }
    }

    /// Follows a reflected ray, `bounce` is what is left of the budget
    fn trace(&self, ray: &Ray, bounce: u32) -> Vector3<f32> {
        if bounce == 0 {
            return self.background;
        }
        self.cast(ray, bounce)
    }

    /// Shades the first hit along `ray`, primary rays always get shaded
    fn cast(&self, ray: &Ray, bounce: u32) -> Vector3<f32> {
        match closest_hit(self.root, ray, 0.0, f32::INFINITY) {
            Some(hit) => self.shade(&hit, ray, bounce),
            None => self.background,
        }
    }

    fn shade(&self, hit: &HitRecord, ray: &Ray, bounce: u32) -> Vector3<f32> {
        let material = hit.material;
        let mut color = material.ambient;
        let to_eye = (ray.origin - hit.point).normalize();

        for light in &self.lights {
            let (to_light, distance) = if light.is_directional() {
                (light.position.truncate().normalize(), f32::INFINITY)
            } else {
                let offset = Point3::from_homogeneous(light.position) - hit.point;
                (offset.normalize(), offset.magnitude())
            };

            if light.is_spot() {
                let cos_angle = (-to_light).dot(light.spot_direction.normalize());
                if cos_angle < Rad::from(Deg(light.spot_cutoff)).0.cos() {
                    continue;
                }
            }

            let shadow_ray = Ray::new(hit.point + hit.normal * SHADOW_EPSILON, to_light);
            if closest_hit(self.root, &shadow_ray, SHADOW_EPSILON, distance).is_some() {
                continue;
            }

            let lambert = hit.normal.dot(to_light).max(0.0);
            let diffuse = (material.diffuse * lambert).mul_element_wise(light.diffuse);

            let reflected = reflect(-to_light, hit.normal);
            let phong = to_eye.dot(reflected).max(0.0).powf(material.shininess);
            let specular = (material.specular * phong).mul_element_wise(light.specular);

            color += diffuse + specular;
        }

        let mut reflection = Vector3::zero();
        if bounce > 0 && material.reflection > 0.0 {
            let bounced = Ray::new(
                hit.point + hit.normal * REFLECTION_EPSILON,
                reflect(ray.direction, hit.normal),
            );
            reflection = self.trace(&bounced, bounce - 1);
        }

        color * material.absorption + reflection * material.reflection
    }
}

fn reflect(incident: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    incident - normal * (2.0 * normal.dot(incident))
}

/// Closest hit over the whole tree with `t_min < t < t_max`
pub fn closest_hit<'a>(root: &'a SceneNode, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord<'a>> {
    let mut search = HitSearch {
        ray: *ray,
        t_min,
        t_max,
        stack: MatrixStack::default(),
        closest: None,
    };
    root.accept(&mut search);
    search.closest
}

struct HitSearch<'a> {
    ray: Ray,
    t_min: f32,
    t_max: f32,
    stack: MatrixStack,
    closest: Option<HitRecord<'a>>,
}

impl<'a> NodeVisitor<'a> for HitSearch<'a> {
    fn visit_group(&mut self, group: &'a GroupNode) {
        self.stack.push(group.anim_transform());
        for child in group.children() {
            child.accept(self);
        }
        self.stack.pop();
    }

    fn visit_leaf(&mut self, leaf: &'a LeafNode) {
        let primitive = match Primitive::from_instance(leaf.instance_of()) {
            Some(primitive) => primitive,
            None => return,
        };
        let model = self.stack.top();
        let inverse = match model.invert() {
            Some(inverse) => inverse,
            None => return,
        };

        let limit = self.closest.as_ref().map_or(self.t_max, |hit| hit.t);
        let local_ray = self.ray.transformed(&inverse);
        if let Some(local) = primitive.intersect(&local_ray, self.t_min, limit) {
            let normal = inverse
                .transpose()
                .transform_vector(local.normal)
                .normalize();
            self.closest = Some(HitRecord {
                t: local.t,
                point: model.transform_point(local.point),
                normal,
                material: leaf.material(),
                tex_coords: local.tex_coords,
            });
        }
    }

    fn visit_transform(&mut self, transform: &'a TransformNode) {
        self.stack.push(transform.transform());
        if let Some(child) = transform.child() {
            child.accept(self);
        }
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgraph::Material;
    use approx::assert_relative_eq;

    fn ball(name: &str, material: Material) -> SceneNode {
        let mut leaf = LeafNode::new(name, "sphere");
        leaf.set_material(material);
        leaf.into()
    }

    fn matte() -> Material {
        Material {
            ambient: Vector3::new(0.1, 0.1, 0.1),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            ..Default::default()
        }
    }

    fn fill_light() -> Light {
        Light {
            diffuse: Vector3::new(0.5, 0.5, 0.5),
            position: Vector4::new(-10.0, 0.0, 10.0, 1.0),
            ..Default::default()
        }
    }

    fn lit_scene(with_blocker: bool, with_fill: bool) -> SceneNode {
        let mut root = GroupNode::new("root");
        root.add_light(Light {
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            position: Vector4::new(10.0, 0.0, 10.0, 1.0),
            ..Default::default()
        });
        if with_fill {
            root.add_light(fill_light());
        }
        root.add_child(ball("target", matte()));
        if with_blocker {
            let mut blocker = TransformNode::translate("blocker-move", 5.0, 0.0, 5.5);
            let mut shrink = TransformNode::scale("blocker-size", 0.5, 0.5, 0.5);
            shrink.add_child(ball("blocker", matte()));
            blocker.add_child(shrink.into());
            root.add_child(blocker.into());
        }
        root.into()
    }

    fn down_z() -> Ray {
        Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn closest_hit_goes_through_transforms() {
        let mut scale = TransformNode::scale("grow", 2.0, 2.0, 2.0);
        scale.add_child(ball("ball", Material::default()));
        let mut near = TransformNode::translate("near", 0.0, 0.0, 3.0);
        near.add_child(LeafNode::new("cube", "box").into());
        let mut root = GroupNode::new("root");
        root.add_child(scale.into());
        root.add_child(near.into());
        let root: SceneNode = root.into();

        let hit = closest_hit(&root, &down_z(), 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 6.5, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vector3::unit_z(), epsilon = 1e-5);
        assert_relative_eq!(hit.point, Point3::new(0.0, 0.0, 3.5), epsilon = 1e-5);
    }

    #[test]
    fn unknown_instances_are_never_hit() {
        let root: SceneNode = LeafNode::new("pot", "teapot").into();
        assert!(closest_hit(&root, &down_z(), 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn shadowed_light_adds_nothing() {
        let open = lit_scene(false, false);
        let blocked = lit_scene(true, false);

        // The blocker sits between the hit point and the light only
        let open_tracer = Tracer::new(&open, Vector3::zero());
        let blocked_tracer = Tracer::new(&blocked, Vector3::zero());
        let open_color = open_tracer.trace(&down_z(), 5);
        let blocked_color = blocked_tracer.trace(&down_z(), 5);

        assert_relative_eq!(blocked_color, Vector3::new(0.1, 0.1, 0.1), epsilon = 1e-6);
        assert!(open_color.x > 0.5);
    }

    #[test]
    fn shadow_only_blocks_the_occluded_light() {
        // The blocker shades the key light, the fill light at -x stays clear
        let blocked = lit_scene(true, true);
        let color = Tracer::new(&blocked, Vector3::zero()).trace(&down_z(), 5);

        let to_fill = Vector3::new(-10.0f32, 0.0, 9.0).normalize();
        let fill_diffuse = 0.5 * to_fill.z;
        assert!(fill_diffuse > 0.3);
        assert_relative_eq!(
            color,
            Vector3::new(0.1, 0.1, 0.1) + Vector3::new(1.0, 1.0, 1.0) * fill_diffuse,
            epsilon = 1e-5
        );
    }

    #[test]
    fn primary_hits_are_shaded_without_bounces() {
        let mut scale = TransformNode::scale("grow", 10.0, 10.0, 10.0);
        scale.add_child(ball(
            "ball",
            Material {
                ambient: Vector3::new(0.0, 1.0, 0.0),
                ..Default::default()
            },
        ));
        let root: SceneNode = scale.into();
        let config = RaycastConfig {
            width: 3,
            height: 3,
            max_bounces: 0,
            background: Vector3::new(0.0, 0.0, 1.0),
            ..Default::default()
        };
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 50.0),
            Point3::origin(),
            Vector3::unit_y(),
        );
        let image = RaycastRenderer::new(config).render(&root, view);
        assert_relative_eq!(image.get(1, 1), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert_eq!(image.get(0, 0), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn miss_returns_background() {
        let root: SceneNode = GroupNode::new("empty").into();
        let config = RaycastConfig {
            width: 4,
            height: 3,
            background: Vector3::new(0.2, 0.3, 0.4),
            ..Default::default()
        };
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 10.0),
            Point3::origin(),
            Vector3::unit_y(),
        );
        let image = RaycastRenderer::new(config).render(&root, view);
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 3);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(image.get(x, y), Vector3::new(0.2, 0.3, 0.4));
            }
        }
    }

    #[test]
    fn center_pixel_sees_the_sphere() {
        let mut scale = TransformNode::scale("grow", 3.0, 3.0, 3.0);
        scale.add_child(ball(
            "ball",
            Material {
                ambient: Vector3::new(0.0, 0.0, 1.0),
                ..Default::default()
            },
        ));
        let root: SceneNode = scale.into();
        let config = RaycastConfig {
            width: 5,
            height: 5,
            ..Default::default()
        };
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 50.0),
            Point3::origin(),
            Vector3::unit_y(),
        );
        let image = RaycastRenderer::new(config).render(&root, view);
        assert_relative_eq!(image.get(2, 2).z, 1.0, epsilon = 1e-5);
        assert_eq!(image.get(0, 0), Vector3::zero());
    }

    #[test]
    fn mirror_blends_reflection() {
        // A mirror facing +Z reflects the ray back out where nothing is hit
        let mirror = Material {
            ambient: Vector3::new(0.4, 0.4, 0.4),
            absorption: 0.5,
            reflection: 0.5,
            ..Default::default()
        };
        let mut flat = TransformNode::scale("flat", 4.0, 4.0, 0.1);
        let mut leaf = LeafNode::new("mirror", "box");
        leaf.set_material(mirror);
        flat.add_child(leaf.into());
        let root: SceneNode = flat.into();

        let tracer = Tracer::new(&root, Vector3::new(1.0, 0.0, 0.0));
        let color = tracer.trace(&down_z(), 5);
        // Default lights sit in front of the mirror and add no diffuse or
        // specular here, so: 0.4 * 0.5 + background * 0.5
        assert_relative_eq!(color, Vector3::new(0.7, 0.2, 0.2), epsilon = 1e-5);
    }

    #[test]
    fn scene_lights_replace_defaults() {
        let lit = lit_scene(false, false);
        assert_eq!(Tracer::new(&lit, Vector3::zero()).lights.len(), 1);
        let dark: SceneNode = GroupNode::new("root").into();
        assert_eq!(Tracer::new(&dark, Vector3::zero()).lights, default_lights());
    }
}
