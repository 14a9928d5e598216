use std::time::Instant;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};
use winit::{dpi::PhysicalPosition, event::*};

/// wgpu clips depth to `[0, 1]` where cgmath's projection targets `[-1, 1]`
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const INITIAL_PITCH: Deg<f32> = Deg(20.0);
const INITIAL_YAW: Deg<f32> = Deg(-135.0);
// Pressing R switches to an isometric looking view
const RESET_PITCH: Deg<f32> = Deg(-35.264);
const RESET_YAW: Deg<f32> = Deg(-135.0);

/// Camera circling `target` at a fixed distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub pitch: Deg<f32>,
    pub yaw: Deg<f32>,
    pub radius: f32,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub aspect: f32,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            pitch: INITIAL_PITCH,
            yaw: INITIAL_YAW,
            radius: 350.0,
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            aspect: 1.0,
            fovy: Deg(60.0),
            znear: 0.1,
            zfar: 10000.0,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Point3<f32> {
        let pitch = Rad::from(self.pitch).0;
        let yaw = Rad::from(self.yaw).0;
        self.target
            + Vector3::new(
                self.radius * pitch.cos() * yaw.sin(),
                self.radius * pitch.sin(),
                self.radius * pitch.cos() * yaw.cos(),
            )
    }

    /// World to eye
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn rotate(&mut self, pitch: Deg<f32>, yaw: Deg<f32>) {
        self.pitch += pitch;
        self.yaw += yaw;
    }

    pub fn reset(&mut self) {
        self.pitch = RESET_PITCH;
        self.yaw = RESET_YAW;
    }
}

/// Turns left-button drags into camera rotations
pub struct CameraController {
    // Degrees of rotation per pixel of mouse travel
    sensitivity: f32,
    is_mouse_left_pressed: bool,
    // Last seen cursor position while dragging
    mouse_previous_position: Option<PhysicalPosition<f64>>,
}

impl CameraController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            is_mouse_left_pressed: false,
            mouse_previous_position: None,
        }
    }

    pub fn process_mouse_input(&mut self, state: &ElementState, button: &MouseButton) {
        if *button == MouseButton::Left {
            self.is_mouse_left_pressed = *state == ElementState::Pressed;
            if !self.is_mouse_left_pressed {
                self.mouse_previous_position = None;
            }
        }
    }

    /// Rotates the camera by the cursor travel since the last event while
    /// the left button is held
    pub fn process_mouse_moved(&mut self, position: PhysicalPosition<f64>, camera: &mut OrbitCamera) {
        if !self.is_mouse_left_pressed {
            return;
        }
        if let Some(previous) = self.mouse_previous_position {
            let yaw = (previous.x - position.x) as f32 * self.sensitivity;
            let pitch = (position.y - previous.y) as f32 * self.sensitivity;
            camera.rotate(Deg(pitch), Deg(yaw));
        }
        self.mouse_previous_position = Some(position);
    }
}

/// Per-window interaction state handed to the render entry points
pub struct ViewSession {
    pub camera: OrbitCamera,
    pub controller: CameraController,
    started: Instant,
    dump_raycast: bool,
}

impl ViewSession {
    pub fn new(aspect: f32) -> Self {
        Self {
            camera: OrbitCamera {
                aspect,
                ..Default::default()
            },
            controller: CameraController::new(0.1),
            started: Instant::now(),
            dump_raycast: false,
        }
    }

    /// Seconds since the session started
    pub fn elapsed(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Handles session keys, returns `true` when the key was used
    pub fn process_keyboard(&mut self, state: &ElementState, keycode: &VirtualKeyCode) -> bool {
        if *state != ElementState::Pressed {
            return false;
        }
        match keycode {
            VirtualKeyCode::R => {
                self.camera.reset();
                true
            }
            VirtualKeyCode::S => {
                self.dump_raycast = true;
                true
            }
            _ => false,
        }
    }

    pub fn process_mouse_input(&mut self, state: &ElementState, button: &MouseButton) {
        self.controller.process_mouse_input(state, button);
    }

    pub fn process_mouse_moved(&mut self, position: PhysicalPosition<f64>) {
        self.controller.process_mouse_moved(position, &mut self.camera);
    }

    /// Returns whether a raycast dump was requested since the last call
    pub fn take_raycast_request(&mut self) -> bool {
        std::mem::replace(&mut self.dump_raycast, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{InnerSpace, Transform};

    #[test]
    fn eye_sits_on_the_orbit() {
        let camera = OrbitCamera::default();
        let eye = camera.eye();
        assert_relative_eq!((eye - camera.target).magnitude(), 350.0, epsilon = 1e-3);
        // Positive pitch looks down from above, yaw -135 puts the eye at -x -z
        assert!(eye.y > 0.0 && eye.x < 0.0 && eye.z < 0.0);
    }

    #[test]
    fn view_moves_target_in_front_of_the_eye() {
        let camera = OrbitCamera::default();
        let target = camera.view_matrix().transform_point(camera.target);
        assert_relative_eq!(target, Point3::new(0.0, 0.0, -350.0), epsilon = 1e-2);
    }

    #[test]
    fn drag_rotates_and_release_stops() {
        let mut session = ViewSession::new(1.0);
        let start = session.camera;

        session.process_mouse_moved(PhysicalPosition::new(10.0, 10.0));
        assert_eq!(session.camera, start);

        session.process_mouse_input(&ElementState::Pressed, &MouseButton::Left);
        session.process_mouse_moved(PhysicalPosition::new(10.0, 10.0));
        session.process_mouse_moved(PhysicalPosition::new(0.0, 30.0));
        assert_relative_eq!(session.camera.yaw.0, start.yaw.0 + 1.0, epsilon = 1e-5);
        assert_relative_eq!(session.camera.pitch.0, start.pitch.0 + 2.0, epsilon = 1e-5);

        session.process_mouse_input(&ElementState::Released, &MouseButton::Left);
        let released = session.camera;
        session.process_mouse_moved(PhysicalPosition::new(100.0, 100.0));
        assert_eq!(session.camera, released);
    }

    #[test]
    fn keys_reset_and_request_raycast() {
        let mut session = ViewSession::new(1.0);
        session.camera.rotate(Deg(5.0), Deg(5.0));

        assert!(session.process_keyboard(&ElementState::Pressed, &VirtualKeyCode::R));
        assert_eq!(session.camera.pitch, RESET_PITCH);
        assert_eq!(session.camera.yaw, RESET_YAW);

        assert!(!session.take_raycast_request());
        assert!(!session.process_keyboard(&ElementState::Released, &VirtualKeyCode::S));
        assert!(session.process_keyboard(&ElementState::Pressed, &VirtualKeyCode::S));
        assert!(session.take_raycast_request());
        assert!(!session.take_raycast_request());
    }
}
