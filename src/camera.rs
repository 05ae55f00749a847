use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::selector::Projector;

/// Orbit camera around a target point: drag to rotate, scroll to zoom.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,   // Radians around +Y
    pub pitch: f32, // Radians, clamped short of the poles
    pub fov_y: f32,
}

const MIN_DISTANCE: f32 = 50.0;
const MAX_DISTANCE: f32 = 20_000.0;
const PITCH_LIMIT: f32 = 1.55;

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 1000.0,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 60f32.to_radians(),
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let dir = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + dir * self.distance
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * 0.01;
        self.pitch = (self.pitch + delta.y * 0.01).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance * (-scroll * 0.002).exp()).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Freeze the camera for one frame drawn into `viewport`, whose top-left
    /// corner sits at `origin` in screen pixels.
    pub fn view(&self, origin: Vec2, viewport: Vec2) -> CameraView {
        let aspect = if viewport.y > 0.0 { viewport.x / viewport.y } else { 1.0 };
        let near = (self.distance * 0.001).max(0.1);
        let far = self.distance * 10.0 + MAX_DISTANCE;
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(self.fov_y, aspect, near, far);
        CameraView {
            view_proj: proj * view,
            origin,
            viewport,
            fov_y: self.fov_y,
        }
    }
}

/// A camera snapshot bound to one viewport.
#[derive(Clone, Copy, Debug)]
pub struct CameraView {
    view_proj: Mat4,
    origin: Vec2,
    viewport: Vec2,
    fov_y: f32,
}

impl CameraView {
    /// Distance along the view axis, negative or zero behind the camera.
    pub fn depth(&self, world: Vec3) -> f32 {
        (self.view_proj * world.extend(1.0)).w
    }

    /// Screen pixels covered by one world unit at `world`'s depth.
    pub fn pixels_per_unit(&self, world: Vec3) -> f32 {
        let depth = self.depth(world);
        if depth <= 0.0 {
            return 0.0;
        }
        self.viewport.y / (2.0 * (self.fov_y * 0.5).tan() * depth)
    }
}

impl Projector for CameraView {
    fn is_visible(&self, world: Vec3) -> bool {
        self.depth(world) > 0.0
    }

    fn world_to_screen(&self, world: Vec3) -> Vec2 {
        let clip = self.view_proj * world.extend(1.0);
        let ndc = if clip.w.abs() > f32::EPSILON { clip.xy() / clip.w } else { clip.xy() };
        self.origin
            + Vec2::new(
                (ndc.x + 1.0) * 0.5 * self.viewport.x,
                (1.0 - ndc.y) * 0.5 * self.viewport.y,
            )
    }
}
