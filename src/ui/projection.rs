//! Maps simulation space onto canvas pixels and pointer positions back.
//!
//! Flat frames are letterboxed into the canvas with a uniform scale.
//! Perspective frames use a pinhole camera at `(0, eye_height, distance)`
//! looking down -z; the vertical field of view spans the canvas height.

use glam::Vec3;
use vivarium_data::{Frame, Projection, Tool};

/// Points closer to the camera than this are culled.
pub const NEAR: f32 = 0.1;

/// A projected point: canvas pixel position and pixels per world unit there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// Surface a pointer ray lands on for 3D tools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Plane {
    /// Horizontal plane `y = height`; yields `(x, z)`.
    Ground(f32),
    /// Vertical plane `z = depth` facing the camera; yields `(x, y)`.
    Facing(f32),
}

impl Plane {
    /// Which plane a tool's coordinates live on in a perspective exhibit.
    #[must_use]
    pub fn for_tool(tool: Tool) -> Self {
        match tool {
            Tool::Scare | Tool::Sonar => Plane::Facing(0.0),
            _ => Plane::Ground(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    canvas_width: f32,
    canvas_height: f32,
    world_width: f32,
    world_height: f32,
    projection: Projection,
}

impl Viewport {
    #[must_use]
    pub fn new(frame: &Frame, canvas_width: f32, canvas_height: f32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            world_width: frame.width.max(1.0),
            world_height: frame.height.max(1.0),
            projection: frame.projection,
        }
    }

    fn letterbox(&self) -> (f32, f32, f32) {
        let scale = (self.canvas_width / self.world_width).min(self.canvas_height / self.world_height);
        let ox = (self.canvas_width - self.world_width * scale) * 0.5;
        let oy = (self.canvas_height - self.world_height * scale) * 0.5;
        (scale, ox, oy)
    }

    fn half_height(&self) -> f32 {
        self.canvas_height * 0.5
    }

    /// Projects a simulation-space point, or `None` when it is behind the
    /// near plane.
    #[must_use]
    pub fn project(&self, x: f32, y: f32, z: f32) -> Option<Screen> {
        match self.projection {
            Projection::Flat => {
                let (scale, ox, oy) = self.letterbox();
                Some(Screen {
                    x: ox + x * scale,
                    y: oy + y * scale,
                    scale,
                })
            }
            Projection::Perspective {
                eye_height,
                distance,
                focal,
            } => {
                let rel = Vec3::new(x, y, z) - Vec3::new(0.0, eye_height, distance);
                let depth = -rel.z;
                if depth < NEAR {
                    return None;
                }
                let scale = focal * self.half_height() / depth;
                Some(Screen {
                    x: self.canvas_width * 0.5 + rel.x * scale,
                    y: self.half_height() - rel.y * scale,
                    scale,
                })
            }
        }
    }

    /// Maps a canvas pixel back to simulation coordinates.
    ///
    /// Flat frames ignore `plane`. Perspective frames cast a ray through the
    /// pixel and return where it meets `plane`, or `None` if it never does in
    /// front of the camera.
    #[must_use]
    pub fn unproject(&self, px: f32, py: f32, plane: Plane) -> Option<(f32, f32)> {
        match self.projection {
            Projection::Flat => {
                let (scale, ox, oy) = self.letterbox();
                Some(((px - ox) / scale, (py - oy) / scale))
            }
            Projection::Perspective {
                eye_height,
                distance,
                focal,
            } => {
                let k = focal * self.half_height();
                let dir = Vec3::new(
                    (px - self.canvas_width * 0.5) / k,
                    (self.half_height() - py) / k,
                    -1.0,
                );
                let eye = Vec3::new(0.0, eye_height, distance);
                let t = match plane {
                    Plane::Ground(h) if dir.y.abs() > f32::EPSILON => (h - eye.y) / dir.y,
                    Plane::Ground(_) => return None,
                    Plane::Facing(d) => eye.z - d,
                };
                if t < NEAR {
                    return None;
                }
                let hit = eye + dir * t;
                Some(match plane {
                    Plane::Ground(_) => (hit.x, hit.z),
                    Plane::Facing(_) => (hit.x, hit.y),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivarium_data::Rgba;

    fn perspective(eye_height: f32, distance: f32) -> Frame {
        let mut frame = Frame::flat(0, 40.0, 40.0, Rgba::BLACK);
        frame.projection = Projection::Perspective {
            eye_height,
            distance,
            focal: 1.0 / (30.0_f32).to_radians().tan(),
        };
        frame
    }

    #[test]
    fn test_flat_letterbox() {
        let frame = Frame::flat(0, 800.0, 600.0, Rgba::BLACK);
        let view = Viewport::new(&frame, 400.0, 400.0);
        let s = view.project(400.0, 300.0, 0.0).unwrap();
        assert!((s.scale - 0.5).abs() < 1e-6);
        assert!((s.x - 200.0).abs() < 1e-4);
        assert!((s.y - 200.0).abs() < 1e-4);
        let (x, y) = view.unproject(s.x, s.y, Plane::Ground(0.0)).unwrap();
        assert!((x - 400.0).abs() < 1e-3 && (y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_points_behind_camera_are_culled() {
        let view = Viewport::new(&perspective(0.0, 0.0), 800.0, 600.0);
        assert!(view.project(0.0, 0.0, 5.0).is_none());
        assert!(view.project(0.0, 0.0, -0.05).is_none());
        let ahead = view.project(0.0, 0.0, -10.0).unwrap();
        assert!((ahead.x - 400.0).abs() < 1e-4);
        assert!((ahead.y - 300.0).abs() < 1e-4);
    }

    #[test]
    fn test_farther_is_smaller() {
        let view = Viewport::new(&perspective(5.0, 25.0), 800.0, 600.0);
        let near = view.project(1.0, 0.0, 10.0).unwrap();
        let far = view.project(1.0, 0.0, -10.0).unwrap();
        assert!(near.scale > far.scale);
    }

    #[test]
    fn test_ground_pick_inverts_projection() {
        let view = Viewport::new(&perspective(3.0, 8.0), 800.0, 600.0);
        let s = view.project(2.0, 0.0, -4.0).unwrap();
        let (x, z) = view.unproject(s.x, s.y, Plane::Ground(0.0)).unwrap();
        assert!((x - 2.0).abs() < 1e-3, "x = {x}");
        assert!((z + 4.0).abs() < 1e-3, "z = {z}");
    }

    #[test]
    fn test_facing_pick_inverts_projection() {
        let view = Viewport::new(&perspective(0.0, 15.0), 800.0, 600.0);
        let s = view.project(-3.0, 2.0, 0.0).unwrap();
        let (x, y) = view.unproject(s.x, s.y, Plane::Facing(0.0)).unwrap();
        assert!((x + 3.0).abs() < 1e-3 && (y - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_sky_pixel_misses_ground() {
        let view = Viewport::new(&perspective(3.0, 8.0), 800.0, 600.0);
        assert!(view.unproject(400.0, 10.0, Plane::Ground(0.0)).is_none());
    }

    #[test]
    fn test_tool_planes() {
        assert_eq!(Plane::for_tool(Tool::Sonar), Plane::Facing(0.0));
        assert_eq!(Plane::for_tool(Tool::Plant), Plane::Ground(0.0));
    }
}
