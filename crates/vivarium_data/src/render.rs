use serde::{Deserialize, Serialize};

/// 8-bit color with a floating alpha, serialized as a plain struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::hex(0xffffff);
    pub const BLACK: Rgba = Rgba::hex(0x000000);

    /// Opaque color from a `0xRRGGBB` literal.
    #[must_use]
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
            a: 1.0,
        }
    }

    #[must_use]
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Linear blend toward `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }

    #[must_use]
    pub fn to_css(&self) -> String {
        format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Circle { radius: f32 },
    Ellipse { rx: f32, ry: f32 },
    /// Centered on the sprite position.
    Rect { w: f32, h: f32 },
    /// Segment from the sprite position to position + (dx, dy).
    Line { dx: f32, dy: f32, width: f32 },
    Ring { radius: f32, width: f32 },
    Star { outer: f32, inner: f32, points: u8 },
}

/// One drawable element of a frame.
///
/// Coordinates are in simulation space; the frame's [`Projection`] says how
/// to map them onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub shape: Shape,
    pub color: Rgba,
    pub rotation: f32,
    pub layer: i8,
}

impl Sprite {
    #[must_use]
    pub fn new(x: f32, y: f32, shape: Shape, color: Rgba) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            shape,
            color,
            rotation: 0.0,
            layer: 0,
        }
    }

    #[must_use]
    pub fn circle(x: f32, y: f32, radius: f32, color: Rgba) -> Self {
        Self::new(x, y, Shape::Circle { radius }, color)
    }

    #[must_use]
    pub fn ellipse(x: f32, y: f32, rx: f32, ry: f32, color: Rgba) -> Self {
        Self::new(x, y, Shape::Ellipse { rx, ry }, color)
    }

    #[must_use]
    pub fn rect(x: f32, y: f32, w: f32, h: f32, color: Rgba) -> Self {
        Self::new(x, y, Shape::Rect { w, h }, color)
    }

    #[must_use]
    pub fn line(x: f32, y: f32, dx: f32, dy: f32, width: f32, color: Rgba) -> Self {
        Self::new(x, y, Shape::Line { dx, dy, width }, color)
    }

    #[must_use]
    pub fn at_depth(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    #[must_use]
    pub fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn on_layer(mut self, layer: i8) -> Self {
        self.layer = layer;
        self
    }

    /// Scales position and extent about `(cx, cy)`, as a camera zoom would.
    #[must_use]
    pub fn scaled_about(mut self, cx: f32, cy: f32, k: f32) -> Self {
        self.x = cx + (self.x - cx) * k;
        self.y = cy + (self.y - cy) * k;
        self.shape = self.shape.scaled(k);
        self
    }
}

impl Shape {
    #[must_use]
    pub fn scaled(self, k: f32) -> Self {
        match self {
            Shape::Circle { radius } => Shape::Circle { radius: radius * k },
            Shape::Ellipse { rx, ry } => Shape::Ellipse {
                rx: rx * k,
                ry: ry * k,
            },
            Shape::Rect { w, h } => Shape::Rect { w: w * k, h: h * k },
            Shape::Line { dx, dy, width } => Shape::Line {
                dx: dx * k,
                dy: dy * k,
                width: width * k,
            },
            Shape::Ring { radius, width } => Shape::Ring {
                radius: radius * k,
                width: width * k,
            },
            Shape::Star {
                outer,
                inner,
                points,
            } => Shape::Star {
                outer: outer * k,
                inner: inner * k,
                points,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Sprites are already in canvas pixels of a `width` x `height` world.
    Flat,
    /// Pinhole camera at `(0, eye_height, distance)` looking down -z.
    Perspective {
        eye_height: f32,
        distance: f32,
        focal: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    pub background: Rgba,
    pub projection: Projection,
    pub sprites: Vec<Sprite>,
}

impl Frame {
    #[must_use]
    pub fn flat(tick: u64, width: f32, height: f32, background: Rgba) -> Self {
        Self {
            tick,
            width,
            height,
            background,
            projection: Projection::Flat,
            sprites: Vec::new(),
        }
    }

    /// Sorts sprites by layer, then back to front for perspective frames.
    pub fn sort_for_painting(&mut self) {
        let by_depth = matches!(self.projection, Projection::Perspective { .. });
        self.sprites.sort_by(|a, b| {
            a.layer.cmp(&b.layer).then_with(|| {
                if by_depth {
                    a.z.total_cmp(&b.z)
                } else {
                    std::cmp::Ordering::Equal
                }
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_css() {
        let c = Rgba::hex(0xff8000).with_alpha(0.5);
        assert_eq!((c.r, c.g, c.b), (255, 128, 0));
        assert_eq!(c.to_css(), "rgba(255,128,0,0.500)");
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Rgba::BLACK;
        let b = Rgba::WHITE;
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 2.0), b);
    }

    #[test]
    fn test_painting_order_is_stable_within_layer() {
        let mut frame = Frame::flat(0, 10.0, 10.0, Rgba::BLACK);
        frame.sprites.push(Sprite::circle(1.0, 0.0, 1.0, Rgba::WHITE).on_layer(2));
        frame.sprites.push(Sprite::circle(2.0, 0.0, 1.0, Rgba::WHITE));
        frame.sprites.push(Sprite::circle(3.0, 0.0, 1.0, Rgba::WHITE));
        frame.sort_for_painting();
        let xs: Vec<f32> = frame.sprites.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_zoom_about_center() {
        let s = Sprite::circle(60.0, 50.0, 2.0, Rgba::WHITE).scaled_about(50.0, 50.0, 2.0);
        assert_eq!((s.x, s.y), (70.0, 50.0));
        assert_eq!(s.shape, Shape::Circle { radius: 4.0 });
    }

    #[test]
    fn test_frame_serializes_shape_tag() {
        let sprite = Sprite::circle(0.0, 0.0, 2.0, Rgba::WHITE);
        let json = serde_json::to_string(&sprite).unwrap();
        assert!(json.contains("\"shape\":\"circle\""));
    }
}
