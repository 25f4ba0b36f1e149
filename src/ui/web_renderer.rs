use crate::ui::projection::{Screen, Viewport};
use std::f64::consts::TAU;
use vivarium_data::{Frame, Shape, Sprite};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// Draws a [`Frame`] onto a 2D canvas context.
pub struct WebRenderer {
    width: f64,
    height: f64,
}

impl WebRenderer {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn render(&self, ctx: &CanvasRenderingContext2d, frame: &Frame) -> Result<(), JsValue> {
        ctx.set_global_alpha(1.0);
        ctx.set_fill_style(&JsValue::from_str(&frame.background.to_css()));
        ctx.fill_rect(0.0, 0.0, self.width, self.height);

        let view = Viewport::new(frame, self.width as f32, self.height as f32);
        let mut sprites = frame.clone();
        sprites.sort_for_painting();

        for sprite in &sprites.sprites {
            let Some(at) = view.project(sprite.x, sprite.y, sprite.z) else {
                continue;
            };
            self.draw_sprite(ctx, &view, sprite, at)?;
        }
        Ok(())
    }

    fn draw_sprite(
        &self,
        ctx: &CanvasRenderingContext2d,
        view: &Viewport,
        sprite: &Sprite,
        at: Screen,
    ) -> Result<(), JsValue> {
        let css = JsValue::from_str(&sprite.color.to_css());
        let (x, y, k) = (at.x as f64, at.y as f64, at.scale as f64);
        let rotation = sprite.rotation as f64;

        match sprite.shape {
            Shape::Circle { radius } => {
                ctx.set_fill_style(&css);
                ctx.begin_path();
                ctx.arc(x, y, (radius as f64 * k).max(0.5), 0.0, TAU)?;
                ctx.fill();
            }
            Shape::Ellipse { rx, ry } => {
                ctx.set_fill_style(&css);
                ctx.begin_path();
                ctx.ellipse(
                    x,
                    y,
                    (rx as f64 * k).max(0.5),
                    (ry as f64 * k).max(0.5),
                    rotation,
                    0.0,
                    TAU,
                )?;
                ctx.fill();
            }
            Shape::Rect { w, h } => {
                let (w, h) = (w as f64 * k, h as f64 * k);
                ctx.set_fill_style(&css);
                ctx.save();
                ctx.translate(x, y)?;
                ctx.rotate(rotation)?;
                ctx.fill_rect(-w / 2.0, -h / 2.0, w, h);
                ctx.restore();
            }
            Shape::Line { dx, dy, width } => {
                // Perspective lines keep their far end in world space.
                let Some(end) = view.project(sprite.x + dx, sprite.y + dy, sprite.z) else {
                    return Ok(());
                };
                ctx.set_stroke_style(&css);
                ctx.set_line_width((width as f64 * k).max(0.5));
                ctx.begin_path();
                ctx.move_to(x, y);
                ctx.line_to(end.x as f64, end.y as f64);
                ctx.stroke();
            }
            Shape::Ring { radius, width } => {
                ctx.set_stroke_style(&css);
                ctx.set_line_width((width as f64 * k).max(0.5));
                ctx.begin_path();
                ctx.arc(x, y, (radius as f64 * k).max(0.5), 0.0, TAU)?;
                ctx.stroke();
            }
            Shape::Star {
                outer,
                inner,
                points,
            } => {
                let points = points.max(2) as usize;
                ctx.set_fill_style(&css);
                ctx.begin_path();
                for i in 0..points * 2 {
                    let r = f64::from(if i % 2 == 0 { outer } else { inner }) * k;
                    let a = rotation + i as f64 * TAU / (points * 2) as f64;
                    let (px, py) = (x + r * a.cos(), y + r * a.sin());
                    if i == 0 {
                        ctx.move_to(px, py);
                    } else {
                        ctx.line_to(px, py);
                    }
                }
                ctx.close_path();
                ctx.fill();
            }
        }
        Ok(())
    }
}
