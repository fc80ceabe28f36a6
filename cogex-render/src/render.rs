use crate::layout::{ArrowSide, Bounds, ItemKind, Layout, LayoutItem, TextMeasure, BODY_PX};
use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{Context, Result};
use cogex_timing::{HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use string_cache::DefaultAtom as Atom;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Stroke, Transform,
};
use tracing::debug;

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const FOREGROUND: [u8; 4] = [255, 255, 255, 255];
const DIMMED: [u8; 4] = [110, 110, 110, 255];
const BUTTON_FILL: [u8; 4] = [40, 90, 200, 255];
const BUTTON_FILL_DISABLED: [u8; 4] = [60, 60, 60, 255];

pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontVec::try_from_vec(bytes).with_context(|| format!("parsing font {}", path.display()))
}

#[derive(Hash, Eq, PartialEq, Clone)]
struct TextKey {
    text: Atom,
    size_bits: u32, // f32 bits for exact size matching
    color: [u8; 4],
}

struct TextCache {
    font: FontVec,
    map: HashMap<TextKey, Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontVec) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, text: &str, size_px: f32, color: [u8; 4]) -> Option<Arc<Pixmap>> {
        let key = TextKey {
            text: Atom::from(text),
            size_bits: size_px.to_bits(),
            color,
        };
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(text, size_px, &self.font, color)?);
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }

    fn width(&self, text: &str, size_px: f32) -> f32 {
        let sf = self.font.as_scaled(PxScale::from(size_px));
        let mut prev = None;
        let mut w = 0.0;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = prev {
                w += sf.kern(prev, id);
            }
            w += sf.h_advance(id);
            prev = Some(id);
        }
        w
    }
}

/// Rasterizes one line of text into a tight, transparent, premultiplied
/// pixmap. `None` for text without any visible glyph.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    font: &impl Font,
    color: [u8; 4],
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // 1) Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    // 2) Union pixel bounds from outlined glyphs
    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let first = outlines.first()?.px_bounds();
    let (mut min_x, mut min_y, mut max_x, mut max_y) =
        (first.min.x, first.min.y, first.max.x, first.max.y);
    for out in &outlines[1..] {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    // 3) Rasterize with premultiplied alpha blending
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * color[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sr = (color[0] as f32 * a_lin) as u8;
            let sg = (color[1] as f32 * a_lin) as u8;
            let sb = (color[2] as f32 * a_lin) as u8;
            let sa = (a_lin * 255.0) as u8;

            // Porter-Duff over: out = src + bg * (1 - src.a)
            let bg = dst[i];
            let inv = 1.0 - (sa as f32 / 255.0);
            let r = sr.saturating_add((bg.red() as f32 * inv) as u8);
            let g = sg.saturating_add((bg.green() as f32 * inv) as u8);
            let b = sb.saturating_add((bg.blue() as f32 * inv) as u8);
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);

            if let Some(px) = PremultipliedColorU8::from_rgba(r.min(a), g.min(a), b.min(a), a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Blends a premultiplied `src` onto `dst` with its top-left at `(x, y)`,
/// clipping at the canvas edges. Fully opaque rows are copied.
pub fn blit_pixmap(dst: &mut Pixmap, src: &Pixmap, x: i32, y: i32) {
    let (cw, ch) = (dst.width() as i32, dst.height() as i32);
    let (w, h) = (src.width() as i32, src.height() as i32);
    if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
        return;
    }

    let dst_x = x.max(0) as usize;
    let dst_y = y.max(0) as usize;
    let src_x = (-x).max(0) as usize;
    let src_y = (-y).max(0) as usize;
    let copy_w = ((w - src_x as i32).min(cw - dst_x as i32)) as usize;
    let copy_h = ((h - src_y as i32).min(ch - dst_y as i32)) as usize;

    let src_stride = src.width() as usize * 4;
    let dst_stride = dst.width() as usize * 4;
    let src_data = src.data();
    let dst_data = dst.data_mut();

    for row in 0..copy_h {
        let s0 = (src_y + row) * src_stride + src_x * 4;
        let d0 = (dst_y + row) * dst_stride + dst_x * 4;
        let s_row = &src_data[s0..s0 + copy_w * 4];
        let d_row = &mut dst_data[d0..d0 + copy_w * 4];

        if s_row.iter().skip(3).step_by(4).all(|&a| a == 255) {
            d_row.copy_from_slice(s_row);
            continue;
        }
        for (s, d) in s_row.chunks_exact(4).zip(d_row.chunks_exact_mut(4)) {
            let inv = 255 - s[3] as u32;
            for c in 0..4 {
                d[c] = (s[c] as u32 + (d[c] as u32 * inv + 127) / 255).min(255) as u8;
            }
        }
    }
}

fn paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
    paint.anti_alias = true;
    paint
}

fn rect(b: Bounds) -> Option<Rect> {
    Rect::from_xywh(b.x, b.y, b.w.max(1.0), b.h.max(1.0))
}

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub items: usize,
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    text_cache: TextCache,
    canvas: Pixmap,
    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontVec) -> Result<Self> {
        let canvas = Pixmap::new(width.max(1), height.max(1))
            .with_context(|| format!("creating {width}x{height} canvas"))?;
        Ok(Self {
            width,
            height,
            text_cache: TextCache::new(font),
            canvas,
            timer: HighPrecisionTimer::new(),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width.max(1), new_height.max(1))
            .with_context(|| format!("resizing canvas to {new_width}x{new_height}"))?;
        self.width = new_width;
        self.height = new_height;
        debug!(new_width, new_height, "renderer resized");
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Draws `layout` and copies the result into an RGBA `frame_buffer` of
    /// the renderer's size. An empty layout clears the frame.
    pub fn render_frame(&mut self, layout: &Layout, frame_buffer: &mut [u8]) -> Result<FrameStats> {
        let t_draw = self.timer.now();
        let bg = BACKGROUND;
        self.canvas
            .fill(Color::from_rgba8(bg[0], bg[1], bg[2], bg[3]));
        for item in &layout.items {
            self.draw_item(item);
        }
        let draw = self.timer.elapsed(t_draw);

        let t_copy = self.timer.now();
        let data = self.canvas.data();
        anyhow::ensure!(
            frame_buffer.len() == data.len(),
            "frame buffer is {} bytes, canvas is {}",
            frame_buffer.len(),
            data.len()
        );
        frame_buffer.copy_from_slice(data);
        let copy = self.timer.elapsed(t_copy);

        Ok(FrameStats {
            draw,
            copy,
            total: draw + copy,
            items: layout.items.len(),
        })
    }

    fn draw_item(&mut self, item: &LayoutItem) {
        let b = item.bounds;
        match &item.kind {
            ItemKind::Text {
                text,
                size_px,
                color,
            } => self.draw_text_centered(text, *size_px, *color, b.center()),
            ItemKind::RadioRow {
                label,
                checked,
                disabled,
            } => {
                let color = if *disabled { DIMMED } else { FOREGROUND };
                let r = (b.h * 0.28).max(4.0);
                let (cx, cy) = (b.x + r + 8.0, b.y + b.h * 0.5);
                let mut pb = PathBuilder::new();
                pb.push_circle(cx, cy, r);
                if let Some(path) = pb.finish() {
                    let stroke = Stroke {
                        width: 2.0,
                        ..Default::default()
                    };
                    self.canvas
                        .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
                }
                if *checked {
                    let mut pb = PathBuilder::new();
                    pb.push_circle(cx, cy, r * 0.55);
                    if let Some(path) = pb.finish() {
                        self.canvas.fill_path(
                            &path,
                            &paint(color),
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
                let label_w = self.text_cache.width(label, BODY_PX);
                let lx = cx + r + 14.0 + label_w * 0.5;
                self.draw_text_centered(label, BODY_PX, color, (lx, cy));
            }
            ItemKind::DropdownBox { label, disabled } => {
                let color = if *disabled { DIMMED } else { FOREGROUND };
                self.stroke_rect(b, color);
                self.draw_text_centered(label, BODY_PX, color, b.center());
            }
            ItemKind::DropdownArrow { side, disabled } => {
                let color = if *disabled { DIMMED } else { FOREGROUND };
                let (cx, cy) = b.center();
                let size = b.h.min(b.w) * 0.25;
                let mut pb = PathBuilder::new();
                match side {
                    ArrowSide::Right => {
                        pb.move_to(cx + size, cy);
                        pb.line_to(cx - size, cy - size);
                        pb.line_to(cx - size, cy + size);
                    }
                    ArrowSide::Left => {
                        pb.move_to(cx - size, cy);
                        pb.line_to(cx + size, cy - size);
                        pb.line_to(cx + size, cy + size);
                    }
                }
                pb.close();
                if let Some(path) = pb.finish() {
                    self.canvas.fill_path(
                        &path,
                        &paint(color),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            ItemKind::Button { label, enabled } => {
                let fill = if *enabled { BUTTON_FILL } else { BUTTON_FILL_DISABLED };
                if let Some(r) = rect(b) {
                    self.canvas
                        .fill_rect(r, &paint(fill), Transform::identity(), None);
                }
                let color = if *enabled { FOREGROUND } else { DIMMED };
                self.draw_text_centered(label, BODY_PX, color, b.center());
            }
        }
    }

    fn stroke_rect(&mut self, b: Bounds, color: [u8; 4]) {
        let Some(r) = rect(b) else {
            return;
        };
        let path = PathBuilder::from_rect(r);
        let stroke = Stroke {
            width: 2.0,
            ..Default::default()
        };
        self.canvas
            .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }

    fn draw_text_centered(&mut self, text: &str, size_px: f32, color: [u8; 4], pos: (f32, f32)) {
        let Some(pm) = self.text_cache.get_or_render(text, size_px, color) else {
            return;
        };
        let x = (pos.0 - pm.width() as f32 * 0.5) as i32;
        let y = (pos.1 - pm.height() as f32 * 0.5) as i32;
        blit_pixmap(&mut self.canvas, &pm, x, y);
    }
}

impl TextMeasure for SkiaRenderer {
    fn text_width(&self, text: &str, size_px: f32) -> f32 {
        self.text_cache.width(text, size_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Pixmap {
        let mut pm = Pixmap::new(w, h).unwrap();
        pm.fill(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
        pm
    }

    fn pixel(pm: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * pm.width() + x) * 4) as usize;
        pm.data()[i..i + 4].try_into().unwrap()
    }

    #[test]
    fn opaque_blit_copies_and_clips() {
        let mut canvas = solid(4, 4, [0, 0, 0, 255]);
        let red = solid(2, 2, [255, 0, 0, 255]);
        blit_pixmap(&mut canvas, &red, 3, 3);
        assert_eq!(pixel(&canvas, 3, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 2, 2), [0, 0, 0, 255]);

        blit_pixmap(&mut canvas, &red, -1, -1);
        assert_eq!(pixel(&canvas, 0, 0), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn transparent_source_leaves_canvas() {
        let mut canvas = solid(2, 2, [10, 20, 30, 255]);
        let clear = Pixmap::new(2, 2).unwrap();
        blit_pixmap(&mut canvas, &clear, 0, 0);
        assert_eq!(pixel(&canvas, 1, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn offscreen_blit_is_a_noop() {
        let mut canvas = solid(2, 2, [0, 0, 0, 255]);
        let red = solid(2, 2, [255, 0, 0, 255]);
        blit_pixmap(&mut canvas, &red, 5, 0);
        blit_pixmap(&mut canvas, &red, 0, -2);
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 0, 255]);
    }
}
