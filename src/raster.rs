use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fontdue::Font;
use image::imageops::FilterType;
use image::{ImageReader, RgbaImage};
use tiny_skia::{
    FillRule, Mask, Paint, Path as SkPath, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::capture::{Capture, CapturedImage, Region};
use crate::fonts::supports_char;
use crate::platform::{Platform, Rgba};
use crate::view::{ChatView, GroupView, Side, EMPTY_HINT, INPUT_PLACEHOLDER};

const DESKTOP_WIDTH: f32 = 720.0;
const DESKTOP_MIN_HEIGHT: f32 = 480.0;
const MOBILE_WIDTH: f32 = 390.0;
const MOBILE_HEIGHT: f32 = 844.0;
const MOBILE_RADIUS: f32 = 47.0;
const MATTE_PAD_X: f32 = 40.0;
const MATTE_PAD_Y: f32 = 80.0;
const MATTE_COLOR: Rgba = [0xf5, 0xf5, 0xf5, 255];

const HEADER_HEIGHT: f32 = 64.0;
const INPUT_HEIGHT: f32 = 64.0;
const AVATAR_SIZE: f32 = 40.0;
const EDGE_PAD: f32 = 16.0;
const BUBBLE_PAD_X: f32 = 12.0;
const BUBBLE_PAD_Y: f32 = 8.0;
const BUBBLE_SHARE: f32 = 0.7;
const BUBBLE_GAP: f32 = 2.0;
const GROUP_GAP: f32 = 12.0;
const JOINED_RADIUS: f32 = 4.0;

const BODY_SIZE: f32 = 15.0;
const TIME_SIZE: f32 = 11.0;
const NAME_SIZE: f32 = 12.0;
const TITLE_SIZE: f32 = 16.0;
const STATUS_SIZE: f32 = 12.0;
const LINE_SPACING: f32 = 1.35;

const MAX_CAPTURE_HEIGHT: u32 = 32_768;
pub const MAX_SCALE: f32 = 8.0;

pub struct RasterCapture {
    scale: f32,
    painter: TextPainter,
    avatars: HashMap<PathBuf, Option<Pixmap>>,
}

impl RasterCapture {
    /// Without a font, text is drawn as skeleton bars of the same measured width.
    pub fn new(scale: f32, font: Option<Font>) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 || scale > MAX_SCALE {
            bail!("scale must be > 0 and <= {MAX_SCALE}, got {scale}");
        }
        Ok(Self {
            scale,
            painter: TextPainter::new(font),
            avatars: HashMap::new(),
        })
    }

    fn px(&self, value: f32) -> f32 {
        value * self.scale
    }

    fn render_chat(&mut self, view: &ChatView, width: f32, height: Option<f32>) -> Result<Pixmap> {
        let plan = self.layout(view, width);

        let natural = self.px(HEADER_HEIGHT) + plan.content_height + self.px(INPUT_HEIGHT);
        let height = height.unwrap_or_else(|| natural.max(self.px(DESKTOP_MIN_HEIGHT)));
        let pixel_height = height.ceil() as u32;
        if pixel_height > MAX_CAPTURE_HEIGHT {
            bail!(
                "conversation is too tall to capture ({pixel_height}px); try --mobile or a smaller --scale"
            );
        }

        let mut pixmap = Pixmap::new(width.ceil() as u32, pixel_height)
            .context("failed to allocate chat pixmap")?;
        let palette = view.palette;
        pixmap.fill(color(palette.background));

        let area_top = self.px(HEADER_HEIGHT);
        let area_bottom = height - self.px(INPUT_HEIGHT);
        // Anchor to the bottom when the conversation overflows, like a scrolled chat.
        let overflow = (plan.content_height - (area_bottom - area_top)).max(0.0);
        let offset = area_top - overflow;

        if view.is_empty() {
            let hint_w = self.painter.measure(EMPTY_HINT, self.px(BODY_SIZE));
            let x = ((width - hint_w) / 2.0).max(self.px(EDGE_PAD));
            let y = area_top + (area_bottom - area_top) / 2.0 - self.px(BODY_SIZE) / 2.0;
            self.painter.draw(
                &mut pixmap,
                x,
                y,
                EMPTY_HINT,
                self.px(BODY_SIZE),
                palette.text_secondary,
            );
        }

        for item in &plan.items {
            let top = item.y + offset;
            if top + item.height < area_top || top > area_bottom {
                continue;
            }
            match &item.kind {
                ItemKind::Name { text } => {
                    self.painter.draw(
                        &mut pixmap,
                        item.x,
                        top,
                        text,
                        self.px(NAME_SIZE),
                        palette.text_secondary,
                    );
                }
                ItemKind::Bubble {
                    side,
                    lines,
                    time_label,
                    radii,
                } => {
                    let (fill, ink, time_ink) = match side {
                        Side::Right => (
                            palette.sender_bubble,
                            palette.sender_text,
                            with_alpha(palette.sender_text, 170),
                        ),
                        Side::Left => (palette.receiver_bubble, palette.text, palette.text_secondary),
                    };
                    if let Some(path) = rounded_rect(item.x, top, item.width, item.height, *radii) {
                        fill_path(&mut pixmap, &path, fill);
                    }

                    let line_h = self.px(BODY_SIZE * LINE_SPACING);
                    let text_x = item.x + self.px(BUBBLE_PAD_X);
                    let mut text_y = top + self.px(BUBBLE_PAD_Y);
                    for line in lines {
                        self.painter
                            .draw(&mut pixmap, text_x, text_y, line, self.px(BODY_SIZE), ink);
                        text_y += line_h;
                    }

                    if let Some(time) = time_label {
                        let time_w = self.painter.measure(time, self.px(TIME_SIZE));
                        let time_x = item.x + item.width - self.px(BUBBLE_PAD_X) - time_w;
                        self.painter.draw(
                            &mut pixmap,
                            time_x,
                            text_y,
                            time,
                            self.px(TIME_SIZE),
                            time_ink,
                        );
                    }
                }
            }
        }

        self.draw_header(&mut pixmap, view, width)?;
        self.draw_input_bar(&mut pixmap, view, width, height);
        Ok(pixmap)
    }

    fn layout(&self, view: &ChatView, width: f32) -> LayoutPlan {
        let mut items = Vec::new();
        let mut y = self.px(EDGE_PAD);
        let max_bubble = width * BUBBLE_SHARE;
        let max_text = (max_bubble - 2.0 * self.px(BUBBLE_PAD_X)).max(self.px(BODY_SIZE));
        let line_h = self.px(BODY_SIZE * LINE_SPACING);
        let time_h = self.px(TIME_SIZE * LINE_SPACING);
        let radius = bubble_radius(view.platform) * self.scale;
        let joined = self.px(JOINED_RADIUS);

        for (group_index, group) in view.groups.iter().enumerate() {
            if group_index > 0 {
                y += self.px(GROUP_GAP);
            }

            if group.side == Side::Left {
                let name_h = self.px(NAME_SIZE * LINE_SPACING);
                items.push(LayoutItem {
                    x: self.px(EDGE_PAD) + self.px(4.0),
                    y,
                    width: self.painter.measure(&group.display_name, self.px(NAME_SIZE)),
                    height: name_h,
                    kind: ItemKind::Name {
                        text: group.display_name.clone(),
                    },
                });
                y += name_h;
            }

            for (bubble_index, bubble) in group.bubbles.iter().enumerate() {
                if bubble_index > 0 {
                    y += self.px(BUBBLE_GAP);
                }
                let body_size = self.px(BODY_SIZE);
                let painter = &self.painter;
                let lines = wrap_to_width(&bubble.text, max_text, |s| painter.measure(s, body_size));
                let text_w = lines
                    .iter()
                    .map(|line| painter.measure(line, body_size))
                    .fold(0.0_f32, f32::max);
                let time_w = bubble
                    .time_label
                    .as_deref()
                    .map(|time| painter.measure(time, self.px(TIME_SIZE)))
                    .unwrap_or(0.0);

                let inner_w = text_w.max(time_w).max(self.px(BODY_SIZE));
                let bubble_w = inner_w + 2.0 * self.px(BUBBLE_PAD_X);
                let bubble_h = 2.0 * self.px(BUBBLE_PAD_Y)
                    + lines.len() as f32 * line_h
                    + if bubble.time_label.is_some() { time_h } else { 0.0 };
                let x = match group.side {
                    Side::Left => self.px(EDGE_PAD),
                    Side::Right => width - self.px(EDGE_PAD) - bubble_w,
                };

                items.push(LayoutItem {
                    x,
                    y,
                    width: bubble_w,
                    height: bubble_h,
                    kind: ItemKind::Bubble {
                        side: group.side,
                        lines,
                        time_label: bubble.time_label.clone(),
                        radii: bubble_radii(group, bubble_index, radius, joined),
                    },
                });
                y += bubble_h;
            }
        }

        LayoutPlan {
            items,
            content_height: y + self.px(EDGE_PAD),
        }
    }

    fn draw_header(&mut self, pixmap: &mut Pixmap, view: &ChatView, width: f32) -> Result<()> {
        let palette = view.palette;
        let header_h = self.px(HEADER_HEIGHT);
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, width, header_h) {
            let mut paint = Paint::default();
            paint.set_color(color(palette.primary));
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        if let Some(rect) = Rect::from_xywh(0.0, header_h - self.px(1.0), width, self.px(1.0)) {
            let mut paint = Paint::default();
            paint.set_color(color(with_alpha(palette.text_secondary, 60)));
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }

        let avatar = self.px(AVATAR_SIZE);
        let avatar_x = self.px(EDGE_PAD);
        let avatar_y = (header_h - avatar) / 2.0;
        let photo = match &view.header.photo {
            Some(path) => self.avatar_pixmap(path, avatar.round() as u32),
            None => None,
        };
        match photo {
            Some(photo) => {
                let circle = PathBuilder::from_circle(
                    avatar_x + avatar / 2.0,
                    avatar_y + avatar / 2.0,
                    avatar / 2.0,
                );
                let mut mask =
                    Mask::new(pixmap.width(), pixmap.height()).context("failed to allocate mask")?;
                if let Some(circle) = circle {
                    mask.fill_path(&circle, FillRule::Winding, true, Transform::identity());
                }
                pixmap.draw_pixmap(
                    avatar_x.round() as i32,
                    avatar_y.round() as i32,
                    photo.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    Some(&mask),
                );
            }
            None => {
                if let Some(circle) = PathBuilder::from_circle(
                    avatar_x + avatar / 2.0,
                    avatar_y + avatar / 2.0,
                    avatar / 2.0,
                ) {
                    fill_path(pixmap, &circle, palette.secondary);
                }
                let size = self.px(TITLE_SIZE);
                let initial_w = self.painter.measure(&view.header.initial, size);
                self.painter.draw(
                    pixmap,
                    avatar_x + (avatar - initial_w) / 2.0,
                    avatar_y + (avatar - size) / 2.0,
                    &view.header.initial,
                    size,
                    [255, 255, 255, 255],
                );
            }
        }

        let text_x = avatar_x + avatar + self.px(12.0);
        self.painter.draw(
            pixmap,
            text_x,
            self.px(13.0),
            &view.header.title,
            self.px(TITLE_SIZE),
            palette.header_text,
        );
        self.painter.draw(
            pixmap,
            text_x,
            self.px(36.0),
            &view.header.status,
            self.px(STATUS_SIZE),
            with_alpha(palette.header_text, 190),
        );
        Ok(())
    }

    fn draw_input_bar(&mut self, pixmap: &mut Pixmap, view: &ChatView, width: f32, height: f32) {
        let palette = view.palette;
        let top = height - self.px(INPUT_HEIGHT);
        if let Some(rect) = Rect::from_xywh(0.0, top, width, self.px(INPUT_HEIGHT)) {
            let mut paint = Paint::default();
            paint.set_color(color(palette.input_background));
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }

        let button = self.px(36.0);
        let field_h = self.px(40.0);
        let field_x = self.px(12.0);
        let field_y = top + (self.px(INPUT_HEIGHT) - field_h) / 2.0;
        let field_w = width - field_x * 2.0 - button - self.px(8.0);
        if let Some(path) = rounded_rect(field_x, field_y, field_w, field_h, [field_h / 2.0; 4]) {
            fill_path(pixmap, &path, palette.background);
        }
        self.painter.draw(
            pixmap,
            field_x + self.px(16.0),
            field_y + (field_h - self.px(14.0)) / 2.0,
            INPUT_PLACEHOLDER,
            self.px(14.0),
            palette.text_secondary,
        );

        let cx = width - self.px(12.0) - button / 2.0;
        let cy = top + self.px(INPUT_HEIGHT) / 2.0;
        if let Some(circle) = PathBuilder::from_circle(cx, cy, button / 2.0) {
            fill_path(pixmap, &circle, palette.secondary);
        }
        let arrow = self.px(8.0);
        let mut pb = PathBuilder::new();
        pb.move_to(cx - arrow * 0.8, cy - arrow);
        pb.line_to(cx + arrow, cy);
        pb.line_to(cx - arrow * 0.8, cy + arrow);
        pb.line_to(cx - arrow * 0.4, cy);
        pb.close();
        if let Some(path) = pb.finish() {
            fill_path(pixmap, &path, [255, 255, 255, 255]);
        }
    }

    fn avatar_pixmap(&mut self, path: &Path, size: u32) -> Option<Pixmap> {
        let entry = self
            .avatars
            .entry(path.to_path_buf())
            .or_insert_with(|| match load_avatar(path, size) {
                Ok(pixmap) => Some(pixmap),
                Err(error) => {
                    let cause = format!("{error:#}");
                    tracing::warn!(
                        path = %path.display(),
                        error = %cause,
                        "avatar photo unavailable, drawing initial instead"
                    );
                    None
                }
            });
        entry.clone()
    }

    fn render_mobile(&mut self, view: &ChatView) -> Result<Pixmap> {
        let content = self.render_chat(view, self.px(MOBILE_WIDTH), Some(self.px(MOBILE_HEIGHT)))?;
        let pad_x = self.px(MATTE_PAD_X);
        let pad_y = self.px(MATTE_PAD_Y);
        let width = content.width() + (2.0 * pad_x) as u32;
        let height = content.height() + (2.0 * pad_y) as u32;

        let mut frame = Pixmap::new(width, height).context("failed to allocate frame pixmap")?;
        frame.fill(color(MATTE_COLOR));

        let radius = self.px(MOBILE_RADIUS);
        let frame_w = content.width() as f32;
        let frame_h = content.height() as f32;
        for (spread, alpha) in [(12.0, 18_u8), (8.0, 24), (4.0, 32)] {
            let spread = self.px(spread);
            if let Some(shadow) = rounded_rect(
                pad_x - spread / 2.0,
                pad_y - spread / 2.0 + self.px(8.0),
                frame_w + spread,
                frame_h + spread,
                [radius + spread / 2.0; 4],
            ) {
                fill_path(&mut frame, &shadow, [0, 0, 0, alpha]);
            }
        }

        let mut mask = Mask::new(width, height).context("failed to allocate frame mask")?;
        if let Some(outline) = rounded_rect(pad_x, pad_y, frame_w, frame_h, [radius; 4]) {
            mask.fill_path(&outline, FillRule::Winding, true, Transform::identity());
        }
        frame.draw_pixmap(
            pad_x.round() as i32,
            pad_y.round() as i32,
            content.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            Some(&mask),
        );
        Ok(frame)
    }
}

impl Capture for RasterCapture {
    fn capture_region(&mut self, view: &ChatView, region: Region) -> Result<CapturedImage> {
        let pixmap = match region {
            Region::ChatContainer => self.render_chat(view, self.px(DESKTOP_WIDTH), None)?,
            Region::MobileFrame => self.render_mobile(view)?,
        };
        tracing::debug!(
            ?region,
            width = pixmap.width(),
            height = pixmap.height(),
            bubbles = view.bubble_count(),
            "rasterized conversation"
        );
        Ok(to_captured(&pixmap))
    }
}

#[derive(Debug)]
struct LayoutPlan {
    items: Vec<LayoutItem>,
    content_height: f32,
}

#[derive(Debug)]
struct LayoutItem {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    kind: ItemKind,
}

#[derive(Debug)]
enum ItemKind {
    Name {
        text: String,
    },
    Bubble {
        side: Side,
        lines: Vec<String>,
        time_label: Option<String>,
        radii: [f32; 4],
    },
}

fn bubble_radius(platform: Platform) -> f32 {
    match platform {
        Platform::WhatsApp => 8.0,
        Platform::Instagram => 18.0,
    }
}

/// Corner radii in top-left, top-right, bottom-right, bottom-left order. Corners
/// facing a neighbouring bubble of the same run are tightened.
fn bubble_radii(group: &GroupView, index: usize, radius: f32, joined: f32) -> [f32; 4] {
    let has_prev = index > 0;
    let has_next = index + 1 < group.bubbles.len();
    let top = if has_prev { joined } else { radius };
    let bottom = if has_next { joined } else { radius };
    match group.side {
        Side::Right => [radius, top, bottom, radius],
        Side::Left => [top, radius, radius, bottom],
    }
}

struct TextPainter {
    font: Option<Font>,
    glyph_cache: HashMap<(char, u32), (fontdue::Metrics, Vec<u8>)>,
}

impl TextPainter {
    fn new(font: Option<Font>) -> Self {
        Self {
            font,
            glyph_cache: HashMap::new(),
        }
    }

    fn measure(&self, text: &str, size: f32) -> f32 {
        match &self.font {
            Some(font) => text
                .chars()
                .filter(|ch| supports_char(font, *ch))
                .map(|ch| font.metrics(ch, size).advance_width)
                .sum(),
            None => text.chars().count() as f32 * size * 0.55,
        }
    }

    /// `y` is the top of the line box.
    fn draw(&mut self, pixmap: &mut Pixmap, x: f32, y: f32, text: &str, size: f32, ink: Rgba) {
        let Self { font, glyph_cache } = self;
        let Some(font) = font.as_ref() else {
            draw_skeleton(pixmap, x, y, text, size, ink);
            return;
        };

        let ascent = font
            .horizontal_line_metrics(size)
            .map(|metrics| metrics.ascent)
            .unwrap_or(size * 0.8);
        let baseline = y + ascent;
        let mut pen = x;

        for ch in text.chars() {
            if !supports_char(font, ch) {
                tracing::debug!(codepoint = ch as u32, "font has no glyph, skipping");
                continue;
            }
            let (metrics, bitmap) = glyph_cache
                .entry((ch, size.to_bits()))
                .or_insert_with(|| font.rasterize(ch, size));

            let gx = (pen + metrics.xmin as f32).round() as i32;
            let gy = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i32;
            blend_coverage(pixmap, gx, gy, metrics.width, metrics.height, bitmap, ink);
            pen += metrics.advance_width;
        }
    }
}

fn draw_skeleton(pixmap: &mut Pixmap, x: f32, y: f32, text: &str, size: f32, ink: Rgba) {
    if text.trim().is_empty() {
        return;
    }
    let width = text.chars().count() as f32 * size * 0.55;
    let height = size * 0.55;
    let top = y + size * 0.3;
    if let Some(path) = rounded_rect(x, top, width, height, [height / 2.0; 4]) {
        fill_path(pixmap, &path, with_alpha(ink, 110));
    }
}

/// Greedy wrap by measured width; words wider than a line are split by char.
fn wrap_to_width(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_owned();
            continue;
        }

        for ch in word.chars() {
            current.push(ch);
            if measure(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn rounded_rect(x: f32, y: f32, w: f32, h: f32, radii: [f32; 4]) -> Option<SkPath> {
    let limit = (w.min(h) / 2.0).max(0.0);
    let [tl, tr, br, bl] = radii.map(|r| r.clamp(0.0, limit));

    let mut pb = PathBuilder::new();
    pb.move_to(x + tl, y);
    pb.line_to(x + w - tr, y);
    pb.quad_to(x + w, y, x + w, y + tr);
    pb.line_to(x + w, y + h - br);
    pb.quad_to(x + w, y + h, x + w - br, y + h);
    pb.line_to(x + bl, y + h);
    pb.quad_to(x, y + h, x, y + h - bl);
    pb.line_to(x, y + tl);
    pb.quad_to(x, y, x + tl, y);
    pb.close();
    pb.finish()
}

fn fill_path(pixmap: &mut Pixmap, path: &SkPath, fill: Rgba) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(fill[0], fill[1], fill[2], fill[3]);
    paint.anti_alias = true;
    pixmap.fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn blend_coverage(
    pixmap: &mut Pixmap,
    x: i32,
    y: i32,
    glyph_w: usize,
    glyph_h: usize,
    coverage: &[u8],
    ink: Rgba,
) {
    let frame_w = pixmap.width() as i32;
    let frame_h = pixmap.height() as i32;
    let data = pixmap.data_mut();

    for row in 0..glyph_h {
        let py = y + row as i32;
        if py < 0 || py >= frame_h {
            continue;
        }
        for col in 0..glyph_w {
            let px = x + col as i32;
            if px < 0 || px >= frame_w {
                continue;
            }
            let mask = coverage[row * glyph_w + col];
            if mask == 0 {
                continue;
            }
            let alpha = (u16::from(mask) * u16::from(ink[3])) / 255;
            let idx = ((py * frame_w + px) * 4) as usize;
            blend_premultiplied(data, idx, ink, alpha);
        }
    }
}

fn blend_premultiplied(data: &mut [u8], idx: usize, ink: Rgba, alpha: u16) {
    if alpha == 0 {
        return;
    }
    let inv_alpha = 255_u16.saturating_sub(alpha);
    for channel in 0..3 {
        let src = u16::from(ink[channel]) * alpha / 255;
        let dst = u16::from(data[idx + channel]);
        data[idx + channel] = (src + (dst * inv_alpha + 127) / 255).min(255) as u8;
    }
    let dst_a = u16::from(data[idx + 3]);
    data[idx + 3] = (alpha + (dst_a * inv_alpha + 127) / 255).min(255) as u8;
}

fn load_avatar(path: &Path, size: u32) -> Result<Pixmap> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed opening {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed sniffing {}", path.display()))?
        .decode()
        .with_context(|| format!("failed decoding {}", path.display()))?
        .to_rgba8();
    let resized = image::imageops::resize(&cover_square(&image), size, size, FilterType::Triangle);

    let mut pixmap = Pixmap::new(size.max(1), size.max(1)).context("failed to allocate avatar")?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(resized.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Center crop to a square, like `object-fit: cover`.
fn cover_square(image: &RgbaImage) -> RgbaImage {
    let side = image.width().min(image.height());
    let x = (image.width() - side) / 2;
    let y = (image.height() - side) / 2;
    image::imageops::crop_imm(image, x, y, side, side).to_image()
}

fn to_captured(pixmap: &Pixmap) -> CapturedImage {
    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let straight = pixel.demultiply();
        rgba.extend_from_slice(&[
            straight.red(),
            straight.green(),
            straight.blue(),
            straight.alpha(),
        ]);
    }
    CapturedImage {
        width: pixmap.width(),
        height: pixmap.height(),
        rgba,
    }
}

fn color(rgba: Rgba) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn with_alpha(rgba: Rgba, alpha: u8) -> Rgba {
    [rgba[0], rgba[1], rgba[2], alpha]
}
