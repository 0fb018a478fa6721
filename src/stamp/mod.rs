//! Text compositing: burn a display string into an image's pixels.
//!
//! [`composite`] decodes the source at its native dimensions, draws it onto an
//! equally-sized surface, rasterizes the stamp text on top (outline first when
//! a stroke color is configured, then the fill at the same anchor), and
//! re-encodes in the source's own format. The source bytes are never mutated.

mod text;

pub use text::{BrushRgba8, TextShaper};

use std::io::Cursor;
use std::sync::Arc;

use crate::config::StampStyle;
use crate::error::{StampError, StampResult};
use crate::pipeline::{ImageKind, SourceImage};

/// A finished, encoded image produced by the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    kind: ImageKind,
}

impl EncodedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Composite `text` onto a copy of `image` using the style configuration.
///
/// Deterministic for identical `(image, text, style)` inputs modulo the font
/// rasterizer. Convenience wrapper that builds a one-shot [`TextShaper`];
/// batch callers stamping many images on one thread can hold a shaper and use
/// [`composite_with`].
pub fn composite(
    image: &SourceImage,
    text: &str,
    style: &StampStyle,
) -> StampResult<EncodedImage> {
    composite_with(&mut TextShaper::new(), image, text, style)
}

/// [`composite`] with a caller-provided shaper, reusing its font collection.
pub fn composite_with(
    shaper: &mut TextShaper,
    image: &SourceImage,
    text: &str,
    style: &StampStyle,
) -> StampResult<EncodedImage> {
    let decoded = image::load_from_memory(image.bytes()).map_err(|e| StampError::Decode {
        name: image.file_name().to_string(),
        source: e,
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let fill = parse_css_color(&style.text_color)?;
    let stroke = match style.stroke_color.as_str() {
        "none" => None,
        other => Some(parse_css_color(other)?),
    };

    let font_size = style.font_size.resolve(width, height);
    let brush = color_to_brush(fill);
    let layout = shaper.shape(text, style, font_size, brush)?;

    // Anchor geometry: padding equals the font size on every edge.
    let padding = font_size;
    let anchor_x = if style.position.is_right() {
        width as f32 - padding - layout.width()
    } else {
        padding
    };
    let baseline_y = if style.position.is_bottom() {
        height as f32 - padding
    } else {
        padding + font_size
    };

    let w16: u16 = width
        .try_into()
        .map_err(|_| StampError::render("image width exceeds u16"))?;
    let h16: u16 = height
        .try_into()
        .map_err(|_| StampError::render("image height exceeds u16"))?;

    let mut premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut premul);
    let base = premul_bytes_to_pixmap(&premul, width, height)?;

    let mut ctx = vello_cpu::RenderContext::new(w16, h16);

    // The unchanged source surface first.
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(base)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    ));

    draw_stamp_text(
        &mut ctx,
        &layout,
        anchor_x,
        baseline_y,
        fill,
        stroke.map(|color| (color, font_size / 8.0)),
    );

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.render_to_pixmap(&mut pixmap);

    let mut out_rgba = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_rgba8_in_place(&mut out_rgba);
    let surface = image::RgbaImage::from_raw(width, height, out_rgba)
        .ok_or_else(|| StampError::render("rendered surface byte length mismatch"))?;

    Ok(EncodedImage {
        bytes: encode(surface, image.kind())?,
        kind: image.kind(),
    })
}

/// Draw the shaped glyph runs, stroking first so the fill sits on top at the
/// same anchor point.
fn draw_stamp_text(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<BrushRgba8>,
    anchor_x: f32,
    baseline_y: f32,
    fill: vello_cpu::peniko::Color,
    stroke: Option<(vello_cpu::peniko::Color, f32)>,
) {
    let Some(first_line) = layout.lines().next() else {
        // Empty text stamps nothing.
        return;
    };

    // Glyph positions are relative to the layout's top-left; shift so the
    // first baseline lands on the requested baseline.
    let offset_y = baseline_y - first_line.metrics().baseline;
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((
        f64::from(anchor_x),
        f64::from(offset_y),
    )));

    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };

            // Rebuild the font handle from raw bytes so the rasterizer is
            // independent of Parley's own font types.
            let font = run.run().font();
            let font_data = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.data.as_ref().to_vec()),
                font.index,
            );

            let glyphs: Vec<vello_cpu::Glyph> = run
                .glyphs()
                .map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                })
                .collect();

            if let Some((stroke_color, stroke_width)) = stroke {
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(stroke_width)));
                ctx.set_paint(stroke_color);
                ctx.glyph_run(&font_data)
                    .font_size(run.run().font_size())
                    .stroke_glyphs(glyphs.iter().copied());
            }

            ctx.set_paint(fill);
            ctx.glyph_run(&font_data)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs.into_iter());
        }
    }
}

/// Parse a CSS color string (named colors, `#rrggbb`, `rgb(...)`, ...).
fn parse_css_color(s: &str) -> StampResult<vello_cpu::peniko::Color> {
    vello_cpu::peniko::color::parse_color(s)
        .map(|c| c.to_alpha_color::<vello_cpu::peniko::color::Srgb>())
        .map_err(|_| StampError::InvalidColor(s.to_string()))
}

fn color_to_brush(color: vello_cpu::peniko::Color) -> BrushRgba8 {
    let rgba = color.to_rgba8();
    BrushRgba8 {
        r: rgba.r,
        g: rgba.g,
        b: rgba.b,
        a: rgba.a,
    }
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> StampResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StampError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StampError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(StampError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

/// Re-encode the stamped surface in the source's own format. JPEG uses the
/// maximum quality setting; WebP is encoded lossless.
fn encode(surface: image::RgbaImage, kind: ImageKind) -> StampResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match kind {
        ImageKind::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(surface).to_rgb8();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 100);
            rgb.write_with_encoder(encoder)?;
        }
        ImageKind::Png => {
            surface.write_to(&mut out, image::ImageFormat::Png)?;
        }
        ImageKind::WebP => {
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut out);
            surface.write_with_encoder(encoder)?;
        }
        ImageKind::Tiff => {
            surface.write_to(&mut out, image::ImageFormat::Tiff)?;
        }
        ImageKind::Bmp => {
            let rgb = image::DynamicImage::ImageRgba8(surface).to_rgb8();
            rgb.write_to(&mut out, image::ImageFormat::Bmp)?;
        }
    }
    Ok(out.into_inner())
}
