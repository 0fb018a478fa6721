use std::borrow::Cow;

use crate::config::StampStyle;
use crate::error::{StampError, StampResult};

/// RGBA8 brush color attached to shaped glyph runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Stateful helper for shaping stamp text into a positioned glyph layout.
///
/// Holds the Parley font and layout contexts so repeated stamping reuses the
/// resolved font collection.
pub struct TextShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<BrushRgba8>,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextShaper {
    /// Construct a shaper with fresh Parley contexts (system fonts loaded).
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape a single line of bold stamp text at the given pixel size.
    ///
    /// The font resolves from `style.font_file` when set, otherwise from the
    /// configured family's font stack against installed fonts.
    pub fn shape(
        &mut self,
        text: &str,
        style: &StampStyle,
        size_px: f32,
        brush: BrushRgba8,
    ) -> StampResult<parley::Layout<BrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StampError::render("font size must be finite and > 0"));
        }

        let stack: Cow<'static, str> = match &style.font_file {
            Some(path) => {
                let font_bytes = std::fs::read(path)?;
                Cow::Owned(self.register_font(font_bytes)?)
            }
            None => Cow::Borrowed(style.font.font_stack()),
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(stack),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<BrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Register explicit font bytes and return the primary family name.
    fn register_font(&mut self, font_bytes: Vec<u8>) -> StampResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| StampError::render("no font families registered from font file"))?;

        self.font_ctx
            .collection
            .family_name(family_id)
            .map(str::to_string)
            .ok_or_else(|| StampError::render("registered font family has no name"))
    }
}
