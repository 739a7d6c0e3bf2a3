use crate::model::{Rect, TextBlock};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

mod wrap;

pub use wrap::{split_label_lines, wrap_label_lines};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 12.0,
            bold: false,
        }
    }
}

impl TextStyle {
    pub fn with_bold(&self, bold: bool) -> Self {
        Self {
            bold,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

/// Font metrics, supplied by whoever knows the target font.
///
/// `text` may contain `\n`; the result covers all lines. An empty string measures as one
/// empty line, so `measure("", style).height` is the line height.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;

    fn line_height(&self, style: &TextStyle) -> f64 {
        self.measure("", style).height
    }
}

/// Headless measurer: per-character advance from East Asian width, scaled by the font size.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub bold_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    pub fn normalized_text_lines(text: &str) -> Vec<&str> {
        let out = text.split('\n').collect::<Vec<_>>();
        if out.is_empty() {
            return vec![""];
        }
        out
    }

    fn line_width_em(line: &str) -> f64 {
        line.chars()
            .map(|ch| match ch {
                '\t' => 4.0,
                c => c.width().unwrap_or(0) as f64,
            })
            .sum()
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let bold_width_factor = if self.bold_width_factor == 0.0 {
            1.1
        } else {
            self.bold_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let lines = Self::normalized_text_lines(text);
        let font_size = style.font_size.max(1.0);
        let weight = if style.bold { bold_width_factor } else { 1.0 };
        let max_em = lines
            .iter()
            .map(|line| Self::line_width_em(line))
            .fold(0.0_f64, f64::max);

        TextMetrics {
            width: max_em * font_size * char_width_factor * weight,
            height: lines.len() as f64 * font_size * line_height_factor,
            line_count: lines.len(),
        }
    }
}

/// Fixed advance per character and fixed line height, independent of the font size.
///
/// Exact arithmetic makes it the measurer of choice for geometry tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTextMeasurer {
    pub char_width: f64,
    pub bold_char_width: f64,
    pub line_height: f64,
}

impl Default for FixedTextMeasurer {
    fn default() -> Self {
        Self {
            char_width: 10.0,
            bold_char_width: 10.0,
            line_height: 20.0,
        }
    }
}

impl TextMeasurer for FixedTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let lines = DeterministicTextMeasurer::normalized_text_lines(text);
        let advance = if style.bold {
            self.bold_char_width
        } else {
            self.char_width
        };
        let max_chars = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        TextMetrics {
            width: max_chars as f64 * advance,
            height: lines.len() as f64 * self.line_height,
            line_count: lines.len(),
        }
    }
}

/// A label broken into lines and measured, not yet positioned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasuredLabel {
    pub lines: Vec<String>,
    pub width: f64,
    pub height: f64,
    pub bold: bool,
}

impl MeasuredLabel {
    /// Measures `text`; an empty label has no lines and zero size.
    pub fn measure(
        measurer: &dyn TextMeasurer,
        text: &str,
        style: &TextStyle,
        max_width: Option<f64>,
    ) -> Self {
        let lines = wrap_label_lines(measurer, text, style, max_width);
        if lines.is_empty() {
            return Self {
                bold: style.bold,
                ..Self::default()
            };
        }
        let metrics = measurer.measure(&lines.join("\n"), style);
        Self {
            lines,
            width: metrics.width,
            height: metrics.height,
            bold: style.bold,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn place(&self, left: f64, top: f64) -> TextBlock {
        TextBlock {
            bounds: Rect::new(left, top, self.width, self.height),
            lines: self.lines.clone(),
            bold: self.bold,
            background: None,
        }
    }
}
