//! Reference SVG adapter over the primitive list.

use crate::model::{Point, Rect, SequenceLayout};
use crate::paint::Primitive;
use seqline_core::Stroke;
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    pub font_family: String,
    pub font_size: f64,
    /// Line height used to place multi-line text inside its bounds.
    pub line_height: Option<f64>,
    pub background: Option<String>,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            font_family: "ui-sans-serif, system-ui, sans-serif".to_string(),
            font_size: 12.0,
            line_height: None,
            background: Some("#ffffff".to_string()),
        }
    }
}

pub fn render_svg(layout: &SequenceLayout) -> String {
    render_svg_with_options(layout, &SvgRenderOptions::default())
}

pub fn render_svg_with_options(layout: &SequenceLayout, options: &SvgRenderOptions) -> String {
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);

    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        fmt(width),
        fmt(height),
        fmt(width),
        fmt(height)
    );
    let _ = writeln!(
        &mut out,
        r#"<style>
 .solid {{ fill: none; stroke: #111827; stroke-width: 1; }}
 .dashed {{ fill: none; stroke: #111827; stroke-width: 1; stroke-dasharray: 4 3; }}
 .head {{ fill: #111827; stroke: none; }}
 .label {{ fill: #111827; font-family: {}; font-size: {}px; text-anchor: middle; }}
 .bold {{ font-weight: bold; }}
</style>"#,
        escape_xml(&options.font_family),
        fmt(options.font_size)
    );
    if let Some(bg) = &options.background {
        let _ = writeln!(
            &mut out,
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}" />"#,
            fmt(width),
            fmt(height),
            escape_xml(bg)
        );
    }

    let line_height = options.line_height.unwrap_or(options.font_size * 1.2);
    for primitive in layout.primitives() {
        render_primitive(&mut out, &primitive, line_height);
    }
    out.push_str("</svg>\n");
    out
}

fn stroke_class(stroke: Stroke) -> &'static str {
    match stroke {
        Stroke::Solid => "solid",
        Stroke::Dashed => "dashed",
    }
}

fn points_attr(points: &[Point]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(&mut out, "{},{}", fmt(p.x), fmt(p.y));
    }
    out
}

fn render_rect(out: &mut String, rect: &Rect, fill: Option<&str>, stroke: Option<Stroke>) {
    let _ = write!(
        out,
        r#"<rect x="{}" y="{}" width="{}" height="{}""#,
        fmt(rect.left),
        fmt(rect.top),
        fmt(rect.width),
        fmt(rect.height)
    );
    if let Some(stroke) = stroke {
        let _ = write!(out, r#" class="{}""#, stroke_class(stroke));
    } else {
        out.push_str(r#" stroke="none""#);
    }
    match fill {
        Some(fill) => {
            let _ = write!(out, r#" style="fill: {}""#, escape_xml(fill));
        }
        None => out.push_str(r#" fill="none""#),
    }
    out.push_str(" />\n");
}

fn render_primitive(out: &mut String, primitive: &Primitive, line_height: f64) {
    match primitive {
        Primitive::Line { from, to, stroke } => {
            let _ = writeln!(
                out,
                r#"<line class="{}" x1="{}" y1="{}" x2="{}" y2="{}" />"#,
                stroke_class(*stroke),
                fmt(from.x),
                fmt(from.y),
                fmt(to.x),
                fmt(to.y)
            );
        }
        Primitive::Polyline { points, stroke } => {
            let _ = writeln!(
                out,
                r#"<polyline class="{}" points="{}" />"#,
                stroke_class(*stroke),
                points_attr(points)
            );
        }
        Primitive::Triangle { points } => {
            let _ = writeln!(
                out,
                r#"<polygon class="head" points="{}" />"#,
                points_attr(points)
            );
        }
        Primitive::Circle { center, radius } => {
            let _ = writeln!(
                out,
                r#"<circle class="head" cx="{}" cy="{}" r="{}" />"#,
                fmt(center.x),
                fmt(center.y),
                fmt(*radius)
            );
        }
        Primitive::Rectangle { rect, fill, stroke } => {
            render_rect(out, rect, fill.as_deref(), *stroke);
        }
        Primitive::Text {
            bounds,
            lines,
            bold,
        } => {
            if lines.is_empty() {
                return;
            }
            let cx = bounds.left + bounds.width / 2.0;
            let block_height = line_height * lines.len() as f64;
            let first_baseline =
                bounds.top + (bounds.height - block_height).max(0.0) / 2.0 + line_height * 0.8;
            let class = if *bold { "label bold" } else { "label" };
            let _ = write!(out, r#"<text class="{class}">"#);
            for (i, line) in lines.iter().enumerate() {
                let _ = write!(
                    out,
                    r#"<tspan x="{}" y="{}">{}</tspan>"#,
                    fmt(cx),
                    fmt(first_baseline + i as f64 * line_height),
                    escape_xml(line)
                );
            }
            out.push_str("</text>\n");
        }
    }
}

/// Formats a coordinate: at most three decimals, no trailing zeros, no `-0`.
fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let k = (v * 1000.0).round();
    if k == 0.0 {
        return "0".to_string();
    }
    let s = format!("{:.3}", k / 1000.0);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_trims_and_rounds() {
        assert_eq!(fmt(10.0), "10");
        assert_eq!(fmt(2.5), "2.5");
        assert_eq!(fmt(1.23456), "1.235");
        assert_eq!(fmt(-0.0001), "0");
        assert_eq!(fmt(f64::NAN), "0");
    }

    #[test]
    fn escape_xml_covers_markup_characters() {
        assert_eq!(escape_xml(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&#39;");
    }

    #[test]
    fn empty_layout_is_still_a_document() {
        let svg = render_svg(&SequenceLayout {
            width: 0.0,
            height: 0.0,
            elements: Vec::new(),
        });
        assert!(svg.starts_with("<svg "));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
