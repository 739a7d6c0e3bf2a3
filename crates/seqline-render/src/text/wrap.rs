//! Label line breaking.
//!
//! Labels break on `\n` and on the two-character escape `\\n` (what a diagram source
//! writes inside a one-line message). Word wrapping is greedy and never splits a word.

use super::{TextMeasurer, TextStyle};

pub fn split_label_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// Splits `text` into lines and, when `max_width` is set, wraps every line that is wider
/// than `max_width` at spaces.
pub fn wrap_label_lines(
    measurer: &dyn TextMeasurer,
    text: &str,
    style: &TextStyle,
    max_width: Option<f64>,
) -> Vec<String> {
    let lines = split_label_lines(text);
    let Some(max_width) = max_width.filter(|w| w.is_finite() && *w > 0.0) else {
        return lines;
    };

    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if measurer.measure(&line, style).width <= max_width {
            out.push(line);
            continue;
        }
        wrap_line_into(measurer, &line, style, max_width, &mut out);
    }
    out
}

fn wrap_line_into(
    measurer: &dyn TextMeasurer,
    line: &str,
    style: &TextStyle,
    max_width: f64,
    out: &mut Vec<String>,
) {
    let mut cur = String::new();
    for word in line.split(' ').filter(|w| !w.is_empty()) {
        if cur.is_empty() {
            cur.push_str(word);
            continue;
        }
        let candidate = format!("{cur} {word}");
        if measurer.measure(&candidate, style).width <= max_width {
            cur = candidate;
        } else {
            out.push(std::mem::take(&mut cur));
            cur.push_str(word);
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
}
