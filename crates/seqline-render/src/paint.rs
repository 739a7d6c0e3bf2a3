//! The growing canvas and the renderer-neutral primitives drawables lower to.

use crate::InternalFault;
use crate::model::{Drawable, Fragment, FragmentChild, Point, Rect, SequenceLayout, TextBlock};
use seqline_core::{ArrowHead, Stroke};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-6;

/// Canvas that only grows.
///
/// Space is reserved with [`PaintDevice::announce`] before the element that needs it is
/// computed; [`PaintDevice::add_sequence_element`] then appends the finished element.
/// Insertion order is paint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintDevice {
    width: f64,
    height: f64,
    pending: f64,
    closed: bool,
    elements: Vec<Drawable>,
}

impl PaintDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn left_bound(&self) -> f64 {
        0.0
    }

    pub fn right_bound(&self) -> f64 {
        self.width
    }

    /// Height announced but not yet consumed by an element.
    pub fn pending(&self) -> f64 {
        self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn elements(&self) -> &[Drawable] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn ensure_open(&self, op: &str) -> Result<(), InternalFault> {
        if self.closed {
            return Err(InternalFault::new(format!("{op} after close()")));
        }
        Ok(())
    }

    pub fn announce(&mut self, extra: f64) -> Result<(), InternalFault> {
        self.ensure_open("announce")?;
        if !extra.is_finite() || extra < 0.0 {
            return Err(InternalFault::new(format!(
                "announced height must be finite and non-negative, got {extra}"
            )));
        }
        if self.pending > 0.0 {
            tracing::trace!(pending = self.pending, "announcement replaced before use");
        }
        self.height += extra;
        self.pending = extra;
        tracing::trace!(extra, height = self.height, "announce");
        Ok(())
    }

    pub fn add_sequence_element(&mut self, drawable: Drawable) -> Result<(), InternalFault> {
        self.ensure_open("add_sequence_element")?;
        let bounds = drawable.bounds();
        if !(bounds.left.is_finite() && bounds.right().is_finite() && bounds.bottom().is_finite())
        {
            return Err(InternalFault::new("drawable has non-finite geometry"));
        }
        if bounds.bottom() > self.height + EPS {
            return Err(InternalFault::new(format!(
                "drawable bottom {} lies below the announced height {}",
                bounds.bottom(),
                self.height
            )));
        }
        self.width = self.width.max(bounds.right());
        self.pending = 0.0;
        self.elements.push(drawable);
        Ok(())
    }

    pub fn grow_width(&mut self, width: f64) -> Result<(), InternalFault> {
        self.ensure_open("grow_width")?;
        if !width.is_finite() {
            return Err(InternalFault::new("non-finite canvas width"));
        }
        self.width = self.width.max(width);
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), InternalFault> {
        self.ensure_open("close")?;
        self.closed = true;
        self.pending = 0.0;
        Ok(())
    }

    pub fn primitives(&self) -> Vec<Primitive> {
        lower_drawables(&self.elements)
    }

    pub fn into_layout(self) -> SequenceLayout {
        SequenceLayout {
            width: self.width,
            height: self.height,
            elements: self.elements,
        }
    }
}

/// A drawing command any backend can execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Primitive {
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Point>,
        stroke: Stroke,
    },
    Triangle {
        points: [Point; 3],
    },
    Circle {
        center: Point,
        radius: f64,
    },
    Rectangle {
        rect: Rect,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke: Option<Stroke>,
    },
    Text {
        bounds: Rect,
        lines: Vec<String>,
        bold: bool,
    },
}

pub fn lower_drawables(elements: &[Drawable]) -> Vec<Primitive> {
    let mut out = Vec::new();
    for drawable in elements {
        lower_drawable(drawable, &mut out);
    }
    out
}

fn push_text(block: &TextBlock, out: &mut Vec<Primitive>) {
    if let Some(bg) = &block.background {
        out.push(Primitive::Rectangle {
            rect: block.bounds,
            fill: Some(bg.clone()),
            stroke: None,
        });
    }
    out.push(Primitive::Text {
        bounds: block.bounds,
        lines: block.lines.clone(),
        bold: block.bold,
    });
}

/// Head at `tip`, pointing along `direction` (+1 right, -1 left).
fn push_arrow_head(
    tip: Point,
    direction: f64,
    head: ArrowHead,
    size: f64,
    out: &mut Vec<Primitive>,
) {
    let back = tip.x - direction * size;
    let upper = Point::new(back, tip.y - size / 2.0);
    let lower = Point::new(back, tip.y + size / 2.0);
    match head {
        ArrowHead::Closed => out.push(Primitive::Triangle {
            points: [tip, upper, lower],
        }),
        ArrowHead::Open => {
            out.push(Primitive::Line {
                from: upper,
                to: tip,
                stroke: Stroke::Solid,
            });
            out.push(Primitive::Line {
                from: lower,
                to: tip,
                stroke: Stroke::Solid,
            });
        }
        ArrowHead::Rounded => out.push(Primitive::Circle {
            center: Point::new(tip.x - direction * size / 2.0, tip.y),
            radius: size / 2.0,
        }),
    }
}

fn lower_fragment(fragment: &Fragment, out: &mut Vec<Primitive>) {
    out.push(Primitive::Rectangle {
        rect: fragment.bounds,
        fill: None,
        stroke: Some(Stroke::Solid),
    });
    let tab = &fragment.tab.bounds;
    out.push(Primitive::Polyline {
        points: vec![
            Point::new(fragment.bounds.left, tab.bottom()),
            Point::new(tab.right(), tab.bottom()),
            Point::new(tab.right(), fragment.bounds.top),
        ],
        stroke: Stroke::Solid,
    });
    push_text(&fragment.tab, out);
    if let Some(cond) = &fragment.condition_label {
        push_text(cond, out);
    }
    for child in &fragment.children {
        match child {
            FragmentChild::Separator(sep) => {
                if let Some(label) = &sep.label {
                    push_text(label, out);
                }
                out.push(Primitive::Line {
                    from: Point::new(sep.left, sep.y),
                    to: Point::new(sep.right, sep.y),
                    stroke: Stroke::Dashed,
                });
            }
            FragmentChild::Fragment(inner) => lower_fragment(inner, out),
        }
    }
}

fn lower_drawable(drawable: &Drawable, out: &mut Vec<Primitive>) {
    match drawable {
        Drawable::Head(head) => {
            out.push(Primitive::Rectangle {
                rect: head.bounds,
                fill: Some("#ffffff".to_string()),
                stroke: Some(Stroke::Solid),
            });
            push_text(&head.label, out);
        }
        Drawable::Line(line) => out.push(Primitive::Line {
            from: Point::new(line.x, line.top),
            to: Point::new(line.x, line.bottom),
            stroke: Stroke::Dashed,
        }),
        Drawable::Activation(bar) => out.push(Primitive::Rectangle {
            rect: bar.bounds,
            fill: Some(bar.fill.clone().unwrap_or_else(|| "#ffffff".to_string())),
            stroke: Some(Stroke::Solid),
        }),
        Drawable::Arrow(arrow) => {
            if let Some(label) = &arrow.label {
                push_text(label, out);
            }
            out.push(Primitive::Line {
                from: arrow.from,
                to: arrow.to,
                stroke: arrow.stroke,
            });
            let direction = if arrow.to.x >= arrow.from.x { 1.0 } else { -1.0 };
            push_arrow_head(arrow.to, direction, arrow.head, arrow.arrow_size, out);
        }
        Drawable::LoopArrow(arrow) => {
            if let Some(label) = &arrow.label {
                push_text(label, out);
            }
            out.push(Primitive::Polyline {
                points: arrow.points.to_vec(),
                stroke: arrow.stroke,
            });
            let [_, _, p2, p3] = arrow.points;
            let direction = if p3.x >= p2.x { 1.0 } else { -1.0 };
            push_arrow_head(p3, direction, arrow.head, arrow.arrow_size, out);
        }
        Drawable::Fragment(fragment) => lower_fragment(fragment, out),
        Drawable::Destructor(cross) => {
            let b = cross.bounds;
            out.push(Primitive::Line {
                from: Point::new(b.left, b.top),
                to: Point::new(b.right(), b.bottom()),
                stroke: Stroke::Solid,
            });
            out.push(Primitive::Line {
                from: Point::new(b.right(), b.top),
                to: Point::new(b.left, b.bottom()),
                stroke: Stroke::Solid,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arrow, LifelineLine, MessageKind};

    fn line(bottom: f64) -> Drawable {
        Drawable::Line(LifelineLine {
            lifeline: "A".to_string(),
            x: 30.0,
            top: 0.0,
            bottom,
        })
    }

    #[test]
    fn announce_grows_height_immediately() {
        let mut device = PaintDevice::new();
        device.announce(12.5).unwrap();
        device.announce(7.5).unwrap();
        assert_eq!(device.height(), 20.0);
        assert_eq!(device.pending(), 7.5);
    }

    #[test]
    fn add_consumes_pending_and_grows_width() {
        let mut device = PaintDevice::new();
        device.announce(40.0).unwrap();
        device.add_sequence_element(line(40.0)).unwrap();
        assert_eq!(device.pending(), 0.0);
        assert_eq!(device.width(), 30.0);
        assert_eq!(device.elements().len(), 1);
    }

    #[test]
    fn negative_or_nan_announce_is_internal_fault() {
        let mut device = PaintDevice::new();
        assert!(device.announce(-1.0).is_err());
        assert!(device.announce(f64::NAN).is_err());
        assert_eq!(device.height(), 0.0);
    }

    #[test]
    fn element_below_announced_height_is_rejected() {
        let mut device = PaintDevice::new();
        device.announce(10.0).unwrap();
        let err = device.add_sequence_element(line(11.0)).unwrap_err();
        assert!(err.message.contains("below the announced height"));
        assert!(device.is_empty());
    }

    #[test]
    fn close_freezes_the_canvas() {
        let mut device = PaintDevice::new();
        device.announce(10.0).unwrap();
        device.close().unwrap();
        assert!(device.announce(1.0).is_err());
        assert!(device.add_sequence_element(line(5.0)).is_err());
        assert!(device.grow_width(100.0).is_err());
        assert!(device.close().is_err());
        assert_eq!(device.height(), 10.0);
        assert_eq!(device.width(), 0.0);
    }

    #[test]
    fn arrow_label_is_lowered_before_its_line() {
        let arrow = Drawable::Arrow(Arrow {
            kind: MessageKind::Call,
            from_lifeline: "A".to_string(),
            to_lifeline: "B".to_string(),
            bounds: Rect::new(0.0, 0.0, 100.0, 30.0),
            from: Point::new(0.0, 25.0),
            to: Point::new(100.0, 25.0),
            head: ArrowHead::Closed,
            stroke: Stroke::Solid,
            arrow_size: 6.0,
            label: Some(TextBlock {
                bounds: Rect::new(40.0, 5.0, 20.0, 12.0),
                lines: vec!["hi".to_string()],
                bold: false,
                background: Some("#ffd8d8".to_string()),
            }),
        });
        let prims = lower_drawables(std::slice::from_ref(&arrow));
        assert!(matches!(prims[0], Primitive::Rectangle { fill: Some(_), .. }));
        assert!(matches!(prims[1], Primitive::Text { .. }));
        assert!(matches!(prims[2], Primitive::Line { .. }));
        let Primitive::Triangle { points } = &prims[3] else {
            panic!("expected closed head");
        };
        assert_eq!(points[0], Point::new(100.0, 25.0));
        assert_eq!(points[1], Point::new(94.0, 22.0));
    }
}
