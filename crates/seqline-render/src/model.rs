use seqline_core::{ArrowHead, Side, Stroke};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in absolute canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut it = points.into_iter();
        let p0 = it.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (p0.x, p0.y, p0.x, p0.y);
        for p in it {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::from_edges(min_x, min_y, max_x, max_y))
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_edges(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// A positioned, already line-broken piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bounds: Rect,
    pub lines: Vec<String>,
    pub bold: bool,
    /// Swatch painted behind the text (threaded, opaque message text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifelineHead {
    pub lifeline: String,
    pub bounds: Rect,
    pub label: TextBlock,
}

/// A dashed piece of a lifeline while it is idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifelineLine {
    pub lifeline: String,
    pub x: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationBar {
    pub lifeline: String,
    pub bounds: Rect,
    pub level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Call,
    Answer,
    SelfCall,
    AnswerToSelf,
}

impl MessageKind {
    pub fn is_answer(self) -> bool {
        matches!(self, MessageKind::Answer | MessageKind::AnswerToSelf)
    }

    pub fn default_head(self) -> ArrowHead {
        if self.is_answer() {
            ArrowHead::Open
        } else {
            ArrowHead::Closed
        }
    }

    pub fn default_stroke(self) -> Stroke {
        if self.is_answer() {
            Stroke::Dashed
        } else {
            Stroke::Solid
        }
    }
}

/// Straight message line between two lifelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub kind: MessageKind,
    pub from_lifeline: String,
    pub to_lifeline: String,
    pub bounds: Rect,
    pub from: Point,
    pub to: Point,
    pub head: ArrowHead,
    pub stroke: Stroke,
    pub arrow_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<TextBlock>,
}

/// Bracket-shaped self message: out, down, back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopArrow {
    pub kind: MessageKind,
    pub lifeline: String,
    pub bounds: Rect,
    pub side: Side,
    pub points: [Point; 4],
    pub head: ArrowHead,
    pub stroke: Stroke,
    pub arrow_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<TextBlock>,
}

impl LoopArrow {
    pub fn outer_x(&self) -> f64 {
        self.points[1].x
    }

    pub fn anchor(&self) -> Point {
        self.points[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentSeparator {
    pub y: f64,
    pub left: f64,
    pub right: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FragmentChild {
    Separator(FragmentSeparator),
    Fragment(Fragment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub bounds: Rect,
    /// Operator tab in the top-left corner.
    pub tab: TextBlock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_label: Option<TextBlock>,
    pub children: Vec<FragmentChild>,
}

/// The cross that ends a destroyed lifeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destructor {
    pub lifeline: String,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Drawable {
    Head(LifelineHead),
    Line(LifelineLine),
    Activation(ActivationBar),
    Arrow(Arrow),
    LoopArrow(LoopArrow),
    Fragment(Fragment),
    Destructor(Destructor),
}

impl Drawable {
    pub fn bounds(&self) -> Rect {
        match self {
            Drawable::Head(h) => h.bounds,
            Drawable::Line(l) => Rect::from_edges(l.x, l.top, l.x, l.bottom),
            Drawable::Activation(a) => a.bounds,
            Drawable::Arrow(a) => a.bounds,
            Drawable::LoopArrow(a) => a.bounds,
            Drawable::Fragment(f) => f.bounds,
            Drawable::Destructor(d) => d.bounds,
        }
    }
}

/// Final output of one layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceLayout {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<Drawable>,
}

impl SequenceLayout {
    pub fn primitives(&self) -> Vec<crate::paint::Primitive> {
        crate::paint::lower_drawables(&self.elements)
    }

    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> {
        self.elements.iter().filter_map(|d| match d {
            Drawable::Arrow(a) => Some(a),
            _ => None,
        })
    }

    pub fn loop_arrows(&self) -> impl Iterator<Item = &LoopArrow> {
        self.elements.iter().filter_map(|d| match d {
            Drawable::LoopArrow(a) => Some(a),
            _ => None,
        })
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.elements.iter().filter_map(|d| match d {
            Drawable::Fragment(f) => Some(f),
            _ => None,
        })
    }
}
