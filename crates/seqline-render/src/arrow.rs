//! Message geometry: straight arrows between two lifelines and bracket-shaped loop arrows
//! for messages a lifeline sends to itself.
//!
//! Laying out a message is split in two so the canvas can be grown first: [`MessageLayout::prepare`]
//! measures the label and fixes everything horizontal, [`PreparedMessage::extent`] is the
//! vertical space to announce, and [`PreparedMessage::place`] produces the drawable once the
//! space is reserved.

use crate::config::{LabelAlignment, LayoutConfig};
use crate::lifeline::Lifelines;
use crate::model::{Arrow, Drawable, LoopArrow, MessageKind, Point, Rect};
use crate::text::{MeasuredLabel, TextMeasurer, TextStyle};
use seqline_core::{ArrowHead, DiagramEvent, Side, Stroke};

/// One message event, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub from: String,
    pub to: String,
    pub side: Side,
    pub label: String,
    pub head: Option<ArrowHead>,
    pub stroke: Option<Stroke>,
    pub thread: Option<usize>,
}

impl Message {
    /// `None` for events that are not messages. A call or return whose ends coincide is a
    /// self message on the right side.
    pub fn from_event(event: &DiagramEvent) -> Option<Self> {
        let (kind, from, to, side, label, head, stroke, thread) = match event {
            DiagramEvent::Call(m) | DiagramEvent::Return(m) => {
                let is_call = matches!(event, DiagramEvent::Call(_));
                let kind = match (is_call, m.from == m.to) {
                    (true, false) => MessageKind::Call,
                    (true, true) => MessageKind::SelfCall,
                    (false, false) => MessageKind::Answer,
                    (false, true) => MessageKind::AnswerToSelf,
                };
                (kind, &m.from, &m.to, Side::Right, &m.label, m.head, m.stroke, m.thread)
            }
            DiagramEvent::SelfCall(m) | DiagramEvent::AnswerToSelf(m) => {
                let kind = if matches!(event, DiagramEvent::SelfCall(_)) {
                    MessageKind::SelfCall
                } else {
                    MessageKind::AnswerToSelf
                };
                (
                    kind,
                    &m.lifeline,
                    &m.lifeline,
                    m.side,
                    &m.label,
                    m.head,
                    m.stroke,
                    m.thread,
                )
            }
            _ => return None,
        };
        Some(Self {
            kind,
            from: from.clone(),
            to: to.clone(),
            side,
            label: label.clone(),
            head,
            stroke,
            thread,
        })
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.kind, MessageKind::SelfCall | MessageKind::AnswerToSelf)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StraightPlan {
    kind: MessageKind,
    from_lifeline: String,
    to_lifeline: String,
    x_from: f64,
    x_to: f64,
    label: MeasuredLabel,
    label_left: f64,
    background: Option<String>,
    head: ArrowHead,
    stroke: Stroke,
    arrow_size: f64,
    spacing: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopPlan {
    kind: MessageKind,
    lifeline: String,
    side: Side,
    x: f64,
    outer_x: f64,
    label: MeasuredLabel,
    label_left: f64,
    background: Option<String>,
    head: ArrowHead,
    stroke: Stroke,
    arrow_size: f64,
    before: f64,
    loop_height: f64,
}

/// A measured message waiting for its vertical position.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedMessage {
    Straight(StraightPlan),
    Loop(LoopPlan),
}

impl PreparedMessage {
    /// Vertical space the message occupies, to be announced before [`Self::place`].
    pub fn extent(&self) -> f64 {
        match self {
            PreparedMessage::Straight(p) => p.spacing + p.label.height + p.arrow_size,
            PreparedMessage::Loop(p) => p.before + p.loop_height + p.arrow_size / 2.0,
        }
    }

    pub fn place(self, y: f64) -> Drawable {
        let extent = self.extent();
        match self {
            PreparedMessage::Straight(p) => Drawable::Arrow(p.place(y, extent)),
            PreparedMessage::Loop(p) => Drawable::LoopArrow(p.place(y, extent)),
        }
    }
}

impl StraightPlan {
    fn place(self, y: f64, extent: f64) -> Arrow {
        let line_y = y + self.spacing + self.label.height + self.arrow_size / 2.0;
        let label = (!self.label.is_empty()).then(|| {
            let mut block = self.label.place(self.label_left, y + self.spacing);
            block.background = self.background.clone();
            block
        });
        let mut bounds = Rect::from_edges(
            self.x_from.min(self.x_to),
            y,
            self.x_from.max(self.x_to),
            y + extent,
        );
        if let Some(label) = &label {
            bounds = bounds.union(&label.bounds);
        }
        Arrow {
            kind: self.kind,
            from_lifeline: self.from_lifeline,
            to_lifeline: self.to_lifeline,
            bounds,
            from: Point::new(self.x_from, line_y),
            to: Point::new(self.x_to, line_y),
            head: self.head,
            stroke: self.stroke,
            arrow_size: self.arrow_size,
            label,
        }
    }
}

impl LoopPlan {
    fn place(self, y: f64, extent: f64) -> LoopArrow {
        let y_from = y + self.before;
        let y_to = y_from + self.loop_height;
        let points = [
            Point::new(self.x, y_from),
            Point::new(self.outer_x, y_from),
            Point::new(self.outer_x, y_to),
            Point::new(self.x, y_to),
        ];
        let label = (!self.label.is_empty()).then(|| {
            let top = if self.kind.is_answer() {
                y_to - self.label.height
            } else {
                y_from
            };
            let mut block = self.label.place(self.label_left, top);
            block.background = self.background.clone();
            block
        });
        let path = Rect::from_points(points).unwrap_or_default();
        let mut bounds = Rect::from_edges(path.left, y, path.right(), y + extent);
        if let Some(label) = &label {
            bounds = bounds.union(&label.bounds);
        }
        LoopArrow {
            kind: self.kind,
            lifeline: self.lifeline,
            bounds,
            side: self.side,
            points,
            head: self.head,
            stroke: self.stroke,
            arrow_size: self.arrow_size,
            label,
        }
    }
}

pub struct MessageLayout<'a> {
    config: &'a LayoutConfig,
    measurer: &'a dyn TextMeasurer,
    style: TextStyle,
    left_bound: f64,
}

impl<'a> MessageLayout<'a> {
    pub fn new(config: &'a LayoutConfig, measurer: &'a dyn TextMeasurer) -> Self {
        Self {
            config,
            measurer,
            style: TextStyle {
                font_family: config.font_family.clone(),
                font_size: config.font_size,
                bold: false,
            },
            left_bound: 0.0,
        }
    }

    /// Leftmost x a left-side loop may reach when its lifeline has no live left neighbour.
    pub fn with_left_bound(mut self, left_bound: f64) -> Self {
        self.left_bound = left_bound;
        self
    }

    /// Measures and positions `message` horizontally.
    ///
    /// Returns `None` for an answer that is not drawn at all (empty label while return
    /// arrows are hidden). Both lifelines must exist in `lifelines`.
    pub fn prepare(&self, message: &Message, lifelines: &Lifelines) -> Option<PreparedMessage> {
        if message.kind.is_answer()
            && message.label.trim().is_empty()
            && !self.config.return_arrow_visible
        {
            tracing::trace!(from = %message.from, to = %message.to, "invisible answer");
            return None;
        }
        if message.is_loop() {
            self.prepare_loop(message, lifelines).map(PreparedMessage::Loop)
        } else {
            self.prepare_straight(message, lifelines)
                .map(PreparedMessage::Straight)
        }
    }

    fn background(&self, message: &Message, lifelines: &Lifelines) -> Option<String> {
        if !self.config.opaque_message_text {
            return None;
        }
        let thread = message.thread.or_else(|| {
            self.config
                .threaded
                .then(|| lifelines.get(&message.from).and_then(|l| l.thread()))
                .flatten()
        })?;
        self.config.thread_color(thread).map(str::to_string)
    }

    fn measure(&self, text: &str, max_width: Option<f64>) -> MeasuredLabel {
        let max_width = if self.config.wrap_labels {
            max_width
        } else {
            None
        };
        MeasuredLabel::measure(self.measurer, text, &self.style, max_width)
    }

    fn prepare_straight(&self, message: &Message, lifelines: &Lifelines) -> Option<StraightPlan> {
        let cfg = self.config;
        let from = lifelines.get(&message.from)?;
        let to = lifelines.get(&message.to)?;
        let (x_from, x_to) = if to.position() > from.position() {
            (from.right_anchor(), to.left_anchor())
        } else {
            (from.left_anchor(), to.right_anchor())
        };
        let (min_x, max_x) = (x_from.min(x_to), x_from.max(x_to));
        let available = max_x - min_x - 2.0 * cfg.message_padding;

        let label = self.measure(&message.label, Some(available));
        if label.width > available {
            tracing::warn!(
                label = %message.label,
                width = label.width,
                available,
                "message label is wider than the gap between its lifelines"
            );
        }
        let label_left = match cfg.label_alignment {
            LabelAlignment::Center => (min_x + max_x) / 2.0 - label.width / 2.0,
            LabelAlignment::Left => min_x + cfg.message_padding,
            LabelAlignment::Right => max_x - cfg.message_padding - label.width,
        }
        .max(0.0);

        Some(StraightPlan {
            kind: message.kind,
            from_lifeline: message.from.clone(),
            to_lifeline: message.to.clone(),
            x_from,
            x_to,
            label_left,
            background: self.background(message, lifelines),
            head: message.head.unwrap_or(message.kind.default_head()),
            stroke: message.stroke.unwrap_or(message.kind.default_stroke()),
            arrow_size: cfg.arrow_size,
            spacing: cfg.message_spacing,
            label,
        })
    }

    fn prepare_loop(&self, message: &Message, lifelines: &Lifelines) -> Option<LoopPlan> {
        let cfg = self.config;
        let lifeline = lifelines.get(&message.from)?;
        let pad = cfg.message_padding;
        let space = cfg.self_message_horizontal_space;
        let left_limit = lifelines
            .left_neighbour(lifeline.position())
            .map(|n| n.right_anchor())
            .unwrap_or(self.left_bound);

        let (x, outer_x, max_width) = match message.side {
            Side::Right => {
                let x = lifeline.right_anchor();
                let outer_x = x + space;
                let max_width = lifelines
                    .right_neighbour(lifeline.position())
                    .map(|n| n.left_anchor() - outer_x - 2.0 * pad);
                (x, outer_x, max_width)
            }
            Side::Left => {
                let x = lifeline.left_anchor();
                let outer_x = (x - space).max(left_limit);
                (x, outer_x, Some(outer_x - left_limit - 2.0 * pad))
            }
        };

        let mut label = self.measure(&message.label, max_width);
        let overflow = max_width.filter(|w| !label.is_empty() && label.width > *w);
        if let Some(available) = overflow {
            if message.side == Side::Left {
                // Clamped against the limit, the label would cross the outer segment.
                label = MeasuredLabel::measure(
                    self.measurer,
                    &message.label,
                    &self.style,
                    Some(available),
                );
            }
            if label.width > available {
                tracing::warn!(
                    label = %message.label,
                    width = label.width,
                    available,
                    side = ?message.side,
                    "self message label does not fit beside its loop"
                );
            }
        }
        let label_left = match message.side {
            Side::Right => outer_x + pad,
            Side::Left => (outer_x - pad - label.width).max(left_limit + pad),
        };

        let before = if message.kind.is_answer() {
            cfg.space_before_answer_to_self
        } else {
            cfg.message_spacing
        };

        Some(LoopPlan {
            kind: message.kind,
            lifeline: message.from.clone(),
            side: message.side,
            x,
            outer_x,
            label_left,
            background: self.background(message, lifelines),
            head: message.head.unwrap_or(message.kind.default_head()),
            stroke: message.stroke.unwrap_or(message.kind.default_stroke()),
            arrow_size: cfg.arrow_size,
            before,
            loop_height: label.height.max(cfg.arrow_size),
            label,
        })
    }
}
