//! The single forward pass over the event stream.

use crate::arrow::{Message, MessageLayout};
use crate::config::LayoutConfig;
use crate::fragment::{Closed, FragmentManager};
use crate::lifeline::{Lifeline, Lifelines};
use crate::model::{Drawable, LifelineHead, Rect};
use crate::paint::PaintDevice;
use crate::text::{MeasuredLabel, TextMeasurer, TextStyle};
use crate::{Error, InternalFault, Result, SemanticError};
use seqline_core::DiagramEvent;

/// Layout state while events are being consumed.
///
/// After every processed event the vertical cursor equals the canvas height; stopping at any
/// point leaves a consistent, partially drawn canvas.
pub struct Diagram<'a> {
    config: &'a LayoutConfig,
    measurer: &'a dyn TextMeasurer,
    device: PaintDevice,
    lifelines: Lifelines,
    fragments: FragmentManager,
    y: f64,
    /// Set by the first event that is not a lifeline creation; until then heads share the
    /// top row.
    started: bool,
    header_height: f64,
}

impl<'a> Diagram<'a> {
    pub fn new(config: &'a LayoutConfig, measurer: &'a dyn TextMeasurer) -> Self {
        Self {
            config,
            measurer,
            device: PaintDevice::new(),
            lifelines: Lifelines::new(),
            fragments: FragmentManager::new(config.fragment_margin, config.fragment_text_padding),
            y: 0.0,
            started: false,
            header_height: 0.0,
        }
    }

    pub fn device(&self) -> &PaintDevice {
        &self.device
    }

    pub fn lifelines(&self) -> &Lifelines {
        &self.lifelines
    }

    pub fn fragments(&self) -> &FragmentManager {
        &self.fragments
    }

    /// Current vertical cursor.
    pub fn y(&self) -> f64 {
        self.y
    }

    fn style(&self, bold: bool) -> TextStyle {
        TextStyle {
            font_family: self.config.font_family.clone(),
            font_size: self.config.font_size,
            bold,
        }
    }

    /// Consumes one event. `position` is the event's index in the stream and is attached to
    /// any error.
    pub fn process(&mut self, position: usize, event: &DiagramEvent) -> Result<()> {
        tracing::debug!(position, kind = event.kind_name(), y = self.y, "event");
        self.validate(event)
            .map_err(|kind| Error::semantic(position, kind))?;

        self.dispatch(event).map_err(|e| e.at(position))?;
        debug_assert!((self.y - self.device.height()).abs() < 1e-6);
        Ok(())
    }

    fn validate(&self, event: &DiagramEvent) -> std::result::Result<(), SemanticError> {
        match event {
            DiagramEvent::CreateLifeline { name, .. } => {
                if self.lifelines.get(name).is_some() {
                    return Err(SemanticError::DuplicateLifeline { name: name.clone() });
                }
                return Ok(());
            }
            DiagramEvent::CloseFragment { id } => return self.fragments.check_close(id.as_deref()),
            DiagramEvent::FragmentSeparator { .. } => return self.fragments.check_separator(),
            _ => {}
        }

        for name in event.participants() {
            match self.lifelines.get(name) {
                Some(l) if !l.is_alive() => {
                    return Err(SemanticError::TerminatedLifeline {
                        name: name.to_string(),
                    });
                }
                Some(_) => {}
                None if self.config.implicit_lifelines && event.is_message() => {}
                None => {
                    return Err(SemanticError::UnknownLifeline {
                        name: name.to_string(),
                    });
                }
            }
        }

        if let DiagramEvent::Deactivate { lifeline } = event {
            if self.lifelines.get(lifeline).is_some_and(|l| l.side_level() == 0) {
                return Err(SemanticError::NotActive {
                    name: lifeline.clone(),
                });
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &DiagramEvent) -> Result<()> {
        if !matches!(event, DiagramEvent::CloseFragment { .. }) {
            self.finish_fragments_not_including()?;
        }

        match event {
            DiagramEvent::CreateLifeline { name, label } => {
                return self.create_lifeline(name, label.as_deref());
            }
            DiagramEvent::CloseFragment { id } => {
                self.fragments
                    .mark_ending(id.as_deref())
                    .map_err(|kind| InternalFault::new(kind.to_string()))?;
                return Ok(());
            }
            _ => {}
        }

        if event.is_message() && self.config.implicit_lifelines {
            for name in event.participants() {
                if self.lifelines.get(name).is_none() {
                    tracing::debug!(name, "creating lifeline on first reference");
                    self.create_lifeline(name, None)?;
                }
            }
        }
        self.started = true;

        match event {
            DiagramEvent::Call(_)
            | DiagramEvent::Return(_)
            | DiagramEvent::SelfCall(_)
            | DiagramEvent::AnswerToSelf(_) => {
                let message = Message::from_event(event)
                    .ok_or_else(|| InternalFault::new("message event without a message"))?;
                self.lay_out_message(&message)
            }
            DiagramEvent::Activate { lifeline, thread } => self.activate(lifeline, *thread),
            DiagramEvent::Deactivate { lifeline } => self.deactivate(lifeline),
            DiagramEvent::Destroy { lifeline } => self.destroy(lifeline),
            DiagramEvent::OpenFragment {
                operator,
                condition,
                id,
            } => self.open_fragment(operator, condition.as_deref(), id.as_deref()),
            DiagramEvent::FragmentSeparator { condition } => {
                self.fragment_separator(condition.as_deref())
            }
            DiagramEvent::CreateLifeline { .. } | DiagramEvent::CloseFragment { .. } => Ok(()),
        }
    }

    fn advance(&mut self, extent: f64) -> Result<()> {
        self.device.announce(extent)?;
        self.y += extent;
        Ok(())
    }

    fn lifeline(&self, name: &str) -> Result<&Lifeline> {
        self.lifelines
            .get(name)
            .ok_or_else(|| InternalFault::new(format!("lifeline `{name}` vanished after validation")).into())
    }

    fn lifeline_mut(&mut self, name: &str) -> Result<&mut Lifeline> {
        self.lifelines
            .get_mut(name)
            .ok_or_else(|| InternalFault::new(format!("lifeline `{name}` vanished after validation")).into())
    }

    fn bar_fill(config: &LayoutConfig) -> impl Fn(Option<usize>) -> Option<String> + '_ {
        move |thread| {
            if !config.threaded {
                return None;
            }
            thread
                .and_then(|t| config.thread_color(t))
                .map(str::to_string)
        }
    }

    fn create_lifeline(&mut self, name: &str, label: Option<&str>) -> Result<()> {
        let cfg = self.config;
        let text = label.unwrap_or(name);
        let label = MeasuredLabel::measure(self.measurer, text, &self.style(true), None);
        let width = (label.width + 2.0 * cfg.head_padding).max(cfg.min_head_width);
        let height = label.height + 2.0 * cfg.head_padding;

        let x = match self.lifelines.last() {
            Some(prev) => prev.x() + prev.head().width / 2.0 + cfg.lifeline_spacing + width / 2.0,
            None => cfg.left_margin + width / 2.0,
        };

        let top = if self.started {
            self.advance(height + cfg.head_gap)?;
            self.y - height - cfg.head_gap
        } else if self.lifelines.is_empty() {
            self.header_height = height;
            self.advance(cfg.top_margin + height + cfg.head_gap)?;
            cfg.top_margin
        } else {
            let extra = (height - self.header_height).max(0.0);
            self.header_height = self.header_height.max(height);
            self.advance(extra)?;
            cfg.top_margin
        };

        let bounds = Rect::new(x - width / 2.0, top, width, height);
        let position = self.lifelines.len();
        tracing::debug!(name, position, x, top, "lifeline");

        self.device.add_sequence_element(Drawable::Head(LifelineHead {
            lifeline: name.to_string(),
            bounds,
            label: label.place(x - label.width / 2.0, top + cfg.head_padding),
        }))?;
        self.lifelines.insert(Lifeline::new(
            name.to_string(),
            text.to_string(),
            position,
            x,
            bounds,
            cfg.activation_width,
        ));
        self.fragments
            .include(x - cfg.activation_width, x + cfg.activation_width);
        Ok(())
    }

    fn lay_out_message(&mut self, message: &Message) -> Result<()> {
        let cfg = self.config;
        let from_x = self.lifeline(&message.from)?.x();
        let to_x = self.lifeline(&message.to)?.x();

        // Open fragments each keep a margin between the canvas edge and their content.
        let left_bound =
            self.device.left_bound() + self.fragments.depth() as f64 * cfg.fragment_margin;
        let layout = MessageLayout::new(cfg, self.measurer).with_left_bound(left_bound);
        let Some(prepared) = layout.prepare(message, &self.lifelines) else {
            return Ok(());
        };
        let extent = prepared.extent();
        let top = self.y;
        self.advance(extent)?;

        let drawable = prepared.place(top);
        let bounds = drawable.bounds();
        self.device.add_sequence_element(drawable)?;

        let bottom = top + extent;
        self.lifeline_mut(&message.from)?.extend_to(bottom);
        self.lifeline_mut(&message.to)?.extend_to(bottom);

        let aw = cfg.activation_width;
        self.fragments.include(
            bounds.left.min(from_x.min(to_x) - aw),
            bounds.right().max(from_x.max(to_x) + aw),
        );
        Ok(())
    }

    fn activate(&mut self, name: &str, thread: Option<usize>) -> Result<()> {
        let y = self.y;
        if let Some(piece) = self.lifeline_mut(name)?.activate(y, thread) {
            self.device.add_sequence_element(piece)?;
        }
        Ok(())
    }

    fn deactivate(&mut self, name: &str) -> Result<()> {
        let y = self.y;
        let fill = Self::bar_fill(self.config);
        let bar = self
            .lifelines
            .get_mut(name)
            .ok_or_else(|| InternalFault::new(format!("lifeline `{name}` vanished after validation")))?
            .deactivate(y, fill)
            .map_err(|kind| InternalFault::new(kind.to_string()))?;
        if let Some(bar) = bar {
            self.device.add_sequence_element(bar)?;
        }
        Ok(())
    }

    fn destroy(&mut self, name: &str) -> Result<()> {
        let size = self.config.destructor_size;
        let top = self.y;
        self.advance(size)?;
        let fill = Self::bar_fill(self.config);
        let lifeline = self
            .lifelines
            .get_mut(name)
            .ok_or_else(|| InternalFault::new(format!("lifeline `{name}` vanished after validation")))?;
        let x = lifeline.x();
        for drawable in lifeline.terminate(top, size, fill) {
            self.device.add_sequence_element(drawable)?;
        }
        self.fragments.include(x - size / 2.0, x + size / 2.0);
        Ok(())
    }

    fn open_fragment(
        &mut self,
        operator: &str,
        condition: Option<&str>,
        id: Option<&str>,
    ) -> Result<()> {
        let cfg = self.config;
        let tab = MeasuredLabel::measure(self.measurer, operator, &self.style(true), None);
        let condition_label = match condition {
            Some(c) if !c.trim().is_empty() => {
                MeasuredLabel::measure(self.measurer, &format!("[{c}]"), &self.style(false), None)
            }
            _ => MeasuredLabel::default(),
        };
        let extent = tab.height.max(condition_label.height)
            + 2.0 * cfg.fragment_text_padding
            + cfg.fragment_padding;

        self.fragments.open(
            id.map(str::to_string),
            operator.to_string(),
            condition.map(str::to_string),
            self.y,
            tab,
            condition_label,
        );
        self.advance(extent)
    }

    fn fragment_separator(&mut self, condition: Option<&str>) -> Result<()> {
        let label = match condition {
            Some(c) if !c.trim().is_empty() => {
                MeasuredLabel::measure(self.measurer, &format!("[{c}]"), &self.style(false), None)
            }
            _ => MeasuredLabel::default(),
        };
        let extent = label.height + self.config.fragment_padding;
        let y = self.y;
        self.fragments
            .add_separator(y, label)
            .map_err(|kind| InternalFault::new(kind.to_string()))?;
        self.advance(extent)
    }

    fn close_top_fragment(&mut self) -> Result<()> {
        let fallback = self.lifelines.alive_span(self.config.activation_width);
        let Some(closed) = self.fragments.close_top(self.y, fallback) else {
            return Ok(());
        };
        self.advance(self.config.fragment_padding)?;
        if let Closed::Outermost(fragment) = closed {
            self.device
                .add_sequence_element(Drawable::Fragment(fragment))?;
        }
        Ok(())
    }

    /// Closes every fragment whose `CloseFragment` has been seen, innermost first.
    fn finish_fragments_not_including(&mut self) -> Result<()> {
        while self.fragments.has_ending() {
            self.close_top_fragment()?;
        }
        Ok(())
    }

    /// Ends the pass: closes all fragments, ends every live lifeline at the cursor, adds the
    /// bottom and right margins and freezes the canvas.
    pub fn finish(mut self) -> Result<PaintDevice> {
        while !self.fragments.is_empty() {
            self.close_top_fragment()?;
        }

        let y = self.y;
        let fill = Self::bar_fill(self.config);
        for lifeline in self.lifelines.iter_mut().filter(|l| l.is_alive()) {
            for drawable in lifeline.finish(y, &fill) {
                self.device.add_sequence_element(drawable)?;
            }
        }

        self.advance(self.config.bottom_margin)?;
        let width = self.device.right_bound() + self.config.right_margin;
        self.device.grow_width(width)?;
        self.device.close()?;
        tracing::debug!(
            width = self.device.width(),
            height = self.device.height(),
            elements = self.device.elements().len(),
            "layout finished"
        );
        Ok(self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::FixedTextMeasurer;
    use seqline_core::MessageEvent;

    fn create(name: &str) -> DiagramEvent {
        DiagramEvent::CreateLifeline {
            name: name.to_string(),
            label: None,
        }
    }

    fn call(from: &str, to: &str, label: &str) -> DiagramEvent {
        DiagramEvent::Call(MessageEvent {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
            head: None,
            stroke: None,
            thread: None,
        })
    }

    #[test]
    fn header_row_is_announced_once_and_grows_for_taller_heads() {
        let cfg = LayoutConfig::default();
        let measurer = FixedTextMeasurer::default();
        let mut d = Diagram::new(&cfg, &measurer);
        d.process(0, &create("A")).unwrap();
        // 10 top margin + (20 + 2 * 6) head + 8 gap
        assert_eq!(d.y(), 50.0);
        d.process(
            1,
            &DiagramEvent::CreateLifeline {
                name: "B".to_string(),
                label: Some("two\nlines".to_string()),
            },
        )
        .unwrap();
        assert_eq!(d.y(), 70.0);
        assert_eq!(d.device().height(), 70.0);
        let b = d.lifelines().get("B").unwrap();
        assert_eq!(b.head().top, 10.0);
    }

    #[test]
    fn lifeline_slots_follow_head_widths() {
        let cfg = LayoutConfig::default();
        let measurer = FixedTextMeasurer::default();
        let mut d = Diagram::new(&cfg, &measurer);
        d.process(0, &create("A")).unwrap();
        d.process(1, &create("Server")).unwrap();
        let a = d.lifelines().get("A").unwrap();
        let s = d.lifelines().get("Server").unwrap();
        // A: min width 40; Server: 60 + 12 = 72
        assert_eq!(a.x(), 30.0);
        assert_eq!(s.x(), 30.0 + 20.0 + 20.0 + 36.0);
    }

    #[test]
    fn head_created_after_start_sits_at_the_cursor() {
        let cfg = LayoutConfig::default();
        let measurer = FixedTextMeasurer::default();
        let mut d = Diagram::new(&cfg, &measurer);
        d.process(0, &create("A")).unwrap();
        d.process(1, &create("B")).unwrap();
        d.process(2, &call("A", "B", "x")).unwrap();
        let before = d.y();
        d.process(3, &create("C")).unwrap();
        assert_eq!(d.lifelines().get("C").unwrap().head().top, before);
        assert_eq!(d.y(), before + 32.0 + 8.0);
    }

    #[test]
    fn rejected_event_leaves_the_canvas_untouched() {
        let cfg = LayoutConfig::default();
        let measurer = FixedTextMeasurer::default();
        let mut d = Diagram::new(&cfg, &measurer);
        d.process(0, &create("A")).unwrap();
        let height = d.device().height();
        let err = d.process(1, &call("A", "Nobody", "x")).unwrap_err();
        assert!(err.is_semantic());
        assert_eq!(err.position(), Some(1));
        assert_eq!(d.device().height(), height);
        assert_eq!(d.device().elements().len(), 1);
    }

    #[test]
    fn implicit_lifelines_are_created_on_first_reference() {
        let cfg = LayoutConfig {
            implicit_lifelines: true,
            ..LayoutConfig::default()
        };
        let measurer = FixedTextMeasurer::default();
        let mut d = Diagram::new(&cfg, &measurer);
        d.process(0, &call("A", "B", "hi")).unwrap();
        assert_eq!(d.lifelines().len(), 2);
        assert_eq!(d.lifelines().get("B").unwrap().head().top, 10.0);
        let device = d.finish().unwrap();
        assert!(device.is_closed());
    }

    #[test]
    fn deactivating_idle_lifeline_is_rejected() {
        let cfg = LayoutConfig::default();
        let measurer = FixedTextMeasurer::default();
        let mut d = Diagram::new(&cfg, &measurer);
        d.process(0, &create("A")).unwrap();
        let err = d
            .process(
                1,
                &DiagramEvent::Deactivate {
                    lifeline: "A".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Semantic {
                position: 1,
                kind: SemanticError::NotActive { .. }
            }
        ));
    }
}
