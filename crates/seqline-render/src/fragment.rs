//! Nested scope blocks (`loop`, `alt`, `opt`, ...).
//!
//! A fragment is open from its `OpenFragment` event, becomes *ending* when its
//! `CloseFragment` arrives, and is closed lazily: the next event that is not itself a
//! `CloseFragment` closes every ending fragment, innermost first. Ending fragments always
//! form a suffix of the stack.

use crate::SemanticError;
use crate::model::{Fragment, FragmentChild, FragmentSeparator, Rect};
use crate::text::MeasuredLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentState {
    Open,
    Ending,
}

#[derive(Debug, Clone)]
enum PendingChild {
    Separator { y: f64, label: MeasuredLabel },
    Fragment(Fragment),
}

#[derive(Debug, Clone)]
struct OpenFragment {
    id: Option<String>,
    operator: String,
    condition: Option<String>,
    top: f64,
    tab: MeasuredLabel,
    condition_label: MeasuredLabel,
    span: Option<(f64, f64)>,
    children: Vec<PendingChild>,
    state: FragmentState,
}

impl OpenFragment {
    fn include(&mut self, left: f64, right: f64) {
        self.span = Some(match self.span {
            Some((l, r)) => (l.min(left), r.max(right)),
            None => (left, right),
        });
    }

    fn display_name(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.operator.clone())
    }
}

/// What happened to a fragment that was just closed.
#[derive(Debug, Clone, PartialEq)]
pub enum Closed {
    /// Became a child of the enclosing fragment.
    Nested,
    /// Outermost fragment; the caller appends it to the canvas.
    Outermost(Fragment),
}

#[derive(Debug, Clone, Default)]
pub struct FragmentManager {
    stack: Vec<OpenFragment>,
    margin: f64,
    text_padding: f64,
}

impl FragmentManager {
    pub fn new(margin: f64, text_padding: f64) -> Self {
        Self {
            stack: Vec::new(),
            margin,
            text_padding,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// States from outermost to innermost.
    pub fn states(&self) -> Vec<FragmentState> {
        self.stack.iter().map(|f| f.state).collect()
    }

    pub fn has_ending(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|f| f.state == FragmentState::Ending)
    }

    pub(crate) fn open(
        &mut self,
        id: Option<String>,
        operator: String,
        condition: Option<String>,
        top: f64,
        tab: MeasuredLabel,
        condition_label: MeasuredLabel,
    ) {
        tracing::debug!(operator = %operator, id = ?id, top, depth = self.stack.len(), "open fragment");
        self.stack.push(OpenFragment {
            id,
            operator,
            condition,
            top,
            tab,
            condition_label,
            span: None,
            children: Vec::new(),
            state: FragmentState::Open,
        });
    }

    /// Grows every open fragment to cover `[left, right]`.
    pub(crate) fn include(&mut self, left: f64, right: f64) {
        for fragment in &mut self.stack {
            fragment.include(left, right);
        }
    }

    fn innermost_open(&self) -> Option<usize> {
        self.stack
            .iter()
            .rposition(|f| f.state == FragmentState::Open)
    }

    /// Checks that a `CloseFragment { id }` would be accepted.
    ///
    /// Without an id the innermost open fragment is closed. An id must name the innermost
    /// open fragment; naming an outer one is malformed nesting, naming none is an error too.
    pub fn check_close(&self, id: Option<&str>) -> Result<(), SemanticError> {
        let Some(idx) = self.innermost_open() else {
            return Err(SemanticError::FragmentNotOpen);
        };
        let Some(id) = id else {
            return Ok(());
        };
        let innermost = &self.stack[idx];
        if innermost.id.as_deref() == Some(id) {
            return Ok(());
        }
        if self.stack[..idx].iter().any(|f| f.id.as_deref() == Some(id)) {
            return Err(SemanticError::MalformedNesting {
                expected: innermost.display_name(),
                found: id.to_string(),
            });
        }
        Err(SemanticError::UnknownFragment { id: id.to_string() })
    }

    pub(crate) fn mark_ending(&mut self, id: Option<&str>) -> Result<(), SemanticError> {
        self.check_close(id)?;
        if let Some(idx) = self.innermost_open() {
            let fragment = &mut self.stack[idx];
            fragment.state = FragmentState::Ending;
            tracing::debug!(operator = %fragment.operator, depth = idx, "fragment ending");
        }
        Ok(())
    }

    pub fn check_separator(&self) -> Result<(), SemanticError> {
        match self.innermost_open() {
            Some(_) => Ok(()),
            None => Err(SemanticError::NoOpenFragment),
        }
    }

    pub(crate) fn add_separator(&mut self, y: f64, label: MeasuredLabel) -> Result<(), SemanticError> {
        let idx = self.innermost_open().ok_or(SemanticError::NoOpenFragment)?;
        self.stack[idx]
            .children
            .push(PendingChild::Separator { y, label });
        Ok(())
    }

    /// Closes the innermost fragment at `bottom`, whatever its state.
    ///
    /// `fallback` is the span used when the fragment never covered a participant.
    pub(crate) fn close_top(&mut self, bottom: f64, fallback: Option<(f64, f64)>) -> Option<Closed> {
        let open = self.stack.pop()?;
        let depth = self.depth();
        tracing::debug!(operator = %open.operator, bottom, depth, "close fragment");
        let fragment = self.build(open, bottom, fallback, depth as f64 * self.margin);
        match self.stack.last_mut() {
            Some(parent) => {
                parent.include(fragment.bounds.left, fragment.bounds.right());
                parent.children.push(PendingChild::Fragment(fragment));
                Some(Closed::Nested)
            }
            None => Some(Closed::Outermost(fragment)),
        }
    }

    /// `floor` keeps a nested border inside its parent's margin even at the canvas edge.
    fn build(
        &self,
        open: OpenFragment,
        bottom: f64,
        fallback: Option<(f64, f64)>,
        floor: f64,
    ) -> Fragment {
        let pad = self.text_padding;
        let (span_left, span_right) = open.span.or(fallback).unwrap_or((0.0, 0.0));

        let left = (span_left - self.margin).max(floor);
        let tab_bounds = Rect::new(
            left,
            open.top,
            open.tab.width + 2.0 * pad,
            open.tab.height + 2.0 * pad,
        );
        let condition_label = (!open.condition_label.is_empty())
            .then(|| open.condition_label.place(tab_bounds.right() + pad, open.top + pad));
        let header_right = condition_label
            .as_ref()
            .map(|c| c.bounds.right() + pad)
            .unwrap_or(tab_bounds.right());
        let right = (span_right + self.margin).max(header_right);

        // The tab text block spans the whole padded tab box.
        let mut tab = open.tab.place(left, open.top);
        tab.bounds = tab_bounds;

        let children = open
            .children
            .into_iter()
            .map(|child| match child {
                PendingChild::Separator { y, label } => FragmentChild::Separator(FragmentSeparator {
                    y,
                    left,
                    right,
                    label: (!label.is_empty()).then(|| label.place(left + pad, y + pad)),
                }),
                PendingChild::Fragment(inner) => FragmentChild::Fragment(inner),
            })
            .collect();

        Fragment {
            id: open.id,
            operator: open.operator,
            condition: open.condition,
            bounds: Rect::from_edges(left, open.top, right, bottom),
            tab,
            condition_label,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(width: f64, height: f64) -> MeasuredLabel {
        MeasuredLabel {
            lines: vec!["x".to_string()],
            width,
            height,
            bold: false,
        }
    }

    fn manager_with(ids: &[&str]) -> FragmentManager {
        let mut m = FragmentManager::new(8.0, 3.0);
        for (i, id) in ids.iter().enumerate() {
            m.open(
                Some(id.to_string()),
                "loop".to_string(),
                None,
                10.0 * i as f64,
                label(40.0, 20.0),
                MeasuredLabel::default(),
            );
        }
        m
    }

    #[test]
    fn closing_without_open_fragment_is_rejected() {
        let mut m = FragmentManager::new(8.0, 3.0);
        assert_eq!(m.mark_ending(None), Err(SemanticError::FragmentNotOpen));
        assert_eq!(m.check_separator(), Err(SemanticError::NoOpenFragment));
    }

    #[test]
    fn close_marks_innermost_open_fragment_ending() {
        let mut m = manager_with(&["outer", "inner"]);
        m.mark_ending(None).unwrap();
        assert_eq!(m.states(), vec![FragmentState::Open, FragmentState::Ending]);
        m.mark_ending(Some("outer")).unwrap();
        assert_eq!(m.states(), vec![FragmentState::Ending, FragmentState::Ending]);
        assert_eq!(m.mark_ending(None), Err(SemanticError::FragmentNotOpen));
    }

    #[test]
    fn closing_an_outer_fragment_first_is_malformed_nesting() {
        let mut m = manager_with(&["outer", "inner"]);
        assert_eq!(
            m.mark_ending(Some("outer")),
            Err(SemanticError::MalformedNesting {
                expected: "inner".to_string(),
                found: "outer".to_string(),
            })
        );
        assert_eq!(m.states(), vec![FragmentState::Open, FragmentState::Open]);
    }

    #[test]
    fn closing_an_id_that_was_never_opened_is_rejected() {
        let mut m = FragmentManager::new(8.0, 3.0);
        m.open(
            None,
            "loop".to_string(),
            None,
            0.0,
            label(40.0, 20.0),
            MeasuredLabel::default(),
        );
        assert_eq!(
            m.mark_ending(Some("ghost")),
            Err(SemanticError::UnknownFragment {
                id: "ghost".to_string()
            })
        );

        let mut m = manager_with(&["outer", "inner"]);
        m.mark_ending(Some("inner")).unwrap();
        assert_eq!(
            m.mark_ending(Some("inner")),
            Err(SemanticError::UnknownFragment {
                id: "inner".to_string()
            })
        );
        assert_eq!(m.states(), vec![FragmentState::Open, FragmentState::Ending]);
    }

    #[test]
    fn nested_borders_at_the_canvas_edge_stay_apart() {
        let mut m = manager_with(&["outer", "inner"]);
        m.include(2.0, 40.0);
        assert_eq!(m.close_top(50.0, None), Some(Closed::Nested));
        let Some(Closed::Outermost(outer)) = m.close_top(60.0, None) else {
            panic!("expected outermost fragment");
        };
        let FragmentChild::Fragment(inner) = &outer.children[0] else {
            panic!("expected nested fragment");
        };
        assert_eq!(outer.bounds.left, 0.0);
        assert_eq!(inner.bounds.left, 8.0);
    }

    #[test]
    fn nested_fragment_becomes_child_and_widens_parent() {
        let mut m = manager_with(&["outer", "inner"]);
        m.include(100.0, 200.0);
        m.mark_ending(None).unwrap();
        assert_eq!(m.close_top(50.0, None), Some(Closed::Nested));
        m.include(150.0, 160.0);
        m.mark_ending(None).unwrap();
        let Some(Closed::Outermost(outer)) = m.close_top(80.0, None) else {
            panic!("expected outermost fragment");
        };
        assert!(m.is_empty());

        let FragmentChild::Fragment(inner) = &outer.children[0] else {
            panic!("expected nested fragment");
        };
        assert_eq!(inner.bounds, Rect::from_edges(92.0, 10.0, 208.0, 50.0));
        assert_eq!(outer.bounds, Rect::from_edges(84.0, 0.0, 216.0, 80.0));
        assert!(outer.bounds.top <= inner.bounds.top);
        assert!(outer.bounds.bottom() >= inner.bounds.bottom());
    }

    #[test]
    fn fragment_without_participants_uses_fallback_span() {
        let mut m = manager_with(&["only"]);
        m.add_separator(30.0, label(20.0, 10.0)).unwrap();
        let Some(Closed::Outermost(f)) = m.close_top(60.0, Some((40.0, 300.0))) else {
            panic!("expected outermost fragment");
        };
        assert_eq!(f.bounds.left, 32.0);
        assert_eq!(f.bounds.right(), 308.0);
        assert_eq!(f.tab.bounds, Rect::new(32.0, 0.0, 46.0, 26.0));
        let FragmentChild::Separator(sep) = &f.children[0] else {
            panic!("expected separator");
        };
        assert_eq!((sep.left, sep.right, sep.y), (32.0, 308.0, 30.0));
    }

    #[test]
    fn fragment_left_edge_never_leaves_the_canvas() {
        let mut m = manager_with(&["edge"]);
        m.include(2.0, 10.0);
        let Some(Closed::Outermost(f)) = m.close_top(40.0, None) else {
            panic!("expected outermost fragment");
        };
        assert_eq!(f.bounds.left, 0.0);
        assert!(f.bounds.right() >= f.tab.bounds.right());
    }
}
