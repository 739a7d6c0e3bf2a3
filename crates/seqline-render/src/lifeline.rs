//! Lifelines: one per participant, each with a fixed horizontal slot.

use crate::SemanticError;
use crate::model::{ActivationBar, Destructor, Drawable, LifelineLine, Rect};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

#[derive(Debug, Clone, PartialEq)]
struct Activation {
    top: f64,
    thread: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lifeline {
    name: String,
    label: String,
    position: usize,
    x: f64,
    head: Rect,
    bar_width: f64,
    alive: bool,
    thread: Option<usize>,
    activations: Vec<Activation>,
    /// Top of the idle line piece not yet emitted; `None` while active or dead.
    line_top: Option<f64>,
    bottom: f64,
}

impl Lifeline {
    pub(crate) fn new(
        name: String,
        label: String,
        position: usize,
        x: f64,
        head: Rect,
        bar_width: f64,
    ) -> Self {
        Self {
            name,
            label,
            position,
            x,
            head,
            bar_width,
            alive: true,
            thread: None,
            activations: Vec::new(),
            line_top: Some(head.bottom()),
            bottom: head.bottom(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Centre x of the head and of the idle line.
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn head(&self) -> Rect {
        self.head
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn thread(&self) -> Option<usize> {
        self.thread
    }

    /// Number of open activations; nested bars shift right by half a bar each.
    pub fn side_level(&self) -> usize {
        self.activations.len()
    }

    /// Lowest y this lifeline has been extended to.
    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    fn bar_left(&self, level: usize) -> f64 {
        self.x - self.bar_width / 2.0 + level as f64 * self.bar_width / 2.0
    }

    pub fn right_anchor(&self) -> f64 {
        match self.activations.len() {
            0 => self.x,
            n => self.bar_left(n - 1) + self.bar_width,
        }
    }

    pub fn left_anchor(&self) -> f64 {
        match self.activations.len() {
            0 => self.x,
            n => self.bar_left(n - 1),
        }
    }

    pub(crate) fn extend_to(&mut self, y: f64) {
        self.bottom = self.bottom.max(y);
    }

    fn take_line_piece(&mut self, bottom: f64) -> Option<Drawable> {
        let top = self.line_top.take()?;
        if bottom <= top {
            return None;
        }
        Some(Drawable::Line(LifelineLine {
            lifeline: self.name.clone(),
            x: self.x,
            top,
            bottom,
        }))
    }

    /// Opens an activation at `y`. Returns the idle line piece that ends here, if any.
    pub(crate) fn activate(&mut self, y: f64, thread: Option<usize>) -> Option<Drawable> {
        let piece = if self.activations.is_empty() {
            self.take_line_piece(y)
        } else {
            None
        };
        self.activations.push(Activation { top: y, thread });
        if thread.is_some() {
            self.thread = thread;
        }
        self.extend_to(y);
        piece
    }

    /// Closes the innermost activation at `y` and returns its bar.
    pub(crate) fn deactivate(
        &mut self,
        y: f64,
        fill: impl Fn(Option<usize>) -> Option<String>,
    ) -> Result<Option<Drawable>, SemanticError> {
        let Some(activation) = self.activations.pop() else {
            return Err(SemanticError::NotActive {
                name: self.name.clone(),
            });
        };
        let level = self.activations.len();
        if level == 0 {
            self.line_top = Some(y);
        }
        self.thread = self.activations.iter().rev().find_map(|a| a.thread);
        self.extend_to(y);
        if y <= activation.top {
            return Ok(None);
        }
        Ok(Some(Drawable::Activation(ActivationBar {
            lifeline: self.name.clone(),
            bounds: Rect::from_edges(
                self.bar_left(level),
                activation.top,
                self.bar_left(level) + self.bar_width,
                y,
            ),
            level,
            thread: activation.thread,
            fill: fill(activation.thread),
        })))
    }

    fn close_bars(
        &mut self,
        y: f64,
        fill: impl Fn(Option<usize>) -> Option<String>,
    ) -> Vec<Drawable> {
        let mut out = Vec::new();
        while !self.activations.is_empty() {
            if let Ok(Some(bar)) = self.deactivate(y, &fill) {
                out.push(bar);
            }
        }
        out
    }

    /// Ends the lifeline at `y` without a destructor: open bars innermost first, then the
    /// trailing idle line piece.
    pub(crate) fn finish(
        &mut self,
        y: f64,
        fill: impl Fn(Option<usize>) -> Option<String>,
    ) -> Vec<Drawable> {
        let mut out = self.close_bars(y, fill);
        if let Some(piece) = self.take_line_piece(y) {
            out.push(piece);
        }
        self.line_top = None;
        out
    }

    /// Destroys the lifeline: a cross of `size` is drawn starting at `y`, with the line
    /// running into its centre.
    pub(crate) fn terminate(
        &mut self,
        y: f64,
        size: f64,
        fill: impl Fn(Option<usize>) -> Option<String>,
    ) -> Vec<Drawable> {
        let mut out = self.close_bars(y, fill);
        if let Some(piece) = self.take_line_piece(y + size / 2.0) {
            out.push(piece);
        }
        out.push(Drawable::Destructor(Destructor {
            lifeline: self.name.clone(),
            bounds: Rect::new(self.x - size / 2.0, y, size, size),
        }));
        self.alive = false;
        self.extend_to(y + size);
        out
    }
}

/// All lifelines in creation order; the index of a lifeline is its slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lifelines {
    by_name: IndexMap<String, Lifeline, FxBuildHasher>,
}

impl Lifelines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Lifeline> {
        self.by_name.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Lifeline> {
        self.by_name.get_mut(name)
    }

    pub fn at(&self, position: usize) -> Option<&Lifeline> {
        self.by_name.get_index(position).map(|(_, l)| l)
    }

    pub fn last(&self) -> Option<&Lifeline> {
        self.by_name.last().map(|(_, l)| l)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lifeline> {
        self.by_name.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Lifeline> {
        self.by_name.values_mut()
    }

    pub(crate) fn insert(&mut self, lifeline: Lifeline) {
        debug_assert_eq!(lifeline.position, self.by_name.len());
        self.by_name.insert(lifeline.name.clone(), lifeline);
    }

    /// Nearest alive lifeline to the left of `position`.
    pub fn left_neighbour(&self, position: usize) -> Option<&Lifeline> {
        (0..position.min(self.len()))
            .rev()
            .filter_map(|p| self.at(p))
            .find(|l| l.is_alive())
    }

    /// Nearest alive lifeline to the right of `position`.
    pub fn right_neighbour(&self, position: usize) -> Option<&Lifeline> {
        (position + 1..self.len())
            .filter_map(|p| self.at(p))
            .find(|l| l.is_alive())
    }

    /// Horizontal extent of the alive lifelines' centres, widened by `pad` on each side.
    pub fn alive_span(&self, pad: f64) -> Option<(f64, f64)> {
        self.iter()
            .filter(|l| l.is_alive())
            .map(|l| (l.x - pad, l.x + pad))
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifeline(name: &str, position: usize, x: f64) -> Lifeline {
        Lifeline::new(
            name.to_string(),
            name.to_string(),
            position,
            x,
            Rect::new(x - 20.0, 10.0, 40.0, 30.0),
            8.0,
        )
    }

    fn no_fill(_: Option<usize>) -> Option<String> {
        None
    }

    #[test]
    fn anchors_follow_nested_activation_bars() {
        let mut l = lifeline("A", 0, 100.0);
        assert_eq!(l.right_anchor(), 100.0);
        assert_eq!(l.left_anchor(), 100.0);

        let piece = l.activate(50.0, None);
        assert!(matches!(piece, Some(Drawable::Line(ref p)) if p.top == 40.0 && p.bottom == 50.0));
        assert_eq!(l.side_level(), 1);
        assert_eq!(l.left_anchor(), 96.0);
        assert_eq!(l.right_anchor(), 104.0);

        assert!(l.activate(60.0, Some(3)).is_none());
        assert_eq!(l.side_level(), 2);
        assert_eq!(l.right_anchor(), 108.0);
        assert_eq!(l.thread(), Some(3));
    }

    #[test]
    fn deactivate_returns_bar_and_resumes_idle_line() {
        let mut l = lifeline("A", 0, 100.0);
        l.activate(50.0, Some(1));
        let bar = l
            .deactivate(90.0, |t| t.map(|n| format!("color-{n}")))
            .unwrap()
            .unwrap();
        let Drawable::Activation(bar) = bar else {
            panic!("expected activation bar");
        };
        assert_eq!(bar.bounds, Rect::new(96.0, 50.0, 8.0, 40.0));
        assert_eq!(bar.fill.as_deref(), Some("color-1"));
        assert_eq!(l.side_level(), 0);

        let rest = l.finish(120.0, no_fill);
        assert_eq!(rest.len(), 1);
        assert!(matches!(&rest[0], Drawable::Line(p) if p.top == 90.0 && p.bottom == 120.0));
    }

    #[test]
    fn deactivating_idle_lifeline_is_semantic_error() {
        let mut l = lifeline("A", 0, 100.0);
        assert_eq!(
            l.deactivate(10.0, no_fill),
            Err(SemanticError::NotActive {
                name: "A".to_string()
            })
        );
    }

    #[test]
    fn terminate_closes_bars_and_draws_cross() {
        let mut l = lifeline("A", 0, 100.0);
        l.activate(50.0, None);
        let out = l.terminate(80.0, 10.0, no_fill);
        assert!(!l.is_alive());
        assert!(matches!(out[0], Drawable::Activation(_)));
        assert!(matches!(&out[1], Drawable::Line(p) if p.top == 80.0 && p.bottom == 85.0));
        assert!(matches!(out.last(), Some(Drawable::Destructor(d)) if d.bounds == Rect::new(95.0, 80.0, 10.0, 10.0)));
        assert_eq!(l.bottom(), 90.0);
    }

    #[test]
    fn neighbours_skip_dead_lifelines() {
        let mut all = Lifelines::new();
        all.insert(lifeline("A", 0, 50.0));
        all.insert(lifeline("B", 1, 150.0));
        all.insert(lifeline("C", 2, 250.0));

        assert_eq!(all.left_neighbour(2).map(Lifeline::name), Some("B"));
        assert_eq!(all.right_neighbour(0).map(Lifeline::name), Some("B"));

        all.get_mut("B").unwrap().terminate(60.0, 10.0, no_fill);
        assert_eq!(all.left_neighbour(2).map(Lifeline::name), Some("A"));
        assert_eq!(all.right_neighbour(0).map(Lifeline::name), Some("C"));
        assert!(all.left_neighbour(0).is_none());
        assert!(all.right_neighbour(2).is_none());
        assert_eq!(all.alive_span(8.0), Some((42.0, 258.0)));
    }
}
