use super::transition_tip::{TipKind, TransitionTip};
use crate::format::{usable_bpm, BpmFormat};

/// One computed row: the tip's title and its display text.
#[derive(Debug, Clone, PartialEq)]
pub struct TipResult {
    pub title: String,
    pub kind: TipKind,
    pub text: String,
    pub hidden: bool,
}

/// Compute the display text of every tip, in `tips` order.
///
/// A missing, zero, negative or non-finite `bpm` yields the placeholder for every tip.
pub fn compute_all(
    bpm: Option<f64>,
    tips: &[TransitionTip],
    format: BpmFormat,
) -> Vec<TipResult> {
    let bpm = usable_bpm(bpm);
    tips.iter()
        .map(|tip| TipResult {
            title: tip.title.clone(),
            kind: tip.kind,
            text: tip.compute(bpm, format),
            hidden: tip.hidden,
        })
        .collect()
}

/// Transition tips together with their results for the current base BPM.
///
/// Results are recomputed on every change, so there is always exactly one result per tip.
#[derive(Debug, Clone)]
pub struct DerivedBpmSet {
    base_bpm: Option<f64>,
    format: BpmFormat,
    tips: Vec<TransitionTip>,
    results: Vec<TipResult>,
}

impl DerivedBpmSet {
    pub fn new(tips: Vec<TransitionTip>, format: BpmFormat) -> Self {
        let mut set = Self {
            base_bpm: None,
            format,
            tips,
            results: Vec::new(),
        };
        set.recompute();
        set
    }

    fn recompute(&mut self) {
        self.results = compute_all(self.base_bpm, &self.tips, self.format);
    }

    pub fn base_bpm(&self) -> Option<f64> {
        self.base_bpm
    }

    pub fn set_base_bpm(&mut self, bpm: Option<f64>) {
        self.base_bpm = usable_bpm(bpm);
        self.recompute();
    }

    pub fn set_format(&mut self, format: BpmFormat) {
        self.format = format;
        self.recompute();
    }

    pub fn set_tips(&mut self, tips: Vec<TransitionTip>) {
        self.tips = tips;
        self.recompute();
    }

    pub fn tips(&self) -> &[TransitionTip] {
        &self.tips
    }

    /// Results in tip order, hidden tips included.
    pub fn results(&self) -> &[TipResult] {
        &self.results
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.title == title)
            .map(|r| r.text.as_str())
    }

    /// Visible results for listing, with the range tip first.
    pub fn display_order(&self) -> Vec<&TipResult> {
        let mut visible: Vec<&TipResult> = self.results.iter().filter(|r| !r.hidden).collect();
        // Stable, so the remaining tips keep their configured order.
        visible.sort_by_key(|r| r.kind != TipKind::Range);
        visible
    }

    /// Flip the hidden flag of the tip at `index`. Returns the new flag.
    pub fn toggle_hidden(&mut self, index: usize) -> Option<bool> {
        let tip = self.tips.get_mut(index)?;
        tip.hidden = !tip.hidden;
        let hidden = tip.hidden;
        self.recompute();
        Some(hidden)
    }

    /// Move the tip at `from` so that it ends up at position `to`.
    pub fn move_tip(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tips.len() || to >= self.tips.len() {
            return false;
        }
        let tip = self.tips.remove(from);
        self.tips.insert(to, tip);
        self.recompute();
        true
    }
}
