//! Grouping over a key-sorted stream.
//!
//! Fusion and zone reduction both consume a stream that the host has sorted
//! by key, and fold each run of equal keys into at most one output. The open
//! group lives in the adapter as an explicit `(key, accumulator)` pair; it is
//! closed when a different key arrives and once more when the input ends.
//!
//! # Precondition
//!
//! Keys must be non-decreasing. The adapter does not reorder: a key that
//! reappears after its run closed starts a second group. Such regressions
//! are counted in [`StageStats::order_violations`] and logged.

use std::fmt;

use crate::stage_stats::StageStats;

/// What a stage makes of one input item.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed<K, V, P> {
    /// Belongs to the group identified by the key.
    Entry(K, V),
    /// Forwarded immediately, without touching the open group.
    Passthrough(P),
}

/// A stage that folds consecutive equal-key entries.
pub trait KeyedStage {
    type Input;
    type Key: PartialOrd + fmt::Debug;
    type Value;
    type Passthrough;
    type Acc: Default;
    type Output;

    /// Classify an input. `None` drops it without affecting grouping; the
    /// stage is expected to have counted the drop.
    fn route(
        &mut self,
        input: Self::Input,
    ) -> Option<Routed<Self::Key, Self::Value, Self::Passthrough>>;

    /// Add one value to the open group.
    fn absorb(&mut self, acc: &mut Self::Acc, value: Self::Value);

    /// Close a group, emitting zero or one output.
    fn finish(&mut self, key: Self::Key, acc: Self::Acc) -> Option<Self::Output>;

    /// Turn a pass-through item into an output.
    fn forward(&mut self, item: Self::Passthrough) -> Self::Output;

    fn stats_mut(&mut self) -> &mut StageStats;
}

/// Lazy iterator applying a [`KeyedStage`] to a sorted input.
pub struct SortedGroups<I, S: KeyedStage> {
    input: I,
    stage: S,
    open: Option<(S::Key, S::Acc)>,
    exhausted: bool,
}

impl<I, S> SortedGroups<I, S>
where
    I: Iterator<Item = S::Input>,
    S: KeyedStage,
{
    pub fn new(input: I, stage: S) -> Self {
        Self {
            input,
            stage,
            open: None,
            exhausted: false,
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn into_stage(self) -> S {
        self.stage
    }

    /// Close the open group if `key` starts a new one. Returns the output
    /// of the closed group, if any.
    fn advance_to(&mut self, key: S::Key) -> Option<S::Output> {
        if matches!(&self.open, Some((open_key, _)) if *open_key == key) {
            return None;
        }

        let mut emitted = None;
        if let Some((previous, acc)) = self.open.take() {
            if key < previous {
                tracing::warn!(?previous, next = ?key, "key regression in sorted stream");
                self.stage.stats_mut().order_violations += 1;
            }
            emitted = self.stage.finish(previous, acc);
        }
        self.open = Some((key, S::Acc::default()));
        emitted
    }
}

impl<I, S> Iterator for SortedGroups<I, S>
where
    I: Iterator<Item = S::Input>,
    S: KeyedStage,
{
    type Item = S::Output;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let Some(input) = self.input.next() else {
                self.exhausted = true;
                let (key, acc) = self.open.take()?;
                return self.stage.finish(key, acc);
            };

            match self.stage.route(input) {
                None => continue,
                Some(Routed::Passthrough(item)) => return Some(self.stage.forward(item)),
                Some(Routed::Entry(key, value)) => {
                    let emitted = self.advance_to(key);
                    if let Some((_, acc)) = self.open.as_mut() {
                        self.stage.absorb(acc, value);
                    }
                    if emitted.is_some() {
                        return emitted;
                    }
                }
            }
        }
        None
    }
}
