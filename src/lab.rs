use std::fmt::Display;

use tracing::*;

use crate::{ReactionResult, RequestSlot, Ticket};

/// State of the reaction lab page: the last inputs, the prediction and the
/// mechanism step being shown.
#[derive(Debug, Default)]
pub struct ReactionLab {
    reactants: String,
    conditions: String,
    prediction: RequestSlot<ReactionResult>,
    step: usize,
    playing: bool,
}

impl ReactionLab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reactants(&self) -> &str {
        &self.reactants
    }

    pub fn conditions(&self) -> &str {
        &self.conditions
    }

    pub fn prediction(&self) -> &RequestSlot<ReactionResult> {
        &self.prediction
    }

    /// Start predicting a reaction, superseding any prediction still in flight.
    ///
    /// Blank reactants start nothing and return `None`.
    pub fn begin_prediction(&mut self, reactants: &str, conditions: &str) -> Option<Ticket> {
        if reactants.trim().is_empty() {
            return None;
        }
        self.reactants = reactants.trim().to_string();
        self.conditions = conditions.trim().to_string();
        self.step = 0;
        self.playing = false;
        Some(self.prediction.begin())
    }

    pub fn finish_prediction<E: Display>(
        &mut self,
        ticket: Ticket,
        result: Result<ReactionResult, E>,
    ) -> bool {
        let applied = self.prediction.complete(ticket, result);
        if applied {
            self.step = 0;
            self.playing = false;
            debug!("Prediction settled: {:?}", self.prediction.state());
        }
        applied
    }

    fn steps(&self) -> &[String] {
        self.prediction
            .result()
            .map(|result| result.mechanism_steps.as_slice())
            .unwrap_or(&[])
    }

    /// The mechanism step on display, with its index.
    pub fn current_step(&self) -> Option<(usize, &str)> {
        self.steps().get(self.step).map(|s| (self.step, s.as_str()))
    }

    pub fn step_count(&self) -> usize {
        self.steps().len()
    }

    pub fn next_step(&mut self) {
        if self.step + 1 < self.step_count() {
            self.step += 1;
        }
    }

    pub fn previous_step(&mut self) {
        self.step = self.step.saturating_sub(1);
    }

    pub fn rewind(&mut self) {
        self.step = 0;
    }

    /// Has playback reached the final mechanism step?
    pub fn at_last_step(&self) -> bool {
        self.step + 1 >= self.step_count()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start or pause automatic playback. Without mechanism steps there is
    /// nothing to play and playback stays off.
    pub fn toggle_playback(&mut self) {
        self.playing = !self.playing && self.step_count() > 0;
        debug!("Playback {}", if self.playing { "started" } else { "paused" });
    }

    /// One playback beat: advance a step while playing. Playback stops on the
    /// beat after the last step is reached. Returns whether the step changed.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        if self.at_last_step() {
            self.playing = false;
            return false;
        }
        self.step += 1;
        true
    }
}
