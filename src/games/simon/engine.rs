//! Simon Says state machine.
//!
//! The engine never sleeps. The caller feeds it the current [`Instant`]
//! through [`SimonEngine::tick`], and every timer whose deadline has passed
//! fires in deadline order. Each timer carries the playback run it was
//! scheduled under; cancelling bumps the run so a late timer can never
//! touch a newer game.

use std::fmt;
use std::mem;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::scores::ScoreStore;
use super::tone::ToneSink;
use crate::error::{GameError, Result};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty
{
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty
{
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn button_count(self) -> usize
    {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Medium => 7,
            Difficulty::Hard => 10,
        }
    }

    pub fn name(self) -> &'static str
    {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn next(self) -> Self
    {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(self) -> Self
    {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}

impl fmt::Display for Difficulty
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState
{
    Idle,
    Showing,
    Input,
    Success,
    Failure,
}

impl fmt::Display for GameState
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            GameState::Idle => "idle",
            GameState::Showing => "showing",
            GameState::Input => "input",
            GameState::Success => "success",
            GameState::Failure => "failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind
{
    Playback,
    Press,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight
{
    pub button: usize,
    pub kind: HighlightKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent
{
    Highlight(Highlight),
    ClearHighlight,
    StateChanged(GameState),
    RoundChanged(u32),
    BestScoreChanged(u32),
    Error,
}

/// Delays that drive playback and the settle phases.
///
/// `step` is measured from one playback highlight to the next, so it must
/// be longer than `highlight` to leave a dark gap between tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings
{
    pub highlight: Duration,
    pub step: Duration,
    pub press: Duration,
    pub playback_settle: Duration,
    pub round_settle: Duration,
    pub failure_settle: Duration,
    pub reset_grace: Duration,
}

impl Timings
{
    pub fn is_consistent(&self) -> bool
    {
        !self.press.is_zero() && self.press < self.highlight && self.highlight < self.step
    }
}

impl Default for Timings
{
    fn default() -> Self
    {
        Self {
            highlight: Duration::from_millis(500),
            step: Duration::from_millis(750),
            press: Duration::from_millis(200),
            playback_settle: Duration::from_millis(400),
            round_settle: Duration::from_millis(800),
            failure_settle: Duration::from_millis(1000),
            reset_grace: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunId(u64);

impl RunId
{
    fn next(self) -> Self
    {
        RunId(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainStep
{
    Highlight(usize),
    Clear(usize),
    EnterInput,
    RoundSettled,
    FailureSettled,
}

#[derive(Debug, Clone, Copy)]
struct Timer<A>
{
    run: RunId,
    due: Instant,
    action: A,
}

enum Due
{
    Chain,
    Press,
}

pub struct SimonEngine<R>
{
    timings: Timings,
    difficulty: Difficulty,
    strict: bool,
    state: GameState,
    sequence: Vec<usize>,
    player_input: Vec<usize>,
    round: u32,
    best_score: u32,
    highlight: Option<Highlight>,
    run: RunId,
    chain: Option<Timer<ChainStep>>,
    press: Option<Timer<usize>>,
    events: Vec<EngineEvent>,
    rng: R,
    store: Box<dyn ScoreStore>,
    tone: Box<dyn ToneSink>,
}

impl<R: Rng> SimonEngine<R>
{
    pub fn new(
        difficulty: Difficulty,
        strict: bool,
        timings: Timings,
        rng: R,
        store: Box<dyn ScoreStore>,
        tone: Box<dyn ToneSink>,
    ) -> Self
    {
        let best_score = store.best_score(difficulty);
        Self {
            timings,
            difficulty,
            strict,
            state: GameState::Idle,
            sequence: Vec::new(),
            player_input: Vec::new(),
            round: 0,
            best_score,
            highlight: None,
            run: RunId(0),
            chain: None,
            press: None,
            events: Vec::new(),
            rng,
            store,
            tone,
        }
    }

    pub fn state(&self) -> GameState
    {
        self.state
    }

    pub fn round(&self) -> u32
    {
        self.round
    }

    pub fn sequence(&self) -> &[usize]
    {
        &self.sequence
    }

    pub fn player_input(&self) -> &[usize]
    {
        &self.player_input
    }

    pub fn highlight(&self) -> Option<Highlight>
    {
        self.highlight
    }

    pub fn best_score(&self) -> u32
    {
        self.best_score
    }

    pub fn difficulty(&self) -> Difficulty
    {
        self.difficulty
    }

    pub fn strict_mode(&self) -> bool
    {
        self.strict
    }

    pub fn button_count(&self) -> usize
    {
        self.difficulty.button_count()
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn ScoreStore
    {
        self.store.as_ref()
    }

    /// Earliest pending deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Instant>
    {
        let chain = self.chain.map(|timer| timer.due);
        let press = self.press.map(|timer| timer.due);
        match (chain, press) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent>
    {
        mem::take(&mut self.events)
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<()>
    {
        if self.state != GameState::Idle {
            return Err(GameError::SettingsLocked(self.state));
        }
        if self.difficulty == difficulty {
            return Ok(());
        }
        self.difficulty = difficulty;
        self.best_score = self.store.best_score(difficulty);
        self.events.push(EngineEvent::BestScoreChanged(self.best_score));
        debug!(%difficulty, best = self.best_score, "difficulty selected");
        Ok(())
    }

    pub fn set_strict_mode(&mut self, strict: bool) -> Result<()>
    {
        if self.state != GameState::Idle {
            return Err(GameError::SettingsLocked(self.state));
        }
        self.strict = strict;
        debug!(strict, "strict mode selected");
        Ok(())
    }

    pub fn start(&mut self, now: Instant) -> Result<()>
    {
        if self.state != GameState::Idle {
            return Err(GameError::GameInProgress(self.state));
        }
        info!(difficulty = %self.difficulty, strict = self.strict, "game started");
        self.new_game(now);
        Ok(())
    }

    /// Restarts the current game from round 1, or stays idle if no game is
    /// running.
    pub fn reset(&mut self, now: Instant)
    {
        if self.state == GameState::Idle {
            self.cancel();
            self.sequence.clear();
            self.player_input.clear();
            self.set_round(0);
            return;
        }
        info!(round = self.round, "game reset");
        self.new_game(now + self.timings.reset_grace);
    }

    pub fn go_to_menu(&mut self)
    {
        self.cancel();
        self.sequence.clear();
        self.player_input.clear();
        self.set_round(0);
        self.set_state(GameState::Idle);
    }

    pub fn submit_input(&mut self, button: usize, now: Instant)
    {
        if self.state != GameState::Input {
            trace!(button, state = %self.state, "input ignored");
            return;
        }
        if button >= self.button_count() {
            warn!(button, buttons = self.button_count(), "out of range input ignored");
            return;
        }

        self.player_input.push(button);
        let position = self.player_input.len() - 1;
        let expected = self.sequence[position];

        if button != expected {
            debug!(position, expected, got = button, "wrong button");
            self.press = None;
            self.set_highlight(Some(Highlight {
                button,
                kind: HighlightKind::Error,
            }));
            self.events.push(EngineEvent::Error);
            self.tone.play_error_tone();
            self.set_state(GameState::Failure);
            self.schedule(ChainStep::FailureSettled, now + self.timings.failure_settle);
            return;
        }

        self.tone.play_tone(button, self.timings.press);
        if self.player_input.len() < self.sequence.len() {
            self.set_highlight(Some(Highlight {
                button,
                kind: HighlightKind::Press,
            }));
            self.press = Some(Timer {
                run: self.run,
                due: now + self.timings.press,
                action: button,
            });
        } else {
            debug!(round = self.round, "round complete");
            self.set_state(GameState::Success);
            self.schedule(ChainStep::RoundSettled, now + self.timings.round_settle);
        }
    }

    /// Fires every timer due at or before `now`.
    pub fn tick(&mut self, now: Instant)
    {
        loop {
            let chain_due = self.chain.filter(|timer| timer.due <= now).map(|timer| timer.due);
            let press_due = self.press.filter(|timer| timer.due <= now).map(|timer| timer.due);
            let next = match (chain_due, press_due) {
                (Some(chain), Some(press)) if press < chain => Due::Press,
                (Some(_), _) => Due::Chain,
                (None, Some(_)) => Due::Press,
                (None, None) => break,
            };

            match next {
                Due::Chain => {
                    let Some(timer) = self.chain.take() else { break };
                    if timer.run != self.run {
                        trace!(run = timer.run.0, "stale playback step dropped");
                        continue;
                    }
                    self.fire(timer.action, timer.due);
                }
                Due::Press => {
                    let Some(timer) = self.press.take() else { break };
                    if timer.run != self.run {
                        trace!(run = timer.run.0, "stale press clear dropped");
                        continue;
                    }
                    if self.highlight
                        == Some(Highlight {
                            button: timer.action,
                            kind: HighlightKind::Press,
                        })
                    {
                        self.set_highlight(None);
                    }
                }
            }
        }
    }

    fn fire(&mut self, step: ChainStep, due: Instant)
    {
        match step {
            ChainStep::Highlight(index) => {
                let Some(&button) = self.sequence.get(index) else {
                    self.schedule(ChainStep::EnterInput, due);
                    return;
                };
                self.set_highlight(Some(Highlight {
                    button,
                    kind: HighlightKind::Playback,
                }));
                self.tone.play_tone(button, self.timings.highlight);
                self.schedule(ChainStep::Clear(index), due + self.timings.highlight);
            }
            ChainStep::Clear(index) => {
                self.set_highlight(None);
                if index + 1 < self.sequence.len() {
                    let gap = self.timings.step.saturating_sub(self.timings.highlight);
                    self.schedule(ChainStep::Highlight(index + 1), due + gap);
                } else {
                    self.schedule(ChainStep::EnterInput, due + self.timings.playback_settle);
                }
            }
            ChainStep::EnterInput => {
                self.player_input.clear();
                self.set_state(GameState::Input);
            }
            ChainStep::RoundSettled => {
                let button = self.random_button();
                self.sequence.push(button);
                self.player_input.clear();
                self.set_highlight(None);
                self.set_round(self.round + 1);
                self.set_state(GameState::Showing);
                self.begin_playback(due);
            }
            ChainStep::FailureSettled => {
                self.set_highlight(None);
                self.player_input.clear();
                if self.strict {
                    info!(round = self.round, "game over");
                    self.sequence.clear();
                    self.set_round(0);
                    self.set_state(GameState::Idle);
                } else {
                    self.set_state(GameState::Showing);
                    self.begin_playback(due);
                }
            }
        }
    }

    fn new_game(&mut self, playback_at: Instant)
    {
        self.cancel();
        self.sequence.clear();
        self.player_input.clear();
        let button = self.random_button();
        self.sequence.push(button);
        self.set_round(1);
        self.set_state(GameState::Showing);
        self.begin_playback(playback_at);
    }

    fn begin_playback(&mut self, at: Instant)
    {
        self.run = self.run.next();
        trace!(run = self.run.0, len = self.sequence.len(), "playback scheduled");
        self.schedule(ChainStep::Highlight(0), at);
    }

    fn schedule(&mut self, action: ChainStep, due: Instant)
    {
        self.chain = Some(Timer {
            run: self.run,
            due,
            action,
        });
    }

    fn cancel(&mut self)
    {
        self.run = self.run.next();
        self.chain = None;
        self.press = None;
        self.set_highlight(None);
    }

    fn random_button(&mut self) -> usize
    {
        self.rng.gen_range(0..self.button_count())
    }

    fn set_highlight(&mut self, highlight: Option<Highlight>)
    {
        if self.highlight == highlight {
            return;
        }
        self.highlight = highlight;
        match highlight {
            Some(highlight) => self.events.push(EngineEvent::Highlight(highlight)),
            None => self.events.push(EngineEvent::ClearHighlight),
        }
    }

    fn set_state(&mut self, state: GameState)
    {
        if self.state == state {
            return;
        }
        trace!(from = %self.state, to = %state, "state change");
        self.state = state;
        self.events.push(EngineEvent::StateChanged(state));
    }

    fn set_round(&mut self, round: u32)
    {
        if self.round == round {
            return;
        }
        self.round = round;
        self.events.push(EngineEvent::RoundChanged(round));

        if round > self.best_score {
            self.best_score = round;
            self.events.push(EngineEvent::BestScoreChanged(round));
            if let Err(err) = self.store.set_best_score(self.difficulty, round) {
                warn!(error = %err, difficulty = %self.difficulty, "failed to save best score");
            }
        }
    }
}
