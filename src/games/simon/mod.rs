pub mod engine;
pub mod keys;
pub mod scores;
pub mod tone;

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::Rng;
use tracing::info;

use crate::config::Settings;
use crate::error::Result;
use crate::terminal::{self, Rgb, TerminalGuard};
use engine::{Difficulty, EngineEvent, GameState, HighlightKind, SimonEngine};
use scores::JsonScoreStore;
use tone::{BellTone, SilentTone, ToneSink};

const TICK_MS: u64 = 33;

const PALETTE: [Rgb; 10] = [
    Rgb::new(0, 200, 70),
    Rgb::new(230, 40, 40),
    Rgb::new(240, 200, 0),
    Rgb::new(40, 110, 255),
    Rgb::new(255, 130, 0),
    Rgb::new(170, 60, 230),
    Rgb::new(0, 200, 200),
    Rgb::new(255, 90, 180),
    Rgb::new(150, 200, 40),
    Rgb::new(200, 200, 200),
];
const ERROR_COLOR: Rgb = Rgb::new(255, 0, 0);
const DIM_FACTOR: u8 = 4;

#[derive(Debug, PartialEq, Eq)]
enum Flow
{
    Continue,
    Exit,
}

/// What the screen remembers between engine events.
#[derive(Default)]
struct Screen
{
    message: Option<String>,
    last_round: u32,
    previous_state: Option<GameState>,
}

impl Screen
{
    fn observe(&mut self, events: &[EngineEvent])
    {
        for event in events {
            match *event {
                EngineEvent::RoundChanged(round) if round > 0 => {
                    self.last_round = round;
                }
                EngineEvent::StateChanged(state) => {
                    if state == GameState::Idle && self.previous_state == Some(GameState::Failure) {
                        self.message = Some(format!("Game over at round {}.", self.last_round));
                    } else if state == GameState::Showing {
                        self.message = None;
                    }
                    self.previous_state = Some(state);
                }
                _ => {}
            }
        }
    }
}

pub fn run(settings: &Settings, difficulty: Difficulty, strict: bool) -> Result<()>
{
    let store = JsonScoreStore::open(&settings.data_dir)?;
    let tone: Box<dyn ToneSink> = if settings.bell {
        Box::new(BellTone)
    } else {
        Box::new(SilentTone)
    };
    let mut engine = SimonEngine::new(
        difficulty,
        strict,
        settings.timings,
        rand::thread_rng(),
        Box::new(store),
        tone,
    );
    info!(%difficulty, strict, "simon opened");

    let mut term = TerminalGuard::enter()?;
    let mut screen = Screen::default();
    let mut last_tick = Instant::now();
    let mut dirty = true;

    loop {
        let now = Instant::now();
        engine.tick(now);

        let wait = engine
            .next_deadline()
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::from_millis(TICK_MS))
            .min(Duration::from_millis(TICK_MS));
        if handle_input(&mut engine, &mut screen, wait)? == Flow::Exit {
            break;
        }

        let events = engine.drain_events();
        if !events.is_empty() {
            screen.observe(&events);
            dirty = true;
        }

        if dirty || last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            terminal::draw_lines(term.stdout(), &build_lines(&engine, &screen))?;
            last_tick = Instant::now();
            dirty = false;
        }
    }

    engine.go_to_menu();
    info!(best = engine.best_score(), "simon closed");
    Ok(())
}

/// Waits up to `wait` for the first key, then drains whatever else is queued.
fn handle_input<R: Rng>(
    engine: &mut SimonEngine<R>,
    screen: &mut Screen,
    wait: Duration,
) -> Result<Flow>
{
    let mut timeout = wait;
    while event::poll(timeout)? {
        timeout = Duration::ZERO;
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Release {
                continue;
            }
            if apply_key(engine, screen, key, Instant::now()) == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
    }
    Ok(Flow::Continue)
}

fn apply_key<R: Rng>(
    engine: &mut SimonEngine<R>,
    screen: &mut Screen,
    key: KeyEvent,
    now: Instant,
) -> Flow
{
    let KeyEvent { code, modifiers, .. } = key;
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Exit;
    }

    if engine.state() == GameState::Idle {
        let result = match code {
            KeyCode::Esc => return Flow::Exit,
            KeyCode::Char('e') => engine.set_difficulty(Difficulty::Easy),
            KeyCode::Char('m') => engine.set_difficulty(Difficulty::Medium),
            KeyCode::Char('h') => engine.set_difficulty(Difficulty::Hard),
            KeyCode::Left => engine.set_difficulty(engine.difficulty().prev()),
            KeyCode::Right => engine.set_difficulty(engine.difficulty().next()),
            KeyCode::Char('s') => engine.set_strict_mode(!engine.strict_mode()),
            KeyCode::Enter | KeyCode::Char(' ') => engine.start(now),
            _ => Ok(()),
        };
        if let Err(err) = result {
            screen.message = Some(err.to_string());
        }
        return Flow::Continue;
    }

    match code {
        KeyCode::Esc => engine.go_to_menu(),
        KeyCode::Char('r') => engine.reset(now),
        other => {
            if let Some(button) = keys::button_for_key(other, engine.button_count()) {
                engine.submit_input(button, now);
            }
        }
    }
    Flow::Continue
}

fn build_lines<R: Rng>(engine: &SimonEngine<R>, screen: &Screen) -> Vec<String>
{
    let mut lines = Vec::new();
    lines.push("KB Games - Simon Says".to_string());
    lines.push(format!(
        "Difficulty: {} ({} buttons)  Strict: {}",
        engine.difficulty(),
        engine.button_count(),
        if engine.strict_mode() { "on" } else { "off" }
    ));
    lines.push(format!("Round: {}  Best: {}", engine.round(), engine.best_score()));
    lines.push(String::new());

    if engine.state() != GameState::Idle {
        lines.push(render_buttons(engine));
        lines.push(String::new());
    }

    lines.push(format!("Status: {}", status_line(engine)));
    if let Some(message) = &screen.message {
        lines.push(message.clone());
    } else {
        lines.push(String::new());
    }
    lines.push(controls_line(engine.state()).to_string());
    lines
}

fn render_buttons<R: Rng>(engine: &SimonEngine<R>) -> String
{
    let highlight = engine.highlight();
    let mut row = String::new();
    for button in 0..engine.button_count() {
        let base = PALETTE[button % PALETTE.len()];
        let color = match highlight {
            Some(lit) if lit.button == button && lit.kind == HighlightKind::Error => ERROR_COLOR,
            Some(lit) if lit.button == button => base,
            _ => base.dimmed(DIM_FACTOR),
        };
        row.push_str(&terminal::tile(keys::button_key_char(button), color));
        row.push(' ');
    }
    row
}

fn status_line<R: Rng>(engine: &SimonEngine<R>) -> String
{
    match engine.state() {
        GameState::Idle => "Pick a difficulty and press Enter".to_string(),
        GameState::Showing => "Watch the sequence...".to_string(),
        GameState::Input => format!(
            "Your turn: {}/{}",
            engine.player_input().len(),
            engine.sequence().len()
        ),
        GameState::Success => "Correct!".to_string(),
        GameState::Failure if engine.strict_mode() => "Wrong button. Game over.".to_string(),
        GameState::Failure => "Wrong button. Watch again.".to_string(),
    }
}

fn controls_line(state: GameState) -> &'static str
{
    match state {
        GameState::Idle => "e/m/h or Left/Right: difficulty  s: strict  Enter: start  Esc: back",
        _ => "Number keys: press buttons  r: restart  Esc: stop",
    }
}

#[cfg(test)]
mod tests
{
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::engine::Timings;
    use super::scores::MemoryScoreStore;
    use super::*;

    fn engine() -> SimonEngine<StdRng>
    {
        SimonEngine::new(
            Difficulty::Easy,
            false,
            Timings::default(),
            StdRng::seed_from_u64(5),
            Box::new(MemoryScoreStore::default()),
            Box::new(SilentTone),
        )
    }

    fn press(code: KeyCode) -> KeyEvent
    {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn idle_keys_change_settings_and_start()
    {
        let mut engine = engine();
        let mut screen = Screen::default();
        let now = Instant::now();

        apply_key(&mut engine, &mut screen, press(KeyCode::Char('h')), now);
        assert_eq!(engine.difficulty(), Difficulty::Hard);
        apply_key(&mut engine, &mut screen, press(KeyCode::Right), now);
        assert_eq!(engine.difficulty(), Difficulty::Easy);
        apply_key(&mut engine, &mut screen, press(KeyCode::Char('s')), now);
        assert!(engine.strict_mode());

        apply_key(&mut engine, &mut screen, press(KeyCode::Enter), now);
        assert_eq!(engine.state(), GameState::Showing);

        // settings keys are plain input once playing
        apply_key(&mut engine, &mut screen, press(KeyCode::Char('m')), now);
        assert_eq!(engine.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn escape_stops_game_then_leaves()
    {
        let mut engine = engine();
        let mut screen = Screen::default();
        let now = Instant::now();
        engine.start(now).expect("start");

        assert_eq!(apply_key(&mut engine, &mut screen, press(KeyCode::Esc), now), Flow::Continue);
        assert_eq!(engine.state(), GameState::Idle);
        assert_eq!(apply_key(&mut engine, &mut screen, press(KeyCode::Esc), now), Flow::Exit);
    }

    #[test]
    fn ctrl_c_always_exits()
    {
        let mut engine = engine();
        let mut screen = Screen::default();
        engine.start(Instant::now()).expect("start");
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_key(&mut engine, &mut screen, key, Instant::now()), Flow::Exit);
    }

    #[test]
    fn digit_keys_reach_the_engine()
    {
        let mut engine = engine();
        let mut screen = Screen::default();
        let start = Instant::now();
        engine.start(start).expect("start");
        let now = start + Duration::from_secs(30);
        engine.tick(now);
        assert_eq!(engine.state(), GameState::Input);

        let expected = engine.sequence()[0];
        let key = keys::button_key_char(expected);
        apply_key(&mut engine, &mut screen, press(KeyCode::Char(key)), now);
        assert_eq!(engine.state(), GameState::Success);
    }

    #[test]
    fn strict_game_over_message_reports_last_round()
    {
        let mut engine = engine();
        let mut screen = Screen::default();
        engine.set_strict_mode(true).expect("idle");
        let start = Instant::now();
        engine.start(start).expect("start");
        let now = start + Duration::from_secs(30);
        engine.tick(now);

        let wrong = (engine.sequence()[0] + 1) % engine.button_count();
        engine.submit_input(wrong, now);
        engine.tick(now + Duration::from_secs(30));
        screen.observe(&engine.drain_events());

        assert_eq!(screen.message.as_deref(), Some("Game over at round 1."));
        let lines = build_lines(&engine, &screen);
        assert!(lines.iter().any(|line| line == "Game over at round 1."));
        assert!(lines.iter().any(|line| line.starts_with("Status: Pick a difficulty")));
    }

    #[test]
    fn buttons_render_once_playing()
    {
        let mut engine = engine();
        let screen = Screen::default();
        assert_eq!(build_lines(&engine, &screen).len(), 7);

        engine.start(Instant::now()).expect("start");
        let lines = build_lines(&engine, &screen);
        let buttons = &lines[4];
        for label in ['1', '2', '3', '4'] {
            assert!(buttons.contains(&format!("  {label}  ")));
        }
        assert!(!buttons.contains("  5  "));
    }
}
