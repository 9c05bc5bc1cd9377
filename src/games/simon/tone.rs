use std::io::{self, Write};
use std::time::Duration;

use tracing::trace;

/// Fire-and-forget sound output. Implementations swallow their own failures.
pub trait ToneSink
{
    fn play_tone(&mut self, button: usize, duration: Duration);
    fn play_error_tone(&mut self);
}

pub struct SilentTone;

impl ToneSink for SilentTone
{
    fn play_tone(&mut self, _button: usize, _duration: Duration) {}

    fn play_error_tone(&mut self) {}
}

/// Terminals have no pitched output, so only the error tone is audible.
pub struct BellTone;

impl ToneSink for BellTone
{
    fn play_tone(&mut self, button: usize, duration: Duration)
    {
        trace!(button, ms = duration.as_millis() as u64, "tone");
    }

    fn play_error_tone(&mut self)
    {
        let mut stdout = io::stdout();
        if let Err(err) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            trace!(error = %err, "bell unavailable");
        }
    }
}
