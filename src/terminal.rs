use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb
{
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb
{
    pub const fn new(r: u8, g: u8, b: u8) -> Self
    {
        Self { r, g, b }
    }

    pub fn dimmed(self, factor: u8) -> Self
    {
        let factor = factor.max(1);
        Self {
            r: self.r / factor,
            g: self.g / factor,
            b: self.b / factor,
        }
    }
}

/// Raw mode plus alternate screen, undone on drop.
pub struct TerminalGuard
{
    stdout: Stdout,
}

impl TerminalGuard
{
    pub fn enter() -> io::Result<Self>
    {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        Ok(Self { stdout })
    }

    pub fn stdout(&mut self) -> &mut Stdout
    {
        &mut self.stdout
    }
}

impl Drop for TerminalGuard
{
    fn drop(&mut self)
    {
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

pub fn draw_lines(stdout: &mut Stdout, lines: &[String]) -> io::Result<()>
{
    let output = format!("{}\r\n", lines.join("\r\n"));
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    stdout.write_all(output.as_bytes())?;
    stdout.flush()
}

pub fn tile(label: char, background: Rgb) -> String
{
    format!(
        "\x1b[48;2;{};{};{}m\x1b[38;2;255;255;255m  {}  \x1b[0m",
        background.r, background.g, background.b, label
    )
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn dimming_divides_channels()
    {
        assert_eq!(Rgb::new(200, 100, 40).dimmed(4), Rgb::new(50, 25, 10));
        assert_eq!(Rgb::new(9, 9, 9).dimmed(0), Rgb::new(9, 9, 9));
    }

    #[test]
    fn tile_wraps_label_in_background_color()
    {
        let rendered = tile('3', Rgb::new(1, 2, 3));
        assert!(rendered.starts_with("\x1b[48;2;1;2;3m"));
        assert!(rendered.contains("  3  "));
        assert!(rendered.ends_with("\x1b[0m"));
    }
}
