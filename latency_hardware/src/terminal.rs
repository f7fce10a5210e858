//! Full-terminal color fill over ANSI truecolor escapes.

use std::io::Write;

use latency_traits::{BoxError, DisplayColor, Screen};

const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";
const CLEAR_HOME: &str = "\x1b[2J\x1b[H";
const RESET: &str = "\x1b[0m";

/// RGB triple used for each display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub dark: (u8, u8, u8),
    pub light: (u8, u8, u8),
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dark: (0, 0, 0),
            light: (255, 255, 255),
        }
    }
}

/// Paints the whole terminal with one solid color per command.
///
/// Attributes and cursor visibility are restored on drop.
pub struct TerminalScreen<W: Write> {
    out: W,
    palette: Palette,
}

impl<W: Write> TerminalScreen<W> {
    pub fn new(out: W) -> std::io::Result<Self> {
        Self::with_palette(out, Palette::default())
    }

    pub fn with_palette(mut out: W, palette: Palette) -> std::io::Result<Self> {
        out.write_all(HIDE_CURSOR.as_bytes())?;
        out.flush()?;
        Ok(Self { out, palette })
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError> {
        let (r, g, b) = match color {
            DisplayColor::Dark => self.palette.dark,
            DisplayColor::Light => self.palette.light,
        };
        write!(self.out, "\x1b[48;2;{r};{g};{b}m{CLEAR_HOME}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for TerminalScreen<W> {
    fn drop(&mut self) {
        let _ = write!(self.out, "{RESET}{CLEAR_HOME}{SHOW_CURSOR}");
        let _ = self.out.flush();
    }
}

/// Screen that renders nothing (offline analysis, headless runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScreen;

impl Screen for NullScreen {
    fn set_color(&mut self, color: DisplayColor) -> Result<(), BoxError> {
        tracing::trace!(?color, "null screen");
        Ok(())
    }
}
