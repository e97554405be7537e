//! Cell frame the log view draws into, independent of the terminal backend.

use logtail_core::LogLevel;

/// Terminal color: the terminal's own default, an ANSI256 index, or RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermColor {
    Default,
    Ansi256(u8),
    Rgb(u8, u8, u8),
}

/// Frame dimensions in terminal cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSize {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: TermColor,
    pub bg: TermColor,
    pub bold: bool,
    pub dim: bool,
    pub reverse: bool,
}

impl CellStyle {
    const PLAIN: Self = Self {
        fg: TermColor::Default,
        bg: TermColor::Default,
        bold: false,
        dim: false,
        reverse: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCell {
    pub glyph: char,
    pub style: CellStyle,
}

/// Semantic role for rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Primary,
    Muted,
    Accent,
    Success,
    Danger,
    Warning,
    Info,
    Trace,
    Fatal,
    Highlight,
}

/// Role used for a level code in the log body.
#[must_use]
pub fn level_role(level: LogLevel) -> TextRole {
    match level {
        LogLevel::Trace => TextRole::Trace,
        LogLevel::Debug => TextRole::Info,
        LogLevel::Info => TextRole::Success,
        LogLevel::Warn => TextRole::Warning,
        LogLevel::Error => TextRole::Danger,
        LogLevel::Fatal | LogLevel::Panic => TextRole::Fatal,
    }
}

#[must_use]
pub fn style_for_role(role: TextRole) -> CellStyle {
    let plain = CellStyle::PLAIN;
    match role {
        TextRole::Primary => plain,
        TextRole::Muted => CellStyle {
            fg: TermColor::Ansi256(244),
            dim: true,
            ..plain
        },
        TextRole::Accent => CellStyle {
            fg: TermColor::Ansi256(75),
            bold: true,
            ..plain
        },
        TextRole::Success => CellStyle {
            fg: TermColor::Ansi256(71),
            ..plain
        },
        TextRole::Danger => CellStyle {
            fg: TermColor::Ansi256(160),
            bold: true,
            ..plain
        },
        TextRole::Warning => CellStyle {
            fg: TermColor::Ansi256(178),
            ..plain
        },
        TextRole::Info => CellStyle {
            fg: TermColor::Ansi256(33),
            ..plain
        },
        TextRole::Trace => CellStyle {
            fg: TermColor::Ansi256(245),
            ..plain
        },
        TextRole::Fatal => CellStyle {
            fg: TermColor::Ansi256(88),
            bold: true,
            ..plain
        },
        TextRole::Highlight => CellStyle {
            fg: TermColor::Ansi256(16),
            bg: TermColor::Ansi256(220),
            ..plain
        },
    }
}

/// A grid of styled cells; rows are clipped, never wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    size: FrameSize,
    cells: Vec<FrameCell>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(size: FrameSize) -> Self {
        let blank = FrameCell {
            glyph: ' ',
            style: CellStyle::PLAIN,
        };
        Self {
            size,
            cells: vec![blank; size.width.saturating_mul(size.height)],
        }
    }

    #[must_use]
    pub fn size(&self) -> FrameSize {
        self.size
    }

    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Option<FrameCell> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.cells[y * self.size.width + x])
    }

    /// Draw `text` at (`x`, `y`) and return the column after the last glyph.
    pub fn draw_text(&mut self, x: usize, y: usize, text: &str, role: TextRole) -> usize {
        self.draw_styled(x, y, text, style_for_role(role))
    }

    /// Like `draw_text`, with the background of `highlight` when `marked`.
    pub fn draw_marked(
        &mut self,
        x: usize,
        y: usize,
        text: &str,
        role: TextRole,
        marked: bool,
    ) -> usize {
        let mut style = style_for_role(role);
        if marked {
            style.bg = style_for_role(TextRole::Highlight).bg;
            style.dim = false;
        }
        self.draw_styled(x, y, text, style)
    }

    /// Paint the whole row in reverse video (status bars).
    pub fn invert_row(&mut self, y: usize) {
        if y >= self.size.height {
            return;
        }
        let start = y * self.size.width;
        for cell in &mut self.cells[start..start + self.size.width] {
            cell.style.reverse = true;
        }
    }

    #[must_use]
    pub fn row_text(&self, y: usize) -> String {
        if y >= self.size.height {
            return String::new();
        }
        let start = y * self.size.width;
        self.cells[start..start + self.size.width]
            .iter()
            .map(|cell| cell.glyph)
            .collect()
    }

    /// Text-only snapshot for tests, trailing blanks trimmed per row.
    #[must_use]
    pub fn snapshot(&self) -> String {
        (0..self.size.height)
            .map(|row| self.row_text(row).trim_end().to_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn draw_styled(&mut self, x: usize, y: usize, text: &str, style: CellStyle) -> usize {
        if y >= self.size.height {
            return x;
        }
        let mut col = x;
        for glyph in text.chars() {
            if col >= self.size.width {
                break;
            }
            let glyph = if glyph.is_control() { ' ' } else { glyph };
            self.cells[y * self.size.width + col] = FrameCell { glyph, style };
            col += 1;
        }
        col
    }
}
