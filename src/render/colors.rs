//! Theme colours and the painter that turns styled segments into terminal
//! text.
//!
//! Rendering code only deals in [`Segment`]s tagged with a semantic
//! [`Style`]; escape sequences are produced in one place, by [`Painter`].

use colored::{ColoredString, Colorize};

/// RGB color for the colored crate's truecolor output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeColor(pub u8, pub u8, pub u8);

impl ThemeColor {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.0, self.1, self.2)
    }
}

// Color constants for consistent theming
pub mod theme {
    use super::ThemeColor;

    pub const GREEN: ThemeColor = ThemeColor(142, 192, 124);
    pub const RED: ThemeColor = ThemeColor(204, 36, 29);
    pub const YELLOW: ThemeColor = ThemeColor(250, 189, 47);
    pub const GOLD: ThemeColor = ThemeColor(215, 153, 33);
    pub const PURPLE: ThemeColor = ThemeColor(180, 142, 173);
    pub const BLUE: ThemeColor = ThemeColor(131, 165, 152);
}

/// What a piece of text means, independent of how it is drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Style {
    Plain,
    Header,
    /// Tree connectors of a branch whose parent was assumed.
    InferredTree,
    Ahead,
    Behind,
    /// Remote glyph of a branch that differs from its remote counterpart.
    RemoteDrift,
    PrOpen,
    PrClosed,
    PrMerged,
    Approved,
    ChangesRequested,
    Link { url: String },
}

impl Style {
    fn color(&self) -> Option<ThemeColor> {
        match self {
            Self::Plain | Self::Header => None,
            Self::InferredTree | Self::RemoteDrift => Some(theme::YELLOW),
            Self::Ahead | Self::Approved => Some(theme::GREEN),
            Self::Behind | Self::ChangesRequested | Self::PrClosed => Some(theme::RED),
            Self::PrOpen => Some(theme::GOLD),
            Self::PrMerged => Some(theme::PURPLE),
            Self::Link { .. } => Some(theme::BLUE),
        }
    }
}

/// Row-wide text attributes, layered over each segment's own style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Emphasis {
    pub bold: bool,
    pub italic: bool,
    pub inverse: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: Style,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(text, Style::Plain)
    }

    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Painter {
    pub color: bool,
    pub hyperlinks: bool,
}

impl Painter {
    /// Detect what stdout can display.
    pub fn for_stdout() -> Self {
        Self {
            color: colored::control::SHOULD_COLORIZE.should_colorize(),
            hyperlinks: supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self {
            color: false,
            hyperlinks: false,
        }
    }

    pub fn paint(&self, segment: &Segment, emphasis: Emphasis) -> String {
        let text = match &segment.style {
            Style::Link { url } if self.hyperlinks => hyperlink(&segment.text, url),
            _ => segment.text.clone(),
        };
        if !self.color {
            return text;
        }

        let mut out: ColoredString = text.as_str().normal();
        if let Some(color) = segment.style.color() {
            let (r, g, b) = color.rgb();
            out = out.truecolor(r, g, b);
        }
        if matches!(segment.style, Style::Link { .. }) {
            out = out.underline();
        }
        if emphasis.bold || segment.style == Style::Header {
            out = out.bold();
        }
        if emphasis.italic {
            out = out.italic();
        }
        if emphasis.inverse {
            out = out.reversed();
        }
        out.to_string()
    }
}

/// OSC 8 terminal hyperlink.
pub fn hyperlink(text: &str, url: &str) -> String {
    format!("\x1b]8;;{url}\x1b\\{text}\x1b]8;;\x1b\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> Segment {
        let url = "https://x/12".to_string();
        Segment::styled("#12", Style::Link { url })
    }

    #[test]
    fn test_plain_painter_emits_no_escapes() {
        let painter = Painter::plain();
        let link = link();
        let emphasis = Emphasis {
            bold: true,
            italic: true,
            inverse: true,
        };
        assert_eq!(painter.paint(&link, emphasis), "#12");
        let ahead = Segment::styled("+2", Style::Ahead);
        assert_eq!(painter.paint(&ahead, emphasis), "+2");
    }

    #[test]
    fn test_hyperlink_without_color() {
        let painter = Painter {
            color: false,
            hyperlinks: true,
        };
        assert_eq!(
            painter.paint(&link(), Emphasis::default()),
            "\x1b]8;;https://x/12\x1b\\#12\x1b]8;;\x1b\\"
        );
    }

    #[test]
    fn test_color_painter_styles_segments() {
        colored::control::set_override(true);
        let painter = Painter {
            color: true,
            hyperlinks: false,
        };
        let ahead = painter.paint(&Segment::styled("+2", Style::Ahead), Emphasis::default());
        assert!(ahead.contains("\x1b["));
        assert!(ahead.contains("+2"));

        let bold = painter.paint(
            &Segment::plain("main"),
            Emphasis {
                bold: true,
                ..Emphasis::default()
            },
        );
        assert!(bold.contains("\x1b[1"));
    }
}
