//! Colour tokens for the viewer.
//!
//! Dark background with neon accents. Marker colours come from the
//! configured CSS hex strings and are parsed here.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Near-black background (primary surface)
    pub background: Color,
    /// Electric cyan accent (focus, highlights)
    pub accent: Color,
    /// Neon green (up candles, gains)
    pub positive: Color,
    /// Hot pink (down candles, losses, errors)
    pub negative: Color,
    /// Neon orange (warnings)
    pub warning: Color,
    /// Cool purple (selection background)
    pub neutral: Color,
    /// Steel blue (muted text, axes)
    pub muted: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::parrot_neon()
    }
}

impl Theme {
    pub fn parrot_neon() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            accent: Color::Rgb(0, 255, 255),
            positive: Color::Rgb(0, 255, 128),
            negative: Color::Rgb(255, 20, 147),
            warning: Color::Rgb(255, 140, 0),
            neutral: Color::Rgb(147, 112, 219),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
            text_secondary: Color::Rgb(170, 170, 170),
        }
    }

    /// Green for gains, pink for losses. Zero counts as a gain.
    pub fn pnl_color(&self, value: f64) -> Color {
        if value >= 0.0 {
            self.positive
        } else {
            self.negative
        }
    }

    pub fn side_color(&self, is_buy: bool) -> Color {
        if is_buy {
            self.positive
        } else {
            self.negative
        }
    }

    /// Marker colour from a `#rrggbb` string, falling back to the side colour.
    pub fn marker_color(&self, hex: &str, is_buy: bool) -> Color {
        parse_hex(hex).unwrap_or_else(|| self.side_color(is_buy))
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.muted)
        }
    }

    pub fn title(&self, focused: bool) -> Style {
        let style = self.border(focused);
        if focused {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
