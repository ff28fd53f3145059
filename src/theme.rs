//! Color themes for the terminal viewer, selected via `--theme`.

use ratatui::style::Color;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Nord-inspired muted colors
    #[default]
    Nord,
    /// Orange/amber text on black
    AmberCrt,
    /// Green text on black
    GreenPhosphor,
}

impl Theme {
    /// Parse theme name from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "nord" => Ok(Theme::Nord),
            "amber" | "ambercrt" | "amber-crt" => Ok(Theme::AmberCrt),
            "green" | "greenphosphor" | "green-phosphor" => Ok(Theme::GreenPhosphor),
            _ => Err(format!(
                "Unknown theme '{}'. Available: nord, amber-crt, green-phosphor",
                s
            )),
        }
    }

    pub fn colors(&self) -> ColorScheme {
        match self {
            Theme::Nord => ColorScheme::nord(),
            Theme::AmberCrt => ColorScheme::amber_crt(),
            Theme::GreenPhosphor => ColorScheme::green_phosphor(),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Nord => write!(f, "nord"),
            Theme::AmberCrt => write!(f, "amber-crt"),
            Theme::GreenPhosphor => write!(f, "green-phosphor"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColorScheme {
    pub text: Color,
    /// Secondary info, ellipsis tokens, disabled nav buttons
    pub text_dim: Color,
    pub border: Color,
    /// Active tab and current page number
    pub accent: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Spinner / "fetching more" line
    pub loading: Color,
    pub error: Color,
}

impl ColorScheme {
    pub fn nord() -> Self {
        Self {
            text: Color::White,
            text_dim: Color::DarkGray,
            border: Color::Gray,
            accent: Color::Cyan,
            selection_bg: Color::Yellow,
            selection_fg: Color::Black,
            loading: Color::Green,
            error: Color::Red,
        }
    }

    pub fn amber_crt() -> Self {
        let amber = Color::Rgb(255, 176, 0);
        let amber_bright = Color::Rgb(255, 200, 100);
        let amber_dim = Color::Rgb(180, 120, 0);
        Self {
            text: amber,
            text_dim: amber_dim,
            border: amber_dim,
            accent: amber_bright,
            selection_bg: amber,
            selection_fg: Color::Black,
            loading: amber_bright,
            error: Color::Red,
        }
    }

    pub fn green_phosphor() -> Self {
        let green = Color::Rgb(0, 255, 0);
        let green_dim = Color::Rgb(0, 180, 0);
        let green_bright = Color::Rgb(100, 255, 100);
        Self {
            text: green,
            text_dim: green_dim,
            border: green_dim,
            accent: green_bright,
            selection_bg: green,
            selection_fg: Color::Black,
            loading: green_bright,
            error: Color::Red, // stands out against green
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::nord()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parsing() {
        assert_eq!(Theme::from_str("nord").unwrap(), Theme::Nord);
        assert_eq!(Theme::from_str("NORD").unwrap(), Theme::Nord);
        assert_eq!(Theme::from_str("amber").unwrap(), Theme::AmberCrt);
        assert_eq!(Theme::from_str("green-phosphor").unwrap(), Theme::GreenPhosphor);
        assert!(Theme::from_str("invalid").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for theme in [Theme::Nord, Theme::AmberCrt, Theme::GreenPhosphor] {
            assert_eq!(Theme::from_str(&theme.to_string()).unwrap(), theme);
        }
    }
}
