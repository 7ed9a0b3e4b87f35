use std::collections::HashMap;

use ratatui::style::Color;

use crate::model::UiConfig;
use crate::ops::NoticeLevel;

/// Colors for the labeling screens, keyed by what they mark rather than by hue
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub dim: Color,
    /// Focus marker, edit cursor, progress bar and the title badge
    pub accent: Color,
    /// Row background of the focused field
    pub focus_bg: Color,
    /// Repeated-entry keys and filter status
    pub info: Color,
    /// Unsaved item, unstored entry key, missing required fields
    pub pending: Color,
    pub error: Color,
    /// Background of filter terms in the item pane
    pub match_bg: Color,
    /// Per-label colors for multilabel fields
    pub label_colors: HashMap<String, Color>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x12, 0x16, 0x1C),
            text: Color::Rgb(0xC9, 0xD1, 0xD9),
            text_bright: Color::Rgb(0xFF, 0xFF, 0xFF),
            dim: Color::Rgb(0x6E, 0x76, 0x81),
            accent: Color::Rgb(0x58, 0xA6, 0xFF),
            focus_bg: Color::Rgb(0x1F, 0x2A, 0x3A),
            info: Color::Rgb(0x56, 0xD4, 0xDD),
            pending: Color::Rgb(0xE3, 0xB3, 0x41),
            error: Color::Rgb(0xF8, 0x51, 0x49),
            match_bg: Color::Rgb(0x3F, 0xB9, 0x50),
            label_colors: HashMap::new(),
        }
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

impl Theme {
    /// Defaults with `[ui.colors]` and `[ui.label_colors]` applied on top
    pub fn from_config(ui: &UiConfig) -> Self {
        let mut theme = Theme::default();

        for (role, value) in &ui.colors {
            let Some(color) = parse_hex_color(value) else {
                tracing::warn!(role = %role, value = %value, "ignoring invalid color");
                continue;
            };
            let slot = match role.as_str() {
                "background" => &mut theme.background,
                "text" => &mut theme.text,
                "text_bright" => &mut theme.text_bright,
                "dim" => &mut theme.dim,
                "accent" => &mut theme.accent,
                "focus_bg" => &mut theme.focus_bg,
                "info" => &mut theme.info,
                "pending" => &mut theme.pending,
                "error" => &mut theme.error,
                "match_bg" => &mut theme.match_bg,
                _ => {
                    tracing::warn!(role = %role, "unknown theme color");
                    continue;
                }
            };
            *slot = color;
        }

        for (label, value) in &ui.label_colors {
            match parse_hex_color(value) {
                Some(color) => {
                    theme.label_colors.insert(label.clone(), color);
                }
                None => tracing::warn!(label = %label, value = %value, "ignoring invalid label color"),
            }
        }

        theme
    }

    /// Color for a multilabel token; unlisted labels use bright text
    pub fn label_color(&self, label: &str) -> Color {
        self.label_colors
            .get(label)
            .copied()
            .unwrap_or(self.text_bright)
    }

    pub fn notice_color(&self, level: NoticeLevel) -> Color {
        match level {
            NoticeLevel::Info => self.info,
            NoticeLevel::Warning => self.pending,
            NoticeLevel::Error => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_need_hash_and_six_digits() {
        assert_eq!(parse_hex_color("#3fb950"), Some(Color::Rgb(0x3F, 0xB9, 0x50)));
        assert_eq!(parse_hex_color("3fb950"), None);
        assert_eq!(parse_hex_color("#3fb"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn config_overrides_roles_and_labels() {
        let mut ui = UiConfig::default();
        ui.colors.insert("pending".into(), "#000000".into());
        ui.colors.insert("yellow".into(), "#000000".into());
        ui.colors.insert("accent".into(), "blue".into());
        ui.label_colors.insert("refund".into(), "#112233".into());
        ui.label_colors.insert("buy".into(), "green".into());

        let theme = Theme::from_config(&ui);
        assert_eq!(theme.pending, Color::Rgb(0, 0, 0));
        assert_eq!(theme.accent, Theme::default().accent);
        assert_eq!(theme.label_color("refund"), Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.label_color("buy"), theme.text_bright);
    }

    #[test]
    fn notices_follow_roles() {
        let theme = Theme::default();
        assert_eq!(theme.notice_color(NoticeLevel::Info), theme.info);
        assert_eq!(theme.notice_color(NoticeLevel::Warning), theme.pending);
        assert_eq!(theme.notice_color(NoticeLevel::Error), theme.error);
    }
}
