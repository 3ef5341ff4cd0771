use inksac::prelude::*;

use crate::shell::transcript::{Segment, StyleTag};

#[derive(Debug, Clone, Copy)]
pub struct SyntaxHighlighter {
    color_support: ColorSupport,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    pub fn new() -> Self {
        let support = check_color_support().unwrap_or(ColorSupport::NoColor);
        Self {
            color_support: support,
        }
    }

    /// A highlighter that never emits escape codes.
    pub fn plain() -> Self {
        Self {
            color_support: ColorSupport::NoColor,
        }
    }

    fn enabled(&self) -> bool {
        !matches!(self.color_support, ColorSupport::NoColor)
    }

    /// Colors the command word and any flags. Spacing is kept as typed so
    /// the line editor's cursor stays put.
    pub fn highlight_command(&self, input: &str) -> String {
        if !self.enabled() {
            return input.to_string();
        }

        let mut seen_command = false;
        let parts: Vec<String> = input
            .split(' ')
            .map(|part| {
                if part.is_empty() {
                    return String::new();
                }
                if !seen_command {
                    seen_command = true;
                    let command_style = Style::builder().foreground(Color::Cyan).bold().build();
                    return part.style(command_style).to_string();
                }
                if part.starts_with('-') {
                    let flag_style = Style::builder().foreground(Color::Yellow).build();
                    return part.style(flag_style).to_string();
                }
                part.to_string()
            })
            .collect();

        parts.join(" ")
    }

    /// Renders one transcript segment for a terminal.
    pub fn render_segment(&self, segment: &Segment) -> String {
        if !self.enabled() || style_for(segment.style).is_none() {
            return segment.text.clone();
        }

        // Styling each line keeps escape codes from spanning a newline.
        segment
            .text
            .split_inclusive('\n')
            .map(|chunk| {
                let (line, newline) = match chunk.strip_suffix('\n') {
                    Some(line) => (line, "\n"),
                    None => (chunk, ""),
                };
                match style_for(segment.style) {
                    Some(style) if !line.is_empty() => format!("{}{newline}", line.style(style)),
                    _ => chunk.to_string(),
                }
            })
            .collect()
    }

    pub fn highlight_hint(&self, hint: &str) -> String {
        if !self.enabled() {
            return hint.to_string();
        }

        let hint_style = Style::builder()
            .foreground(Color::RGB(128, 128, 128))
            .build();

        hint.style(hint_style).to_string()
    }
}

fn style_for(tag: StyleTag) -> Option<Style> {
    let style = match tag {
        StyleTag::Plain | StyleTag::Input => return None,
        StyleTag::Prompt => Style::builder().foreground(Color::Green).build(),
        StyleTag::Label => Style::builder().foreground(Color::Cyan).bold().build(),
        StyleTag::Diagnostic => Style::builder().foreground(Color::Red).bold().build(),
        StyleTag::Banner => Style::builder().foreground(Color::Yellow).bold().build(),
    };
    Some(style)
}
