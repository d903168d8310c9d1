//! Screen layout for each redraw
//!
//! A screen is a stack of positioned text layers drawn bottom to top:
//! the frame (or loading placeholder), the status line, and the help panel.

use crate::controller::{PlaybackController, TermSize};
use crossterm::style::{Color, Stylize};

const ACCENT: Color = Color::AnsiValue(86);
const MUTED: Color = Color::AnsiValue(240);
const HIGHLIGHT: Color = Color::AnsiValue(213);

const KEYBINDINGS: &[(&str, &str)] = &[
    ("Space", "Pause/Resume"),
    ("n / →", "Next frame"),
    ("p / ←", "Previous frame"),
    ("?", "Toggle help"),
    ("q / Ctrl+C", "Quit"),
];

/// Text placed with its top-left corner at (`x`, `y`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub x: u16,
    pub y: u16,
    pub lines: Vec<String>,
}

impl Layer {
    fn new(x: u16, y: u16, text: &str) -> Self {
        Self {
            x,
            y,
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    fn width(&self) -> u16 {
        self.lines.iter().map(|l| visible_width(l)).max().unwrap_or(0) as u16
    }

    fn height(&self) -> u16 {
        self.lines.len() as u16
    }
}

/// Builds the layers for the controller's current state
pub fn layers(controller: &PlaybackController) -> Vec<Layer> {
    let size = controller.size().unwrap_or(TermSize::new(0, 0));

    if let Some(progress) = controller.progress().filter(|_| controller.is_loading()) {
        let mut frame = Layer::new(0, 0, &progress.partial);
        frame.x = centered(size.width, frame.width());
        let status = format!(
            " Loading... {}/{} rows ",
            progress.rows_complete, progress.total_rows
        );
        return vec![frame, Layer::new(1, 0, &status.with(ACCENT).to_string())];
    }

    let Some(text) = controller.current_frame_text() else {
        let message = Layer::new(0, 0, &"Loading GIF...".with(ACCENT).to_string());
        return vec![center(message, size)];
    };

    let mut layers = vec![
        center(Layer::new(0, 0, text), size),
        Layer::new(1, 0, &status_line(controller).with(MUTED).to_string()),
    ];
    if controller.show_help() {
        layers.push(center(help_panel(), size));
    }
    layers
}

/// Play/pause icon with a 1-based frame counter
pub fn status_line(controller: &PlaybackController) -> String {
    let icon = if controller.is_paused() { "⏸" } else { "▶" };
    format!(
        " {} {}/{} ",
        icon,
        controller.current_frame() + 1,
        controller.frames().len()
    )
}

/// Rounded-border panel listing the keybindings
pub fn help_panel() -> Layer {
    let mut content = vec![
        "  Keybindings".with(HIGHLIGHT).bold().to_string(),
        String::new(),
    ];
    content.extend(
        KEYBINDINGS
            .iter()
            .map(|(keys, description)| format!("  {:<11}{}", keys, description)),
    );
    content.push(String::new());

    let inner = content.iter().map(|l| visible_width(l)).max().unwrap_or(0) + 4;
    let border = |s: &str| s.with(HIGHLIGHT).to_string();
    let padding = format!("{}{}{}", border("│"), " ".repeat(inner), border("│"));

    let mut lines = vec![format!(
        "{}{}{}",
        border("╭"),
        border(&"─".repeat(inner)),
        border("╮")
    )];
    lines.push(padding.clone());
    for line in &content {
        let fill = inner - 4 - visible_width(line);
        lines.push(format!(
            "{}  {}{}  {}",
            border("│"),
            line,
            " ".repeat(fill),
            border("│")
        ));
    }
    lines.push(padding);
    lines.push(format!(
        "{}{}{}",
        border("╰"),
        border(&"─".repeat(inner)),
        border("╯")
    ));

    Layer { x: 0, y: 0, lines }
}

fn center(mut layer: Layer, size: TermSize) -> Layer {
    layer.x = centered(size.width, layer.width());
    layer.y = centered(size.height, layer.height());
    layer
}

fn centered(outer: u16, inner: u16) -> u16 {
    outer.saturating_sub(inner) / 2
}

/// Number of printed columns, ignoring SGR escape sequences
pub fn visible_width(line: &str) -> usize {
    let mut width = 0;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI sequences end with a byte in '@'..='~'
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            continue;
        }
        width += 1;
    }
    width
}
