//! Terminal rendering of the conversation and the side panels.

use crate::character::Character;
use crate::emotion::{EmotionKind, EmotionVector, EMOTION_HIGHLIGHT_THRESHOLD, EMOTION_MAX};
use crate::message::Message;
use crate::parameters::{PersonalityParameters, PARAMETER_MAX};

/// Width of a full bar in cells.
const BAR_WIDTH: usize = 20;

/// Available colors for printed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterColor {
    Red,
    Green,
    Yellow,
    Blue,
    Cyan,
    White,
    BoldRed,
    BoldCyan,
    BoldWhite,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Blue => "\x1b[34m",
            Self::Cyan => "\x1b[36m",
            Self::White => "\x1b[37m",
            Self::BoldRed => "\x1b[1;31m",
            Self::BoldCyan => "\x1b[1;36m",
            Self::BoldWhite => "\x1b[1;37m",
        }
    }
}

/// ANSI reset code.
const RESET: &str = "\x1b[0m";

/// A piece of colored text.
#[derive(Debug, Clone, PartialEq)]
pub struct ColoredText {
    pub text: String,
    pub color: PrinterColor,
}

impl ColoredText {
    pub fn new(text: impl Into<String>, color: PrinterColor) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// `value / max` as a filled bar of [`BAR_WIDTH`] cells.
pub fn bar(value: f64, max: f64) -> String {
    let ratio = if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Segments of one chat bubble.
///
/// Character bubbles carry anger and sadness to one decimal.
pub fn message_segments(message: &Message, character_name: &str) -> Vec<ColoredText> {
    if message.is_user() {
        return vec![
            ColoredText::new("You: ", PrinterColor::BoldCyan),
            ColoredText::new(message.content.clone(), PrinterColor::Cyan),
        ];
    }
    let emotion = message.emotion.unwrap_or_default();
    vec![
        ColoredText::new(format!("{}: ", character_name), PrinterColor::BoldWhite),
        ColoredText::new(message.content.clone(), PrinterColor::White),
        ColoredText::new(
            format!(
                "  [anger {:.1} | sadness {:.1}]",
                emotion.anger, emotion.sadness
            ),
            PrinterColor::Yellow,
        ),
    ]
}

/// Emotional state panel lines; components above 3 are highlighted.
pub fn emotion_panel(emotion: &EmotionVector) -> Vec<ColoredText> {
    EmotionKind::ALL
        .iter()
        .map(|kind| {
            let value = emotion.get(*kind);
            let color = if value > EMOTION_HIGHLIGHT_THRESHOLD {
                PrinterColor::BoldRed
            } else {
                PrinterColor::Green
            };
            ColoredText::new(
                format!("{:<8} {} {:.1}", kind.label(), bar(value, EMOTION_MAX), value),
                color,
            )
        })
        .collect()
}

/// Parameter panel lines.
pub fn parameter_panel(parameters: &PersonalityParameters) -> Vec<String> {
    parameters
        .entries()
        .iter()
        .map(|(name, value)| {
            format!(
                "{:<20} {} {:.1}",
                name.label(),
                bar(*value, PARAMETER_MAX),
                value
            )
        })
        .collect()
}

/// One line per character, marking the selection.
pub fn character_lines(characters: &[Character], selected: Option<&str>) -> Vec<String> {
    characters
        .iter()
        .map(|c| {
            let marker = if Some(c.id.as_str()) == selected { "*" } else { " " };
            format!("{} [{}] {} ({})", marker, c.id, c.name, c.primary_trait())
        })
        .collect()
}

/// Printer for console output with color support.
#[derive(Debug, Clone, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Self
    }

    /// Print a message with the specified color.
    pub fn print(&self, content: &str, color: PrinterColor) {
        println!("{}{}{}", color.ansi_code(), content, RESET);
    }

    /// Print multiple colored text segments on a single line.
    pub fn print_colored(&self, segments: &[ColoredText]) {
        let mut line = String::new();
        for segment in segments {
            line.push_str(segment.color.ansi_code());
            line.push_str(&segment.text);
            line.push_str(RESET);
        }
        println!("{}", line);
    }

    pub fn print_message(&self, message: &Message, character_name: &str) {
        self.print_colored(&message_segments(message, character_name));
    }

    pub fn print_emotions(&self, emotion: &EmotionVector) {
        self.print("Emotional state", PrinterColor::BoldWhite);
        for line in emotion_panel(emotion) {
            self.print(&line.text, line.color);
        }
    }

    pub fn print_parameters(&self, parameters: &PersonalityParameters) {
        self.print("Personality parameters", PrinterColor::BoldWhite);
        for line in parameter_panel(parameters) {
            self.print(&line, PrinterColor::Blue);
        }
    }

    pub fn print_error(&self, message: &str) {
        self.print(message, PrinterColor::Red);
    }
}
