//! The live text run of a rendering surface.

use palette::Srgba;
use serde::{Deserialize, Serialize};

use crate::{invalidate::Change, FontId};

pub fn default_color() -> Srgba<u8> {
    Srgba::new(0, 0, 0, u8::MAX)
}

/// Horizontal alignment of each line within the frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub enum Align {
    Right,
    Center,
    Left,
}

impl Default for Align {
    fn default() -> Self {
        Align::Right
    }
}

/// Base paragraph direction handed to the shaping backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub enum WritingDirection {
    /// Let the backend detect the direction from the text.
    Auto,
    RightToLeft,
    LeftToRight,
}

impl Default for WritingDirection {
    fn default() -> Self {
        WritingDirection::RightToLeft
    }
}

/// The text, font and styling currently shown by a surface.
///
/// Setters return the [`Change`] they caused, or `None` when the stored
/// value was already equal.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    text: String,
    char_count: usize,
    font: Option<FontId>,
    color: Srgba<u8>,
    align: Align,
    direction: WritingDirection,
}

impl Default for TextRun {
    fn default() -> Self {
        Self {
            text: String::new(),
            char_count: 0,
            font: None,
            color: default_color(),
            align: Align::default(),
            direction: WritingDirection::default(),
        }
    }
}

impl TextRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in characters. Page boundaries index into this range.
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn font(&self) -> Option<FontId> {
        self.font
    }

    pub fn color(&self) -> Srgba<u8> {
        self.color
    }

    pub fn align(&self) -> Align {
        self.align
    }

    pub fn direction(&self) -> WritingDirection {
        self.direction
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Option<Change> {
        let text = text.into();
        if text == self.text {
            return None;
        }
        self.char_count = text.chars().count();
        self.text = text;
        Some(Change::Text)
    }

    pub fn set_font(&mut self, font: Option<FontId>) -> Option<Change> {
        if font == self.font {
            return None;
        }
        self.font = font;
        Some(Change::Font)
    }

    pub fn set_color(&mut self, color: Srgba<u8>) -> Option<Change> {
        if color == self.color {
            return None;
        }
        self.color = color;
        Some(Change::Color)
    }

    pub fn set_align(&mut self, align: Align) -> Option<Change> {
        if align == self.align {
            return None;
        }
        self.align = align;
        Some(Change::Alignment)
    }

    pub fn set_direction(&mut self, direction: WritingDirection) -> Option<Change> {
        if direction == self.direction {
            return None;
        }
        self.direction = direction;
        Some(Change::WritingDirection)
    }
}
