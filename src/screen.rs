//! Line-oriented text output on an RGB565 display.

use embedded_graphics::{
    mono_font::{ascii::FONT_6X12, MonoFont, MonoTextStyleBuilder},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::Rectangle,
    text::{Alignment as TextAlignment, Baseline, Text, TextStyleBuilder},
};

pub const FONT: &MonoFont<'static> = &FONT_6X12;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Colors {
    pub foreground: Rgb565,
    pub background: Rgb565,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            foreground: Rgb565::BLACK,
            background: Rgb565::WHITE,
        }
    }
}

pub fn line_height() -> u32 {
    FONT.character_size.height
}

/// Prints `text` on text line `line`, optionally blanking the whole line first.
pub fn println<D>(
    target: &mut D,
    text: &str,
    alignment: Alignment,
    line: u32,
    colors: Colors,
    clean: bool,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let width = target.bounding_box().size.width;
    let y = (line * line_height()) as i32;

    if clean {
        target.fill_solid(
            &Rectangle::new(Point::new(0, y), Size::new(width, line_height())),
            colors.background,
        )?;
    }

    let (x, text_alignment) = match alignment {
        Alignment::Left => (0, TextAlignment::Left),
        Alignment::Center => (width as i32 / 2, TextAlignment::Center),
        Alignment::Right => (width as i32 - 1, TextAlignment::Right),
    };

    let char_style = MonoTextStyleBuilder::new()
        .font(FONT)
        .text_color(colors.foreground)
        .background_color(colors.background)
        .build();
    let text_style = TextStyleBuilder::new()
        .alignment(text_alignment)
        .baseline(Baseline::Top)
        .build();

    Text::with_text_style(text, Point::new(x, y), char_style, text_style).draw(target)?;

    Ok(())
}
