use std::fmt;
use std::str::FromStr;
use std::sync::{LazyLock, PoisonError, RwLock};

use colored::Color;
use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::error::Error;

pub const DEFAULT_BANNER: &str = " ▼ [ERROR TRACE]";
pub const DEFAULT_MIDDLE: &str = " ├─ ";
pub const DEFAULT_TERMINAL: &str = " ╰─ ";
pub const DEFAULT_VERTICAL: &str = " │ ";

/// The pieces of a trace that can be colored independently.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum Token {
    Banner,
    Connector,
    Message,
    Key,
    Value,
}

impl Token {
    pub fn parse_name(name: &str) -> Result<Self, Error> {
        name.parse::<Self>().map_err(|_| Error::Parse {
            reason: format!(
                "unknown style token \"{name}\", expected one of: {}",
                Self::VARIANTS.join(", ")
            ),
        })
    }
}

/// A 24-bit color, written as `#rrggbb` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || Error::Parse {
            reason: format!("invalid color \"{s}\", expected #rrggbb"),
        };
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(invalid)
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One color per [`Token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub banner: Rgb,
    pub connector: Rgb,
    pub message: Rgb,
    pub key: Rgb,
    pub value: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        let structure = Rgb::new(0x58, 0x5b, 0x70);
        Self {
            banner: structure,
            connector: structure,
            message: Rgb::new(0xf3, 0x8b, 0xa8),
            key: Rgb::new(0xcb, 0xa6, 0xf7),
            value: Rgb::new(0xa6, 0xe3, 0xa1),
        }
    }
}

impl Palette {
    pub fn color(&self, token: Token) -> Rgb {
        match token {
            Token::Banner => self.banner,
            Token::Connector => self.connector,
            Token::Message => self.message,
            Token::Key => self.key,
            Token::Value => self.value,
        }
    }

    pub fn set(&mut self, token: Token, color: Rgb) {
        let slot = match token {
            Token::Banner => &mut self.banner,
            Token::Connector => &mut self.connector,
            Token::Message => &mut self.message,
            Token::Key => &mut self.key,
            Token::Value => &mut self.value,
        };
        *slot = color;
    }
}

/// Tree-drawing glyphs.
///
/// `middle` and `terminal` should have the same width; nested rows are
/// indented by the width of `middle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Glyphs {
    pub middle: String,
    pub terminal: String,
    pub vertical: String,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            middle: DEFAULT_MIDDLE.to_string(),
            terminal: DEFAULT_TERMINAL.to_string(),
            vertical: DEFAULT_VERTICAL.to_string(),
        }
    }
}

impl Glyphs {
    pub fn connector(&self, last: bool) -> &str {
        if last { &self.terminal } else { &self.middle }
    }

    fn unit(&self) -> usize {
        self.middle.chars().count()
    }

    /// Indent under a row whose branch continues: the vertical glyph padded
    /// to the indent unit.
    pub fn open_indent(&self) -> String {
        let pad = self.unit().saturating_sub(self.vertical.chars().count());
        format!("{}{}", self.vertical, " ".repeat(pad.max(1)))
    }

    /// Indent under a row that ends its branch.
    pub fn closed_indent(&self) -> String {
        " ".repeat(self.unit())
    }
}

/// Everything a trace render depends on besides the chain itself.
///
/// `palette: None` renders plain text. In JSON configuration a missing
/// `palette` keeps the default colors and `"palette": null` turns them off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceStyle {
    pub banner: String,
    pub glyphs: Glyphs,
    pub palette: Option<Palette>,
}

impl Default for TraceStyle {
    fn default() -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            glyphs: Glyphs::default(),
            palette: Some(Palette::default()),
        }
    }
}

impl TraceStyle {
    pub fn plain() -> Self {
        Self {
            palette: None,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn with_color(mut self, token: Token, color: Rgb) -> Self {
        self.palette
            .get_or_insert_with(Palette::default)
            .set(token, color);
        self
    }

    /// Style one token. Empty text stays empty so no escape codes wrap nothing.
    ///
    /// With a palette the ANSI truecolor codes are always written; output
    /// does not depend on whether stdout is a terminal. Callers that need
    /// plain text pick [`TraceStyle::plain`].
    pub fn paint(&self, text: &str, token: Token) -> String {
        match &self.palette {
            Some(palette) if !text.is_empty() => {
                let Rgb { r, g, b } = palette.color(token);
                let fg = Color::TrueColor { r, g, b }.to_fg_str();
                format!("\x1b[{fg}m{text}\x1b[0m")
            }
            _ => text.to_string(),
        }
    }
}

static GLOBAL_STYLE: LazyLock<RwLock<TraceStyle>> =
    LazyLock::new(|| RwLock::new(TraceStyle::default()));

/// Snapshot of the process-wide style used by [`trace`](crate::trace).
pub fn global_style() -> TraceStyle {
    GLOBAL_STYLE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn update_global(apply: impl FnOnce(&mut TraceStyle)) {
    let mut style = GLOBAL_STYLE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    apply(&mut style);
}

pub fn set_global_style(style: TraceStyle) {
    update_global(|current| *current = style);
}

pub fn set_banner(banner: impl Into<String>) {
    let banner = banner.into();
    update_global(|style| style.banner = banner);
}

pub fn set_glyphs(glyphs: Glyphs) {
    update_global(|style| style.glyphs = glyphs);
}

/// Recolor one token. Turns coloring on if it was off.
pub fn set_color(token: Token, color: Rgb) {
    update_global(|style| {
        style
            .palette
            .get_or_insert_with(Palette::default)
            .set(token, color);
    });
}

pub fn set_colors_enabled(enabled: bool) {
    update_global(|style| {
        if enabled {
            style.palette.get_or_insert_with(Palette::default);
        } else {
            style.palette = None;
        }
    });
}
