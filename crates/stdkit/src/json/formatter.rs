use std::io::{self, Write};

use serde_json::ser::{CharEscape, CompactFormatter, Formatter, PrettyFormatter};

use super::encoder::JsonEncoderOptions;

/// Escaping toggles applied to every string the serializer writes, keys included.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Escapes {
    pub tags: bool,
    pub ampersands: bool,
    pub apostrophes: bool,
    pub quotes: bool,
    pub slashes: bool,
    pub unicode: bool,
    pub line_terminators: bool,
}

impl From<&JsonEncoderOptions> for Escapes {
    fn from(options: &JsonEncoderOptions) -> Self {
        Self {
            tags: options.escape_tags,
            ampersands: options.escape_ampersands,
            apostrophes: options.escape_apostrophes,
            quotes: options.escape_quotes,
            slashes: options.escape_slashes,
            unicode: options.escape_unicode,
            line_terminators: options.escape_line_terminators,
        }
    }
}

impl Escapes {
    fn escape_for(&self, c: char) -> Option<Escape> {
        match c {
            '/' if self.slashes => Some(Escape::Literal("\\/")),
            '<' if self.tags => Some(Escape::Literal("\\u003C")),
            '>' if self.tags => Some(Escape::Literal("\\u003E")),
            '&' if self.ampersands => Some(Escape::Literal("\\u0026")),
            '\'' if self.apostrophes => Some(Escape::Literal("\\u0027")),
            '\u{2028}' | '\u{2029}' if self.unicode || self.line_terminators => Some(Escape::Unicode),
            c if !c.is_ascii() && self.unicode => Some(Escape::Unicode),
            _ => None,
        }
    }
}

enum Escape {
    Literal(&'static str),
    Unicode,
}

/// Serializer formatter: compact or pretty layout, plus the configured escapes.
pub(crate) struct EncodingFormatter {
    pretty: Option<PrettyFormatter<'static>>,
    escapes: Escapes,
    preserve_zero_fraction: bool,
}

impl EncodingFormatter {
    pub fn new(options: &JsonEncoderOptions) -> Self {
        Self {
            pretty: options
                .pretty_print
                .then(|| PrettyFormatter::with_indent(b"    ")),
            escapes: Escapes::from(options),
            preserve_zero_fraction: options.preserve_zero_fraction,
        }
    }
}

/// Forwards a layout method to the pretty formatter when one is configured.
macro_rules! layout {
    ($self:ident.$method:ident($($arg:expr),*)) => {
        match &mut $self.pretty {
            Some(pretty) => pretty.$method($($arg),*),
            None => CompactFormatter.$method($($arg),*),
        }
    };
}

impl Formatter for EncodingFormatter {
    fn write_number_str<W: ?Sized + Write>(&mut self, writer: &mut W, value: &str) -> io::Result<()> {
        let value = match value.strip_suffix(".0") {
            Some(integral) if !self.preserve_zero_fraction => integral,
            _ => value,
        };
        writer.write_all(value.as_bytes())
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (index, c) in fragment.char_indices() {
            let Some(escape) = self.escapes.escape_for(c) else {
                continue;
            };
            writer.write_all(&fragment.as_bytes()[start..index])?;
            match escape {
                Escape::Literal(text) => writer.write_all(text.as_bytes())?,
                Escape::Unicode => {
                    let mut units = [0u16; 2];
                    for unit in c.encode_utf16(&mut units) {
                        write!(writer, "\\u{:04x}", unit)?;
                    }
                }
            }
            start = index + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn write_char_escape<W: ?Sized + Write>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()> {
        match char_escape {
            CharEscape::Quote if self.escapes.quotes => writer.write_all(b"\\u0022"),
            other => CompactFormatter.write_char_escape(writer, other),
        }
    }

    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.begin_array(writer))
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.end_array(writer))
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        layout!(self.begin_array_value(writer, first))
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.end_array_value(writer))
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.begin_object(writer))
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.end_object(writer))
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        layout!(self.begin_object_key(writer, first))
    }

    fn end_object_key<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.end_object_key(writer))
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.begin_object_value(writer))
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        layout!(self.end_object_value(writer))
    }
}
