//! The JSON lexer/parser.
//!
//! A state machine over a character source with one character of
//! pushback. There is no separate token stream: the parser builds the
//! intermediate tree ([`JsonValue`]) directly, and registers every
//! object that carries an `@id` in the reference table as a side effect,
//! so the reader's build pass never has to re-scan for identities.
//!
//! Three details matter for correctness and are easy to miss:
//!
//! - **Numbers** are scanned into a fixed-size buffer and classified:
//!   any `.`, `e` or `E` makes the number a double, everything else is a
//!   64-bit integer accumulated manually with wrapping arithmetic;
//!   wrapping negate is what lets `i64::MIN` survive the round trip.
//! - **Arrays** are parsed with an explicit work stack, not recursion; a
//!   document nested ten thousand arrays deep must not blow the host
//!   stack.
//! - **Strings** go through the literal intern table on completion, so
//!   the meta-keys and common tokens come back as canonical instances.
//!
//! Whitespace between tokens is space, tab, newline, carriage return,
//! form feed, and backspace. Parse errors carry the 1-based byte
//! position of the offending character.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

use twox_hash::XxHash64;

use crate::constants::MAX_NUMBER_LENGTH;
use crate::error::{JsonError, Result};
use crate::intern;
use crate::tree::{JsonArrayRef, JsonObj, JsonObjRef, JsonValue};

/// `@id` -> defining object, populated while parsing.
pub(crate) type RefTable = HashMap<i64, JsonObjRef, BuildHasherDefault<XxHash64>>;

/// A fully parsed document: the root node plus the identity table.
pub(crate) struct Parsed {
    pub root: JsonValue,
    pub refs: RefTable,
}

/// Parses a complete document. The top-level value may be an object, an
/// array, or a bare scalar.
pub(crate) fn parse(input: &str) -> Result<Parsed> {
    let mut parser = Parser::new(input);
    let root = parser.parse_root()?;
    Ok(Parsed {
        root,
        refs: parser.refs,
    })
}

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{c}' | '\u{8}')
}

/// A character source with one character of pushback and a running
/// 1-based byte position.
struct PushbackSource<'a> {
    chars: std::str::Chars<'a>,
    pushback: Option<char>,
    pos: u64,
}

impl<'a> PushbackSource<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars(),
            pushback: None,
            pos: 0,
        }
    }

    fn read(&mut self) -> Option<char> {
        let c = match self.pushback.take() {
            Some(c) => c,
            None => self.chars.next()?,
        };
        self.pos += c.len_utf8() as u64;
        Some(c)
    }

    fn unread(&mut self, c: char) {
        self.pos -= c.len_utf8() as u64;
        self.pushback = Some(c);
    }

    /// Byte position of the most recently read character (1-based).
    fn pos(&self) -> u64 {
        self.pos
    }
}

enum StrState {
    Plain,
    Escape,
    Hex,
}

struct Parser<'a> {
    src: PushbackSource<'a>,
    num_buf: String,
    str_buf: String,
    refs: RefTable,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            src: PushbackSource::new(input),
            num_buf: String::with_capacity(MAX_NUMBER_LENGTH),
            str_buf: String::new(),
            refs: RefTable::default(),
        }
    }

    fn parse_root(&mut self) -> Result<JsonValue> {
        match self.skip_ws_read() {
            Some(c) => {
                self.src.unread(c);
                match c {
                    '{' => self.read_object(),
                    '[' => self.read_array(),
                    _ => self.read_value(),
                }
            }
            None => Err(JsonError::structural("input is empty", self.src.pos())),
        }
    }

    // --- VALUES ---

    fn read_value(&mut self) -> Result<JsonValue> {
        let c = self.src.read().ok_or_else(|| {
            JsonError::lexical("Unexpected end of input, expected a value", self.src.pos())
        })?;

        match c {
            '"' => Ok(JsonValue::Str(self.read_string()?)),
            '{' => {
                self.src.unread('{');
                self.read_object()
            }
            '[' => {
                self.src.unread('[');
                self.read_array()
            }
            't' | 'T' => {
                self.src.unread(c);
                self.expect_token("true")?;
                Ok(JsonValue::Bool(true))
            }
            'f' | 'F' => {
                self.src.unread(c);
                self.expect_token("false")?;
                Ok(JsonValue::Bool(false))
            }
            'n' | 'N' => {
                self.src.unread(c);
                self.expect_token("null")?;
                Ok(JsonValue::Null)
            }
            _ if c.is_ascii_digit() || c == '-' => self.read_number(c),
            _ => Err(JsonError::lexical(
                format!("Unknown value type starting with '{c}'"),
                self.src.pos(),
            )),
        }
    }

    /// The dispatch character has been pushed back by the caller; the
    /// whole token must match exactly (lowercase only).
    fn expect_token(&mut self, token: &str) -> Result<()> {
        for expected in token.chars() {
            match self.src.read() {
                Some(c) if c == expected => {}
                _ => {
                    return Err(JsonError::lexical(
                        format!("Expected token '{token}'"),
                        self.src.pos(),
                    ));
                }
            }
        }
        Ok(())
    }

    // --- OBJECTS ---

    fn read_object(&mut self) -> Result<JsonValue> {
        enum State {
            Start,
            Field,
            Value,
            PostValue,
        }

        let obj = JsonObj::new_ref();
        let mut field: Rc<str> = intern::intern("");
        let mut state = State::Start;

        loop {
            match state {
                State::Start => {
                    match self.skip_ws_read() {
                        Some('{') => {}
                        _ => {
                            return Err(JsonError::structural(
                                "Input is not valid JSON; expected '{'",
                                self.src.pos(),
                            ));
                        }
                    }
                    match self.skip_ws_read() {
                        Some('}') => return Ok(JsonValue::Object(obj)), // empty object
                        Some(c) => {
                            self.src.unread(c);
                            state = State::Field;
                        }
                        None => {
                            return Err(JsonError::structural(
                                "Object not ended with '}'",
                                self.src.pos(),
                            ));
                        }
                    }
                }

                State::Field => match self.skip_ws_read() {
                    Some('"') => {
                        field = self.read_string()?;
                        match self.skip_ws_read() {
                            Some(':') => {}
                            _ => {
                                return Err(JsonError::structural(
                                    "Expected ':' between string field and value",
                                    self.src.pos(),
                                ));
                            }
                        }
                        state = State::Value;
                    }
                    _ => {
                        return Err(JsonError::structural(
                            "Expected quote before field name",
                            self.src.pos(),
                        ));
                    }
                },

                State::Value => {
                    self.skip_ws();
                    let value = self.read_value()?;
                    // Register identities as they stream past.
                    if &*field == intern::META_ID {
                        if let JsonValue::Long(id) = value {
                            self.refs.insert(id, Rc::clone(&obj));
                        }
                    }
                    obj.borrow_mut().insert(Rc::clone(&field), value);
                    state = State::PostValue;
                }

                State::PostValue => match self.skip_ws_read() {
                    Some('}') | None => return Ok(JsonValue::Object(obj)),
                    Some(',') => state = State::Field,
                    Some(_) => {
                        return Err(JsonError::structural(
                            "Object not ended with '}'",
                            self.src.pos(),
                        ));
                    }
                },
            }
        }
    }

    // --- ARRAYS ---

    /// Parses `[ ... ]` with an explicit work stack; nested arrays are
    /// linked into their parent up front and resumed after the child
    /// closes.
    fn read_array(&mut self) -> Result<JsonValue> {
        match self.skip_ws_read() {
            Some('[') => {}
            _ => {
                return Err(JsonError::structural(
                    "Expected '[' to open an array",
                    self.src.pos(),
                ));
            }
        }

        let root: JsonArrayRef = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut stack: Vec<JsonArrayRef> = vec![Rc::clone(&root)];

        'next_array: while let Some(array) = stack.pop() {
            loop {
                self.skip_ws();
                let c = self.src.read().ok_or_else(|| {
                    JsonError::lexical("End of input reached inside array", self.src.pos())
                })?;

                if c == ']' {
                    continue 'next_array;
                } else if c == ',' {
                    // separator
                } else if c == '[' {
                    let child: JsonArrayRef = Rc::new(std::cell::RefCell::new(Vec::new()));
                    array.borrow_mut().push(JsonValue::Array(Rc::clone(&child)));
                    stack.push(array);
                    stack.push(child);
                    continue 'next_array;
                } else {
                    self.src.unread(c);
                    let value = self.read_value()?;
                    array.borrow_mut().push(value);
                }
            }
        }

        Ok(JsonValue::Array(root))
    }

    // --- NUMBERS ---

    /// `first` is the already-read leading digit or minus sign.
    fn read_number(&mut self, first: char) -> Result<JsonValue> {
        self.num_buf.clear();
        self.num_buf.push(first);
        let mut is_float = false;

        while let Some(c) = self.src.read() {
            match c {
                '0'..='9' | '-' | '+' => self.push_number_char(c)?,
                '.' | 'e' | 'E' => {
                    self.push_number_char(c)?;
                    is_float = true;
                }
                _ => {
                    self.src.unread(c);
                    break;
                }
            }
        }

        if is_float {
            let parsed: f64 = self.num_buf.parse().map_err(|_| {
                JsonError::lexical(
                    format!("Invalid floating point number: {}", self.num_buf),
                    self.src.pos(),
                )
            })?;
            return Ok(JsonValue::Double(parsed));
        }

        let bytes = self.num_buf.as_bytes();
        let negative = bytes.first() == Some(&b'-');
        let mut n: i64 = 0;
        for &b in bytes.iter().skip(usize::from(negative)) {
            if !b.is_ascii_digit() {
                return Err(JsonError::lexical(
                    format!("Invalid integer: {}", self.num_buf),
                    self.src.pos(),
                ));
            }
            n = n.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
        }
        // Wrapping negate keeps i64::MIN intact.
        Ok(JsonValue::Long(if negative { n.wrapping_neg() } else { n }))
    }

    fn push_number_char(&mut self, c: char) -> Result<()> {
        if self.num_buf.len() >= MAX_NUMBER_LENGTH {
            return Err(JsonError::lexical(
                "Too many digits in number",
                self.src.pos(),
            ));
        }
        self.num_buf.push(c);
        Ok(())
    }

    // --- STRINGS ---

    /// The opening quote has already been consumed. The parsed string is
    /// filtered through the literal intern table.
    fn read_string(&mut self) -> Result<Rc<str>> {
        self.str_buf.clear();
        let mut state = StrState::Plain;
        let mut hex_acc: u32 = 0;
        let mut hex_len: u8 = 0;
        let mut pending_high: Option<u16> = None;

        loop {
            let c = self.src.read().ok_or_else(|| {
                JsonError::lexical(
                    "End of input reached before expected string end quote",
                    self.src.pos(),
                )
            })?;

            match state {
                StrState::Plain => match c {
                    '\\' => state = StrState::Escape,
                    '"' => break,
                    _ => self.push_string_char(c, &mut pending_high)?,
                },

                StrState::Escape => {
                    let unescaped = match c {
                        'n' => Some('\n'),
                        'r' => Some('\r'),
                        't' => Some('\t'),
                        'f' => Some('\u{c}'),
                        'b' => Some('\u{8}'),
                        '\\' => Some('\\'),
                        '/' => Some('/'),
                        '"' => Some('"'),
                        'u' => None,
                        _ => {
                            return Err(JsonError::lexical(
                                format!("Invalid character escape sequence '\\{c}'"),
                                self.src.pos(),
                            ));
                        }
                    };
                    match unescaped {
                        Some(u) => {
                            self.push_string_char(u, &mut pending_high)?;
                            state = StrState::Plain;
                        }
                        None => {
                            hex_acc = 0;
                            hex_len = 0;
                            state = StrState::Hex;
                        }
                    }
                }

                StrState::Hex => match c.to_digit(16) {
                    Some(digit) => {
                        hex_acc = hex_acc * 16 + digit;
                        hex_len += 1;
                        if hex_len == 4 {
                            self.push_code_unit(hex_acc as u16, &mut pending_high)?;
                            state = StrState::Plain;
                        }
                    }
                    None => {
                        return Err(JsonError::lexical(
                            "Expected hexadecimal digits",
                            self.src.pos(),
                        ));
                    }
                },
            }
        }

        if pending_high.is_some() {
            return Err(JsonError::lexical(
                "High surrogate escape not followed by a low surrogate",
                self.src.pos(),
            ));
        }

        Ok(intern::intern(&self.str_buf))
    }

    fn push_string_char(&mut self, c: char, pending_high: &mut Option<u16>) -> Result<()> {
        if pending_high.is_some() {
            return Err(JsonError::lexical(
                "High surrogate escape not followed by a low surrogate",
                self.src.pos(),
            ));
        }
        self.str_buf.push(c);
        Ok(())
    }

    /// Feeds one UTF-16 code unit from a `\uXXXX` escape, pairing
    /// surrogates into a single code point.
    fn push_code_unit(&mut self, unit: u16, pending_high: &mut Option<u16>) -> Result<()> {
        if let Some(high) = pending_high.take() {
            if (0xDC00..=0xDFFF).contains(&unit) {
                let cp =
                    0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
                match char::from_u32(cp) {
                    Some(c) => {
                        self.str_buf.push(c);
                        return Ok(());
                    }
                    None => {
                        return Err(JsonError::lexical(
                            "Surrogate pair decodes to an invalid code point",
                            self.src.pos(),
                        ));
                    }
                }
            }
            return Err(JsonError::lexical(
                "High surrogate escape not followed by a low surrogate",
                self.src.pos(),
            ));
        }

        if (0xD800..=0xDBFF).contains(&unit) {
            *pending_high = Some(unit);
            return Ok(());
        }
        if (0xDC00..=0xDFFF).contains(&unit) {
            return Err(JsonError::lexical(
                "Unpaired low surrogate escape",
                self.src.pos(),
            ));
        }
        match char::from_u32(u32::from(unit)) {
            Some(c) => {
                self.str_buf.push(c);
                Ok(())
            }
            None => Err(JsonError::lexical(
                "Invalid unicode escape",
                self.src.pos(),
            )),
        }
    }

    // --- WHITESPACE ---

    /// Reads past whitespace and returns the first significant
    /// character, saving a read/pushback pair over peeking.
    fn skip_ws_read(&mut self) -> Option<char> {
        loop {
            match self.src.read() {
                Some(c) if is_ws(c) => continue,
                other => return other,
            }
        }
    }

    fn skip_ws(&mut self) {
        if let Some(c) = self.skip_ws_read() {
            self.src.unread(c);
        }
    }
}
