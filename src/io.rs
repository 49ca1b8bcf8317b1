//! The machine's I/O port.
//!
//! `INP`, `OUT` and `OTC` talk to an [`IoPort`]. The core never touches a
//! console directly; [`ConsolePort`] drives any reader/writer pair (stdin
//! and stdout in the CLI) and [`BufferPort`] is an in-memory double for
//! tests and embedding.
//!
//! Both ports share the same output rule. Numbers normally go one per
//! line. Writing a character starts a "character line": from then on
//! numbers and characters are appended with no line breaks until a `\n`
//! character ends the line. So `OTC 'a'; OUT 1; OUT 2` prints `a12`.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, Stdin, StdinLock, Stdout, Write};
use std::ops::RangeInclusive;
use thiserror::Error;
use crate::cpu::word::Word;

/// Prompt printed by [`ConsolePort`] before each read.
pub const DEFAULT_PROMPT: &str = ">? ";

/// What the machine needs from the outside world.
pub trait IoPort {
    /// Read a number.
    ///
    /// Malformed input is handled here, not reported: the port asks again
    /// until it gets an integer that lies in `range` (any integer when
    /// `range` is `None`).
    fn read_num(&mut self, range: Option<RangeInclusive<Word>>) -> Result<Word, IoError>;

    /// Print a number.
    fn write_num(&mut self, value: Word) -> Result<(), IoError>;

    /// Print the character with code `code`.
    fn write_char(&mut self, code: Word) -> Result<(), IoError>;
}

impl<T: IoPort + ?Sized> IoPort for &mut T {
    fn read_num(&mut self, range: Option<RangeInclusive<Word>>) -> Result<Word, IoError> {
        (**self).read_num(range)
    }

    fn write_num(&mut self, value: Word) -> Result<(), IoError> {
        (**self).write_num(value)
    }

    fn write_char(&mut self, code: Word) -> Result<(), IoError> {
        (**self).write_char(code)
    }
}

/// Errors that can occur at the port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("input ended while the program was waiting for a number")]
    EndOfInput,

    #[error("{0} is not a valid character code")]
    InvalidChar(Word),

    #[error("stream error: {0}")]
    Stream(String),
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Stream(e.to_string())
    }
}

/// Why a line of input was not accepted as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAnInteger,
    OutOfRange,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotAnInteger => write!(f, "Input must be an integer"),
            Rejection::OutOfRange => write!(f, "Input out of range"),
        }
    }
}

/// Validate one line of input.
pub fn parse_input(line: &str, range: Option<&RangeInclusive<Word>>) -> Result<Word, Rejection> {
    let value: Word = line.trim().parse().map_err(|_| Rejection::NotAnInteger)?;
    match range {
        Some(range) if !range.contains(&value) => Err(Rejection::OutOfRange),
        _ => Ok(value),
    }
}

/// The character-line state shared by every port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LineMode {
    active: bool,
}

impl LineMode {
    fn format_num(&self, value: Word) -> String {
        if self.active {
            value.to_string()
        } else {
            format!("{}\n", value)
        }
    }

    fn format_char(&mut self, code: Word) -> Result<char, IoError> {
        let ch = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or(IoError::InvalidChar(code))?;
        self.active = ch != '\n';
        Ok(ch)
    }
}

/// A port over any line reader and writer.
///
/// Prompts and complaints about bad input go to the same writer as the
/// program's output.
#[derive(Debug)]
pub struct ConsolePort<R, W> {
    input: R,
    output: W,
    prompt: String,
    line: LineMode,
}

impl ConsolePort<StdinLock<'static>, Stdout> {
    /// A port on the process's stdin and stdout.
    pub fn stdio() -> Self {
        let stdin: Stdin = std::io::stdin();
        Self::new(stdin.lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePort<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            prompt: DEFAULT_PROMPT.to_string(),
            line: LineMode::default(),
        }
    }

    /// Replace the input prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Whether a character line is in progress.
    pub fn is_line_mode(&self) -> bool {
        self.line.active
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> IoPort for ConsolePort<R, W> {
    fn read_num(&mut self, range: Option<RangeInclusive<Word>>) -> Result<Word, IoError> {
        loop {
            write!(self.output, "{}", self.prompt)?;
            self.output.flush()?;

            let mut buf = String::new();
            if self.input.read_line(&mut buf)? == 0 {
                return Err(IoError::EndOfInput);
            }

            match parse_input(&buf, range.as_ref()) {
                Ok(value) => return Ok(value),
                Err(rejection) => writeln!(self.output, "{}", rejection)?,
            }
        }
    }

    fn write_num(&mut self, value: Word) -> Result<(), IoError> {
        let text = self.line.format_num(value);
        self.output.write_all(text.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    fn write_char(&mut self, code: Word) -> Result<(), IoError> {
        let ch = self.line.format_char(code)?;
        write!(self.output, "{}", ch)?;
        self.output.flush()?;
        Ok(())
    }
}

/// In-memory port with scripted input and captured output.
#[derive(Debug, Clone, Default)]
pub struct BufferPort {
    input: VecDeque<String>,
    output: String,
    rejected: Vec<String>,
    line: LineMode,
}

impl BufferPort {
    /// A port that will answer reads with `inputs`, in order.
    pub fn new<I: IntoIterator<Item = Word>>(inputs: I) -> Self {
        Self::from_lines(inputs.into_iter().map(|value| value.to_string()))
    }

    /// A port that will answer reads with raw input lines, which are
    /// validated like console input.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Queue another input line.
    pub fn push_input(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    /// Everything written so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Take the output written so far, leaving the buffer empty.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Input lines that were refused and skipped.
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Input lines not consumed yet.
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }

    pub fn is_line_mode(&self) -> bool {
        self.line.active
    }
}

impl IoPort for BufferPort {
    fn read_num(&mut self, range: Option<RangeInclusive<Word>>) -> Result<Word, IoError> {
        while let Some(line) = self.input.pop_front() {
            match parse_input(&line, range.as_ref()) {
                Ok(value) => return Ok(value),
                Err(_) => self.rejected.push(line),
            }
        }
        Err(IoError::EndOfInput)
    }

    fn write_num(&mut self, value: Word) -> Result<(), IoError> {
        let text = self.line.format_num(value);
        self.output.push_str(&text);
        Ok(())
    }

    fn write_char(&mut self, code: Word) -> Result<(), IoError> {
        let ch = self.line.format_char(code)?;
        self.output.push(ch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_numbers_one_per_line() {
        let mut port = BufferPort::default();
        port.write_num(1).unwrap();
        port.write_num(-2).unwrap();
        assert_eq!(port.output(), "1\n-2\n");
    }

    #[test]
    fn test_char_starts_line_mode() {
        let mut port = BufferPort::default();
        port.write_char('a' as Word).unwrap();
        port.write_num(1).unwrap();
        port.write_num(2).unwrap();
        assert!(port.is_line_mode());
        assert_eq!(port.output(), "a12");
    }

    #[test]
    fn test_newline_char_ends_line_mode() {
        let mut port = BufferPort::default();
        port.write_char('x' as Word).unwrap();
        port.write_char('\n' as Word).unwrap();
        assert!(!port.is_line_mode());
        port.write_num(7).unwrap();
        assert_eq!(port.output(), "x\n7\n");
    }

    #[test]
    fn test_invalid_char_code() {
        let mut port = BufferPort::default();
        assert_eq!(port.write_char(-1), Err(IoError::InvalidChar(-1)));
        assert_eq!(port.write_char(0xD800), Err(IoError::InvalidChar(0xD800)));
        assert!(!port.is_line_mode());
    }

    #[test]
    fn test_buffer_skips_bad_input() {
        let mut port = BufferPort::from_lines(["abc", "5000", " 12 "]);
        assert_eq!(port.read_num(Some(-999..=999)), Ok(12));
        assert_eq!(port.rejected(), ["abc".to_string(), "5000".to_string()]);
        assert_eq!(port.read_num(None), Err(IoError::EndOfInput));
    }

    #[test]
    fn test_buffer_unbounded_read() {
        let mut port = BufferPort::new([5000]);
        assert_eq!(port.read_num(None), Ok(5000));
    }

    #[test]
    fn test_console_reprompts() {
        let input = Cursor::new("x\n1000\n-3\n");
        let mut port = ConsolePort::new(input, Vec::new()).with_prompt("? ");
        assert_eq!(port.read_num(Some(-999..=999)), Ok(-3));

        let (_, output) = port.into_inner();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "? Input must be an integer\n? Input out of range\n? "
        );
    }

    #[test]
    fn test_console_end_of_input() {
        let mut port = ConsolePort::new(Cursor::new(""), Vec::new());
        assert_eq!(port.read_num(None), Err(IoError::EndOfInput));
    }

    #[test]
    fn test_console_line_mode() {
        let mut port = ConsolePort::new(Cursor::new(""), Vec::new());
        port.write_num(4).unwrap();
        port.write_char('h' as Word).unwrap();
        port.write_char('i' as Word).unwrap();
        port.write_num(5).unwrap();
        port.write_char('\n' as Word).unwrap();
        port.write_num(6).unwrap();

        let (_, output) = port.into_inner();
        assert_eq!(String::from_utf8(output).unwrap(), "4\nhi5\n6\n");
    }
}
