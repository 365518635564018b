//! Built-in Python source normalizer.
//!
//! Checks the structure a Python tokenizer would reject first (unterminated
//! strings, unbalanced brackets, inconsistent indentation, missing blocks) and
//! normalizes whitespace: LF line endings, expanded leading tabs, no trailing
//! spaces, at most two consecutive blank lines, exactly one final newline.
//! The normalized text is then parsed as a Python module, so anything the
//! interpreter would refuse to import is rejected here.

use rustpython_parser::{Mode, parse};

use crate::error::FormatError;

use super::SourceFormatter;

pub struct PythonNormalizer {
    tab_width: usize,
}

impl PythonNormalizer {
    pub fn new(tab_width: usize) -> Self {
        Self {
            tab_width: tab_width.max(1),
        }
    }

    fn expand_leading_tabs(&self, line: &str) -> String {
        let body = line.trim_start_matches([' ', '\t']);
        let lead = &line[..line.len() - body.len()];
        let width: usize = lead
            .chars()
            .map(|c| if c == '\t' { self.tab_width } else { 1 })
            .sum();
        format!("{}{}", " ".repeat(width), body)
    }
}

impl Default for PythonNormalizer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SourceFormatter for PythonNormalizer {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let text = source.replace("\r\n", "\n").replace('\r', "\n");

        let mut scanner = Scanner::default();
        let mut indents: Vec<usize> = vec![0];
        let mut expect_block: Option<usize> = None;
        // (text, verbatim) pairs; verbatim lines sit inside a triple-quoted string.
        let mut lines: Vec<(String, bool)> = Vec::new();

        for (i, raw) in text.split('\n').enumerate() {
            let lineno = i + 1;
            let in_string = scanner.triple.is_some();
            let continuing = scanner.in_continuation();

            let line = if in_string {
                raw.to_string()
            } else {
                self.expand_leading_tabs(raw).trim_end().to_string()
            };

            if !continuing && !is_blank_or_comment(&line) {
                let indent = line.len() - line.trim_start().len();
                check_indent(&mut indents, &mut expect_block, indent, lineno)?;
            }

            scanner.scan_line(&line, lineno, in_string)?;
            if !scanner.in_continuation() && scanner.last_code_char == Some(':') {
                expect_block = Some(lineno);
            }

            lines.push((line, in_string));
        }

        scanner.finish()?;
        if let Some(line) = expect_block {
            return Err(FormatError::ExpectedBlock { line });
        }

        let normalized = join_lines(lines);
        check_syntax(&normalized)?;
        Ok(normalized)
    }
}

fn check_syntax(source: &str) -> Result<(), FormatError> {
    parse(source, Mode::Module, "<botflow>").map_err(|e| {
        let offset = (u32::from(e.offset) as usize).min(source.len());
        let line = source.as_bytes()[..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        FormatError::Syntax {
            line,
            message: e.error.to_string(),
        }
    })?;
    Ok(())
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn check_indent(
    indents: &mut Vec<usize>,
    expect_block: &mut Option<usize>,
    indent: usize,
    lineno: usize,
) -> Result<(), FormatError> {
    let top = indents.last().copied().unwrap_or(0);
    if let Some(opener) = expect_block.take() {
        if indent <= top {
            return Err(FormatError::ExpectedBlock { line: opener });
        }
        indents.push(indent);
        return Ok(());
    }
    if indent > top {
        return Err(FormatError::Indentation {
            line: lineno,
            message: "unexpected indent".into(),
        });
    }
    while indents.last().is_some_and(|&level| indent < level) {
        indents.pop();
    }
    if indents.last().copied() != Some(indent) {
        return Err(FormatError::Indentation {
            line: lineno,
            message: "unindent does not match any outer indentation level".into(),
        });
    }
    Ok(())
}

fn join_lines(lines: Vec<(String, bool)>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut blank_run = 0;
    for (line, verbatim) in lines {
        if !verbatim && line.is_empty() {
            blank_run += 1;
            if blank_run > 2 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return String::new();
    }
    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

/// Line-by-line lexical state carried across physical lines.
#[derive(Default)]
struct Scanner {
    brackets: Vec<(char, usize)>,
    /// Open triple-quoted string: quote char and starting line.
    triple: Option<(char, usize)>,
    backslash: bool,
    last_code_char: Option<char>,
}

impl Scanner {
    fn in_continuation(&self) -> bool {
        !self.brackets.is_empty() || self.triple.is_some() || self.backslash
    }

    fn scan_line(&mut self, line: &str, lineno: usize, in_string: bool) -> Result<(), FormatError> {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        self.backslash = false;
        if !in_string {
            self.last_code_char = None;
        }

        while i < chars.len() {
            if let Some((quote, _)) = self.triple {
                match chars[i] {
                    '\\' => i += 2,
                    c if c == quote && is_triple(&chars, i, quote) => {
                        self.triple = None;
                        self.last_code_char = Some(quote);
                        i += 3;
                    }
                    _ => i += 1,
                }
                continue;
            }

            let c = chars[i];
            match c {
                '#' => break,
                '\'' | '"' => {
                    if is_triple(&chars, i, c) {
                        self.triple = Some((c, lineno));
                        i += 3;
                        continue;
                    }
                    i = skip_string(&chars, i, c)
                        .ok_or(FormatError::UnterminatedString { line: lineno })?;
                    self.last_code_char = Some(c);
                    continue;
                }
                '(' | '[' | '{' => {
                    self.brackets.push((c, lineno));
                    self.last_code_char = Some(c);
                }
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match self.brackets.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(FormatError::UnbalancedBracket {
                                line: lineno,
                                bracket: c,
                            });
                        }
                    }
                    self.last_code_char = Some(c);
                }
                '\\' if chars[i + 1..].iter().all(|c| c.is_whitespace()) => {
                    self.backslash = true;
                    break;
                }
                c if c.is_whitespace() => {}
                c => self.last_code_char = Some(c),
            }
            i += 1;
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), FormatError> {
        if let Some((_, line)) = self.triple {
            return Err(FormatError::UnterminatedString { line });
        }
        if let Some(&(bracket, line)) = self.brackets.last() {
            return Err(FormatError::UnbalancedBracket { line, bracket });
        }
        Ok(())
    }
}

fn is_triple(chars: &[char], i: usize, quote: char) -> bool {
    chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
}

/// Index just past the closing quote of a single-line string starting at `start`.
fn skip_string(chars: &[char], start: usize, quote: char) -> Option<usize> {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}
