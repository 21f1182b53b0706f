//! Word tokenizer for caption and question text.

/// A word or punctuation token.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub kind: WordKind,
    pub span: Span,
    pub text: String,
}

/// Source span (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Word kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    /// Alphabetic word, possibly with inner hyphens or apostrophes.
    Alpha,
    Number,
    /// `,` `;` `.` `?` `!` `:`: clause separators.
    Punct,
}

impl Word {
    /// Lowercased text.
    pub fn lower(&self) -> String {
        self.text.to_ascii_lowercase()
    }

    pub fn is(&self, word: &str) -> bool {
        self.kind == WordKind::Alpha && self.text.eq_ignore_ascii_case(word)
    }
}

/// Split text into words. Never fails: unknown symbols are skipped.
pub fn tokenize(input: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => { chars.next(); }

            c if c.is_alphabetic() => {
                let start = pos;
                let mut end = pos;
                let mut text = String::new();
                while let Some(&(i, c)) = chars.peek() {
                    let inner = (c == '-' || c == '\'')
                        && matches!(chars.clone().nth(1), Some((_, n)) if n.is_alphabetic());
                    if c.is_alphabetic() || inner {
                        text.push(c);
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                words.push(Word { kind: WordKind::Alpha, span: Span { start, end }, text });
            }

            c if c.is_ascii_digit() => {
                let start = pos;
                let mut end = pos;
                let mut text = String::new();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        text.push(c);
                        end = i + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                words.push(Word { kind: WordKind::Number, span: Span { start, end }, text });
            }

            ',' | ';' | '.' | '?' | '!' | ':' => {
                chars.next();
                words.push(Word {
                    kind: WordKind::Punct,
                    span: Span { start: pos, end: pos + 1 },
                    text: ch.to_string(),
                });
            }

            _ => { chars.next(); }
        }
    }

    words
}
