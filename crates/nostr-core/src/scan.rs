//! Quote- and parenthesis-aware tokenizer for search queries.
//!
//! Every parser in this crate works on the token stream produced here, so
//! quoted phrases are opaque everywhere: an `OR`, a paren or a directive
//! inside `"..."` is just part of a word.

/// What a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of non-whitespace text (may contain quoted segments).
    Word,
    /// `(`
    Open,
    /// `)`
    Close,
}

/// A token with its byte span in the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// For `Open`/`Close`: index of the matching paren token, if balanced.
    pub partner: Option<usize>,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Whole-word, case-insensitive `OR`.
    pub fn is_or(&self, source: &str) -> bool {
        self.kind == TokenKind::Word && self.text(source).eq_ignore_ascii_case("OR")
    }
}

/// Split `input` into words and parens, then pair up balanced parens.
///
/// Unbalanced parens keep `partner: None` and are treated as literal text
/// by callers. An unterminated quote swallows the rest of the input into
/// the current word.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' || c == ')' {
            chars.next();
            tokens.push(Token {
                kind: if c == '(' { TokenKind::Open } else { TokenKind::Close },
                start: i,
                end: i + 1,
                partner: None,
            });
            continue;
        }

        let start = i;
        let mut end = input.len();
        let mut in_quotes = false;
        while let Some(&(j, ch)) = chars.peek() {
            if ch == '"' {
                in_quotes = !in_quotes;
            } else if !in_quotes && (ch.is_whitespace() || ch == '(' || ch == ')') {
                end = j;
                break;
            }
            chars.next();
        }
        tokens.push(Token {
            kind: TokenKind::Word,
            start,
            end,
            partner: None,
        });
    }

    let mut stack: Vec<usize> = Vec::new();
    for idx in 0..tokens.len() {
        match tokens[idx].kind {
            TokenKind::Open => stack.push(idx),
            TokenKind::Close => {
                if let Some(open) = stack.pop() {
                    tokens[open].partner = Some(idx);
                    tokens[idx].partner = Some(open);
                }
            }
            TokenKind::Word => {}
        }
    }

    tokens
}

/// Indices of `OR` tokens in `tokens[from..to]` that sit at nesting depth
/// zero relative to that range. Only balanced parens affect depth.
pub fn top_level_ors(source: &str, tokens: &[Token], from: usize, to: usize) -> Vec<usize> {
    let mut ors = Vec::new();
    let mut idx = from;
    while idx < to {
        let tok = &tokens[idx];
        match (tok.kind, tok.partner) {
            (TokenKind::Open, Some(close)) if close > idx => {
                idx = close + 1;
                continue;
            }
            _ => {
                if tok.is_or(source) {
                    ors.push(idx);
                }
            }
        }
        idx += 1;
    }
    ors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<&str> {
        tokenize(input).iter().map(|t| t.text(input)).collect()
    }

    #[test]
    fn splits_words_and_parens() {
        assert_eq!(words("a (b OR c)"), vec!["a", "(", "b", "OR", "c", ")"]);
    }

    #[test]
    fn quoted_phrase_is_one_word() {
        assert_eq!(
            words(r#"say "cats OR (dogs)" now"#),
            vec!["say", r#""cats OR (dogs)""#, "now"]
        );
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(words(r#"a "b OR c"#), vec!["a", r#""b OR c"#]);
    }

    #[test]
    fn pairs_balanced_parens_only() {
        let toks = tokenize("(a (b) c");
        assert_eq!(toks[0].partner, None);
        assert_eq!(toks[2].partner, Some(4));
        assert_eq!(toks[4].partner, Some(2));
    }

    #[test]
    fn stray_close_is_unpaired() {
        let toks = tokenize("a ) b");
        assert_eq!(toks[1].kind, TokenKind::Close);
        assert_eq!(toks[1].partner, None);
    }

    #[test]
    fn top_level_or_skips_nested_groups() {
        let q = "a OR (b OR c) or d";
        let toks = tokenize(q);
        let ors = top_level_ors(q, &toks, 0, toks.len());
        let texts: Vec<_> = ors.iter().map(|&i| toks[i].start).collect();
        assert_eq!(texts, vec![2, 14]);
    }

    #[test]
    fn or_inside_word_is_not_operator() {
        let q = "by:OR ORACLE";
        let toks = tokenize(q);
        assert!(top_level_ors(q, &toks, 0, toks.len()).is_empty());
    }
}
