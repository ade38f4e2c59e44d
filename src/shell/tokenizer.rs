use snafu::Snafu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

/// Splits a command line into words, POSIX-shell style.
///
/// Single quotes keep everything literally. Inside double quotes a backslash
/// only escapes `"`, `\` and `$`. Outside quotes a backslash escapes any
/// character.
pub fn split_line(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<Quote> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(Quote::Single), '\'') | (Some(Quote::Double), '"') => quote = None,
            (Some(Quote::Single), c) => word.push(c),
            (Some(Quote::Double), '\\') => match chars.peek() {
                Some(&next @ ('"' | '\\' | '$')) => {
                    word.push(next);
                    chars.next();
                }
                _ => word.push('\\'),
            },
            (Some(Quote::Double), c) => word.push(c),
            (None, '\'') => {
                quote = Some(Quote::Single);
                in_word = true;
            }
            (None, '"') => {
                quote = Some(Quote::Double);
                in_word = true;
            }
            (None, '\\') => {
                let escaped = chars.next().ok_or(TokenizeError::TrailingEscape)?;
                word.push(escaped);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(TokenizeError::UnterminatedQuote);
    }
    if in_word {
        words.push(word);
    }

    Ok(words)
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TokenizeError {
    #[snafu(display("unterminated quote"))]
    UnterminatedQuote,
    #[snafu(display("escape character at end of line"))]
    TrailingEscape,
}
