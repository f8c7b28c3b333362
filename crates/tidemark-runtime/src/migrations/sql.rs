//! Lexical helpers for migration bodies.
//!
//! The engine never parses SQL; it only needs to know whether a body holds
//! anything besides comments, whitespace and empty statements. Quoted text is
//! skipped so that `'--'` or `"#"` inside a literal never reads as a comment.

/// Remove `-- ...`, `# ...` and `/* ... */` comments, leaving quoted text intact.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                copy_quoted(c, &mut chars, &mut out);
            }
            '-' if chars.peek() == Some(&'-') => skip_line(&mut chars, &mut out),
            '#' => skip_line(&mut chars, &mut out),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                // Keep tokens on either side of the comment apart.
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Whether the body contains at least one statement once comments,
/// whitespace and bare `;` separators are removed.
pub fn has_statements(sql: &str) -> bool {
    strip_comments(sql)
        .chars()
        .any(|c| !c.is_whitespace() && c != ';')
}

/// Count the non-empty statements in a body, splitting on `;` outside quotes.
///
/// Only used for log output; routine bodies containing their own `;` are
/// counted per inner statement.
pub fn statement_count(sql: &str) -> usize {
    let stripped = strip_comments(sql);
    let mut count = 0;
    let mut current_has_content = false;
    let mut chars = stripped.chars().peekable();
    let mut scratch = String::new();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                current_has_content = true;
                copy_quoted(c, &mut chars, &mut scratch);
                scratch.clear();
            }
            ';' => {
                if current_has_content {
                    count += 1;
                }
                current_has_content = false;
            }
            c if !c.is_whitespace() => current_has_content = true,
            _ => {}
        }
    }

    if current_has_content {
        count += 1;
    }
    count
}

/// Copy a quoted run up to and including its closing quote.
///
/// Handles backslash escapes and doubled quote characters.
fn copy_quoted(
    quote: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' && quote != '`' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == quote {
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                return;
            }
        }
    }
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    for c in chars.by_ref() {
        if c == '\n' {
            out.push('\n');
            return;
        }
    }
}
