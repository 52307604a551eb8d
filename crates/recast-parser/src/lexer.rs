//! Line joining and quote-aware splitting of instruction bodies.

/// Join backslash-continued physical lines into logical instruction lines.
///
/// A space is inserted where a continued line meets its successor. Comment
/// lines between continued lines are dropped without ending the instruction;
/// a blank line does end it.
pub fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = String::new();
    let mut continuing = false;

    for raw in content.lines() {
        let line = raw.trim_end();
        if continuing && line.trim_start().starts_with('#') {
            continue;
        }
        if let Some(head) = line.strip_suffix('\\') {
            buf.push_str(head);
            buf.push(' ');
            continuing = true;
            continue;
        }
        buf.push_str(line);
        lines.push(std::mem::take(&mut buf));
        continuing = false;
    }
    if !buf.trim().is_empty() {
        lines.push(buf.trim_end().to_owned());
    }
    lines
}

/// Split a shell body into sub-commands on top-level `&&` and `;`.
///
/// Separators inside single or double quotes, inside parentheses (subshells
/// and `$(...)`), or escaped with a backslash do not split. Sub-commands are
/// trimmed; empty ones are dropped.
pub fn split_commands(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = body.chars().peekable();

    let flush = |cur: &mut String, out: &mut Vec<String>| {
        let cmd = cur.trim();
        if !cmd.is_empty() {
            out.push(cmd.to_owned());
        }
        cur.clear();
    };

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            cur.push(c);
            if c == '\\' && q == '"' {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\\' => {
                cur.push(c);
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            '\'' | '"' => {
                quote = Some(c);
                cur.push(c);
            }
            '(' => {
                depth += 1;
                cur.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                cur.push(c);
            }
            ';' if depth == 0 => flush(&mut cur, &mut out),
            '&' if depth == 0 && chars.peek() == Some(&'&') => {
                chars.next();
                flush(&mut cur, &mut out);
            }
            _ => cur.push(c),
        }
    }
    flush(&mut cur, &mut out);
    out
}

/// Split text into whitespace-separated words, honouring quotes.
///
/// Quotes are removed from the resulting words; a backslash outside single
/// quotes escapes the next character.
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut cur = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            (Some(_), c) => cur.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut cur));
                    in_word = false;
                }
            }
            (None, c) => {
                cur.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(cur);
    }
    words
}

/// Strip one pair of matching surrounding quotes.
pub fn unquote(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            return inner;
        }
    }
    s.trim_matches(|c| c == '"' || c == '\'')
}

/// Parse a JSON string array (`["a", "b"]`), the exec form of several directives.
pub fn json_array(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if !text.starts_with('[') {
        return None;
    }
    serde_json::from_str(text).ok()
}
