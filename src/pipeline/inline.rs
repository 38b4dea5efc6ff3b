//! Inline markup parsing: `**bold**`, `*italic*`, `***both***`, `<u>underline</u>`.
//!
//! This is the inverse of the run wrapping done by
//! [`super::serialize::render_run`]. It is intentionally narrow: only the
//! three markers the serializer emits are recognised, an asterisk run only
//! opens before non-whitespace and only closes after non-whitespace, and a
//! line whose markers do not balance is returned as one literal span.
//!
//! A backslash makes the next `\\`, `*`, `<u>` or `</u>` literal; the
//! serializer escapes those in run text so they survive the round trip.
//! Between two differently styled runs the markers touch (`**a***b*`); an
//! asterisk run is then split into a closing part and an opening part.

use crate::document::TextStyle;

/// A piece of line text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: TextStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Split a line into styled spans, stripping the markers.
///
/// Adjacent spans never share a style and no span is empty.
pub fn parse_inline(line: &str) -> Vec<Span> {
    let chars: Vec<char> = line.chars().collect();
    let mut spans: Vec<Span> = Vec::new();
    let mut buf = String::new();
    let mut state = TextStyle::default();
    let mut i = 0;

    while i < chars.len() {
        if let Some(escaped) = escaped_at(&chars, i) {
            buf.push(escaped);
            i += 2;
            continue;
        }
        if !state.underline && starts_with_at(&chars, i, "<u>") {
            flush(&mut spans, &mut buf, state);
            state.underline = true;
            i += 3;
            continue;
        }
        if state.underline && starts_with_at(&chars, i, "</u>") {
            flush(&mut spans, &mut buf, state);
            state.underline = false;
            i += 4;
            continue;
        }

        if chars[i] == '*' {
            let n = chars[i..].iter().take_while(|&&c| c == '*').count();
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + n).copied();
            let can_close = prev.is_some_and(|c| !c.is_whitespace());
            let can_open = next.is_some_and(|c| !c.is_whitespace());

            let toggled = match asterisk_style(n) {
                Some(t) if state.contains(t) && can_close => Some(state.without(t)),
                Some(t) if state.is_disjoint(t) && can_open => Some(state.with(t)),
                _ if can_close && can_open => close_then_open(state, n),
                _ => None,
            };
            if let Some(next_state) = toggled {
                flush(&mut spans, &mut buf, state);
                state = next_state;
                i += n;
                continue;
            }
            buf.extend(&chars[i..i + n]);
            i += n;
            continue;
        }

        buf.push(chars[i]);
        i += 1;
    }

    if !state.is_plain() {
        // Unbalanced markup: keep the line exactly as written.
        return if line.is_empty() {
            Vec::new()
        } else {
            vec![Span::plain(unescape(line))]
        };
    }
    flush(&mut spans, &mut buf, state);
    spans
}

/// Concatenated text of a span list.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

fn asterisk_style(n: usize) -> Option<TextStyle> {
    match n {
        1 => Some(TextStyle::ITALIC),
        2 => Some(TextStyle::BOLD),
        3 => Some(TextStyle::BOLD.with(TextStyle::ITALIC)),
        _ => None,
    }
}

/// Split `n` asterisks into a run closing flags of `state` followed by a run
/// opening new ones. Wider closing parts are tried first.
fn close_then_open(state: TextStyle, n: usize) -> Option<TextStyle> {
    (1..n).rev().find_map(|closing| {
        let close = asterisk_style(closing)?;
        let open = asterisk_style(n - closing)?;
        let rest = state.without(close);
        (state.contains(close) && rest.is_disjoint(open)).then(|| rest.with(open))
    })
}

/// The literal character produced by a backslash escape at `i`, if any.
fn escaped_at(chars: &[char], i: usize) -> Option<char> {
    if chars[i] != '\\' {
        return None;
    }
    match chars.get(i + 1) {
        Some(&c) if c == '\\' || c == '*' => Some(c),
        Some(&'<') if starts_with_at(chars, i + 1, "<u>") || starts_with_at(chars, i + 1, "</u>") => Some('<'),
        _ => None,
    }
}

/// Resolve backslash escapes without interpreting any markers.
fn unescape(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        match escaped_at(&chars, i) {
            Some(c) => {
                out.push(c);
                i += 2;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

fn starts_with_at(chars: &[char], i: usize, pat: &str) -> bool {
    let mut k = i;
    for p in pat.chars() {
        if chars.get(k) != Some(&p) {
            return false;
        }
        k += 1;
    }
    true
}

fn flush(spans: &mut Vec<Span>, buf: &mut String, style: TextStyle) {
    if buf.is_empty() {
        return;
    }
    let text = std::mem::take(buf);
    match spans.last_mut() {
        Some(last) if last.style == style => last.text.push_str(&text),
        _ => spans.push(Span { text, style }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold_italic() -> TextStyle {
        TextStyle::BOLD.with(TextStyle::ITALIC)
    }

    #[test]
    fn plain_line_is_one_span() {
        assert_eq!(parse_inline("just text"), vec![Span::plain("just text")]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn bold_and_italic_markers() {
        assert_eq!(
            parse_inline("**Bold** plain *slanted*"),
            vec![
                Span::styled("Bold", TextStyle::BOLD),
                Span::plain(" plain "),
                Span::styled("slanted", TextStyle::ITALIC),
            ]
        );
    }

    #[test]
    fn serializer_nesting_parses_back() {
        let all = bold_italic().with(TextStyle::UNDERLINE);
        assert_eq!(parse_inline("<u>***x***</u>"), vec![Span::styled("x", all)]);
        assert_eq!(parse_inline("***x***"), vec![Span::styled("x", bold_italic())]);
        assert_eq!(
            parse_inline("<u>under</u> line"),
            vec![Span::styled("under", TextStyle::UNDERLINE), Span::plain(" line")]
        );
    }

    #[test]
    fn nested_italic_inside_bold() {
        assert_eq!(
            parse_inline("**a *b* c**"),
            vec![
                Span::styled("a ", TextStyle::BOLD),
                Span::styled("b", bold_italic()),
                Span::styled(" c", TextStyle::BOLD),
            ]
        );
    }

    #[test]
    fn spaced_asterisks_are_literal() {
        assert_eq!(parse_inline("2 * 3 * 4"), vec![Span::plain("2 * 3 * 4")]);
        assert_eq!(parse_inline("* bullet"), vec![Span::plain("* bullet")]);
    }

    #[test]
    fn unbalanced_markup_falls_back_to_literal() {
        assert_eq!(parse_inline("**open only"), vec![Span::plain("**open only")]);
        assert_eq!(parse_inline("<u>never closed"), vec![Span::plain("<u>never closed")]);
    }

    #[test]
    fn long_asterisk_runs_are_literal() {
        assert_eq!(parse_inline("a **** b"), vec![Span::plain("a **** b")]);
    }

    #[test]
    fn touching_markers_between_runs() {
        assert_eq!(
            parse_inline("**Bold***Italic*"),
            vec![
                Span::styled("Bold", TextStyle::BOLD),
                Span::styled("Italic", TextStyle::ITALIC),
            ]
        );
        assert_eq!(
            parse_inline("*I***B**"),
            vec![Span::styled("I", TextStyle::ITALIC), Span::styled("B", TextStyle::BOLD)]
        );
        assert_eq!(
            parse_inline("***x****y*"),
            vec![Span::styled("x", bold_italic()), Span::styled("y", TextStyle::ITALIC)]
        );
    }

    #[test]
    fn four_asterisks_after_italic_stay_literal() {
        assert_eq!(parse_inline("*I****B**"), vec![Span::plain("*I****B**")]);
    }

    #[test]
    fn escaped_markers_are_literal() {
        assert_eq!(parse_inline(r"2\*3\*4"), vec![Span::plain("2*3*4")]);
        assert_eq!(parse_inline(r"**a\*b**"), vec![Span::styled("a*b", TextStyle::BOLD)]);
        assert_eq!(parse_inline(r"\<u>tag\</u>"), vec![Span::plain("<u>tag</u>")]);
        assert_eq!(parse_inline(r"C:\\dir \d"), vec![Span::plain(r"C:\dir \d")]);
    }

    #[test]
    fn unbalanced_fallback_resolves_escapes() {
        assert_eq!(parse_inline(r"**open \* only"), vec![Span::plain("**open * only")]);
    }

    #[test]
    fn plain_text_strips_markers() {
        assert_eq!(plain_text(&parse_inline("**Hello** *there*")), "Hello there");
    }
}
