// =============================================================================
// markup.rs — JUST ENOUGH HTML TO READ A BLOCK EXPLORER
// =============================================================================
//
// The static strategy gets raw HTML and needs three things out of it:
//
//   1. the first element carrying a given class (`mr-3`, `col-6`)
//   2. that element's direct children, each flattened to text, in order
//   3. the text of every `<button>`, in document order
//
// That is the whole contract. This is not a general HTML parser and does not
// try to be one. It walks tags with memchr, tracks nesting depth for the
// element it cares about, steps over comments, doctypes and the insides of
// <script>/<style>, and knows which tags never close.
//
// Child indexing matches what a tree-building parser would report: the
// whitespace between two tags is a text child of its own. Positional lookups
// downstream count those, so we count them too.
// =============================================================================

use memchr::{memchr, memmem};

/// Tags that never have a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Tags whose content is raw text, never markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// One element located in a document, borrowing from it.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    name: &'a str,
    attrs: &'a str,
    inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        attr_value(self.attrs, name)
    }

    /// True if `class` is one of the space-separated entries of the class attribute.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// All descendant text, entities decoded, whitespace preserved.
    pub fn text(&self) -> String {
        if is_raw_text(self.name) {
            return decode_entities(self.inner);
        }
        text_content(self.inner)
    }

    /// Direct children flattened to text, in document order. Text runs
    /// between child tags (whitespace included) and comments count as children.
    pub fn child_texts(&self) -> Vec<String> {
        let inner = self.inner;
        let mut out = Vec::new();
        let mut pos = 0;

        while let Some(token) = next_token(inner, pos) {
            let run = &inner[pos..token.start()];
            if !run.is_empty() {
                out.push(decode_entities(run));
            }
            pos = match token {
                Token::Open(tag) => {
                    let (inner_end, outer_end) = element_bounds(inner, &tag);
                    let child = Element {
                        name: tag.name,
                        attrs: tag.attrs,
                        inner: &inner[tag.end..inner_end],
                    };
                    out.push(child.text());
                    outer_end
                }
                Token::Skip { start, end } => {
                    if let Some(body) = comment_body(&inner[start..end]) {
                        out.push(body.to_string());
                    }
                    end
                }
                Token::Close { end, .. } => end,
            };
        }

        let tail = &inner[pos..];
        if !tail.is_empty() {
            out.push(decode_entities(tail));
        }
        out
    }
}

/// Every element in the document, in order of their opening tags.
pub fn elements(html: &str) -> Elements<'_> {
    Elements { html, pos: 0 }
}

pub struct Elements<'a> {
    html: &'a str,
    pos: usize,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token = next_token(self.html, self.pos)?;
            match token {
                Token::Open(tag) => {
                    let (inner_end, outer_end) = element_bounds(self.html, &tag);
                    // Descend into children next time, except into raw text.
                    self.pos = if is_raw_text(tag.name) { outer_end } else { tag.end };
                    return Some(Element {
                        name: tag.name,
                        attrs: tag.attrs,
                        inner: &self.html[tag.end..inner_end],
                    });
                }
                Token::Close { end, .. } | Token::Skip { end, .. } => self.pos = end,
            }
        }
    }
}

/// First element with the given class, optionally restricted to a tag name.
pub fn find_by_class<'a>(html: &'a str, tag: Option<&str>, class: &str) -> Option<Element<'a>> {
    elements(html).find(|el| {
        tag.map_or(true, |t| el.name.eq_ignore_ascii_case(t)) && el.has_class(class)
    })
}

/// Text of every element with this tag name, in document order.
pub fn texts_of_tag(html: &str, tag: &str) -> Vec<String> {
    elements(html)
        .filter(|el| el.name.eq_ignore_ascii_case(tag))
        .map(|el| el.text())
        .collect()
}

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct OpenTag<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    attrs: &'a str,
    self_closing: bool,
}

#[derive(Debug, Clone, Copy)]
enum Token<'a> {
    Open(OpenTag<'a>),
    Close { start: usize, end: usize, name: &'a str },
    /// Comments, doctypes, processing instructions.
    Skip { start: usize, end: usize },
}

impl Token<'_> {
    fn start(&self) -> usize {
        match self {
            Token::Open(tag) => tag.start,
            Token::Close { start, .. } | Token::Skip { start, .. } => *start,
        }
    }
}

/// Next real tag at or after `from`. A `<` that does not start a tag is text.
fn next_token(html: &str, from: usize) -> Option<Token<'_>> {
    let bytes = html.as_bytes();
    let mut pos = from;

    while pos < bytes.len() {
        let at = memchr(b'<', &bytes[pos..])? + pos;
        let rest = &bytes[at..];

        if rest.starts_with(b"<!--") {
            let end = memmem::find(&bytes[at + 4..], b"-->")
                .map(|i| at + 4 + i + 3)
                .unwrap_or(bytes.len());
            return Some(Token::Skip { start: at, end });
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            let end = memchr(b'>', rest).map(|i| at + i + 1).unwrap_or(bytes.len());
            return Some(Token::Skip { start: at, end });
        }
        if rest.starts_with(b"</") {
            if let Some((name, name_end)) = tag_name(html, at + 2) {
                let end = memchr(b'>', &bytes[name_end..])
                    .map(|i| name_end + i + 1)
                    .unwrap_or(bytes.len());
                return Some(Token::Close { start: at, end, name });
            }
        } else if let Some(tag) = parse_open_tag(html, at) {
            return Some(Token::Open(tag));
        }

        pos = at + 1;
    }
    None
}

fn tag_name(html: &str, from: usize) -> Option<(&str, usize)> {
    let bytes = html.as_bytes();
    if !bytes.get(from)?.is_ascii_alphabetic() {
        return None;
    }
    let mut end = from;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-' || bytes[end] == b':')
    {
        end += 1;
    }
    Some((&html[from..end], end))
}

fn parse_open_tag(html: &str, at: usize) -> Option<OpenTag<'_>> {
    let (name, name_end) = tag_name(html, at + 1)?;
    let close = find_tag_end(html.as_bytes(), name_end)?;
    let raw_attrs = html[name_end..close].trim_end();
    let self_closing = raw_attrs.ends_with('/');
    let attrs = if self_closing {
        &raw_attrs[..raw_attrs.len() - 1]
    } else {
        raw_attrs
    };
    Some(OpenTag {
        start: at,
        end: close + 1,
        name,
        attrs,
        self_closing,
    })
}

/// Index of the `>` ending a tag, skipping over quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// (end of inner content, end of closing tag) for an opened element.
/// An element that never closes runs to the end of the document.
fn element_bounds(html: &str, tag: &OpenTag<'_>) -> (usize, usize) {
    if tag.self_closing || is_void(tag.name) {
        return (tag.end, tag.end);
    }
    if is_raw_text(tag.name) {
        return raw_text_bounds(html, tag);
    }

    let mut depth = 1usize;
    let mut pos = tag.end;
    while let Some(token) = next_token(html, pos) {
        pos = match token {
            Token::Open(child) => {
                if child.name.eq_ignore_ascii_case(tag.name) && !child.self_closing {
                    depth += 1;
                    child.end
                } else if is_raw_text(child.name) {
                    raw_text_bounds(html, &child).1
                } else {
                    child.end
                }
            }
            Token::Close { start, end, name } => {
                if name.eq_ignore_ascii_case(tag.name) {
                    depth -= 1;
                    if depth == 0 {
                        return (start, end);
                    }
                }
                end
            }
            Token::Skip { end, .. } => end,
        };
    }
    (html.len(), html.len())
}

fn raw_text_bounds(html: &str, tag: &OpenTag<'_>) -> (usize, usize) {
    let needle = format!("</{}", tag.name.to_ascii_lowercase());
    let haystack = html[tag.end..].to_ascii_lowercase();
    match memmem::find(haystack.as_bytes(), needle.as_bytes()) {
        Some(i) => {
            let close_start = tag.end + i;
            let close_end = memchr(b'>', &html.as_bytes()[close_start..])
                .map(|j| close_start + j + 1)
                .unwrap_or(html.len());
            (close_start, close_end)
        }
        None => (html.len(), html.len()),
    }
}

fn is_void(name: &str) -> bool {
    VOID_TAGS.iter().any(|t| name.eq_ignore_ascii_case(t))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_TAGS.iter().any(|t| name.eq_ignore_ascii_case(t))
}

// =============================================================================
// Attributes and text
// =============================================================================

fn attr_value<'a>(attrs: &'a str, wanted: &str) -> Option<&'a str> {
    let bytes = attrs.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = &attrs[name_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = "";
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let q = bytes[i];
                let start = i + 1;
                let end = memchr(q, &bytes[start..]).map(|j| start + j).unwrap_or(bytes.len());
                value = &attrs[start..end];
                i = (end + 1).min(bytes.len());
            } else {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = &attrs[start..i];
            }
        }

        if !name.is_empty() && name.eq_ignore_ascii_case(wanted) {
            return Some(value);
        }
        if name.is_empty() {
            i += 1;
        }
    }
    None
}

/// Text of a `<!-- -->` comment, or `None` for doctypes and the like.
fn comment_body(token: &str) -> Option<&str> {
    let body = token.strip_prefix("<!--")?;
    Some(body.strip_suffix("-->").unwrap_or(body))
}

/// Descendant text of a markup fragment.
fn text_content(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut pos = 0;

    while let Some(token) = next_token(fragment, pos) {
        out.push_str(&decode_entities(&fragment[pos..token.start()]));
        pos = match token {
            Token::Open(tag) if is_raw_text(tag.name) => {
                let (inner_end, outer_end) = raw_text_bounds(fragment, &tag);
                out.push_str(&fragment[tag.end..inner_end]);
                outer_end
            }
            Token::Open(tag) => tag.end,
            Token::Close { end, .. } | Token::Skip { end, .. } => end,
        };
    }
    out.push_str(&decode_entities(&fragment[pos..]));
    out
}

/// Decode the handful of entities explorers actually emit, plus numeric ones.
pub fn decode_entities(s: &str) -> String {
    if memchr(b'&', s.as_bytes()).is_none() {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let semi = candidate.find(';').filter(|&i| i <= 10);
        let decoded = semi.and_then(|i| decode_entity(&candidate[1..i]));
        match (semi, decoded) {
            (Some(i), Some(ch)) => {
                out.push(ch);
                rest = &candidate[i + 1..];
            }
            _ => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Million (MM) Token Tracker</title>
  <script>var x = "<div class='mr-3'>9 addresses</div>";</script>
</head>
<body>
  <!-- <div class="mr-3">stale</div> -->
  <div class="card">
    <div class="row">
      <div class="col-6">
<h6>Price</h6>
<span class="d-block">$0.0832 @ 0.000041 Eth (+4.21%)</span>
<br/>
</div>
      <div class="col-6"><h6>Fully Diluted</h6></div>
    </div>
    <div class="d-flex">
      <div class="mr-3"><i class="fa fa-user"></i> 1,234,567 addresses</div>
    </div>
  </div>
  <button type="button">Overview</button>
  <button type="button" class="btn">Contract</button>
  <button type="button">$ 2,345,678.90</button>
</body>
</html>"#;

    #[test]
    fn test_find_by_class_skips_scripts_and_comments() {
        let el = find_by_class(TOKEN_PAGE, Some("div"), "mr-3").unwrap();
        assert_eq!(el.text().split_whitespace().next(), Some("1,234,567"));
    }

    #[test]
    fn test_find_by_class_matches_whole_class_tokens() {
        let html = r#"<div class="mr-30">no</div><span class="d-block text-muted">yes</span>"#;
        assert!(find_by_class(html, None, "mr-3").is_none());
        assert_eq!(find_by_class(html, None, "d-block").unwrap().text(), "yes");
    }

    #[test]
    fn test_find_by_class_respects_tag_filter() {
        let html = r#"<span class="mr-3">span</span><div class="mr-3">div</div>"#;
        assert_eq!(find_by_class(html, Some("div"), "mr-3").unwrap().text(), "div");
        assert_eq!(find_by_class(html, None, "mr-3").unwrap().text(), "span");
    }

    #[test]
    fn test_nested_same_tag_closes_at_matching_depth() {
        let html = r#"<div class="outer"><div>a</div><div>b</div>c</div><div>after</div>"#;
        let el = find_by_class(html, Some("div"), "outer").unwrap();
        assert_eq!(el.text(), "abc");
    }

    #[test]
    fn test_child_texts_count_whitespace_runs() {
        let el = find_by_class(TOKEN_PAGE, Some("div"), "col-6").unwrap();
        let children = el.child_texts();
        assert_eq!(children[0], "\n");
        assert_eq!(children[1], "Price");
        assert_eq!(children[2], "\n");
        assert_eq!(children[3], "$0.0832 @ 0.000041 Eth (+4.21%)");
        assert_eq!(children[5], "");
    }

    #[test]
    fn test_child_texts_count_comments() {
        let html = "<div class=\"col-6\">a<!--c--><h6>P</h6>\n<span>$1 @ 2 Eth x (+1%)</span></div>";
        let el = find_by_class(html, Some("div"), "col-6").unwrap();
        assert_eq!(
            el.child_texts(),
            vec!["a", "c", "P", "\n", "$1 @ 2 Eth x (+1%)"]
        );
    }

    #[test]
    fn test_buttons_in_document_order() {
        let labels = texts_of_tag(TOKEN_PAGE, "button");
        assert_eq!(labels, vec!["Overview", "Contract", "$ 2,345,678.90"]);
    }

    #[test]
    fn test_void_tags_do_not_swallow_siblings() {
        let html = r#"<div class="x"><img src="a.png"><input value=1>text</div><p>p</p>"#;
        let el = find_by_class(html, None, "x").unwrap();
        assert_eq!(el.text(), "text");
        assert_eq!(el.child_texts(), vec!["", "", "text"]);
    }

    #[test]
    fn test_quoted_gt_inside_attribute() {
        let html = r#"<div title="a > b" class="mr-3">42 addresses</div>"#;
        assert_eq!(find_by_class(html, None, "mr-3").unwrap().text(), "42 addresses");
    }

    #[test]
    fn test_unquoted_and_single_quoted_attributes() {
        let html = "<div class=mr-3 id='h'>7</div>";
        let el = find_by_class(html, None, "mr-3").unwrap();
        assert_eq!(el.attr("id"), Some("h"));
    }

    #[test]
    fn test_stray_lt_is_text() {
        let html = "<div class=\"v\">a < b</div>";
        assert_eq!(find_by_class(html, None, "v").unwrap().text(), "a < b");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("$1&nbsp;000 &amp; co"), "$1\u{a0}000 & co");
        assert_eq!(decode_entities("&#36;5 &#x24;6"), "$5 $6");
        assert_eq!(decode_entities("AT&T &bogus;"), "AT&T &bogus;");
    }

    #[test]
    fn test_unclosed_element_runs_to_end() {
        let html = r#"<div class="mr-3">99 addresses"#;
        assert_eq!(find_by_class(html, None, "mr-3").unwrap().text(), "99 addresses");
    }
}
