// ── Body rendering ──
//
// Markdown bodies become styled spans; plain bodies get web addresses
// turned into links. The summary line is the first line of the result.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::model::{BodyFormat, RichText, SUMMARY_MAX_CHARS, TextStyle};

#[allow(clippy::unwrap_used)]
static WEB_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:(?:https?|ftp)://[^\s<>"']+|www\.[^\s<>"']+|(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?:[/?#][^\s<>"']*)?)"#,
    )
    .unwrap()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Render the body according to its format. A blank body renders to `None`.
pub fn render_body(body: &str, format: BodyFormat) -> Option<RichText> {
    if body.trim().is_empty() {
        return None;
    }
    let text = match format {
        BodyFormat::Markdown => render_markdown(body),
        BodyFormat::Plain => autolink(body),
    };
    (!text.is_empty()).then_some(text)
}

/// First line of the rendered body, at most 160 characters.
pub fn summary_line(body: &RichText) -> Option<String> {
    let plain = body.plain_text();
    let first = plain.lines().next()?;
    Some(first.chars().take(SUMMARY_MAX_CHARS).collect())
}

/// Turn web addresses in plain text into link spans. Scheme-less matches
/// link to `https://`.
pub fn autolink(text: &str) -> RichText {
    let mut out = RichText::default();
    let plain = TextStyle::default();
    let mut cursor = 0;

    for m in WEB_ADDRESS.find_iter(text) {
        // Part of an e-mail address.
        if text[..m.start()].ends_with('@') {
            continue;
        }
        let matched = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if matched.is_empty() {
            continue;
        }
        let end = m.start() + matched.len();

        out.push(&text[cursor..m.start()], plain, None);
        let target = if matched.contains("://") {
            matched.to_string()
        } else {
            format!("https://{matched}")
        };
        out.push(matched, plain, Some(&target));
        cursor = end;
    }
    out.push(&text[cursor..], plain, None);
    out
}

#[derive(Default)]
struct MarkdownWriter {
    out: RichText,
    bold: u32,
    italic: u32,
    strike: u32,
    code_block: bool,
    links: Vec<String>,
    lists: Vec<Option<u64>>,
    after_marker: bool,
}

impl MarkdownWriter {
    fn style(&self, code: bool) -> TextStyle {
        TextStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            strikethrough: self.strike > 0,
            code: code || self.code_block,
        }
    }

    fn text(&mut self, text: &str, code: bool) {
        let style = self.style(code);
        let link = self.links.last().cloned();
        self.out.push(text, style, link.as_deref());
        self.after_marker = false;
    }

    fn newline(&mut self, count: usize) {
        let current = self.out.plain_text();
        if current.is_empty() {
            return;
        }
        let existing = current.len() - current.trim_end_matches('\n').len();
        for _ in existing..count {
            self.out.push("\n", TextStyle::default(), None);
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Strong | Tag::Heading { .. } => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { dest_url, .. } => self.links.push(dest_url.to_string()),
            Tag::CodeBlock(_) => {
                self.newline(2);
                self.code_block = true;
            }
            Tag::List(first) => {
                self.newline(1);
                self.lists.push(first);
            }
            Tag::Item => {
                self.newline(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.out.push(&marker, TextStyle::default(), None);
                self.after_marker = true;
            }
            // Loose list items wrap their text in a paragraph.
            Tag::Paragraph if self.after_marker => {}
            Tag::Paragraph | Tag::BlockQuote(_) => self.newline(2),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Heading(_) => {
                self.bold = self.bold.saturating_sub(1);
                self.newline(1);
            }
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => {
                self.links.pop();
            }
            TagEnd::CodeBlock => self.code_block = false,
            TagEnd::List(_) => {
                self.lists.pop();
            }
            _ => {}
        }
    }

    fn finish(self) -> RichText {
        let mut out = self.out;
        // Drop trailing line breaks.
        while let Some(last) = out.spans.last_mut() {
            let trimmed = last.text.trim_end_matches('\n').len();
            last.text.truncate(trimmed);
            if last.text.is_empty() {
                out.spans.pop();
            } else {
                break;
            }
        }
        out
    }
}

/// Render CommonMark (with strikethrough) to styled spans.
pub fn render_markdown(source: &str) -> RichText {
    let mut writer = MarkdownWriter::default();
    for event in Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(tag) => writer.start(tag),
            Event::End(tag) => writer.end(tag),
            Event::Text(text) => writer.text(&text, false),
            Event::Code(text) => writer.text(&text, true),
            Event::SoftBreak => writer.text(" ", false),
            Event::HardBreak => writer.text("\n", false),
            Event::Rule => writer.newline(2),
            Event::Html(html) | Event::InlineHtml(html) => writer.text(&html, false),
            _ => {}
        }
    }
    writer.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_body_renders_nothing() {
        assert!(render_body("", BodyFormat::Plain).is_none());
        assert!(render_body("   \n", BodyFormat::Markdown).is_none());
    }

    #[test]
    fn autolinks_schemed_and_bare_addresses() {
        let text = autolink("see http://x.test and www.example.org/docs, or hub.example.net.");
        let links: Vec<_> = text.links().collect();
        assert_eq!(
            links,
            vec!["http://x.test", "https://www.example.org/docs", "https://hub.example.net"]
        );
        assert_eq!(
            text.plain_text(),
            "see http://x.test and www.example.org/docs, or hub.example.net."
        );
    }

    #[test]
    fn autolink_skips_email_domains_and_numbers() {
        let text = autolink("mail ops@example.org about version 3.14");
        assert_eq!(text.links().count(), 0);
    }

    #[test]
    fn markdown_styles() {
        let text = render_markdown("**Leak** in *basement* ~~now~~ `pump-1`");
        assert_eq!(text.plain_text(), "Leak in basement now pump-1");
        assert!(text.spans[0].style.bold);
        assert_eq!(text.spans[0].text, "Leak");
        let italic = text.spans.iter().find(|s| s.text == "basement").unwrap();
        assert!(italic.style.italic);
        let struck = text.spans.iter().find(|s| s.text == "now").unwrap();
        assert!(struck.style.strikethrough);
        let code = text.spans.iter().find(|s| s.text == "pump-1").unwrap();
        assert!(code.style.code);
    }

    #[test]
    fn markdown_links_and_paragraphs() {
        let text = render_markdown("Open [dashboard](https://hub.test/lovelace)\n\nSecond paragraph");
        assert_eq!(text.plain_text(), "Open dashboard\n\nSecond paragraph");
        assert_eq!(text.links().collect::<Vec<_>>(), vec!["https://hub.test/lovelace"]);
    }

    #[test]
    fn markdown_lists() {
        let text = render_markdown("- one\n- two\n\n1. first\n2. second\n");
        assert_eq!(text.plain_text(), "• one\n• two\n1. first\n2. second");
    }

    #[test]
    fn summary_is_first_line_truncated() {
        let body = render_body("line one\nline two", BodyFormat::Plain).unwrap();
        assert_eq!(summary_line(&body).as_deref(), Some("line one"));

        let long = "y".repeat(400);
        let body = render_body(&long, BodyFormat::Plain).unwrap();
        assert_eq!(summary_line(&body).unwrap().chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn loose_list_items_stay_on_marker_line() {
        let text = render_markdown("- one\n\n- two\n");
        assert_eq!(text.plain_text(), "• one\n• two");
    }

    #[test]
    fn markdown_summary_uses_rendered_text() {
        let body = render_body("# Alarm\nDetails", BodyFormat::Markdown).unwrap();
        assert_eq!(summary_line(&body).as_deref(), Some("Alarm"));
    }
}
