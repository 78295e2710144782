//! Presentation sinks for conversation output.
//!
//! A sink receives titled blocks of text and shows them somewhere. Sinks never
//! report failures back to the conversation; anything that can fail (writing a
//! file, say) happens after the run.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

/// Something that can show a titled block of text.
pub trait DisplaySink {
    fn display(&mut self, title: &str, content: &str);
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    fn display(&mut self, title: &str, content: &str) {
        (**self).display(title, content)
    }
}

/// Sends every block to each of two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: DisplaySink, B: DisplaySink> DisplaySink for Tee<A, B> {
    fn display(&mut self, title: &str, content: &str) {
        self.0.display(title, content);
        self.1.display(title, content);
    }
}

/// Prints blocks to stdout, titles highlighted.
#[cfg(feature = "cli")]
#[derive(Debug, Default)]
pub struct TerminalSink;

#[cfg(feature = "cli")]
impl TerminalSink {
    /// Error blocks in red, everything else in cyan.
    fn highlight(title: &str) -> colored::ColoredString {
        use colored::Colorize;

        if title == crate::conversation::ERROR_TITLE {
            title.bright_red().bold()
        } else {
            title.bright_cyan().bold()
        }
    }
}

#[cfg(feature = "cli")]
impl DisplaySink for TerminalSink {
    fn display(&mut self, title: &str, content: &str) {
        use colored::Colorize;

        println!("{}", Self::highlight(title));
        println!("{content}");
        println!("{}", "─".repeat(50).bright_black());
    }
}

/// A content block kept by [`HtmlPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub title: String,
    pub content: String,
}

/// Collects blocks and renders them as a standalone HTML page.
#[derive(Debug, Clone, Default)]
pub struct HtmlPage {
    title: String,
    blocks: Vec<Block>,
}

impl HtmlPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Renders the full document.
    pub fn render(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>{}</title>", escape_html(&self.title));
        html.push_str(STYLE);
        html.push_str("</head>\n<body>\n");
        for block in &self.blocks {
            let _ = writeln!(
                html,
                "<div class=\"content-block\">\n<h3>{}</h3>\n<pre><code>{}</code></pre>\n</div>",
                escape_html(&block.title),
                escape_html(&block.content)
            );
        }
        html.push_str("</body>\n</html>\n");
        html
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.render())
    }
}

impl DisplaySink for HtmlPage {
    fn display(&mut self, title: &str, content: &str) {
        self.blocks.push(Block {
            title: title.to_string(),
            content: content.to_string(),
        });
    }
}

const STYLE: &str = "<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
.content-block { border: 1px solid #ddd; border-radius: 6px; padding: 0 1rem; margin-bottom: 1rem; }
pre { white-space: pre-wrap; }
</style>
";

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "cli")]
    #[test]
    fn terminal_highlights_the_error_title() {
        use crate::conversation::{ASSISTANT_TITLE, ERROR_TITLE};
        use colored::Color;

        assert_eq!(
            TerminalSink::highlight(ERROR_TITLE).fgcolor(),
            Some(Color::BrightRed)
        );
        assert_eq!(
            TerminalSink::highlight(ASSISTANT_TITLE).fgcolor(),
            Some(Color::BrightCyan)
        );
    }

    #[test]
    fn html_blocks_are_escaped_and_ordered() {
        let mut page = HtmlPage::new("Chia");
        page.display("You:", "<b>hai</b>");
        page.display("AI (Chia):", "[\"ok\" & 'fine']");

        let html = page.render();
        let first = html.find("You:").unwrap();
        let second = html.find("AI (Chia):").unwrap();
        assert!(first < second);
        assert!(html.contains("<pre><code>&lt;b&gt;hai&lt;/b&gt;</code></pre>"));
        assert!(html.contains("[&quot;ok&quot; &amp; &#39;fine&#39;]"));
        assert_eq!(html.matches("class=\"content-block\"").count(), 2);
    }

    #[test]
    fn emoji_pass_through_untouched() {
        assert_eq!(escape_html("Haii ❤️😊"), "Haii ❤️😊");
    }

    #[test]
    fn tee_feeds_both_sinks() {
        let mut a = HtmlPage::default();
        let mut b = HtmlPage::default();
        {
            let mut tee = Tee(&mut a, &mut b);
            tee.display("t", "c");
        }
        assert_eq!(a.blocks(), b.blocks());
        assert_eq!(a.blocks().len(), 1);
    }

    #[test]
    fn write_to_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chia.html");
        let mut page = HtmlPage::new("Chia");
        page.display("Error", "boom");
        page.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<h3>Error</h3>"));
    }
}
