//! Markdown to Steam BBCode.
//!
//! Release notes on GitHub are GitHub-flavoured markdown; Steam event
//! bodies take BBCode. Parsing goes through pulldown-cmark and each event
//! maps onto the matching Steam tag:
//!
//! | Markdown | BBCode |
//! |----------|--------|
//! | `# h` .. `### h` (deeper levels clamp to 3) | `[h1]` .. `[h3]` |
//! | `**b**`, `*i*`, `~~s~~` | `[b]`, `[i]`, `[strike]` |
//! | `[t](u)` | `[url=u]t[/url]` |
//! | `![a](u)` | `[img]u[/img]` |
//! | `- x` / `1. x` | `[list]` / `[olist]` with `[*]` items |
//! | fenced code | `[code]` |
//! | `---` | `[hr][/hr]` |
//! | tables | `[table]`, `[tr]`, `[th]`, `[td]` |
//!
//! Raw HTML is dropped.

use pulldown_cmark::{Event, Options, Parser as MdParser, Tag, TagEnd};

/// Render markdown as Steam BBCode.
pub fn markdown_to_bbcode(markdown: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = MdParser::new_ext(markdown, options);

    let mut out = String::new();
    // One entry per open list: true when ordered.
    let mut lists: Vec<bool> = Vec::new();
    let mut in_image = false;
    let mut in_table_head = false;

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    ensure_newline(&mut out);
                    out.push_str(&format!("[h{}]", heading_level(level as u8)));
                }
                Tag::Strong => out.push_str("[b]"),
                Tag::Emphasis => out.push_str("[i]"),
                Tag::Strikethrough => out.push_str("[strike]"),
                Tag::Link { dest_url, .. } => out.push_str(&format!("[url={}]", dest_url)),
                Tag::Image { dest_url, .. } => {
                    out.push_str(&format!("[img]{}[/img]", dest_url));
                    in_image = true;
                }
                Tag::List(start) => {
                    ensure_newline(&mut out);
                    let ordered = start.is_some();
                    out.push_str(if ordered { "[olist]\n" } else { "[list]\n" });
                    lists.push(ordered);
                }
                Tag::Item => out.push_str("[*]"),
                Tag::CodeBlock(_) => {
                    ensure_newline(&mut out);
                    out.push_str("[code]");
                }
                Tag::Table(_) => {
                    ensure_newline(&mut out);
                    out.push_str("[table]\n");
                }
                Tag::TableHead => {
                    in_table_head = true;
                    out.push_str("[tr]");
                }
                Tag::TableRow => out.push_str("[tr]"),
                Tag::TableCell => out.push_str(if in_table_head { "[th]" } else { "[td]" }),
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(level) => {
                    out.push_str(&format!("[/h{}]\n", heading_level(level as u8)));
                }
                TagEnd::Paragraph => {
                    out.push('\n');
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                TagEnd::Strong => out.push_str("[/b]"),
                TagEnd::Emphasis => out.push_str("[/i]"),
                TagEnd::Strikethrough => out.push_str("[/strike]"),
                TagEnd::Link => out.push_str("[/url]"),
                TagEnd::Image => in_image = false,
                TagEnd::Item => ensure_newline(&mut out),
                TagEnd::List(_) => {
                    ensure_newline(&mut out);
                    let ordered = lists.pop().unwrap_or(false);
                    out.push_str(if ordered { "[/olist]\n" } else { "[/list]\n" });
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                TagEnd::CodeBlock => {
                    ensure_newline(&mut out);
                    out.push_str("[/code]\n\n");
                }
                TagEnd::Table => out.push_str("[/table]\n\n"),
                TagEnd::TableHead => {
                    in_table_head = false;
                    out.push_str("[/tr]\n");
                }
                TagEnd::TableRow => out.push_str("[/tr]\n"),
                TagEnd::TableCell => out.push_str(if in_table_head { "[/th]" } else { "[/td]" }),
                _ => {}
            },
            Event::Text(text) if !in_image => out.push_str(&text),
            Event::Code(code) => out.push_str(&code),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_newline(&mut out);
                out.push_str("[hr][/hr]\n\n");
            }
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Steam only styles h1 through h3.
fn heading_level(level: u8) -> u8 {
    level.clamp(1, 3)
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
