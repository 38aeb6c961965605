//! Streaming HTML data extractor
//!
//! This module pulls structured data out of a page without building a DOM:
//! the html5ever tokenizer emits start tags, end tags and character data, and
//! a token sink folds them into:
//! - The page title
//! - Links with their anchor text
//! - Images with their alt text
//! - Meta tag key/value pairs
//! - `h1`-`h3` heading text
//! - Text fragments long enough to be worth previewing
//!
//! Malformed markup never aborts extraction. Tokenizer parse errors are
//! logged and skipped, and whatever was collected so far is kept.

use crate::state::{ImageRecord, DEFAULT_TITLE};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use std::collections::BTreeMap;

/// Text nodes must be longer than this (in characters, after trimming) to be kept
pub const MIN_TEXT_FRAGMENT_CHARS: usize = 10;

/// At most this many headings are kept per page
pub const MAX_HEADINGS: usize = 10;

/// A link as written in the markup, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub anchor_text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// Whitespace-collapsed title, or `"untitled"`
    pub title: String,

    /// Every `<a href>` in document order
    pub links: Vec<RawLink>,

    /// Every `<img src>` in document order
    pub images: Vec<ImageRecord>,

    /// `<meta>` name (or property) to content; last write wins
    pub meta_tags: BTreeMap<String, String>,

    /// Collapsed text of the first [`MAX_HEADINGS`] non-empty `h1`-`h3` elements
    pub headings: Vec<String>,

    /// Trimmed text nodes longer than [`MIN_TEXT_FRAGMENT_CHARS`]
    pub text_fragments: Vec<String>,
}

/// Token sink accumulating page data
#[derive(Debug, Default)]
struct PageDataSink {
    title: String,
    in_title: bool,
    links: Vec<RawLink>,
    open_link: Option<RawLink>,
    images: Vec<ImageRecord>,
    meta_tags: BTreeMap<String, String>,
    headings: Vec<String>,
    open_heading: Option<String>,
    text_fragments: Vec<String>,

    /// Depth of open `<script>`/`<style>` elements
    suppressed_depth: usize,

    /// Character data since the last non-text token
    pending_text: String,
}

impl PageDataSink {
    /// Routes the buffered text node to title, anchor text and fragments
    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);

        if self.suppressed_depth > 0 {
            return;
        }

        if self.in_title {
            push_collapsed(&mut self.title, &text);
        }

        if let Some(link) = self.open_link.as_mut() {
            push_collapsed(&mut link.anchor_text, &text);
        }

        if let Some(heading) = self.open_heading.as_mut() {
            push_collapsed(heading, &text);
        }

        let trimmed = text.trim();
        if trimmed.chars().count() > MIN_TEXT_FRAGMENT_CHARS {
            self.text_fragments.push(trimmed.to_string());
        }
    }

    fn handle_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        match tag.kind {
            TagKind::StartTag => self.handle_start_tag(tag),
            TagKind::EndTag => {
                self.handle_end_tag(&tag);
                TokenSinkResult::Continue
            }
        }
    }

    fn handle_start_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        match &*tag.name {
            "title" => {
                self.in_title = true;
                return TokenSinkResult::RawData(RawKind::Rcdata);
            }
            "script" => {
                self.suppressed_depth += 1;
                return TokenSinkResult::RawData(RawKind::ScriptData);
            }
            "style" => {
                self.suppressed_depth += 1;
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            "a" => {
                // Anchors do not nest; a new one closes the previous one.
                self.close_link();
                if let Some(href) = attr(&tag, "href") {
                    self.open_link = Some(RawLink {
                        href: href.to_string(),
                        anchor_text: String::new(),
                    });
                }
            }
            "h1" | "h2" | "h3" => {
                self.close_heading();
                self.open_heading = Some(String::new());
            }
            "img" => {
                if let Some(src) = attr(&tag, "src").filter(|s| !s.trim().is_empty()) {
                    self.images.push(ImageRecord {
                        src: src.trim().to_string(),
                        alt: attr(&tag, "alt").unwrap_or_default().trim().to_string(),
                    });
                }
            }
            "meta" => {
                let key = attr(&tag, "name")
                    .filter(|k| !k.is_empty())
                    .or_else(|| attr(&tag, "property"));
                let content = attr(&tag, "content");
                if let (Some(key), Some(content)) = (key, content) {
                    if !key.is_empty() && !content.is_empty() {
                        self.meta_tags.insert(key.to_string(), content.to_string());
                    }
                }
            }
            _ => {}
        }

        TokenSinkResult::Continue
    }

    fn handle_end_tag(&mut self, tag: &Tag) {
        match &*tag.name {
            "title" => self.in_title = false,
            "script" | "style" => {
                self.suppressed_depth = self.suppressed_depth.saturating_sub(1);
            }
            "a" => self.close_link(),
            "h1" | "h2" | "h3" => self.close_heading(),
            _ => {}
        }
    }

    fn close_heading(&mut self) {
        if let Some(heading) = self.open_heading.take() {
            if !heading.is_empty() && self.headings.len() < MAX_HEADINGS {
                self.headings.push(heading);
            }
        }
    }

    fn close_link(&mut self) {
        if let Some(link) = self.open_link.take() {
            self.links.push(link);
        }
    }

    fn finish(mut self) -> ParsedPage {
        self.flush_text();
        self.close_link();
        self.close_heading();

        let title = if self.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            self.title
        };

        ParsedPage {
            title,
            links: self.links,
            images: self.images,
            meta_tags: self.meta_tags,
            headings: self.headings,
            text_fragments: self.text_fragments,
        }
    }
}

impl TokenSink for PageDataSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => {
                self.pending_text.push_str(&text);
                TokenSinkResult::Continue
            }
            Token::NullCharacterToken => TokenSinkResult::Continue,
            Token::TagToken(tag) => {
                self.flush_text();
                self.handle_tag(tag)
            }
            Token::ParseError(message) => {
                tracing::trace!("Skipping malformed markup at line {}: {}", line_number, message);
                TokenSinkResult::Continue
            }
            Token::CommentToken(_) | Token::DoctypeToken(_) | Token::EOFToken => {
                self.flush_text();
                TokenSinkResult::Continue
            }
        }
    }
}

/// Returns the value of an attribute by local name
fn attr<'a>(tag: &'a Tag, name: &str) -> Option<&'a str> {
    tag.attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

/// Appends `text` to `target` with runs of whitespace collapsed to one space
fn push_collapsed(target: &mut String, text: &str) {
    for word in text.split_whitespace() {
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(word);
    }
}

/// Incremental extractor fed with chunks of decoded markup
///
/// # Example
///
/// ```
/// use sumi_trawl::crawler::PageDataExtractor;
///
/// let mut extractor = PageDataExtractor::new();
/// extractor.feed("<html><head><title>Hel");
/// extractor.feed("lo</title></head></html>");
/// assert_eq!(extractor.finish().title, "Hello");
/// ```
pub struct PageDataExtractor {
    tokenizer: Tokenizer<PageDataSink>,
    input: BufferQueue,
}

impl PageDataExtractor {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(PageDataSink::default(), TokenizerOpts::default()),
            input: BufferQueue::new(),
        }
    }

    /// Feeds the next chunk of markup
    pub fn feed(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.input.push_back(StrTendril::from_slice(chunk));
        // The sink never yields script handles, so feeding runs to completion.
        let _ = self.tokenizer.feed(&mut self.input);
    }

    /// Flushes the tokenizer and returns the extracted data
    pub fn finish(mut self) -> ParsedPage {
        self.tokenizer.end();
        self.tokenizer.sink.finish()
    }
}

impl Default for PageDataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts page data from a complete HTML document
///
/// # Example
///
/// ```
/// use sumi_trawl::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links[0].href, "/page");
/// assert_eq!(parsed.links[0].anchor_text, "Link");
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let mut extractor = PageDataExtractor::new();
    extractor.feed(html);
    extractor.finish()
}
