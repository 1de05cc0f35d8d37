/// Headless text layout for notebook markup.
///
/// The transform service answers with inline HTML: one `<span class="char-N">`
/// per alphanumeric character, `title` / `section-title` / `bullet` spans
/// around whole lines, and `\n` between lines. This module turns that markup
/// into rows of glyph boxes sitting on the ruled lines and reports the
/// content height, which is what the capture pipeline measures.

use scraper::{ElementRef, Html, Node};

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Box metrics of the notebook page in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub width: u32,
    pub padding_left: u32,
    pub padding_right: u32,
    pub padding_top: u32,
    pub padding_bottom: u32,
    /// Equal to the ruling pitch so every row sits on a rule
    pub line_height: u32,
    pub char_width: u32,
    pub title_char_width: u32,
}

impl Default for PageMetrics {
    fn default() -> Self {
        Self {
            width: 794,
            padding_left: 60,
            padding_right: 24,
            padding_top: 25,
            padding_bottom: 25,
            line_height: 25,
            char_width: 10,
            title_char_width: 13,
        }
    }
}

impl PageMetrics {
    pub fn content_width(&self) -> u32 {
        self.width
            .saturating_sub(self.padding_left + self.padding_right)
    }

    fn char_width_for(&self, kind: LineKind) -> u32 {
        match kind {
            LineKind::Title => self.title_char_width.max(1),
            _ => self.char_width.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineKind {
    Title,
    Section,
    Bullet,
    #[default]
    Body,
}

/// One character and the handwriting variation class it was tagged with
/// (`char-1` .. `char-5`; 0 when untagged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub variant: u8,
}

impl Glyph {
    fn plain(ch: char) -> Self {
        Glyph { ch, variant: 0 }
    }
}

/// A logical line before wrapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLine {
    pub kind: LineKind,
    pub glyphs: Vec<Glyph>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    fn is_blank(&self) -> bool {
        self.glyphs.iter().all(|g| g.ch.is_whitespace())
    }
}

/// A wrapped row placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow {
    pub rect: Rect,
    pub kind: LineKind,
    pub glyphs: Vec<Glyph>,
    pub char_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub rows: Vec<LayoutRow>,
    /// Height of the laid-out content including vertical padding
    pub content_height: u32,
}

#[derive(Default)]
struct LineCollector {
    lines: Vec<TextLine>,
    current: TextLine,
}

impl LineCollector {
    fn push_char(&mut self, ch: char, kind: Option<LineKind>, variant: u8) {
        if ch == '\n' {
            self.break_line();
            return;
        }
        if ch == '\r' {
            return;
        }
        if let Some(k) = kind {
            if self.current.kind == LineKind::Body {
                self.current.kind = k;
            }
        }
        self.current.glyphs.push(Glyph { ch, variant });
    }

    fn break_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        self.lines.push(line);
    }

    /// Block boundary: only breaks when something is pending.
    fn soft_break(&mut self) {
        if !self.current.glyphs.is_empty() {
            self.break_line();
        }
    }

    fn finish(mut self) -> Vec<TextLine> {
        self.soft_break();
        while self.lines.last().map(|l| l.is_blank()).unwrap_or(false) {
            self.lines.pop();
        }
        while self.lines.first().map(|l| l.is_blank()).unwrap_or(false) {
            self.lines.remove(0);
        }
        self.lines
    }
}

fn class_kind(el: &scraper::node::Element) -> Option<LineKind> {
    el.classes().find_map(|c| match c {
        "title" => Some(LineKind::Title),
        "section-title" => Some(LineKind::Section),
        "bullet" => Some(LineKind::Bullet),
        _ => None,
    })
}

fn class_variant(el: &scraper::node::Element) -> Option<u8> {
    el.classes().find_map(|c| {
        c.strip_prefix("char-")
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=5).contains(n))
    })
}

fn walk(el: ElementRef<'_>, kind: Option<LineKind>, variant: u8, out: &mut LineCollector) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => {
                for ch in t.chars() {
                    out.push_char(ch, kind, variant);
                }
            }
            Node::Element(e) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = e.name();
                let block = matches!(name, "p" | "div" | "li" | "h1" | "h2" | "h3");
                if name == "br" {
                    out.break_line();
                    continue;
                }
                if block {
                    out.soft_break();
                }
                let child_kind = class_kind(e)
                    .or(match name {
                        "h1" => Some(LineKind::Title),
                        "h2" | "h3" => Some(LineKind::Section),
                        "li" => Some(LineKind::Bullet),
                        _ => None,
                    })
                    .or(kind);
                let child_variant = class_variant(e).unwrap_or(variant);
                walk(child_ref, child_kind, child_variant, out);
                if block {
                    out.soft_break();
                }
            }
            _ => {}
        }
    }
}

/// Split markup into logical lines, keeping span classes.
pub fn parse_markup(markup: &str) -> Vec<TextLine> {
    let fragment = Html::parse_fragment(markup);
    let mut collector = LineCollector::default();
    walk(fragment.root_element(), None, 0, &mut collector);
    collector.finish()
}

fn wrap_line(line: &TextLine, max_chars: usize) -> Vec<Vec<Glyph>> {
    let mut glyphs = line.glyphs.clone();
    if line.kind == LineKind::Bullet {
        let body: Vec<Glyph> = glyphs
            .into_iter()
            .skip_while(|g| g.ch.is_whitespace())
            .collect();
        glyphs = vec![Glyph::plain('•'), Glyph::plain(' ')];
        glyphs.extend(body);
    }
    if line.is_blank() {
        return vec![Vec::new()];
    }

    let max_chars = max_chars.max(1);
    let mut rows = Vec::new();
    let mut cur: Vec<Glyph> = Vec::new();
    // words keep their trailing whitespace glyphs attached
    let mut word: Vec<Glyph> = Vec::new();
    let flush_word = |word: &mut Vec<Glyph>, cur: &mut Vec<Glyph>, rows: &mut Vec<Vec<Glyph>>| {
        let visible = word.iter().filter(|g| !g.ch.is_whitespace()).count();
        if !cur.is_empty() && cur.len() + visible > max_chars {
            while cur.last().map(|g| g.ch.is_whitespace()).unwrap_or(false) {
                cur.pop();
            }
            rows.push(std::mem::take(cur));
        }
        for g in word.drain(..) {
            if cur.len() == max_chars {
                rows.push(std::mem::take(cur));
                if g.ch.is_whitespace() {
                    continue;
                }
            }
            cur.push(g);
        }
    };

    for g in glyphs {
        let trailing_space = word.last().map(|w| w.ch.is_whitespace()).unwrap_or(false);
        if trailing_space && !g.ch.is_whitespace() {
            flush_word(&mut word, &mut cur, &mut rows);
        }
        word.push(g);
    }
    flush_word(&mut word, &mut cur, &mut rows);
    while cur.last().map(|g| g.ch.is_whitespace()).unwrap_or(false) {
        cur.pop();
    }
    if !cur.is_empty() {
        rows.push(cur);
    }
    if rows.is_empty() {
        rows.push(Vec::new());
    }
    rows
}

/// Lay out `markup` on a page with the given metrics.
pub fn layout_markup(markup: &str, metrics: PageMetrics) -> PageLayout {
    let lines = parse_markup(markup);
    let content_w = metrics.content_width();
    let mut y = metrics.padding_top;
    let mut rows = Vec::new();

    for line in &lines {
        let cw = metrics.char_width_for(line.kind);
        let max_chars = (content_w / cw) as usize;
        for glyphs in wrap_line(line, max_chars) {
            rows.push(LayoutRow {
                rect: Rect {
                    x: metrics.padding_left as i32,
                    y: y as i32,
                    width: content_w,
                    height: metrics.line_height,
                },
                kind: line.kind,
                glyphs,
                char_width: cw,
            });
            y += metrics.line_height;
        }
    }

    PageLayout {
        rows,
        content_height: y + metrics.padding_bottom,
    }
}
