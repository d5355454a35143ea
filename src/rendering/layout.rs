/// Layout primitives for card templates

use crate::autofit::TextMeasure;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape {
    Square,
    Circle,
}

pub type Rgba = [u8; 4];

/// What a positioned node draws.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Fill {
        rgba: Rgba,
    },
    /// Lines are already wrapped; `font_px` is the final (autofit) size.
    Text {
        lines: Vec<String>,
        font_px: u32,
        line_height: f32,
        rgba: Rgba,
        align: Align,
    },
    /// `source` is a form image payload; `None` draws the empty placeholder.
    Image {
        source: Option<String>,
        shape: ImageShape,
        placeholder: Rgba,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub rect: Rect,
    pub kind: NodeKind,
}

impl LayoutNode {
    pub fn fill(rect: Rect, rgba: Rgba) -> Self {
        Self { rect, kind: NodeKind::Fill { rgba } }
    }

    pub fn text(rect: Rect, text: impl Into<String>, font_px: u32, rgba: Rgba, align: Align) -> Self {
        Self {
            rect,
            kind: NodeKind::Text {
                lines: vec![text.into()],
                font_px,
                line_height: 1.2,
                rgba,
                align,
            },
        }
    }

    pub fn paragraph(rect: Rect, lines: Vec<String>, font_px: u32, rgba: Rgba, align: Align) -> Self {
        Self {
            rect,
            kind: NodeKind::Text { lines, font_px, line_height: 1.4, rgba, align },
        }
    }

    pub fn image(rect: Rect, source: Option<&str>, shape: ImageShape, placeholder: Rgba) -> Self {
        Self {
            rect,
            kind: NodeKind::Image {
                source: source.map(str::to_string),
                shape,
                placeholder,
            },
        }
    }

    /// Text of a text node, lines joined with `\n`.
    pub fn text_content(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Text { lines, .. } => Some(lines.join("\n")),
            _ => None,
        }
    }
}

/// A laid-out card: the unit that gets mounted on the stage and captured.
#[derive(Debug, Clone, PartialEq)]
pub struct CardElement {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub background: Rgba,
    pub nodes: Vec<LayoutNode>,
}

/// Greedy word wrap against `max_width` at `px`, keeping at most `max_lines`.
///
/// The last kept line ends in "..." when text was dropped.
pub fn wrap_lines(
    text: &str,
    px: f32,
    max_width: f32,
    max_lines: usize,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut truncated = false;

    for word in text.split_whitespace() {
        let candidate = if cur.is_empty() { word.to_string() } else { format!("{} {}", cur, word) };
        if cur.is_empty() || measure.width(&candidate, px) <= max_width {
            cur = candidate;
            continue;
        }
        lines.push(std::mem::replace(&mut cur, word.to_string()));
        if lines.len() == max_lines {
            truncated = true;
            break;
        }
    }
    if !truncated && !cur.is_empty() {
        lines.push(cur);
    }
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        truncated = true;
    }

    if truncated {
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && measure.width(&format!("{}...", last), px) > max_width {
                match last.rsplit_once(' ') {
                    Some((head, _)) => *last = head.to_string(),
                    None => {
                        last.pop();
                    }
                }
            }
            last.push_str("...");
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofit::AdvanceTable;

    fn mono() -> AdvanceTable {
        // every letter 1em wide, spaces too
        let mut t = AdvanceTable::new().with_advance(' ', 1.0);
        for c in 'a'..='z' {
            t = t.with_advance(c, 1.0);
        }
        t.with_advance('.', 1.0)
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_lines("aaa bbb ccc", 1.0, 7.0, 5, &mono());
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn wrap_truncates_with_ellipsis() {
        let lines = wrap_lines("aaa bbb ccc ddd eee", 1.0, 7.0, 2, &mono());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "aaa bbb");
        assert!(lines[1].ends_with("..."));
        assert!(mono().width(&lines[1], 1.0) <= 7.0);
    }

    #[test]
    fn wrap_of_blank_text_is_empty() {
        assert!(wrap_lines("   ", 1.0, 10.0, 3, &mono()).is_empty());
    }

    #[test]
    fn overlong_single_word_stays_on_its_line() {
        let lines = wrap_lines("abcdefghijkl", 1.0, 5.0, 3, &mono());
        assert_eq!(lines, vec!["abcdefghijkl"]);
    }
}
