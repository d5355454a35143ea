/// Paint command list for a card element

use crate::rendering::layout::{Align, CardElement, ImageShape, NodeKind, Rect, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    /// One line of text inside `width`; `y` is the top of the line box.
    Text {
        x: i32,
        y: i32,
        width: u32,
        font_px: f32,
        text: String,
        rgba: Rgba,
        align: Align,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        source: Option<String>,
        shape: ImageShape,
        placeholder: Rgba,
    },
}

/// Flatten an element into back-to-front paint commands (logical pixels).
pub fn paint_element(element: &CardElement) -> Vec<PaintCommand> {
    let mut cmds = vec![PaintCommand::SolidRect {
        x: 0,
        y: 0,
        width: element.width,
        height: element.height,
        rgba: element.background,
    }];

    for node in &element.nodes {
        let Rect { x, y, width, height } = node.rect;
        match &node.kind {
            NodeKind::Fill { rgba } => cmds.push(PaintCommand::SolidRect { x, y, width, height, rgba: *rgba }),
            NodeKind::Text { lines, font_px, line_height, rgba, align } => {
                let px = *font_px as f32;
                let step = px * line_height;
                // single lines are centered vertically in their box
                let top = if lines.len() == 1 {
                    y as f32 + (height as f32 - step).max(0.0) / 2.0
                } else {
                    y as f32
                };
                for (i, line) in lines.iter().enumerate() {
                    cmds.push(PaintCommand::Text {
                        x,
                        y: (top + i as f32 * step).round() as i32,
                        width,
                        font_px: px,
                        text: line.clone(),
                        rgba: *rgba,
                        align: *align,
                    });
                }
            }
            NodeKind::Image { source, shape, placeholder } => cmds.push(PaintCommand::Image {
                x,
                y,
                width,
                height,
                source: source.clone(),
                shape: *shape,
                placeholder: *placeholder,
            }),
        }
    }
    cmds
}
