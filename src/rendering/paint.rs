/// Paint commands for one exported notebook page, in unscaled CSS pixels.
/// Commands are painted in order; later commands cover earlier ones.

use crate::rendering::layout::{LayoutRow, LineKind, PageLayout};
use crate::rendering::ruling::{
    RuleGeometry, RulingStyle, HOLE_COLOR, HOLE_RADIUS_PX, MARGIN_COLOR, RULE_COLOR,
};

/// Handwriting ink.
pub const INK_COLOR: (u8, u8, u8, u8) = (0x1f, 0x2f, 0x6b, 0xff);
/// Titles are drawn a little darker.
pub const TITLE_INK_COLOR: (u8, u8, u8, u8) = (0x10, 0x1a, 0x45, 0xff);

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: (u8, u8, u8, u8),
    },
    Circle {
        cx: i32,
        cy: i32,
        radius: u32,
        rgba: (u8, u8, u8, u8),
    },
    /// A glyph box: the ink stroke standing in for one character
    Glyph {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: (u8, u8, u8, u8),
    },
}

/// Vertical jitter for the `char-N` variation classes, in pixels.
fn variant_offset(variant: u8) -> i32 {
    match variant {
        1 => 0,
        2 => -1,
        3 => 1,
        4 => -2,
        5 => 1,
        _ => 0,
    }
}

fn glyph_height(ch: char, kind: LineKind) -> u32 {
    let base = if kind == LineKind::Title { 16 } else { 12 };
    if ch.is_uppercase() || ch.is_ascii_digit() {
        base + 3
    } else if ch.is_alphanumeric() {
        base
    } else {
        // punctuation is a short stroke
        3
    }
}

fn paint_row(row: &LayoutRow, out: &mut Vec<PaintCommand>) {
    let ink = if row.kind == LineKind::Title {
        TITLE_INK_COLOR
    } else {
        INK_COLOR
    };
    // the rule under this row sits at the bottom edge of the row box
    let baseline = row.rect.y + row.rect.height as i32 - 3;
    let stroke_w = row.char_width.saturating_sub(2).max(1);

    for (i, g) in row.glyphs.iter().enumerate() {
        if g.ch.is_whitespace() {
            continue;
        }
        let h = glyph_height(g.ch, row.kind);
        let x = row.rect.x + (i as u32 * row.char_width) as i32 + 1;
        let y = baseline - h as i32 + variant_offset(g.variant);
        out.push(PaintCommand::Glyph {
            x,
            y,
            width: stroke_w,
            height: h,
            rgba: ink,
        });
    }

    if row.kind == LineKind::Section {
        // underline section titles just above the rule
        let len = row.glyphs.len() as u32 * row.char_width;
        out.push(PaintCommand::SolidRect {
            x: row.rect.x,
            y: baseline + 1,
            width: len,
            height: 1,
            rgba: ink,
        });
    }
}

/// Build the display list: background, rules, left decoration, then text.
pub fn build_display_list(
    layout: &PageLayout,
    ruling: &RuleGeometry,
    style: RulingStyle,
    width: u32,
    height: u32,
    background: (u8, u8, u8, u8),
) -> Vec<PaintCommand> {
    let mut cmds = vec![PaintCommand::SolidRect {
        x: 0,
        y: 0,
        width,
        height,
        rgba: background,
    }];

    for y in &ruling.lines {
        cmds.push(PaintCommand::SolidRect {
            x: 0,
            y: *y as i32,
            width,
            height: 1,
            rgba: RULE_COLOR,
        });
    }

    match style {
        RulingStyle::MarginLine => cmds.push(PaintCommand::SolidRect {
            x: ruling.margin_x as i32,
            y: 0,
            width: 1,
            height,
            rgba: MARGIN_COLOR,
        }),
        RulingStyle::HolePunches => {
            for (cx, cy) in ruling.hole_centers() {
                cmds.push(PaintCommand::Circle {
                    cx: cx as i32,
                    cy: cy as i32,
                    radius: HOLE_RADIUS_PX,
                    rgba: HOLE_COLOR,
                });
            }
        }
    }

    for row in &layout.rows {
        paint_row(row, &mut cmds);
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::{layout_markup, PageMetrics};
    use crate::rendering::ruling::compute_ruling;

    #[test]
    fn display_list_starts_with_background() {
        let layout = layout_markup("Oi", PageMetrics::default());
        let ruling = compute_ruling(Some(600.0), 25);
        let cmds = build_display_list(&layout, &ruling, RulingStyle::MarginLine, 794, 600, (255, 255, 255, 255));
        match &cmds[0] {
            PaintCommand::SolidRect { width, height, rgba, .. } => {
                assert_eq!((*width, *height), (794, 600));
                assert_eq!(*rgba, (255, 255, 255, 255));
            }
            other => panic!("unexpected first command {:?}", other),
        }
        let glyphs = cmds.iter().filter(|c| matches!(c, PaintCommand::Glyph { .. })).count();
        assert_eq!(glyphs, 2);
    }

    #[test]
    fn hole_style_replaces_margin_line() {
        let layout = layout_markup("", PageMetrics::default());
        let ruling = compute_ruling(Some(100.0), 25);
        let cmds = build_display_list(&layout, &ruling, RulingStyle::HolePunches, 794, 100, (255, 255, 255, 255));
        assert!(cmds.iter().any(|c| matches!(c, PaintCommand::Circle { .. })));
        assert!(!cmds
            .iter()
            .any(|c| matches!(c, PaintCommand::SolidRect { rgba, .. } if *rgba == MARGIN_COLOR)));
    }
}
