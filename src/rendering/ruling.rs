/// Ruled-page geometry: horizontal rules derived from measured content height
/// plus a fixed left-margin decoration.

/// Vertical distance between successive horizontal rules.
pub const DEFAULT_PITCH_PX: u32 = 25;
/// Height assumed when the page could not be measured.
pub const MIN_PAGE_HEIGHT_PX: u32 = 600;
/// Horizontal offset of the red margin rule.
pub const MARGIN_LINE_X: u32 = 45;
/// Left edge of the binder-hole column.
pub const HOLE_COLUMN_X: u32 = 15;
/// Width of the binder-hole column; holes are centred in it.
pub const HOLE_COLUMN_WIDTH: u32 = 8;
/// Vertical spacing between binder holes.
pub const HOLE_SPACING_PX: u32 = 40;
pub const HOLE_RADIUS_PX: u32 = 2;

pub const RULE_COLOR: (u8, u8, u8, u8) = (0x87, 0xce, 0xeb, 0xff);
pub const MARGIN_COLOR: (u8, u8, u8, u8) = (0xff, 0x6b, 0x6b, 0xff);
pub const HOLE_COLOR: (u8, u8, u8, u8) = (0xdd, 0xdd, 0xdd, 0xff);

/// Left-edge decoration drawn next to the horizontal rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RulingStyle {
    /// Single vertical red rule, as on school paper
    #[default]
    MarginLine,
    /// Column of binder holes
    HolePunches,
}

impl std::str::FromStr for RulingStyle {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "margin" | "margin-line" => Ok(RulingStyle::MarginLine),
            "holes" | "hole-punches" => Ok(RulingStyle::HolePunches),
            other => Err(crate::Error::Config(format!("unknown ruling style '{}'", other))),
        }
    }
}

/// Geometry for one ruled page. Never stored; recomputed per export.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGeometry {
    /// Vertical offset of each horizontal rule, top to bottom
    pub lines: Vec<u32>,
    /// Horizontal offset of the vertical margin rule
    pub margin_x: u32,
    pub pitch: u32,
    /// Height the rules were computed for (after the minimum-height fallback)
    pub height: u32,
}

impl RuleGeometry {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Centres of the binder holes covering the ruled height.
    pub fn hole_centers(&self) -> Vec<(u32, u32)> {
        let cx = HOLE_COLUMN_X + HOLE_COLUMN_WIDTH / 2;
        (0..)
            .map(|i| i * HOLE_SPACING_PX + HOLE_SPACING_PX / 2)
            .take_while(|y| *y < self.height)
            .map(|y| (cx, y))
            .collect()
    }
}

/// Compute rules covering `measured_height_px`.
///
/// `None`, zero, negative and non-finite heights all fall back to
/// [`MIN_PAGE_HEIGHT_PX`], so at least one page of rules is always produced.
/// A zero pitch is treated as [`DEFAULT_PITCH_PX`].
pub fn compute_ruling(measured_height_px: Option<f64>, pitch_px: u32) -> RuleGeometry {
    let pitch = if pitch_px == 0 { DEFAULT_PITCH_PX } else { pitch_px };
    let height = match measured_height_px {
        Some(h) if h.is_finite() && h > 0.0 => h,
        _ => MIN_PAGE_HEIGHT_PX as f64,
    };

    let count = (height / pitch as f64).ceil() as u32;
    // baseline-aligned: each rule sits one pixel short of the next pitch boundary
    let lines = (0..count).map(|i| i * pitch + (pitch - 1)).collect();

    RuleGeometry {
        lines,
        margin_x: MARGIN_LINE_X,
        pitch,
        height: height.ceil() as u32,
    }
}
