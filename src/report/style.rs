use plotters::style::{RGBColor, WHITE};

/// Visual settings shared by every chart of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    /// Series color for label 0 (market down).
    pub down: RGBColor,
    /// Series color for label 1 (market up).
    pub up: RGBColor,
    /// Single-series color (histogram, monthly means).
    pub accent: RGBColor,
    /// Color of reference lines (means, medians).
    pub reference: RGBColor,
    /// Fill of the statistics panel.
    pub panel: RGBColor,
    pub background: RGBColor,
    pub font_family: String,
    pub title_size: u32,
    pub label_size: u32,
    /// Canvas size in pixels.
    pub canvas: (u32, u32),
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            down: hex(0xE74C3C),
            up: hex(0x3498DB),
            accent: hex(0x9B59B6),
            reference: hex(0x27AE60),
            panel: hex(0xF5DEB3),
            background: WHITE,
            font_family: "sans-serif".to_string(),
            title_size: 24,
            label_size: 14,
            canvas: (1500, 600),
        }
    }
}

impl ChartStyle {
    pub fn with_label_colors(self, down: RGBColor, up: RGBColor) -> Self {
        Self { down, up, ..self }
    }

    pub fn with_accent(self, accent: RGBColor) -> Self {
        Self { accent, ..self }
    }

    pub fn with_background(self, background: RGBColor) -> Self {
        Self { background, ..self }
    }

    pub fn with_font_family(self, font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            ..self
        }
    }

    pub fn with_font_sizes(self, title_size: u32, label_size: u32) -> Self {
        Self {
            title_size,
            label_size,
            ..self
        }
    }

    pub fn with_canvas(self, width: u32, height: u32) -> Self {
        Self {
            canvas: (width, height),
            ..self
        }
    }

    /// Series color of `label`; anything but 0 uses the "up" color.
    pub fn label_color(&self, label: i32) -> RGBColor {
        if label == 0 { self.down } else { self.up }
    }

    pub(crate) fn title_font(&self) -> (&str, u32) {
        (self.font_family.as_str(), self.title_size)
    }

    pub(crate) fn label_font(&self) -> (&str, u32) {
        (self.font_family.as_str(), self.label_size)
    }
}

/// Builds a color from a `0xRRGGBB` literal.
pub const fn hex(rgb: u32) -> RGBColor {
    RGBColor((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Red-yellow-green diverging scale over `[0, 1]`, yellow at 0.5.
pub fn diverging_color(value: f64) -> RGBColor {
    const RED: (f64, f64, f64) = (215.0, 48.0, 39.0);
    const YELLOW: (f64, f64, f64) = (255.0, 255.0, 191.0);
    const GREEN: (f64, f64, f64) = (26.0, 152.0, 80.0);

    let t = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.5 };
    let (from, to, t) = if t < 0.5 {
        (RED, YELLOW, t / 0.5)
    } else {
        (YELLOW, GREEN, (t - 0.5) / 0.5)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;

    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(0xE74C3C), RGBColor(231, 76, 60));
        assert_eq!(hex(0x000000), RGBColor(0, 0, 0));
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(0.0), RGBColor(215, 48, 39));
        assert_eq!(diverging_color(0.5), RGBColor(255, 255, 191));
        assert_eq!(diverging_color(1.0), RGBColor(26, 152, 80));
        assert_eq!(diverging_color(2.0), diverging_color(1.0));
    }

    #[test]
    fn test_builders() {
        let style = ChartStyle::default().with_canvas(800, 400).with_font_sizes(20, 10);
        assert_eq!(style.canvas, (800, 400));
        assert_eq!(style.title_font(), ("sans-serif", 20));
        assert_eq!(style.label_color(0), style.down);
        assert_eq!(style.label_color(1), style.up);
    }
}
