//! Text measurement used by collision sizing and label placement.

use web_sys::CanvasRenderingContext2d;

/// Width and height of a single line of text at a given font size.
pub trait TextMeasure {
	fn measure(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// Deterministic estimate for when no drawing surface is available.
#[derive(Clone, Copy, Debug)]
pub struct EstimatedTextMeasure {
	/// Average glyph advance as a fraction of the font size.
	pub char_width: f64,
	/// Line box height as a fraction of the font size.
	pub line_height: f64,
}

impl Default for EstimatedTextMeasure {
	fn default() -> Self {
		Self {
			char_width: 0.58,
			line_height: 1.2,
		}
	}
}

impl TextMeasure for EstimatedTextMeasure {
	fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
		let chars = text.chars().count() as f64;
		(chars * font_size * self.char_width, font_size * self.line_height)
	}
}

/// Measures with a 2D canvas context. Text is measured at a large reference
/// size and scaled, so tiny view-box font sizes are not quantised.
pub struct CanvasTextMeasure {
	ctx: CanvasRenderingContext2d,
	family: String,
}

const REFERENCE_SIZE: f64 = 100.0;

impl CanvasTextMeasure {
	pub fn new(ctx: CanvasRenderingContext2d, family: &str) -> Self {
		Self {
			ctx,
			family: family.to_string(),
		}
	}
}

impl TextMeasure for CanvasTextMeasure {
	fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
		self.ctx.save();
		self.ctx.set_font(&format!("{REFERENCE_SIZE}px {}", self.family));
		let width = self
			.ctx
			.measure_text(text)
			.map(|m| m.width())
			.unwrap_or_else(|_| text.chars().count() as f64 * REFERENCE_SIZE * 0.58);
		self.ctx.restore();
		(width * font_size / REFERENCE_SIZE, font_size * 1.2)
	}
}

/// Longest prefix of `text` (plus an ellipsis) that fits in `max_width`.
///
/// Returns `None` when not even one character fits.
pub fn truncate_to_width(text: &str, max_width: f64, font_size: f64, measure: &dyn TextMeasure) -> Option<String> {
	if measure.measure(text, font_size).0 <= max_width {
		return Some(text.to_string());
	}
	let chars: Vec<char> = text.chars().collect();
	for len in (1..chars.len()).rev() {
		let candidate: String = chars[..len].iter().collect::<String>().trim_end().to_string() + "…";
		if measure.measure(&candidate, font_size).0 <= max_width {
			return Some(candidate);
		}
	}
	None
}
