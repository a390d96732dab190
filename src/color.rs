//! Length buckets and readable text colors for train bars.

use crate::config::ColorConfig;
use crate::model::{ColorMode, Train};
use std::fmt;

/// Luminance assumed for colors that cannot be parsed.
pub const NEUTRAL_LUMINANCE: f64 = 0.5;

/// WCAG AA contrast for normal text.
pub const MIN_CONTRAST: f64 = 4.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    B1,
    B2,
    B3,
    B4,
    B5,
}

impl Bucket {
    const ALL: [Bucket; 5] = [Bucket::B1, Bucket::B2, Bucket::B3, Bucket::B4, Bucket::B5];

    /// 1-based label number.
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl Default for Bucket {
    fn default() -> Self {
        Bucket::B3
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.number())
    }
}

/// Bucket whose reference value is closest to `value`. The first reference
/// wins on equal distance. Anything but exactly five references gives `B3`.
pub fn nearest_bucket(value: f64, canonical: &[f64]) -> Bucket {
    if canonical.len() != Bucket::ALL.len() {
        return Bucket::default();
    }
    let mut nearest = 0;
    let mut nearest_dist = f64::INFINITY;
    for (i, reference) in canonical.iter().enumerate() {
        let dist = (value - reference).abs();
        if dist < nearest_dist {
            nearest_dist = dist;
            nearest = i;
        }
    }
    Bucket::ALL[nearest]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parses `rgb(r, g, b)`, `rgba(r, g, b, a)`, `#rgb` and `#rrggbb`.
pub fn parse_color(s: &str) -> Option<Rgb> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let args = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut channels = args.split(',').map(|c| c.trim().parse::<u8>());
    let r = channels.next()?.ok()?;
    let g = channels.next()?.ok()?;
    let b = channels.next()?.ok()?;
    Some(Rgb { r, g, b })
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let doubled = hex.chars().flat_map(|c| [c, c]).collect::<String>();
            parse_hex(&doubled)
        }
        6 => Some(Rgb {
            r: channel(&hex[0..2])?,
            g: channel(&hex[2..4])?,
            b: channel(&hex[4..6])?,
        }),
        _ => None,
    }
}

fn linear(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn luminance(rgb: Rgb) -> f64 {
    0.2126 * linear(rgb.r) + 0.7152 * linear(rgb.g) + 0.0722 * linear(rgb.b)
}

pub fn relative_luminance(color: &str) -> f64 {
    parse_color(color).map(luminance).unwrap_or(NEUTRAL_LUMINANCE)
}

pub fn contrast_ratio(l1: f64, l2: f64) -> f64 {
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColor {
    White,
    Black,
}

impl TextColor {
    pub fn hex(self) -> &'static str {
        match self {
            TextColor::White => "#ffffff",
            TextColor::Black => "#000000",
        }
    }
}

pub fn text_color_for_luminance(effective: f64) -> TextColor {
    let white = contrast_ratio(effective, 1.0);
    let black = contrast_ratio(effective, 0.0);
    if white >= MIN_CONTRAST || (white > black && black < MIN_CONTRAST) {
        TextColor::White
    } else {
        TextColor::Black
    }
}

/// Text color for a bar, judged against the darker of its fill and border.
pub fn text_color_for(background: &str, border: &str) -> TextColor {
    let effective = relative_luminance(background).min(relative_luminance(border));
    text_color_for_luminance(effective)
}

fn short_hex(hex: &str) -> Option<Rgb> {
    // only the two hex forms, rgb() is not accepted here
    hex.strip_prefix('#').and_then(parse_hex)
}

fn to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

pub fn darken(hex: &str, percent: f64) -> String {
    match short_hex(hex) {
        Some(rgb) => {
            let f = |c: u8| (c as f64 * (100.0 - percent) / 100.0).floor().clamp(0.0, 255.0) as u8;
            to_hex(Rgb { r: f(rgb.r), g: f(rgb.g), b: f(rgb.b) })
        }
        None => "#000000".to_string(),
    }
}

pub fn lighten(hex: &str, percent: f64) -> String {
    match short_hex(hex) {
        Some(rgb) => {
            let f = |c: u8| {
                (c as f64 + (255.0 - c as f64) * percent / 100.0)
                    .floor()
                    .clamp(0.0, 255.0) as u8
            };
            to_hex(Rgb { r: f(rgb.r), g: f(rgb.g), b: f(rgb.b) })
        }
        None => "#ffffff".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainStyle {
    pub bucket: Bucket,
    pub background: String,
    pub border: String,
    pub text: TextColor,
}

pub fn style_for(train: &Train, config: &ColorConfig) -> TrainStyle {
    let bucket = nearest_bucket(train.length, &config.canonical_lengths);
    let background = match train.color_mode.unwrap_or(config.mode) {
        ColorMode::Single => config.single_color.clone(),
        ColorMode::Length => config
            .bucket_colors
            .get(bucket.index())
            .cloned()
            .unwrap_or_else(|| config.single_color.clone()),
    };
    let border = darken(&background, config.border_darken_percent);
    let text = text_color_for(&background, &border);
    TrainStyle {
        bucket,
        background,
        border,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::train;

    #[test]
    fn nearest_bucket_picks_closest() {
        let canonical = [10.0, 20.0, 30.0, 40.0, 50.0];
        let bucket = nearest_bucket(37.0, &canonical);
        assert_eq!(bucket, Bucket::B4);
        assert_eq!(bucket.to_string(), "b4");
        assert_eq!(nearest_bucket(-100.0, &canonical), Bucket::B1);
        assert_eq!(nearest_bucket(1000.0, &canonical), Bucket::B5);
    }

    #[test]
    fn nearest_bucket_ties_and_order() {
        // 15 is equally far from 10 and 20
        assert_eq!(nearest_bucket(15.0, &[10.0, 20.0, 30.0, 40.0, 50.0]), Bucket::B1);
        // references need not be sorted
        assert_eq!(nearest_bucket(49.0, &[50.0, 10.0, 20.0, 30.0, 40.0]), Bucket::B1);
        assert_eq!(nearest_bucket(75.0, &[50.0, 75.0, 80.0, 107.0, 135.0]), Bucket::B2);
    }

    #[test]
    fn nearest_bucket_wrong_length_is_middle() {
        assert_eq!(nearest_bucket(37.0, &[10.0, 20.0, 30.0, 40.0]), Bucket::B3);
        assert_eq!(nearest_bucket(37.0, &[]), Bucket::B3);
        assert_eq!(nearest_bucket(1.0, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), Bucket::B3);
    }

    #[test]
    fn parses_supported_forms() {
        let red = Rgb { r: 255, g: 0, b: 0 };
        assert_eq!(parse_color("#ff0000"), Some(red));
        assert_eq!(parse_color("#F00"), Some(red));
        assert_eq!(parse_color("rgb(255, 0, 0)"), Some(red));
        assert_eq!(parse_color("rgba(255,0,0,0.5)"), Some(red));
        assert_eq!(parse_color("transparent"), None);
        assert_eq!(parse_color("#ff00"), None);
        assert_eq!(parse_color("#gg0000"), None);
        assert_eq!(parse_color("rgb(300, 0, 0)"), None);
        assert_eq!(parse_color("hsl(0, 100%, 50%)"), None);
    }

    #[test]
    fn unparseable_is_neutral() {
        assert_eq!(relative_luminance("nonsense"), NEUTRAL_LUMINANCE);
        assert_eq!(text_color_for("nonsense", "nonsense"), TextColor::Black);
    }

    #[test]
    fn contrast_extremes() {
        assert!((contrast_ratio(1.0, 0.0) - 21.0).abs() < 1e-9);
        assert_eq!(text_color_for("#000000", "#000"), TextColor::White);
        assert_eq!(text_color_for("#ffffff", "#fff"), TextColor::Black);

        // near-black always gets white text, near-white always black
        for l in [0.0, 0.001, 0.0031] {
            assert_eq!(text_color_for_luminance(l), TextColor::White);
        }
        for l in [0.9, 0.95, 1.0] {
            assert_eq!(text_color_for_luminance(l), TextColor::Black);
        }
    }

    #[test]
    fn darker_of_fill_and_border_decides() {
        // a white fill with a black border is judged as black
        assert_eq!(text_color_for("#ffffff", "#000000"), TextColor::White);
    }

    #[test]
    fn darken_and_lighten() {
        assert_eq!(darken("#ffffff", 50.0), "#7f7f7f");
        assert_eq!(lighten("#000000", 50.0), "#7f7f7f");
        assert_eq!(darken("#fff", 0.0), "#ffffff");
        assert_eq!(darken("rgb(1,2,3)", 10.0), "#000000");
        assert_eq!(lighten("bad", 10.0), "#ffffff");
    }

    #[test]
    fn style_follows_color_mode() {
        let config = ColorConfig::default();
        let mut t = train(1, None, 0, 60);
        t.length = 130.0;
        let style = style_for(&t, &config);
        assert_eq!(style.bucket, Bucket::B5);
        assert_eq!(style.background, config.bucket_colors[4]);
        assert_eq!(style.text, TextColor::White);

        t.color_mode = Some(ColorMode::Single);
        let style = style_for(&t, &config);
        assert_eq!(style.background, config.single_color);
        assert_eq!(style.border, darken(&config.single_color, config.border_darken_percent));
    }
}
