//! Standard paper sizes used for the PDF page and the matching viewport

use crate::{Error, Viewport};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// CSS pixels per inch, the resolution Chrome lays pages out at
pub const CSS_PX_PER_INCH: f64 = 96.0;

/// A named paper size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PaperFormat {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperFormat {
    pub const ALL: [PaperFormat; 6] = [
        PaperFormat::A3,
        PaperFormat::A4,
        PaperFormat::A5,
        PaperFormat::Letter,
        PaperFormat::Legal,
        PaperFormat::Tabloid,
    ];

    /// Portrait `(width, height)` in inches
    pub fn inches(self) -> (f64, f64) {
        match self {
            PaperFormat::A3 => (11.69, 16.54),
            PaperFormat::A4 => (8.27, 11.69),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
        }
    }

    /// `(width, height)` in inches for the given orientation
    pub fn oriented_inches(self, landscape: bool) -> (f64, f64) {
        let (w, h) = self.inches();
        if landscape {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// Viewport covering one page of this size at 96 CSS px/inch
    pub fn viewport(self, landscape: bool) -> Viewport {
        let (w, h) = self.oriented_inches(landscape);
        Viewport {
            width: (w * CSS_PX_PER_INCH).round() as u32,
            height: (h * CSS_PX_PER_INCH).round() as u32,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
            PaperFormat::Tabloid => "Tabloid",
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaperFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaperFormat::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown paper format '{}'", s)))
    }
}

/// Page margins in inches
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn uniform(inches: f64) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }

    pub fn is_zero(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .all(|m| *m == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_viewport_at_96_dpi() {
        let vp = PaperFormat::A4.viewport(false);
        assert_eq!(vp.width, 794);
        assert_eq!(vp.height, 1122);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let portrait = PaperFormat::Letter.viewport(false);
        let landscape = PaperFormat::Letter.viewport(true);
        assert_eq!(portrait.width, 816);
        assert_eq!(portrait.height, 1056);
        assert_eq!(landscape.width, portrait.height);
        assert_eq!(landscape.height, portrait.width);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("a4".parse::<PaperFormat>().unwrap(), PaperFormat::A4);
        assert_eq!(" LETTER ".parse::<PaperFormat>().unwrap(), PaperFormat::Letter);
        assert!("B5".parse::<PaperFormat>().is_err());
    }

    #[test]
    fn labels_parse_back() {
        for p in PaperFormat::ALL {
            assert_eq!(p.to_string().parse::<PaperFormat>().unwrap(), p);
        }
    }

    #[test]
    fn margins() {
        assert!(Margins::zero().is_zero());
        assert!(!Margins::uniform(0.5).is_zero());
    }
}
