use crate::support::parallel::FloatGrid;

/// Entries in the built-in lookup tables.
const TABLE_SIZE: usize = 256;

/// Lower bound of a logarithmic scale whose observed minimum is not
/// positive, relative to its maximum.
const LOG_FLOOR: f32 = 1e-6;

const OPAQUE: u32 = 0xFF00_0000;

/// Lookup table from normalised values in `[0, 1]` to RGB colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMap {
    name: String,
    table: Vec<[u8; 3]>,
}

impl ColorMap {
    /// Samples `f` at `size` evenly spaced points of `[0, 1]`.
    ///
    /// `f` returns channel intensities in `[0, 1]`; values outside are
    /// clamped. A `size` below 2 is raised to 2.
    pub fn from_fn(name: impl Into<String>, size: usize, f: impl Fn(f64) -> [f64; 3]) -> Self {
        let size = size.max(2);
        #[allow(clippy::cast_precision_loss)]
        let last = (size - 1) as f64;
        let table = (0..size)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / last;
                f(t).map(to_channel)
            })
            .collect();
        Self {
            name: name.into(),
            table,
        }
    }

    /// Black to white.
    #[must_use]
    pub fn gray() -> Self {
        Self::from_fn("gray", TABLE_SIZE, |t| [t, t, t])
    }

    /// Black through red and yellow to white.
    #[must_use]
    pub fn heat() -> Self {
        Self::from_fn("heat", TABLE_SIZE, |t| {
            [3.0 * t, 3.0 * t - 1.0, 3.0 * t - 2.0]
        })
    }

    /// Blue through cyan, yellow and red.
    #[must_use]
    pub fn rainbow() -> Self {
        Self::from_fn("rainbow", TABLE_SIZE, |t| {
            let four_t = 4.0 * t;
            [
                1.5 - (four_t - 3.0).abs(),
                1.5 - (four_t - 2.0).abs(),
                1.5 - (four_t - 1.0).abs(),
            ]
        })
    }

    /// Built-in table by name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "gray" => Some(Self::gray()),
            "heat" => Some(Self::heat()),
            "rainbow" => Some(Self::rainbow()),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Opaque ARGB color of a normalised value.
    ///
    /// `t` is clamped to `[0, 1]`; `NaN` maps to the first entry.
    #[must_use]
    pub fn argb(&self, t: f32) -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let index = (t.clamp(0.0, 1.0) * (self.table.len() - 1) as f32).round() as usize;
        let [r, g, b] = self.table[index.min(self.table.len() - 1)];
        OPAQUE | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::gray()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(intensity: f64) -> u8 {
    (intensity.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// How values are spread over a color map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScale {
    #[default]
    Linear,

    /// Logarithmic; falls back to linear when the maximum is not positive.
    Logarithmic,
}

impl ColorScale {
    /// Maps `value` into `[0, 1]` over `[min, max]`.
    ///
    /// A degenerate range maps everything to the middle of the table.
    #[must_use]
    pub fn normalize(self, value: f32, min: f32, max: f32) -> f32 {
        match self {
            Self::Linear => linear(value, min, max),
            Self::Logarithmic if max > 0.0 => {
                let floor = if min > 0.0 { min } else { max * LOG_FLOOR };
                linear(value.max(floor).ln(), floor.ln(), max.ln())
            }
            Self::Logarithmic => linear(value, min, max),
        }
    }
}

fn linear(value: f32, min: f32, max: f32) -> f32 {
    if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Row-major buffer of opaque ARGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Colors every cell of `values` over `[min, max]`.
    #[must_use]
    pub fn render(values: &FloatGrid, map: &ColorMap, scale: ColorScale, min: f32, max: f32) -> Self {
        let pixels = values
            .values()
            .iter()
            .map(|&value| map.argb(scale.normalize(value, min, max)))
            .collect();
        Self {
            width: values.width(),
            height: values.height(),
            pixels,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn pixel(&self, col: usize, row: usize) -> u32 {
        self.pixels[row * self.width + col]
    }

    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}
