// channels.rs — Channel transforms feeding the feature pyramid.
//
// A channel maps some input (RGB planes, a grayscale image, color-opponent
// planes) to a single f32 plane of the same size:
//
//   Intensity    RgbPlanes      → luma
//   RedGreen     OpponentPlanes → |R - G|
//   BlueYellow   OpponentPlanes → |B - Y|
//   GaborFilter  Image<f32>     → oriented Gabor response
//
// The `Channel` trait is the seam `features::extract_features` is generic
// over. Closures returning `Result<Image<f32>, SaliencyError>` implement
// it too, so ad-hoc channels don't need a named type.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convert::{rgb_to_grayscale, RgbPlanes};
use crate::convolution::{correlate_2d, Border};
use crate::error::SaliencyError;
use crate::image::Image;

/// Largest Gabor kernel side accepted by `GaborFilter::new`.
pub const MAX_GABOR_SIZE: usize = 31;

/// An image → image transform applied before pyramid construction.
pub trait Channel<I: ?Sized> {
    fn apply(&self, input: &I) -> Result<Image<f32>, SaliencyError>;
}

impl<I: ?Sized, F> Channel<I> for F
where
    F: Fn(&I) -> Result<Image<f32>, SaliencyError>,
{
    fn apply(&self, input: &I) -> Result<Image<f32>, SaliencyError> {
        self(input)
    }
}

// ============================================================
// Intensity
// ============================================================

/// Grayscale intensity of a color frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Intensity;

impl Channel<RgbPlanes> for Intensity {
    fn apply(&self, input: &RgbPlanes) -> Result<Image<f32>, SaliencyError> {
        Ok(intensity(input))
    }
}

/// Grayscale intensity of a color frame, same spatial size.
pub fn intensity(rgb: &RgbPlanes) -> Image<f32> {
    rgb_to_grayscale(rgb)
}

// ============================================================
// Color opponency
// ============================================================

/// Four non-negative color-opponent planes (Itti et al. 1998).
#[derive(Clone, Debug, PartialEq)]
pub struct OpponentPlanes {
    pub red: Image<f32>,
    pub green: Image<f32>,
    pub blue: Image<f32>,
    pub yellow: Image<f32>,
}

impl OpponentPlanes {
    /// Build opponent planes from RGB.
    ///
    /// Each raw plane is first zeroed wherever it does not exceed
    /// `max(intensity) / threshold_ratio`, suppressing hue noise in dark
    /// regions. Then
    ///
    /// ```text
    /// R = r - (g + b) / 2
    /// G = g - (r + b) / 2
    /// B = b - (g + r) / 2
    /// Y = (r + g) / 2 - |r - g| / 2 - b
    /// ```
    ///
    /// each floored at zero. A frame darker than the threshold everywhere
    /// yields all-zero planes.
    pub fn from_rgb(rgb: &RgbPlanes, threshold_ratio: f32) -> Result<Self, SaliencyError> {
        if !(threshold_ratio > 0.0) || !threshold_ratio.is_finite() {
            return Err(SaliencyError::config(format!(
                "color threshold ratio must be positive, got {threshold_ratio}"
            )));
        }
        let max_intensity = intensity(rgb).max_value().unwrap_or(0.0);
        let threshold = max_intensity / threshold_ratio;
        debug!(threshold, "color opponency threshold");

        // THRESH_TOZERO on private copies: keep v only if v > threshold.
        let cut = |v: f32| if v > threshold { v } else { 0.0 };
        let r = rgb.r.map(cut);
        let g = rgb.g.map(cut);
        let b = rgb.b.map(cut);

        let (w, h) = rgb.dimensions();
        let mut red = Image::new(w, h);
        let mut green = Image::new(w, h);
        let mut blue = Image::new(w, h);
        let mut yellow = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let (rv, gv, bv) = (r.get(x, y), g.get(x, y), b.get(x, y));
                red.set(x, y, (rv - (gv + bv) / 2.0).max(0.0));
                green.set(x, y, (gv - (rv + bv) / 2.0).max(0.0));
                blue.set(x, y, (bv - (gv + rv) / 2.0).max(0.0));
                yellow.set(x, y, ((rv + gv) / 2.0 - (rv - gv).abs() / 2.0 - bv).max(0.0));
            }
        }
        Ok(OpponentPlanes { red, green, blue, yellow })
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        self.red.dimensions()
    }

    /// `|R - G|`.
    pub fn red_green(&self) -> Result<Image<f32>, SaliencyError> {
        self.red.absdiff(&self.green)
    }

    /// `|B - Y|`.
    pub fn blue_yellow(&self) -> Result<Image<f32>, SaliencyError> {
        self.blue.absdiff(&self.yellow)
    }
}

/// Red-green opponency sub-channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedGreen;

impl Channel<OpponentPlanes> for RedGreen {
    fn apply(&self, input: &OpponentPlanes) -> Result<Image<f32>, SaliencyError> {
        input.red_green()
    }
}

/// Blue-yellow opponency sub-channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueYellow;

impl Channel<OpponentPlanes> for BlueYellow {
    fn apply(&self, input: &OpponentPlanes) -> Result<Image<f32>, SaliencyError> {
        input.blue_yellow()
    }
}

// ============================================================
// Gabor orientation
// ============================================================

/// Parameters of one Gabor kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaborParams {
    /// Kernel width in pixels.
    pub width: usize,
    /// Kernel height in pixels.
    pub height: usize,
    /// Wavelength of the cosine carrier.
    pub lambda: f32,
    /// Orientation in radians.
    pub theta: f32,
    /// Phase offset in radians.
    pub psi: f32,
    /// Envelope parameter.
    pub sigma: f32,
    /// Spatial aspect ratio.
    pub gamma: f32,
}

impl Default for GaborParams {
    fn default() -> Self {
        GaborParams {
            width: 10,
            height: 10,
            lambda: 2.5,
            theta: 0.0,
            psi: PI / 2.0,
            sigma: 2.5,
            gamma: 0.5,
        }
    }
}

impl GaborParams {
    /// Same parameters, different orientation.
    pub fn with_theta(self, theta: f32) -> Self {
        GaborParams { theta, ..self }
    }

    pub(crate) fn validate(&self) -> Result<(), SaliencyError> {
        if self.width == 0 || self.height == 0 {
            return Err(SaliencyError::config("gabor kernel dimensions must be non-zero"));
        }
        if self.width > MAX_GABOR_SIZE || self.height > MAX_GABOR_SIZE {
            return Err(SaliencyError::config(format!(
                "gabor kernel {}x{} exceeds {MAX_GABOR_SIZE}x{MAX_GABOR_SIZE}",
                self.width, self.height
            )));
        }
        if !(self.lambda > 0.0) || !self.lambda.is_finite() {
            return Err(SaliencyError::config(format!("gabor lambda must be positive, got {}", self.lambda)));
        }
        if !self.sigma.is_finite() || !self.gamma.is_finite() || !self.theta.is_finite() || !self.psi.is_finite() {
            return Err(SaliencyError::config("gabor parameters must be finite"));
        }
        Ok(())
    }
}

/// A Gabor filter with its kernel sampled once at construction.
#[derive(Debug, Clone)]
pub struct GaborFilter {
    params: GaborParams,
    kernel: Image<f32>,
}

impl GaborFilter {
    pub fn new(params: GaborParams) -> Result<Self, SaliencyError> {
        params.validate()?;
        Ok(GaborFilter {
            kernel: gabor_kernel(&params),
            params,
        })
    }

    pub fn params(&self) -> &GaborParams {
        &self.params
    }

    pub fn kernel(&self) -> &Image<f32> {
        &self.kernel
    }

    /// Filter a grayscale image; output has the input's size. Borders are
    /// mirrored without repeating the edge pixel.
    pub fn filter(&self, image: &Image<f32>) -> Image<f32> {
        correlate_2d(image, &self.kernel, Border::Reflect101)
    }
}

impl Channel<Image<f32>> for GaborFilter {
    fn apply(&self, input: &Image<f32>) -> Result<Image<f32>, SaliencyError> {
        Ok(self.filter(input))
    }
}

/// Sample the Gabor function on a `height × width` grid.
///
/// Row `r`, column `c` holds `g(half_h - r, half_w - c)` with
///
/// ```text
/// x' =  i cos θ + j sin θ
/// y' = -i sin θ + j cos θ
/// g(i, j) = exp(-(x'^2 + γ^2 y'^2) / 2 * σ^2) * cos(2π x' / λ + ψ)
/// ```
///
/// The envelope is `/ 2 * σ^2` as written (divide by two, then multiply),
/// so larger σ narrows it.
pub fn gabor_kernel(p: &GaborParams) -> Image<f32> {
    let half_h = p.height as f32 / 2.0;
    let half_w = p.width as f32 / 2.0;
    let (sin_t, cos_t) = p.theta.sin_cos();
    Image::from_fn(p.width, p.height, |c, r| {
        let i = half_h - r as f32;
        let j = half_w - c as f32;
        let xp = i * cos_t + j * sin_t;
        let yp = -i * sin_t + j * cos_t;
        let envelope = (-(xp * xp + p.gamma * p.gamma * yp * yp) / 2.0 * p.sigma * p.sigma).exp();
        envelope * (2.0 * PI * xp / p.lambda + p.psi).cos()
    })
}
