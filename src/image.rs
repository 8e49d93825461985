// image.rs — Runtime-sized image container, generic over pixel type.
//
// Every stage of the saliency pipeline works on `Image<f32>`: channel
// transforms, pyramid levels, feature maps, conspicuity maps and the final
// saliency map. `Image<u8>` only appears at the edges (decoded frames and
// diagnostic output).
//
// Pixel-wise combinators (`absdiff`, `add`, `add_scaled`) check that both
// operands have identical dimensions and return `SaliencyError::ShapeMismatch`
// otherwise. Callers are expected to resize explicitly first.
//
// Layout: row-major, contiguous, no stride padding.
//
//   data index:  0  1  2  3  4  5  6  7  8  9 10 11
//   pixel:       ■  ■  ■  ■  ■  ■  ■  ■  ■  ■  ■  ■
//   row:         |-- row 0 --|  |-- row 1 --|  |-- row 2 --|

use std::fmt;

use crate::error::SaliencyError;

// ---------------------------------------------------------------------------
// Pixel Trait
// ---------------------------------------------------------------------------

/// Trait for types that can serve as pixel values in an Image.
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + 'static {
    /// Convert this pixel value to f32 (raw, not normalized).
    fn to_f32(self) -> f32;

    /// Construct a pixel from an f32 value (with appropriate clamping/rounding).
    fn from_f32(v: f32) -> Self;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        // Raw cast: 42u8 -> 42.0. Channel formulas operate on raw values.
        self as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, 255.0).round() as u8
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D image with runtime dimensions, generic over pixel type `T`.
pub struct Image<T: Pixel> {
    /// Pixel data in row-major order. Length = width * height.
    data: Vec<T>,
    width: usize,
    height: usize,
}

// Manual Clone: a deep copy of the pixel buffer.
impl<T: Pixel> Clone for Image<T> {
    fn clone(&self) -> Self {
        Image {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T: Pixel> PartialEq for Image<T> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.data == other.data
    }
}

impl<T: Pixel> Image<T> {
    // --- Constructors ---

    /// Create a zero-initialized image with the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            data: vec![T::default(); width * height],
            width,
            height,
        }
    }

    /// Create an image where every pixel holds `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing pixel vector in row-major order.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height }
    }

    /// Build an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image { data, width, height }
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// True if the image holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the pixel value at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Get pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height.
    /// Used in convolution inner loops where bounds are validated per row.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(
            x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        *self.data.get_unchecked(y * self.width + x)
    }

    /// Set pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height.
    #[inline(always)]
    pub unsafe fn set_unchecked(&mut self, x: usize, y: usize, value: T) {
        debug_assert!(x < self.width && y < self.height);
        *self.data.get_unchecked_mut(y * self.width + x) = value;
    }

    /// Get a mutable reference to the pixel at (x, y).
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        &mut self.data[idx]
    }

    /// Set the pixel at (x, y) to the given value.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    /// Borrow a single row as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Iterate over all pixels as `(x, y, value)` tuples.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let w = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % w, i / w, v))
    }

    /// Access the underlying data as a flat slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Apply `f` to every pixel, producing a new image of the same size.
    pub fn map<U: Pixel>(&self, f: impl Fn(T) -> U) -> Image<U> {
        Image {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Combine two same-sized images pixel by pixel.
    ///
    /// `op` names the operation in the error if the shapes differ.
    pub fn zip_map<U: Pixel>(
        &self,
        other: &Image<T>,
        op: &'static str,
        f: impl Fn(T, T) -> U,
    ) -> Result<Image<U>, SaliencyError> {
        ensure_same_shape(op, self.dimensions(), other.dimensions())?;
        Ok(Image {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        })
    }

    // --- Internal helpers ---

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

/// Fail with `ShapeMismatch` unless the two `(width, height)` pairs agree.
pub fn ensure_same_shape(
    op: &'static str,
    left: (usize, usize),
    right: (usize, usize),
) -> Result<(), SaliencyError> {
    if left != right {
        return Err(SaliencyError::ShapeMismatch { op, left, right });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// f32 map arithmetic
// ---------------------------------------------------------------------------

impl Image<f32> {
    /// Per-pixel `|self - other|`.
    pub fn absdiff(&self, other: &Image<f32>) -> Result<Image<f32>, SaliencyError> {
        self.zip_map(other, "absdiff", |a, b| (a - b).abs())
    }

    /// Per-pixel `self + other`.
    pub fn add(&self, other: &Image<f32>) -> Result<Image<f32>, SaliencyError> {
        self.zip_map(other, "add", |a, b| a + b)
    }

    /// Per-pixel `self + weight * other`.
    pub fn add_scaled(&self, other: &Image<f32>, weight: f32) -> Result<Image<f32>, SaliencyError> {
        self.zip_map(other, "add_scaled", |a, b| a + weight * b)
    }

    /// Multiply every pixel by `factor`.
    pub fn scale(&self, factor: f32) -> Image<f32> {
        self.map(|v| v * factor)
    }

    /// Largest pixel value, or `None` for an empty image.
    pub fn max_value(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::max)
    }

    /// Smallest pixel value, or `None` for an empty image.
    pub fn min_value(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::min)
    }

    /// Location `(x, y)` of the largest pixel. Ties resolve to the first
    /// pixel in row-major order. `None` for an empty image.
    pub fn argmax(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| (i % self.width, i / self.width))
    }

    /// Mean pixel value (0.0 for an empty image).
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}

// Debug formatting — useful for small images in tests.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(16) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 16 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Index / IndexMut — img[(x, y)] syntax
// ---------------------------------------------------------------------------

impl<T: Pixel> std::ops::Index<(usize, usize)> for Image<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.bounds_check(x, y);
        &self.data[y * self.width + x]
    }
}

impl<T: Pixel> std::ops::IndexMut<(usize, usize)> for Image<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        &mut self.data[idx]
    }
}

// ---------------------------------------------------------------------------
// Bilinear Interpolation
// ---------------------------------------------------------------------------

/// Bilinear interpolation for sub-pixel access on an f32 image.
///
/// Coordinates are clamped to the image, so edge pixels are replicated
/// when sampling outside. This is the sampling primitive behind
/// `resize::resize_bilinear`.
///
/// # Panics
/// Panics if the image is empty (width or height is 0).
pub fn interpolate_bilinear(img: &Image<f32>, x: f32, y: f32) -> f32 {
    assert!(img.width() > 0 && img.height() > 0, "cannot interpolate on an empty image");

    let max_x = (img.width() - 1) as f32;
    let max_y = (img.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);

    // SAFETY: x0, x1 < width and y0, y1 < height after clamping.
    unsafe {
        let p00 = img.get_unchecked(x0, y0);
        let p10 = img.get_unchecked(x1, y0);
        let p01 = img.get_unchecked(x0, y1);
        let p11 = img.get_unchecked(x1, y1);
        // Lerp form: equal neighbours reproduce their value exactly.
        let top = p00 + (p10 - p00) * fx;
        let bottom = p01 + (p11 - p01) * fx;
        top + (bottom - top) * fy
    }
}
