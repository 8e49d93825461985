// convolution.rs — Filtering primitives for the saliency pipeline.
//
//   Border          how samples outside the image are fetched
//   correlate_2d()  dense kernel, used by the Gabor orientation channel
//   reduce_rows()   horizontal 1D filter evaluated at even columns only
//   reduce_cols()   vertical 1D filter evaluated at even rows only
//
// reduce_rows + reduce_cols with `BINOMIAL_5` is one pyramid step: blur
// with [1 4 6 4 1]/16 in both directions and keep every other sample,
// producing ((w+1)/2, (h+1)/2). Filtering only the kept samples halves the
// work of each pass compared to blurring the full image first.

use crate::image::{Image, Pixel};

/// 5-tap binomial approximation of a Gaussian with σ ≈ 1.
pub const BINOMIAL_5: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Out-of-range sample policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// `aaa|abcd|ddd`
    Replicate,
    /// `dcb|abcd|cba`, the edge pixel is not repeated.
    Reflect101,
}

impl Border {
    /// Map a possibly out-of-range coordinate into `[0, len)`.
    ///
    /// # Panics
    /// Panics if `len == 0`.
    pub fn index(self, i: isize, len: usize) -> usize {
        assert!(len > 0, "cannot sample an empty axis");
        if i >= 0 && (i as usize) < len {
            return i as usize;
        }
        match self {
            Border::Replicate => i.clamp(0, len as isize - 1) as usize,
            Border::Reflect101 => {
                if len == 1 {
                    return 0;
                }
                let period = 2 * (len as isize - 1);
                let m = i.rem_euclid(period);
                if m >= len as isize {
                    (period - m) as usize
                } else {
                    m as usize
                }
            }
        }
    }
}

/// Dense 2D correlation of `src` with `kernel` (no kernel flip).
///
/// The anchor sits at `(kernel.width() / 2, kernel.height() / 2)`, so
/// even-sized kernels are allowed and lean one pixel toward the top-left,
/// matching the usual filter2D convention. Output has the size of `src`.
///
/// # Panics
/// Panics if the kernel is empty.
pub fn correlate_2d<T: Pixel>(src: &Image<T>, kernel: &Image<f32>, border: Border) -> Image<f32> {
    assert!(!kernel.is_empty(), "kernel must not be empty");

    let w = src.width();
    let h = src.height();
    let kw = kernel.width();
    let kh = kernel.height();
    let ax = kw / 2;
    let ay = kh / 2;
    let mut dst = Image::<f32>::new(w, h);
    if w == 0 || h == 0 {
        return dst;
    }

    for y in 0..h {
        for x in 0..w {
            // Interior pixels skip the border lookup entirely.
            let interior = x >= ax && y >= ay && x + (kw - ax) <= w && y + (kh - ay) <= h;
            let mut acc = 0.0f32;
            for ky in 0..kh {
                let row = kernel.row(ky);
                if interior {
                    let sy = y + ky - ay;
                    for (kx, &kv) in row.iter().enumerate() {
                        // SAFETY: interior check keeps sx in [0, w) and sy in [0, h).
                        acc += unsafe { src.get_unchecked(x + kx - ax, sy) }.to_f32() * kv;
                    }
                } else {
                    let sy = border.index((y + ky) as isize - ay as isize, h);
                    for (kx, &kv) in row.iter().enumerate() {
                        let sx = border.index((x + kx) as isize - ax as isize, w);
                        acc += src.get(sx, sy).to_f32() * kv;
                    }
                }
            }
            // SAFETY: x < w, y < h.
            unsafe { dst.set_unchecked(x, y, acc) };
        }
    }
    dst
}

/// Filter each row with the centered odd-length `kernel`, keeping only even
/// columns. Output is `((w + 1) / 2, h)`.
///
/// # Panics
/// Panics if `kernel` has even length.
pub fn reduce_rows<T: Pixel>(src: &Image<T>, kernel: &[f32], border: Border) -> Image<f32> {
    assert!(kernel.len() % 2 == 1, "kernel length must be odd");
    let half = kernel.len() / 2;
    let w = src.width();
    let h = src.height();
    let out_w = w.div_ceil(2);
    let mut dst = Image::<f32>::new(out_w, h);

    for y in 0..h {
        let row = src.row(y);
        for ox in 0..out_w {
            let cx = 2 * ox;
            let mut acc = 0.0f32;
            if cx >= half && cx + half < w {
                for (k, &kv) in kernel.iter().enumerate() {
                    acc += row[cx + k - half].to_f32() * kv;
                }
            } else {
                for (k, &kv) in kernel.iter().enumerate() {
                    let sx = border.index((cx + k) as isize - half as isize, w);
                    acc += row[sx].to_f32() * kv;
                }
            }
            // SAFETY: ox < out_w, y < h.
            unsafe { dst.set_unchecked(ox, y, acc) };
        }
    }
    dst
}

/// Filter each column with the centered odd-length `kernel`, keeping only
/// even rows. Output is `(w, (h + 1) / 2)`.
///
/// # Panics
/// Panics if `kernel` has even length.
pub fn reduce_cols(src: &Image<f32>, kernel: &[f32], border: Border) -> Image<f32> {
    assert!(kernel.len() % 2 == 1, "kernel length must be odd");
    let half = kernel.len() / 2;
    let w = src.width();
    let h = src.height();
    let out_h = h.div_ceil(2);
    let mut dst = Image::<f32>::new(w, out_h);
    let mut acc = vec![0.0f32; w];

    for oy in 0..out_h {
        acc.iter_mut().for_each(|a| *a = 0.0);
        for (k, &kv) in kernel.iter().enumerate() {
            let sy = border.index((2 * oy + k) as isize - half as isize, h);
            for (a, &v) in acc.iter_mut().zip(src.row(sy)) {
                *a += v * kv;
            }
        }
        for (x, &v) in acc.iter().enumerate() {
            // SAFETY: x < w, oy < out_h.
            unsafe { dst.set_unchecked(x, oy, v) };
        }
    }
    dst
}
