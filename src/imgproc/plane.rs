//! Single-channel real-valued image.

use super::ImageError;

/// A row-major `f32` matrix with fixed dimensions.
///
/// Every per-pixel field of the filter is a `Plane`; all planes that belong
/// to one stream share the same dimensions for the lifetime of the stream.
#[derive(Clone, PartialEq)]
pub struct Plane {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl Plane {
    /// Creates a plane with every element set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Creates a zero-filled plane.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Wraps an existing buffer, checking that its length matches.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyInput);
        }
        if data.len() != width * height {
            return Err(ImageError::BufferSize {
                expected: width * height,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds a plane by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the plane.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    /// Returns one row as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Overwrites this plane with the contents of `other`.
    ///
    /// Dimensions must already agree; the allocation is reused.
    pub fn copy_from(&mut self, other: &Plane) -> Result<(), ImageError> {
        self.ensure_same_size(other)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Fails with [`ImageError::DimensionMismatch`] unless both planes agree.
    pub fn ensure_same_size(&self, other: &Plane) -> Result<(), ImageError> {
        if self.dimensions() != other.dimensions() {
            return Err(ImageError::DimensionMismatch {
                expected: self.dimensions(),
                got: other.dimensions(),
            });
        }
        Ok(())
    }

    /// Arithmetic mean of all elements. Zero for an empty plane.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Returns true if no element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl std::fmt::Debug for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mean", &self.mean())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(matches!(
            Plane::from_vec(4, 4, vec![0.0; 15]),
            Err(ImageError::BufferSize {
                expected: 16,
                got: 15
            })
        ));
    }

    #[test]
    fn test_from_vec_rejects_empty() {
        assert!(matches!(
            Plane::from_vec(0, 4, Vec::new()),
            Err(ImageError::EmptyInput)
        ));
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let plane = Plane::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(plane.row(1), &[10.0, 11.0, 12.0]);
        assert_eq!(plane.get(2, 0), 2.0);
    }

    #[test]
    fn test_copy_from_checks_size() {
        let mut a = Plane::zeros(4, 4);
        let b = Plane::filled(4, 4, 3.0);
        a.copy_from(&b).unwrap();
        assert_eq!(a, b);

        let c = Plane::zeros(2, 2);
        assert!(a.copy_from(&c).is_err());
    }

    #[test]
    fn test_mean_and_finite() {
        let mut plane = Plane::from_fn(2, 2, |x, y| (x + y) as f32);
        assert!((plane.mean() - 1.0).abs() < 1e-6);
        assert!(plane.is_finite());

        plane.set(0, 0, f32::NAN);
        assert!(!plane.is_finite());
    }
}
