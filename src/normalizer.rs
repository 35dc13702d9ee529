use crate::reader::{RawElementSet, RawPixelBuffer};

use dicom_dictionary_std::tags;
use image::{GrayImage, ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2, Zip};
use std::path::Path;

/// Display window (center/width) applied before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub center: f64,
    pub width: f64,
}

impl Window {
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    /// The file's own window, if both center and width are present. Only the
    /// first of several stored windows is used.
    pub fn from_elements(elements: &RawElementSet) -> Option<Self> {
        let center = elements.first_float(tags::WINDOW_CENTER)?;
        let width = elements.first_float(tags::WINDOW_WIDTH)?;
        Some(Self::new(center, width))
    }

    /// `(low, high)` with the half width floored.
    pub fn bounds(&self) -> (f64, f64) {
        let half = (self.width / 2.0).floor();
        (self.center - half, self.center + half)
    }
}

/// An 8-bit single channel image derived from one [`RawPixelBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    data: Array2<u8>,
}

impl NormalizedImage {
    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn to_image(&self) -> Option<GrayImage> {
        let (height, width) = self.data.dim();
        ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
            width as u32,
            height as u32,
            self.data.iter().copied().collect(),
        )
    }

    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        let Some(image) = self.to_image() else {
            return Err(image::ImageError::Parameter(
                image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                ),
            ));
        };
        image.save(path)
    }
}

pub struct IntensityNormalizer;

impl IntensityNormalizer {
    /// Map `buffer` onto `0..=255`.
    ///
    /// The buffer is clipped to the window first, if one is given; then its
    /// observed minimum maps to 0 and its maximum to 255. A buffer without
    /// dynamic range maps to all zeros.
    pub fn normalize(buffer: &RawPixelBuffer, window: Option<Window>) -> NormalizedImage {
        let mut values = buffer.data().mapv(f64::from);

        if let Some(window) = window {
            let (low, high) = window.bounds();
            values.par_mapv_inplace(|v| v.max(low).min(high));
        }

        let data = match Self::min_max(&values.view()) {
            Some((min, max)) if max > min => Self::rescale(&values.view(), min, max),
            _ => Array2::zeros(values.dim()),
        };

        NormalizedImage { data }
    }

    fn min_max(values: &ArrayView2<'_, f64>) -> Option<(f64, f64)> {
        values.iter().copied().fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
    }

    fn rescale(values: &ArrayView2<'_, f64>, min: f64, max: f64) -> Array2<u8> {
        let range = max - min;
        Zip::from(values).par_map_collect(|&v| Self::to_u8((v - min) / range))
    }

    #[inline]
    fn to_u8(scaled: f64) -> u8 {
        (scaled * 255.0).round().clamp(0.0, 255.0) as u8
    }
}
