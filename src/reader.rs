use crate::enums::PixelRepresentation;

use dicom::{
    core::{DataElement, PrimitiveValue, Tag, VR},
    object::{DefaultDicomObject, OpenFileOptions, WriteError},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Dicom {
        path: PathBuf,
        #[source]
        source: dicom::object::ReadError,
    },
}

#[derive(Debug, Error)]
pub enum PixelError {
    #[error("no pixel data in element set")]
    MissingPixelData,

    #[error("pixel data contains no frames")]
    NoFrames,

    #[error("decoded frame is {actual:?}, expected {expected:?} (rows, columns)")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("failed to decode pixel data: {0}")]
    Decode(#[from] dicom::pixeldata::Error),
}

/// Decodes single DICOM files into [`RawElementSet`]s.
pub struct ElementSetReader;

impl ElementSetReader {
    /// Read the file at `path`.
    ///
    /// With `with_pixels` unset, parsing stops in front of the Pixel Data
    /// element, which is all the classifier and the series summary need.
    pub fn read(path: &Path, with_pixels: bool) -> Result<RawElementSet, ReadError> {
        let options = OpenFileOptions::new();
        let options = if with_pixels {
            options
        } else {
            options.read_until(tags::PIXEL_DATA)
        };

        options
            .open_file(path)
            .map(RawElementSet::from_object)
            .map_err(|source| ReadError::Dicom {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// The decoded elements of one file.
#[derive(Debug, Clone)]
pub struct RawElementSet {
    object: DefaultDicomObject,
}

impl RawElementSet {
    pub fn from_object(object: DefaultDicomObject) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &DefaultDicomObject {
        &self.object
    }

    pub fn contains(&self, tag: Tag) -> bool {
        matches!(self.object.element_opt(tag), Ok(Some(_)))
    }

    /// Textual value of `tag`, trimmed. Multi-valued elements are joined with
    /// a backslash. Empty values count as absent.
    pub fn text(&self, tag: Tag) -> Option<String> {
        self.object
            .element_opt(tag)
            .ok()
            .flatten()
            .and_then(|element| element.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// First value of a numeric element, also for multi-valued ones.
    pub fn first_float(&self, tag: Tag) -> Option<f64> {
        self.object
            .element_opt(tag)
            .ok()
            .flatten()?
            .to_multi_float64()
            .ok()?
            .first()
            .copied()
    }

    pub fn u16(&self, tag: Tag) -> Option<u16> {
        self.object
            .element_opt(tag)
            .ok()
            .flatten()?
            .to_int::<u16>()
            .ok()
    }

    /// (rows, columns) from the image header, if both are present.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        self.u16(tags::ROWS).zip(self.u16(tags::COLUMNS))
    }

    pub(crate) fn replace(&mut self, tag: Tag, vr: VR, value: PrimitiveValue) {
        self.object.put(DataElement::new(tag, vr, value));
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), WriteError> {
        self.object.write_to_file(path)
    }

    /// Decode the stored values of the first frame.
    ///
    /// Neither the modality LUT nor a VOI LUT is applied; windowing is left
    /// to the [`IntensityNormalizer`](crate::normalizer::IntensityNormalizer).
    /// Multi-sample images contribute their first sample only.
    pub fn pixel_buffer(&self) -> Result<RawPixelBuffer, PixelError> {
        if !self.contains(tags::PIXEL_DATA) {
            return Err(PixelError::MissingPixelData);
        }

        let decoded = self.object.decode_pixel_data()?;
        if decoded.number_of_frames() == 0 {
            return Err(PixelError::NoFrames);
        }

        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        let data = decoded
            .to_ndarray_with_options::<i32>(&options)?
            .slice_move(s![0, .., .., 0]);

        let expected = (decoded.rows() as usize, decoded.columns() as usize);
        if data.dim() != expected {
            return Err(PixelError::ShapeMismatch {
                expected,
                actual: data.dim(),
            });
        }

        let representation = self
            .u16(tags::PIXEL_REPRESENTATION)
            .map(PixelRepresentation::from_value)
            .unwrap_or(PixelRepresentation::Unsigned);

        Ok(RawPixelBuffer {
            data,
            bits_allocated: decoded.bits_allocated(),
            bits_stored: decoded.bits_stored(),
            representation,
        })
    }
}

/// Stored pixel values of one frame, widened to `i32`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPixelBuffer {
    data: Array2<i32>,
    bits_allocated: u16,
    bits_stored: u16,
    representation: PixelRepresentation,
}

impl RawPixelBuffer {
    pub fn new(
        data: Array2<i32>,
        bits_allocated: u16,
        bits_stored: u16,
        representation: PixelRepresentation,
    ) -> Self {
        Self {
            data,
            bits_allocated,
            bits_stored,
            representation,
        }
    }

    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<i32> {
        &self.data
    }

    pub fn bits_allocated(&self) -> u16 {
        self.bits_allocated
    }

    pub fn bits_stored(&self) -> u16 {
        self.bits_stored
    }

    pub fn representation(&self) -> PixelRepresentation {
        self.representation
    }
}
