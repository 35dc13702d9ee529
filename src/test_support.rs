//! Builders for in-memory element sets used by the unit tests.

use crate::reader::RawElementSet;

use dicom::{
    core::{DataElement, PrimitiveValue, Tag, VR},
    object::{DefaultDicomObject, FileDicomObject, FileMetaTableBuilder},
};
use dicom_dictionary_std::{StandardDataDictionary, tags, uids};
use std::path::Path;

pub(crate) struct ElementSetBuilder {
    object: DefaultDicomObject,
}

impl ElementSetBuilder {
    pub(crate) fn new(sop_instance_uid: &str) -> Self {
        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(uids::MR_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(sop_instance_uid)
            .build()
            .unwrap();
        let object = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);

        Self { object }
            .element(tags::SOP_CLASS_UID, VR::UI, uids::MR_IMAGE_STORAGE)
            .element(tags::SOP_INSTANCE_UID, VR::UI, sop_instance_uid)
    }

    pub(crate) fn element(mut self, tag: Tag, vr: VR, value: impl Into<PrimitiveValue>) -> Self {
        self.object.put(DataElement::new(tag, vr, value.into()));
        self
    }

    pub(crate) fn text(self, tag: Tag, value: &str) -> Self {
        self.element(tag, VR::LO, value)
    }

    /// Decimal string element. Backslashes separate multiple values.
    pub(crate) fn decimal(self, tag: Tag, value: &str) -> Self {
        let values = value.split('\\').map(str::to_owned).collect();
        self.element(tag, VR::DS, PrimitiveValue::Strs(values))
    }

    pub(crate) fn pixels(self, rows: u16, columns: u16, values: &[u16]) -> Self {
        self.image_header(rows, columns, 0)
            .element(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(values.iter().copied().collect()))
    }

    pub(crate) fn signed_pixels(self, rows: u16, columns: u16, values: &[i16]) -> Self {
        self.image_header(rows, columns, 1).element(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(values.iter().map(|&v| v as u16).collect()),
        )
    }

    fn image_header(self, rows: u16, columns: u16, representation: u16) -> Self {
        self.element(tags::ROWS, VR::US, rows)
            .element(tags::COLUMNS, VR::US, columns)
            .element(tags::SAMPLES_PER_PIXEL, VR::US, 1_u16)
            .element(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2")
            .element(tags::BITS_ALLOCATED, VR::US, 16_u16)
            .element(tags::BITS_STORED, VR::US, 16_u16)
            .element(tags::HIGH_BIT, VR::US, 15_u16)
            .element(tags::PIXEL_REPRESENTATION, VR::US, representation)
    }

    pub(crate) fn build(self) -> RawElementSet {
        RawElementSet::from_object(self.object)
    }
}

pub(crate) fn write_file(elements: &RawElementSet, path: &Path) {
    elements.write_to_file(path).unwrap();
}
