//! DICOM fixtures written with dicom-rs.

#![allow(dead_code)]

use dicom::{
    core::{DataElement, PrimitiveValue, Tag, VR},
    object::{DefaultDicomObject, FileDicomObject, FileMetaTableBuilder},
};
use dicom_dictionary_std::{StandardDataDictionary, tags, uids};
use std::path::{Path, PathBuf};

pub struct Slice<'a> {
    pub series_uid: &'a str,
    pub description: &'a str,
    pub patient_id: &'a str,
    pub instance: u16,
    pub pixels: Option<[u16; 4]>,
}

impl<'a> Slice<'a> {
    pub fn new(series_uid: &'a str, description: &'a str, instance: u16) -> Self {
        Self {
            series_uid,
            description,
            patient_id: "PAT-0042",
            instance,
            pixels: Some([0, 100 * instance, 200, 4000]),
        }
    }

    pub fn without_pixels(mut self) -> Self {
        self.pixels = None;
        self
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let sop_uid = format!("{}.{}", self.series_uid, self.instance);
        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(uids::MR_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(sop_uid.as_str())
            .build()
            .unwrap();
        let mut object: DefaultDicomObject =
            FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);

        let mut put = |tag: Tag, vr: VR, value: PrimitiveValue| {
            object.put(DataElement::new(tag, vr, value));
        };
        put(tags::SOP_CLASS_UID, VR::UI, uids::MR_IMAGE_STORAGE.into());
        put(tags::SOP_INSTANCE_UID, VR::UI, sop_uid.as_str().into());
        put(tags::SERIES_INSTANCE_UID, VR::UI, self.series_uid.into());
        put(tags::SERIES_DESCRIPTION, VR::LO, self.description.into());
        put(tags::STUDY_DESCRIPTION, VR::LO, "KNEE".into());
        put(tags::MODALITY, VR::CS, "MR".into());
        put(tags::PATIENT_NAME, VR::PN, "Doe^Jane".into());
        put(tags::PATIENT_ID, VR::LO, self.patient_id.into());
        put(tags::PATIENT_BIRTH_DATE, VR::DA, "19700101".into());
        put(tags::INSTANCE_NUMBER, VR::IS, self.instance.to_string().as_str().into());
        put(
            tags::SLICE_LOCATION,
            VR::DS,
            format!("{:.1}", f64::from(self.instance) * 2.5).as_str().into(),
        );

        if let Some(pixels) = self.pixels {
            put(tags::ROWS, VR::US, 2_u16.into());
            put(tags::COLUMNS, VR::US, 2_u16.into());
            put(tags::SAMPLES_PER_PIXEL, VR::US, 1_u16.into());
            put(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2".into());
            put(tags::BITS_ALLOCATED, VR::US, 16_u16.into());
            put(tags::BITS_STORED, VR::US, 16_u16.into());
            put(tags::HIGH_BIT, VR::US, 15_u16.into());
            put(tags::PIXEL_REPRESENTATION, VR::US, 0_u16.into());
            put(
                tags::PIXEL_DATA,
                VR::OW,
                PrimitiveValue::U16(pixels.iter().copied().collect()),
            );
        }

        let path = dir.join(name);
        object.write_to_file(&path).unwrap();
        path
    }
}

pub fn count_files(dir: &Path, suffix: &str) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(suffix))
        .count()
}
