use crate::reader::RawElementSet;

use dicom::core::{PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use tiny_keccak::{Hasher, Shake};

pub const ANONYMOUS_NAME: &str = "ANONYMOUS";

const TOKEN_BYTES: usize = 8;

/// Stable pseudonym for a patient ID: `ID` followed by 16 hex digits of its
/// SHAKE256 digest.
pub fn patient_token(patient_id: &str) -> String {
    let mut hasher = Shake::v256();
    hasher.update(patient_id.as_bytes());
    let mut output = [0u8; TOKEN_BYTES];
    hasher.finalize(&mut output);
    format!("ID{}", hex::encode(output))
}

/// Copy of `elements` with the patient name replaced, the patient ID
/// pseudonymized and the birth date cleared. Elements that are not present
/// stay absent.
pub fn anonymize(elements: &RawElementSet) -> RawElementSet {
    let mut anonymized = elements.clone();

    if elements.contains(tags::PATIENT_NAME) {
        anonymized.replace(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from(ANONYMOUS_NAME));
    }
    if elements.contains(tags::PATIENT_ID) {
        let id = elements.text(tags::PATIENT_ID).unwrap_or_default();
        anonymized.replace(tags::PATIENT_ID, VR::LO, PrimitiveValue::from(patient_token(&id)));
    }
    if elements.contains(tags::PATIENT_BIRTH_DATE) {
        anonymized.replace(tags::PATIENT_BIRTH_DATE, VR::DA, PrimitiveValue::Empty);
    }

    anonymized
}
