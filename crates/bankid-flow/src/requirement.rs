//! Optional initiation requirements.

use serde::Serialize;

use crate::error::Error;

/// Card reader class the provider may be told to require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardReader {
    #[serde(rename = "class1")]
    Class1,
    #[serde(rename = "class2")]
    Class2,
}

/// Constraints on how the provider lets the end user complete an order.
///
/// All fields are optional; an empty requirement is omitted from the
/// initiation payload entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrtd: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_reader: Option<CardReader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_policies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_number: Option<String>,
}

impl Requirement {
    pub(crate) fn is_empty(&self) -> bool {
        self.pin_code.is_none()
            && self.mrtd.is_none()
            && self.card_reader.is_none()
            && self.certificate_policies.is_none()
            && self.personal_number.is_none()
    }

    /// Naive validation of the (swedish) personal number format.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(personal_number) = &self.personal_number {
            if personal_number.len() != 12 {
                return Err(Error::InvalidPersonalNumber("not of length 12".to_owned()));
            }
            if !personal_number.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidPersonalNumber(
                    "includes non digits".to_owned(),
                ));
            }
        }
        Ok(())
    }
}
