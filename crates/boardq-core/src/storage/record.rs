//! Record type for stored rows.

use crate::error::Error;
use boardq_proto::Value;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

/// A single stored field.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: Value,
}

/// A stored row with metadata. The identity lives in the key, not here.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Field values, in catalog order.
    pub fields: Vec<StoredField>,

    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,
}

impl Record {
    /// Create a new record with the current timestamp.
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| StoredField { name, value })
                .collect(),
            created_at: super::key::current_timestamp(),
        }
    }

    /// Field values as name/value pairs.
    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
            .into_iter()
            .map(|field| (field.name, field.value))
            .collect()
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    ///
    /// sled hands out values without alignment guarantees, so the bytes are
    /// copied into an aligned buffer before validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut aligned: AlignedVec = AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
