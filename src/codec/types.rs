use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    TransferStructure,
    TransferBegin,
    ChunkData,
    FileBegin,
    FileComplete,
    TransferComplete,
    TransferCancel,
    ProgressUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub service_id: String,
    pub session_id: String,
    pub session_create_at: i64,
}

/// The wire envelope every message is wrapped in. Optional fields are
/// omitted from the JSON output when empty, matching the canonical schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub session: SessionDescriptor,
    pub file_id: String,
    pub file_name: String,
    pub sequence_no: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "base64_opt"
    )]
    pub data: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chunk_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

mod base64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        v: &Option<Vec<u8>>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => s.serialize_str(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<Vec<u8>>, D::Error> {
        let opt: Option<String> = Option::deserialize(d)?;
        match opt {
            Some(s) => STANDARD
                .decode(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
