use serde::{Deserialize, Serialize};

/// Structured payload of a data part. Key order is preserved.
pub type DataMap = serde_json::Map<String, serde_json::Value>;

/// Content unit for messages and artifacts.
///
/// Discriminated on the wire by a `type` member:
/// `{"type":"text","text":"..."}`, `{"type":"file","file":{...}}`,
/// `{"type":"data","data":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<DataMap>,
    },
    File {
        file: FileContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<DataMap>,
    },
    Data {
        data: DataMap,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<DataMap>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn data(data: DataMap) -> Self {
        Part::Data {
            data,
            metadata: None,
        }
    }

    pub fn file(file: FileContent) -> Self {
        Part::File {
            file,
            metadata: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<&DataMap> {
        match self {
            Part::Text { metadata, .. } | Part::File { metadata, .. } | Part::Data { metadata, .. } => {
                metadata.as_ref()
            }
        }
    }
}

/// File reference carried by a [`Part::File`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub source: FileSource,
}

/// Either inline bytes (base64 on the wire) or a URI, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSource {
    Bytes {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    Uri {
        uri: String,
    },
}

impl FileContent {
    pub fn inline(name: Option<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name,
            mime_type,
            source: FileSource::Bytes { bytes },
        }
    }

    pub fn uri(name: Option<String>, mime_type: Option<String>, uri: impl Into<String>) -> Self {
        Self {
            name,
            mime_type,
            source: FileSource::Uri { uri: uri.into() },
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_part_serde() {
        let part = Part::text("Hello");

        let json = serde_json::to_string(&part).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"Hello"}"#);

        let deserialized: Part = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.as_text(), Some("Hello"));
    }

    #[test]
    fn test_data_part_preserves_key_order() {
        let json = r#"{"type":"data","data":{"zeta":1,"alpha":2,"mid":{"b":1,"a":2}}}"#;
        let part: Part = serde_json::from_str(json).unwrap();

        match &part {
            Part::Data { data, .. } => {
                let keys: Vec<&str> = data.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
            }
            _ => panic!("Expected Data part"),
        }

        assert_eq!(serde_json::to_string(&part).unwrap(), json);
    }

    #[test]
    fn test_file_part_inline_bytes() {
        let part = Part::file(FileContent::inline(
            Some("hello.txt".into()),
            Some("text/plain".into()),
            b"Hello".to_vec(),
        ));

        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains(r#""bytes":"SGVsbG8=""#));
        assert!(json.contains(r#""mimeType":"text/plain""#));
        assert!(!json.contains("uri"));

        let deserialized: Part = serde_json::from_str(&json).unwrap();
        match deserialized {
            Part::File { file, .. } => {
                assert_eq!(file.name.as_deref(), Some("hello.txt"));
                assert_eq!(file.source, FileSource::Bytes { bytes: b"Hello".to_vec() });
            }
            _ => panic!("Expected File part"),
        }
    }

    #[test]
    fn test_file_part_uri() {
        let json = r#"{"type":"file","file":{"uri":"https://example.com/report.pdf","mimeType":"application/pdf"}}"#;
        let part: Part = serde_json::from_str(json).unwrap();
        match part {
            Part::File { file, .. } => {
                assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
                assert!(file.name.is_none());
                match file.source {
                    FileSource::Uri { uri } => assert!(uri.ends_with("report.pdf")),
                    _ => panic!("Expected Uri source"),
                }
            }
            _ => panic!("Expected File part"),
        }
    }

    #[test]
    fn test_file_part_invalid_base64_fails() {
        let json = r#"{"type":"file","file":{"bytes":"%%%"}}"#;
        assert!(serde_json::from_str::<Part>(json).is_err());
    }

    #[test]
    fn test_part_with_metadata() {
        let mut meta = DataMap::new();
        meta.insert("lang".into(), "en".into());
        let part = Part::Text {
            text: "hi".into(),
            metadata: Some(meta),
        };

        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains(r#""metadata":{"lang":"en"}"#));

        let deserialized: Part = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.metadata().unwrap()["lang"], "en");
    }

    #[test]
    fn test_unknown_part_type_fails() {
        let json = r#"{"type":"video","url":"x"}"#;
        assert!(serde_json::from_str::<Part>(json).is_err());
    }

    #[test]
    fn test_missing_type_tag_fails() {
        let json = r#"{"text":"no tag"}"#;
        assert!(serde_json::from_str::<Part>(json).is_err());
    }

    #[test]
    fn test_as_text_non_text() {
        assert!(Part::data(DataMap::new()).as_text().is_none());
    }
}
