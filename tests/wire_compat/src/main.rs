fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use ferry_protocol::messages::{
        CancelUploadRequest, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
        UploadChunkRequest, UploadChunkResponse,
    };
    use ferry_protocol::types::ProgressSnapshot;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// The assembly service serializes `65.0` as `65`; both are
    /// semantically identical, so numbers are compared as f64.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    serde_json::json!(f)
                } else {
                    v.clone()
                }
            }
            serde_json::Value::Object(map) => {
                let normalized: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect();
                serde_json::Value::Object(normalized)
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and
    /// compares the JSON values (order-independent, float-normalized).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        let norm_fixture = normalize_value(&fixture);
        let norm_reserialized = normalize_value(&reserialized);
        assert_eq!(
            norm_fixture, norm_reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    #[test]
    fn fixture_init_upload_request() {
        roundtrip_test::<InitUploadRequest>("init_upload_request.json");
    }

    #[test]
    fn fixture_init_upload_response() {
        roundtrip_test::<InitUploadResponse>("init_upload_response.json");
    }

    #[test]
    fn fixture_upload_chunk_request() {
        roundtrip_test::<UploadChunkRequest>("upload_chunk_request.json");
    }

    #[test]
    fn fixture_upload_chunk_response() {
        roundtrip_test::<UploadChunkResponse>("upload_chunk_response.json");
    }

    #[test]
    fn fixture_finalize_upload_request() {
        roundtrip_test::<FinalizeUploadRequest>("finalize_upload_request.json");
    }

    #[test]
    fn fixture_cancel_upload_request() {
        roundtrip_test::<CancelUploadRequest>("cancel_upload_request.json");
    }

    #[test]
    fn fixture_progress_snapshot() {
        roundtrip_test::<ProgressSnapshot>("progress_snapshot.json");
    }

    #[test]
    fn chunk_request_data_is_base64() {
        let fixture = load_fixture("upload_chunk_request.json");
        let parsed: UploadChunkRequest = serde_json::from_value(fixture).unwrap();
        // "SGVsbG8=" decodes to "Hello".
        assert_eq!(parsed.data, b"Hello");
    }
}
