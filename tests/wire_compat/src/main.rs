fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use modsdk_protocol::{CaptureEnvelope, RenderRequest, UploadEnvelope};
    use serde_json::Value;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
        parsed
    }

    /// Asserts that a value built in Rust serializes exactly to a fixture.
    fn emits_fixture<T: serde::Serialize>(value: &T, name: &str) {
        assert_eq!(
            serde_json::to_value(value).unwrap(),
            load_fixture(name),
            "{name}"
        );
    }

    // --- Capture envelope ---

    #[test]
    fn fixture_capture_success() {
        let env: CaptureEnvelope = roundtrip_test("capture_success.json");
        assert!(env.ok);
        assert_eq!(env.icon_bytes().unwrap(), b"icon");
        assert_eq!(env.thumbnail_bytes().unwrap(), b"thumb");

        emits_fixture(
            &CaptureEnvelope::success(b"icon", b"thumb"),
            "capture_success.json",
        );
    }

    #[test]
    fn fixture_capture_failure() {
        let env: CaptureEnvelope = roundtrip_test("capture_failure.json");
        assert!(!env.ok);
        assert!(env.icon.is_none());
        assert!(env.thumbnail.is_none());

        emits_fixture(
            &CaptureEnvelope::failure("render failed: renderer exited with exit status: 1"),
            "capture_failure.json",
        );
    }

    #[test]
    fn fixture_capture_partial() {
        let env: CaptureEnvelope = roundtrip_test("capture_partial.json");
        assert!(!env.ok);
        assert_eq!(env.icon_bytes().unwrap(), b"icon");
        assert!(env.error.unwrap().starts_with("publish failed"));
    }

    #[test]
    fn capture_failure_omits_image_keys() {
        let json = serde_json::to_value(CaptureEnvelope::failure("x")).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(json.get("icon").is_none());
    }

    // --- Upload envelope ---

    #[test]
    fn fixture_upload_success() {
        let env: UploadEnvelope = roundtrip_test("upload_success.json");
        assert!(env.succeeded());
        assert_eq!(env.result().unwrap()["uid"], "reverb");
    }

    #[test]
    fn fixture_upload_scalar() {
        let env: UploadEnvelope = roundtrip_test("upload_scalar.json");
        assert_eq!(env.result(), Some(&serde_json::json!(42)));
        emits_fixture(&UploadEnvelope::success(serde_json::json!(42)), "upload_scalar.json");
    }

    #[test]
    fn fixture_upload_failure() {
        let env: UploadEnvelope = roundtrip_test("upload_failure.json");
        assert!(!env.succeeded());
        assert_eq!(env.result(), None);
        emits_fixture(&UploadEnvelope::failure("boom"), "upload_failure.json");
    }

    // --- Requests ---

    #[test]
    fn fixture_render_request() {
        let req: RenderRequest = roundtrip_test("render_request.json");
        assert_eq!(req.fragment(), "reverb.lv2,urn:fx:reverb");
        assert!(req.validate().is_ok());
    }
}
