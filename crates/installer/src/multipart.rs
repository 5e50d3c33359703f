//! `multipart/form-data` framing for a single file part.

use rand::Rng;

/// Random hex digits appended to the boundary prefix (88 bits).
const BOUNDARY_BYTES: usize = 11;
const BOUNDARY_PREFIX: &str = "----------";
const CRLF: &[u8] = b"\r\n";

/// An encoded multipart body and the boundary that frames it.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Encodes one file part under a freshly generated boundary.
    pub fn single_file(field: &str, filename: &str, content: &[u8]) -> Self {
        Self::with_boundary(generate_boundary(), field, filename, content)
    }

    /// Encodes one file part under `boundary`.
    pub fn with_boundary(boundary: String, field: &str, filename: &str, content: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(content.len() + 256);
        push_line(&mut bytes, format!("--{boundary}").as_bytes());
        push_line(
            &mut bytes,
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"")
                .as_bytes(),
        );
        push_line(&mut bytes, b"Content-Type: application/octet-stream");
        push_line(&mut bytes, b"");
        push_line(&mut bytes, content);
        push_line(&mut bytes, format!("--{boundary}--").as_bytes());

        Self { boundary, bytes }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn push_line(buf: &mut Vec<u8>, line: &[u8]) {
    buf.extend_from_slice(line);
    buf.extend_from_slice(CRLF);
}

/// `----------` followed by 22 lowercase hex digits.
pub fn generate_boundary() -> String {
    let mut bytes = [0u8; BOUNDARY_BYTES];
    rand::thread_rng().fill(&mut bytes);
    format!("{BOUNDARY_PREFIX}{}", hex::encode(bytes))
}
