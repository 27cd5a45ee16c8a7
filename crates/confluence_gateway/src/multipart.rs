//! Minimal `multipart/form-data` encoder for the upload endpoint.
//!
//! ureq ships no multipart support, so the body is assembled by hand: one
//! file part per occupied slot, named `file1`..`file5`.

/// A single file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Form field name, e.g. `file3`.
    pub name: String,
    /// Original file name, forwarded so the service can keep the extension.
    pub filename: String,
    pub data: Vec<u8>,
}

/// Encode `parts` into a multipart body with the given boundary. Returns the
/// `Content-Type` header value and the raw body bytes.
pub fn encode(boundary: &str, parts: &[Part]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let content_type = format!("multipart/form-data; boundary={boundary}");
    (content_type, body)
}
