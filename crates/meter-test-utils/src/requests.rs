//! Request builders with storage headers.

use crate::fake_app::ChunkBody;
use http::Request;

/// Request with an empty body.
pub fn storage_request(method: &str, path: &str) -> Result<Request<ChunkBody>, http::Error> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(ChunkBody::empty())
}

/// Request carrying a body, the way an object PUT does.
pub fn storage_request_with_body(
    method: &str,
    path: &str,
    body: &str,
) -> Result<Request<ChunkBody>, http::Error> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(ChunkBody::from(body))
}

/// Request with an empty body and the given headers.
pub fn storage_request_with_headers(
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
) -> Result<Request<ChunkBody>, http::Error> {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(ChunkBody::empty())
}
