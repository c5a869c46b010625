use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header::CONTENT_TYPE, Request},
};

pub(crate) const BOUNDARY: &str = "chunkup-test-boundary";

pub(crate) fn multipart_body(parts: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(crate) async fn multipart_from_parts(parts: &[(String, Vec<u8>)]) -> Multipart {
    multipart_from_body(multipart_body(parts)).await
}

pub(crate) async fn multipart_from_body(body: Vec<u8>) -> Multipart {
    let request = Request::builder()
        .method("POST")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    Multipart::from_request(request, &()).await.unwrap()
}

pub(crate) fn chunk_parts(
    upload_id: &str,
    chunk_number: &str,
    total_chunks: &str,
    total_file_size: &str,
    file_name: &str,
    payload: &[u8],
) -> Vec<(String, Vec<u8>)> {
    vec![
        ("upload_id".to_string(), upload_id.as_bytes().to_vec()),
        ("chunk_number".to_string(), chunk_number.as_bytes().to_vec()),
        ("total_chunks".to_string(), total_chunks.as_bytes().to_vec()),
        (
            "total_file_size".to_string(),
            total_file_size.as_bytes().to_vec(),
        ),
        ("file_name".to_string(), file_name.as_bytes().to_vec()),
        ("file".to_string(), payload.to_vec()),
    ]
}
