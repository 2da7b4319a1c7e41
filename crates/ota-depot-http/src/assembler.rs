use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use md5::{Digest, Md5};
use ota_depot_core::{FirmwareFamily, ResolvedOutcome};
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

/// Hex MD5 of the body, checked by the device after download
pub const MD5_HEADER: HeaderName = HeaderName::from_static("x-md5");

const CHUNK_SIZE: usize = 64 * 1024;

/// Turn a resolver decision into the response sent to the device.
///
/// `report_abort` is false for requests whose body is never sent (`HEAD`).
pub async fn assemble(
    family: &FirmwareFamily,
    outcome: ResolvedOutcome,
    report_abort: bool,
) -> Response {
    match outcome {
        ResolvedOutcome::NotFound => StatusCode::NOT_FOUND.into_response(),
        ResolvedOutcome::NoUpdate => StatusCode::NOT_MODIFIED.into_response(),
        ResolvedOutcome::InternalError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        ResolvedOutcome::UpdateAvailable { path, version } => {
            let image = match tokio::fs::read(&path).await {
                Ok(image) => Bytes::from(image),
                Err(e) => {
                    error!("Failed reading file {}: {}", path.display(), e);
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            info!(
                "Serving firmware {} version {} ({} bytes)",
                family,
                version,
                image.len()
            );
            firmware_response(family, image, report_abort)
        }
    }
}

/// Build the 200 response carrying a firmware image
pub fn firmware_response(family: &FirmwareFamily, image: Bytes, report_abort: bool) -> Response {
    let digest = hex::encode(Md5::digest(&image));
    let disposition = format!("attachment; filename={}", family.attachment_name());
    let Ok(disposition) = HeaderValue::from_str(&disposition) else {
        error!("Firmware family {:?} is not usable in a header", family.as_str());
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let length = image.len();
    let reader = TransferReader::new(family.clone(), image, report_abort);
    let body = Body::from_stream(ReaderStream::with_capacity(reader, CHUNK_SIZE));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, length)
        .header(MD5_HEADER, digest)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(body)
        .unwrap_or_else(|e| {
            error!("Failed to build firmware response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

/// In-memory image source that notices when the client goes away early.
///
/// Hyper drops the body without surfacing an error when a connection dies
/// mid-transfer, so the only signal is being dropped before the last byte
/// was handed out.
struct TransferReader {
    family: FirmwareFamily,
    inner: Cursor<Bytes>,
    report_abort: bool,
}

impl TransferReader {
    fn new(family: FirmwareFamily, image: Bytes, report_abort: bool) -> Self {
        Self {
            family,
            inner: Cursor::new(image),
            report_abort,
        }
    }

    fn remaining(&self) -> usize {
        let len = self.inner.get_ref().len();
        len.saturating_sub(self.inner.position() as usize)
    }

    fn aborted(&self) -> bool {
        self.report_abort && self.remaining() > 0
    }
}

impl AsyncRead for TransferReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for TransferReader {
    fn drop(&mut self) {
        if self.aborted() {
            warn!(
                "Failed writing response body for firmware {}: transfer aborted with {} bytes unsent",
                self.family,
                self.remaining()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn family(name: &str) -> FirmwareFamily {
        name.parse().expect("valid family")
    }

    #[tokio::test]
    async fn no_update_is_empty_not_modified() {
        let response = assemble(&family("fw"), ResolvedOutcome::NoUpdate, true).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert!(response.headers().get(MD5_HEADER).is_none());
    }

    #[tokio::test]
    async fn outcome_statuses() {
        let fw = family("fw");
        assert_eq!(
            assemble(&fw, ResolvedOutcome::NotFound, true).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            assemble(&fw, ResolvedOutcome::InternalError, true).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unreadable_image_is_internal_error() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let outcome = ResolvedOutcome::UpdateAvailable {
            path: dir.path().join("fw-1.0.0.bin"),
            version: ota_depot_core::FirmwareVersion::parse("1.0.0"),
        };
        let response = assemble(&family("fw"), outcome, true).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn firmware_headers() {
        let response = firmware_response(&family("fw"), Bytes::from_static(b"hello"), true);
        let headers = response.headers();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[header::CONTENT_LENGTH], "5");
        assert_eq!(headers[MD5_HEADER], "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=fw.bin"
        );
    }

    #[tokio::test]
    async fn transfer_reader_yields_whole_image() {
        let mut reader = TransferReader::new(family("fw"), Bytes::from_static(b"abcdef"), true);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.expect("read");
        assert_eq!(out, b"abcdef");
        assert_eq!(reader.remaining(), 0);
    }

    #[tokio::test]
    async fn transfer_reader_tracks_partial_reads() {
        let mut reader = TransferReader::new(family("fw"), Bytes::from_static(b"abcdef"), true);
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await.expect("read");
        assert_eq!(reader.remaining(), 4);
        assert!(reader.aborted());

        reader.read_to_end(&mut Vec::new()).await.expect("read");
        assert!(!reader.aborted());
    }

    #[test]
    fn unread_head_body_is_not_an_abort() {
        let reader = TransferReader::new(family("fw"), Bytes::from_static(b"abcdef"), false);
        assert_eq!(reader.remaining(), 6);
        assert!(!reader.aborted());

        let reader = TransferReader::new(family("fw"), Bytes::from_static(b"abcdef"), true);
        assert!(reader.aborted());
    }

    #[test]
    fn head_response_keeps_firmware_headers() {
        let response = firmware_response(&family("fw"), Bytes::from_static(b"hello"), false);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        assert_eq!(
            response.headers()[MD5_HEADER],
            "5d41402abc4b2a76b9719d911017c592"
        );
    }
}
