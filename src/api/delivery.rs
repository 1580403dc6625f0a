//! Streaming an artifact to the client
//!
//! The response body owns the [`Delivery`]. When the body is dropped, whether
//! fully sent or abandoned by the client, the artifact's files are removed and
//! the URL's reservation is released.

use crate::config::FetchConfig;
use crate::coordinator::Delivery;
use crate::error::{Error, Result};
use axum::{
    body::{Body, Bytes},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Body stream that keeps the delivery alive until it is dropped
pub struct DeliveryStream {
    reader: ReaderStream<File>,
    delivery: Delivery,
    bytes_sent: u64,
    finished: bool,
}

impl DeliveryStream {
    /// Stream `file`, the opened artifact of `delivery`
    pub fn new(file: File, delivery: Delivery) -> Self {
        Self {
            reader: ReaderStream::new(file),
            delivery,
            bytes_sent: 0,
            finished: false,
        }
    }
}

impl Stream for DeliveryStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.reader).poll_next(cx);

        match &poll {
            Poll::Ready(Some(Ok(chunk))) => this.bytes_sent += chunk.len() as u64,
            Poll::Ready(Some(Err(e))) => {
                tracing::error!(url = %this.delivery.key(), error = %e, "Error reading artifact during delivery");
            }
            Poll::Ready(None) if !this.finished => {
                this.finished = true;
                tracing::info!(
                    url = %this.delivery.key(),
                    bytes = this.bytes_sent,
                    "Delivered artifact"
                );
            }
            _ => {}
        }

        poll
    }
}

impl Drop for DeliveryStream {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                url = %self.delivery.key(),
                bytes = self.bytes_sent,
                "Delivery ended before the artifact was fully sent"
            );
        }
    }
}

/// `<title truncated to max_chars characters>.mp4`
pub fn attachment_filename(title: &str, max_chars: usize) -> String {
    let stem: String = title.chars().take(max_chars).collect();
    format!("{stem}.mp4")
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

/// Build the streaming 200 response for `delivery`
///
/// If the artifact cannot be opened the delivery is dropped here, which cleans
/// up before the error is returned.
pub async fn stream_response(delivery: Delivery, config: &FetchConfig) -> Result<Response> {
    let artifact = delivery.artifact();
    let path = artifact.path.clone();

    let file = File::open(&path).await.map_err(|e| Error::Storage {
        path: path.clone(),
        reason: format!("failed to open artifact: {e}"),
    })?;
    let size = file
        .metadata()
        .await
        .map(|m| m.len())
        .unwrap_or(artifact.size_bytes);

    let filename = attachment_filename(&artifact.title, config.filename_max_chars);

    tracing::info!(
        url = %delivery.key(),
        path = %path.display(),
        size,
        filename = %filename,
        "Streaming artifact"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, config.content_type.as_str())
        .header(CONTENT_DISPOSITION, content_disposition(&filename))
        .header(CONTENT_LENGTH, size.to_string())
        .body(Body::from_stream(DeliveryStream::new(file, delivery)))
        .map_err(|e| Error::Other(format!("failed to build response: {e}")))
}
