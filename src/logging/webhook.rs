use std::path::Path;

use bytes::Bytes;
use http::{header::CONTENT_TYPE, Request, Uri};
use http_body_util::Full;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{
    error::RemoteDeliveryError,
    remote::{ChannelFuture, ChannelId, FormattedMessage, RemoteChannel},
};
use crate::http::HttpsClient;

/// Posts reports and archived files to chat webhooks. The channel id is the
/// webhook URL.
#[derive(Clone)]
pub struct WebhookChannel {
    client: HttpsClient,
}

impl WebhookChannel {
    pub fn new(client: HttpsClient) -> Self {
        Self { client }
    }

    fn uri(channel: &ChannelId) -> Result<Uri, RemoteDeliveryError> {
        channel
            .as_str()
            .parse::<Uri>()
            .ok()
            .filter(|uri| uri.scheme().is_some() && uri.host().is_some())
            .ok_or_else(|| RemoteDeliveryError::InvalidChannel(channel.to_string()))
    }
}

impl RemoteChannel for WebhookChannel {
    fn send(
        &self,
        channel: &ChannelId,
        title: Option<&str>,
        body: &FormattedMessage,
    ) -> ChannelFuture {
        let client = self.client.clone();
        let uri = Self::uri(channel);
        let payload = embed_payload(title, body).to_string();

        Box::pin(async move { post(&client, uri?, "application/json", payload.into_bytes()).await })
    }

    fn upload(&self, channel: &ChannelId, path: &Path) -> ChannelFuture {
        let client = self.client.clone();
        let uri = Self::uri(channel);
        let path = path.to_path_buf();

        Box::pin(async move {
            let uri = uri?;
            let contents = tokio::fs::read(&path).await?;

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "archive.log".to_string());
            let stem = path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.clone());

            let payload = json!({ "content": format!("### 📁 Archived: {}", stem) });
            let boundary = format!("relaylog-{}", Uuid::new_v4().as_simple());
            let body = multipart_body(&boundary, &payload, &file_name, &contents);

            post(
                &client,
                uri,
                &format!("multipart/form-data; boundary={}", boundary),
                body,
            )
            .await
        })
    }
}

async fn post(
    client: &HttpsClient,
    uri: Uri,
    content_type: &str,
    body: Vec<u8>,
) -> Result<(), RemoteDeliveryError> {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))?;

    let response = client.request(request).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteDeliveryError::Status(status));
    }

    Ok(())
}

/// Webhook message with a single embed carrying the log text.
pub fn embed_payload(title: Option<&str>, body: &FormattedMessage) -> Value {
    json!({
        "content": title,
        "embeds": [{
            "description": body.description,
            "color": body.color,
            "timestamp": body.timestamp.to_rfc3339(),
        }],
    })
}

fn multipart_body(boundary: &str, payload: &Value, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(contents.len() + 512);

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"payload_json\"\r\n");
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(payload.to_string().as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"files[0]\"; filename=\"{}\"\r\n",
            file_name.replace('"', "'")
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
