//! Tasks that execute a prepared request and decode its body

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use reqwest::{Client, Request};
use serde::de::DeserializeOwned;

/// Build a task that executes a request and decodes the body as JSON into `T`
pub fn decode_json_task<T>(
    client: Client,
) -> impl Fn(Request) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static
where
    T: DeserializeOwned + Send + 'static,
{
    move |request| {
        let client = client.clone();
        Box::pin(async move {
            let (url, body) = fetch_body(&client, request).await?;
            serde_json::from_str(&body)
                .map_err(|e| Error::Decode(format!("invalid JSON from {}: {}", url, e)))
        })
    }
}

/// Build a task that executes a request and decodes the body as XML into `T`
pub fn decode_xml_task<T>(
    client: Client,
) -> impl Fn(Request) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static
where
    T: DeserializeOwned + Send + 'static,
{
    move |request| {
        let client = client.clone();
        Box::pin(async move {
            let (url, body) = fetch_body(&client, request).await?;
            quick_xml::de::from_str(&body)
                .map_err(|e| Error::Decode(format!("invalid XML from {}: {}", url, e)))
        })
    }
}

async fn fetch_body(client: &Client, request: Request) -> Result<(String, String)> {
    let url = request.url().to_string();
    let response = client.execute(request).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            url,
        });
    }

    let body = response.text().await?;
    Ok((url, body))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[derive(Debug, Deserialize)]
    struct XmlPayload {
        title: String,
    }

    fn get(client: &Client, url: String) -> Request {
        client
            .get(url)
            .header("User-Agent", "vidfeed-test")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_task_decodes_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("User-Agent", "vidfeed-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"abc","count":3}"#))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let task = decode_json_task::<Payload>(client.clone());
        let payload = task(get(&client, format!("{}/feed", mock_server.uri())))
            .await
            .unwrap();

        assert_eq!(payload.name, "abc");
        assert_eq!(payload.count, 3);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let task = decode_json_task::<Payload>(client.clone());
        let result = task(get(&client, format!("{}/feed", mock_server.uri()))).await;

        assert!(matches!(result, Err(Error::HttpStatus { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let task = decode_json_task::<Payload>(client.clone());
        let result = task(get(&client, format!("{}/feed", mock_server.uri()))).await;

        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_xml_task_decodes_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<feed><title>Uploads</title></feed>"),
            )
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let task = decode_xml_task::<XmlPayload>(client.clone());
        let payload = task(get(&client, format!("{}/feed", mock_server.uri())))
            .await
            .unwrap();

        assert_eq!(payload.title, "Uploads");
    }
}
