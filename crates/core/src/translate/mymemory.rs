use crate::config::Endpoint;
use crate::translate::{TranslateError, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const LOG_TARGET: &str = "translate::mymemory";
const SUCCESS_STATUS: u64 = 200;
const FALLBACK_DETAILS: &str = "Translation failed";

#[derive(Clone)]
pub struct MyMemoryTranslator {
    client: Client,
    endpoint: Endpoint,
}

impl MyMemoryTranslator {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, TranslateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_status: serde_json::Value,
    #[serde(default)]
    response_data: Option<MyMemoryData>,
    #[serde(default)]
    response_details: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: Option<String>,
}

/// Builds `<endpoint>?q=<text>&langpair=<source>|<target>`, keeping any query the endpoint already has.
pub fn build_request_url(
    endpoint: &Endpoint,
    text: &str,
    source: &str,
    target: &str,
) -> Result<Url, TranslateError> {
    let mut url = Url::parse(endpoint.as_str())
        .map_err(|e| TranslateError::InvalidResponse(format!("bad endpoint {endpoint}: {e}")))?;
    let params = format!(
        "q={}&langpair={}|{}",
        urlencoding::encode(text),
        urlencoding::encode(source),
        urlencoding::encode(target)
    );
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{params}"),
        _ => params,
    };
    url.set_query(Some(&query));
    Ok(url)
}

/// Extracts the translated text from a response body.
pub fn parse_response(body: &str) -> Result<String, TranslateError> {
    let response: MyMemoryResponse = serde_json::from_str(body)
        .map_err(|e| TranslateError::InvalidResponse(format!("failed to parse JSON: {e}")))?;

    if response.response_status.as_u64() != Some(SUCCESS_STATUS) {
        let details = response
            .response_details
            .as_str()
            .filter(|d| !d.is_empty())
            .unwrap_or(FALLBACK_DETAILS);
        return Err(TranslateError::Provider(details.to_owned()));
    }

    response
        .response_data
        .and_then(|d| d.translated_text)
        .ok_or_else(|| TranslateError::InvalidResponse("missing responseData.translatedText".into()))
}

impl Translator for MyMemoryTranslator {
    fn translate(
        &self,
        text: String,
        source: String,
        target: String,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            let url = build_request_url(&self.endpoint, &text, &source, &target)?;
            tracing::debug!(target: LOG_TARGET, %source, %target, chars = text.chars().count(), "requesting translation");

            let response = self.client.get(url).send().await?;
            let status = response.status();
            let body = response.text().await?;

            parse_response(&body).inspect_err(|e| {
                tracing::debug!(target: LOG_TARGET, http_status = %status, error = %e, "translation rejected");
            })
        }
        .boxed()
    }
}
