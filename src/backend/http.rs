use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{Backend, BackendError, Rendered, parse_count};
use crate::model::{Record, Schema};

/// Talks to a FastEx-compatible server over HTTP
pub struct HttpBackend {
    base: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpBackend {
            base: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, BackendError> {
        let url = self.url(path);
        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(|e| map_error(&url, e))?;
        read_body(&url, response)
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        let url = self.url(path);
        let response = self
            .agent
            .post(&url)
            .send_json(body)
            .map_err(|e| map_error(&url, e))?;
        read_body(&url, response)
    }
}

fn map_error(url: &str, error: ureq::Error) -> BackendError {
    match error {
        ureq::Error::Status(status, _) => BackendError::Status {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(t) => BackendError::Transport {
            url: url.to_string(),
            message: t.to_string(),
        },
    }
}

/// Read a JSON body; an empty body (a bare acknowledgement) reads as null
fn read_body(url: &str, response: ureq::Response) -> Result<Value, BackendError> {
    let text = response.into_string().map_err(|e| BackendError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

impl Backend for HttpBackend {
    fn schema(&self) -> Result<Schema, BackendError> {
        let value = self.get_json("/schema/", &[])?;
        Ok(Schema::from_json(&value)?)
    }

    fn count(&self) -> Result<usize, BackendError> {
        let value = self.get_json("/count/", &[])?;
        parse_count(&value)
    }

    fn get(&self, index: usize) -> Result<Record, BackendError> {
        let value = self.get_json(&format!("/get/{}", index), &[])?;
        match value {
            Value::Object(record) => Ok(record),
            // An item that was never annotated may come back empty
            Value::Null => Ok(Record::new()),
            other => Err(BackendError::Decode {
                endpoint: "/get/",
                message: format!("expected an object, got {}", other),
            }),
        }
    }

    fn update(&self, payload: &Record) -> Result<(), BackendError> {
        tracing::debug!(idx = ?payload.get(crate::model::INDEX_KEY), "posting update");
        self.post_json("/update/", &Value::Object(payload.clone()))?;
        Ok(())
    }

    fn autocomplete(&self, field: &str) -> Result<Vec<String>, BackendError> {
        let value = self.get_json("/autocomplete/", &[("name", field)])?;
        decode("/autocomplete/", value)
    }

    fn search(&self, query: &str) -> Result<Vec<usize>, BackendError> {
        let value = self.post_json("/search/", &json!({ "query": query }))?;
        decode("/search/", value)
    }

    fn render(&self, start: usize, count: usize) -> Result<Rendered, BackendError> {
        let start_s = start.to_string();
        let count_s = count.to_string();
        let value = self.get_json("/render/", &[("start", &start_s), ("count", &count_s)])?;

        #[derive(serde::Deserialize)]
        struct Page {
            #[serde(default)]
            html: Vec<String>,
            #[serde(default)]
            obj: Vec<Record>,
        }
        let page: Page = decode("/render/", value)?;
        Ok(Rendered {
            html: page.html,
            items: page.obj,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:8080/", Duration::from_secs(1));
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(backend.url("/count/"), "http://localhost:8080/count/");
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on localhost is essentially never listening
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(500));
        match backend.count() {
            Err(BackendError::Transport { url, .. }) => assert!(url.ends_with("/count/")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
