use super::{ensure_success, NotifyError};

/// Spreadsheet webhook that records lucky-number entries. The script host answers
/// with a redirect, so the entry travels as GET query parameters.
#[derive(Clone)]
pub struct ScriptWebhookClient {
    client: reqwest::Client,
    url: String,
}

impl ScriptWebhookClient {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim().to_string(),
        }
    }

    pub async fn record_lucky_number(
        &self,
        email: &str,
        lucky_number: i32,
        business_name: Option<&str>,
    ) -> Result<(), NotifyError> {
        let business_name = business_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("N/A");
        let lucky_number = lucky_number.to_string();

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("email", email),
                ("luckyNumber", lucky_number.as_str()),
                ("businessName", business_name),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        log::info!("Lucky-number webhook answered {}", response.status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_entry_as_query_parameters_and_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exec"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/echo", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/echo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ScriptWebhookClient::new(format!("{}/exec", server.uri()));
        client
            .record_lucky_number("lan@example.com", 8888, None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let first = &requests[0];
        let pairs: Vec<(String, String)> = first
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("email".into(), "lan@example.com".into())));
        assert!(pairs.contains(&("luckyNumber".into(), "8888".into())));
        assert!(pairs.contains(&("businessName".into(), "N/A".into())));
    }

    #[tokio::test]
    async fn non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("businessName", "Phở Hòa"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ScriptWebhookClient::new(server.uri());
        let err = client
            .record_lucky_number("lan@example.com", 1234, Some("Phở Hòa"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Upstream { status: 500, .. }));
    }
}
