use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{http_client, NotificationError, SmsSender};
use crate::config::SmsConfig;

static PHONE_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-()]").unwrap());

/// Normalizes a Philippine mobile number to the `63XXXXXXXXXX` form the SMS
/// gateway expects.
pub fn normalize_phone(raw: &str) -> String {
    let mut number = PHONE_NOISE.replace_all(raw.trim(), "").into_owned();

    if let Some(rest) = number.strip_prefix('0') {
        number = format!("63{}", rest);
    }
    if !number.starts_with("63") && !number.starts_with("+63") {
        number = format!("63{}", number);
    }
    number.replacen('+', "", 1)
}

/// Semaphore SMS client.
#[derive(Clone)]
pub struct SemaphoreSmsSender {
    client: reqwest::Client,
    config: SmsConfig,
}

impl SemaphoreSmsSender {
    pub fn new(config: SmsConfig, timeout: Duration) -> Result<Self, NotificationError> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl SmsSender for SemaphoreSmsSender {
    #[instrument(skip(self, message))]
    async fn send_sms(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        if !self.config.enabled {
            return Err(NotificationError::Disabled("SMS disabled"));
        }
        if !self.config.has_api_key() {
            return Err(NotificationError::NotConfigured("API key not configured"));
        }

        let number = normalize_phone(phone);
        debug!(number = %number, "sending SMS");

        let response = self
            .client
            .post(self.messages_url())
            .form(&[
                ("apikey", self.config.api_key.as_str()),
                ("number", number.as_str()),
                ("message", message),
                ("sendername", self.config.sender_name.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "SMS gateway rejected message");
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "0123456789abcdef0123456789";

    #[rstest]
    #[case("09171234567", "639171234567")]
    #[case("0917-123-4567", "639171234567")]
    #[case("(0917) 123 4567", "639171234567")]
    #[case("+639171234567", "639171234567")]
    #[case("639171234567", "639171234567")]
    #[case("9171234567", "639171234567")]
    fn normalizes_phone_numbers(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_phone(raw), expected);
    }

    fn sender(config: SmsConfig) -> SemaphoreSmsSender {
        SemaphoreSmsSender::new(config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn disabled_or_unconfigured_is_not_attempted() {
        let disabled = sender(SmsConfig {
            enabled: false,
            api_key: KEY.into(),
            ..SmsConfig::default()
        });
        assert_matches!(
            disabled.send_sms("09171234567", "hi").await,
            Err(NotificationError::Disabled(_))
        );

        let placeholder = sender(SmsConfig::default());
        let err = placeholder.send_sms("09171234567", "hi").await.unwrap_err();
        assert!(err.is_skip());
        assert_eq!(err.to_string(), "API key not configured");
    }

    #[tokio::test]
    async fn posts_form_encoded_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_string_contains("number=639171234567"))
            .and(body_string_contains("sendername=Kuchefnero"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "message_id": 1 }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sms = sender(SmsConfig {
            api_key: KEY.into(),
            api_base: server.uri(),
            ..SmsConfig::default()
        });
        sms.send_sms("0917 123 4567", "Order confirmed").await.unwrap();
    }

    #[tokio::test]
    async fn non_200_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let sms = sender(SmsConfig {
            api_key: KEY.into(),
            api_base: server.uri(),
            ..SmsConfig::default()
        });
        assert_matches!(
            sms.send_sms("09171234567", "hi").await,
            Err(NotificationError::Rejected { status: 401, .. })
        );
    }
}
