use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{http_client, NotificationError, PushMessage, PushSender, PushTarget};
use crate::config::PushConfig;

/// OneSignal notifications client.
#[derive(Clone)]
pub struct OneSignalPushSender {
    client: reqwest::Client,
    config: PushConfig,
}

impl OneSignalPushSender {
    pub fn new(config: PushConfig, timeout: Duration) -> Result<Self, NotificationError> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }

    fn payload(&self, target: &PushTarget, message: &PushMessage) -> Value {
        let mut payload = json!({
            "app_id": self.config.app_id,
            "headings": { "en": message.title },
            "contents": { "en": message.body },
            "data": message.data,
        });

        match target {
            PushTarget::AllSubscribers => {
                payload["included_segments"] = json!(["All"]);
            }
            PushTarget::Subscriber(player_id) => {
                payload["include_player_ids"] = json!([player_id]);
            }
        }
        if let Some(icon) = &self.config.icon_url {
            payload["chrome_web_icon"] = json!(icon);
        }
        if let Some(url) = &self.config.launch_url {
            payload["url"] = json!(url);
        }
        payload
    }
}

#[async_trait]
impl PushSender for OneSignalPushSender {
    #[instrument(skip(self, message), fields(kind = ?message.data.kind, order_number = %message.data.order_number))]
    async fn send_push(
        &self,
        target: PushTarget,
        message: PushMessage,
    ) -> Result<(), NotificationError> {
        if !self.config.enabled {
            return Err(NotificationError::Disabled("Push disabled"));
        }
        if !self.config.has_app_id() {
            return Err(NotificationError::NotConfigured("OneSignal not configured"));
        }

        let response = self
            .client
            .post(format!(
                "{}/notifications",
                self.config.api_base.trim_end_matches('/')
            ))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.config.rest_api_key),
            )
            .json(&self.payload(&target, &message))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            debug!("push accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "OneSignal rejected push");
        Err(NotificationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{PushData, PushKind};
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(kind: PushKind) -> PushMessage {
        PushMessage {
            title: "On The Way!".into(),
            body: "Your order ORD-1 is out for delivery. See you soon!".into(),
            data: PushData {
                order_number: "ORD-1".into(),
                kind,
            },
        }
    }

    fn configured(server: &MockServer) -> PushConfig {
        PushConfig {
            app_id: "22fa0af9-app".into(),
            rest_api_key: "rest-key".into(),
            api_base: server.uri(),
            ..PushConfig::default()
        }
    }

    #[tokio::test]
    async fn targets_a_single_subscriber() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications"))
            .and(header("authorization", "Basic rest-key"))
            .and(body_partial_json(json!({
                "app_id": "22fa0af9-app",
                "include_player_ids": ["player-1"],
                "data": { "orderNumber": "ORD-1", "type": "out_for_delivery" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "n1" })))
            .expect(1)
            .mount(&server)
            .await;

        let push = OneSignalPushSender::new(configured(&server), Duration::from_secs(5)).unwrap();
        push.send_push(
            PushTarget::Subscriber("player-1".into()),
            message(PushKind::OutForDelivery),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn broadcasts_to_all_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications"))
            .and(body_partial_json(json!({ "included_segments": ["All"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "n2" })))
            .expect(1)
            .mount(&server)
            .await;

        let push = OneSignalPushSender::new(configured(&server), Duration::from_secs(5)).unwrap();
        push.send_push(PushTarget::AllSubscribers, message(PushKind::NewOrder))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn guards_and_rejections() {
        let push = OneSignalPushSender::new(PushConfig::default(), Duration::from_secs(5)).unwrap();
        assert_matches!(
            push.send_push(PushTarget::AllSubscribers, message(PushKind::NewOrder)).await,
            Err(NotificationError::NotConfigured(_))
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad app"))
            .mount(&server)
            .await;
        let push = OneSignalPushSender::new(configured(&server), Duration::from_secs(5)).unwrap();
        assert_matches!(
            push.send_push(PushTarget::AllSubscribers, message(PushKind::NewOrder)).await,
            Err(NotificationError::Rejected { status: 400, .. })
        );

        let disabled = OneSignalPushSender::new(
            PushConfig {
                enabled: false,
                ..configured(&server)
            },
            Duration::from_secs(5),
        )
        .unwrap();
        assert_matches!(
            disabled
                .send_push(PushTarget::AllSubscribers, message(PushKind::NewOrder))
                .await,
            Err(NotificationError::Disabled(_))
        );
    }
}
