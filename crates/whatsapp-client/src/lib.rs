//! WhatsApp Cloud API client.

mod client;
mod error;
mod phone;
mod types;
mod webhook;

pub use client::{WhatsAppClient, DEFAULT_API_URL, DEFAULT_API_VERSION};
pub use error::WhatsAppError;
pub use phone::{normalize_phone_number, DEFAULT_COUNTRY_CODE};
pub use types::*;
pub use webhook::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_client(mock_server: &MockServer) -> WhatsAppClient {
        WhatsAppClient::new(mock_server.uri(), "v17.0", Duration::from_secs(5))
            .unwrap()
            .with_credentials(Some("test-token".into()), Some("1234".into()))
            .with_business_account(Some("waba-1".into()))
    }

    #[tokio::test]
    async fn test_send_template_with_copy_code_button() {
        let mock_server = MockServer::start().await;

        let expected = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": "+923176227245",
            "type": "template",
            "template": {
                "name": "otp_verification",
                "language": {"code": "en_US"},
                "components": [
                    {"type": "body", "parameters": [
                        {"type": "text", "text": "123456"},
                        {"type": "text", "text": "MSL Card"}
                    ]},
                    {"type": "button", "sub_type": "url", "index": 0, "parameters": [
                        {"type": "text", "text": "123456"}
                    ]}
                ]
            }
        });

        Mock::given(method("POST"))
            .and(path("/v17.0/1234/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": "wamid.ABC"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let template = TemplateMessage::new("otp_verification", "en_US")
            .with_parameters(["123456", "MSL Card"])
            .with_button(Some(TemplateButton::copy_code("123456")));

        let response = client.send_template("03176227245", &template).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.message_id(), Some("wamid.ABC"));
    }

    #[tokio::test]
    async fn test_provider_error_is_returned_verbatim() {
        let mock_server = MockServer::start().await;

        let error_body = serde_json::json!({
            "error": {"message": "Invalid parameter", "code": 100}
        });

        Mock::given(method("POST"))
            .and(path("/v17.0/1234/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let template = TemplateMessage::new("approved", "en");
        let response = client.send_template("03001234567", &template).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, 400);
        assert_eq!(response.body, error_body);
    }

    #[tokio::test]
    async fn test_not_configured_makes_no_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = WhatsAppClient::new(mock_server.uri(), "v17.0", Duration::from_secs(5))
            .unwrap()
            .with_credentials(Some("token".into()), Some("  ".into()));

        assert!(!client.is_configured());
        let result = client.send_text("03001234567", "hi").await;
        assert!(matches!(result, Err(WhatsAppError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_send_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v17.0/1234/messages"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "+923001234567",
                "type": "text",
                "text": {"body": "Welcome!"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.T"}]
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let response = client.send_text("0300-1234567", "Welcome!").await.unwrap();
        assert_eq!(response.message_id(), Some("wamid.T"));
    }

    #[tokio::test]
    async fn test_send_image_defaults_caption() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v17.0/1234/messages"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "+923001234567",
                "type": "image",
                "image": {"link": "https://example.org/card.png", "caption": ""}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let response = client
            .send_image("923001234567", "https://example.org/card.png", None)
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_non_json_reply_is_kept_as_string() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v17.0/1234/messages"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let response = client.send_text("03001234567", "hi").await.unwrap();
        assert_eq!(response.status, 502);
        assert_eq!(response.body, serde_json::json!("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_list_message_templates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v17.0/waba-1/message_templates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"name": "approved", "language": "en", "status": "APPROVED", "category": "UTILITY"},
                    {"name": "otp_verification", "language": "en_US", "status": "APPROVED"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let templates = client.list_message_templates().await.unwrap();
        assert_eq!(templates.data.len(), 2);
        assert_eq!(templates.data[0].name, "approved");
        assert_eq!(templates.data[1].language.as_deref(), Some("en_US"));
    }

    #[tokio::test]
    async fn test_list_templates_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v17.0/waba-1/message_templates"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired token"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.list_message_templates().await;
        assert!(matches!(result, Err(WhatsAppError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_list_templates_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v17.0/waba-1/message_templates"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.list_message_templates().await;
        assert!(matches!(result, Err(WhatsAppError::Json(_))));
    }

    #[test]
    fn test_components_without_parameters_or_button() {
        let template = TemplateMessage::new("approved", "en");
        assert!(template.components().is_empty());
    }

    #[test]
    fn test_generic_button_kind() {
        let template = TemplateMessage::new("memeber_register", "en_US")
            .with_parameters(["Ali", "MSL-001"])
            .with_button(Some(TemplateButton {
                kind: ButtonKind::QuickReply,
                value: "yes".into(),
            }));

        let components = template.components();
        assert_eq!(components.len(), 2);
        assert_eq!(
            components[1],
            Component::Button {
                sub_type: "quick_reply".into(),
                index: 0,
                parameters: vec![Parameter::text("yes")],
            }
        );
    }
}
