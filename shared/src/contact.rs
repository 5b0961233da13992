use crate::auth::body_str;
use crate::types::ContactRequest;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::Utc;
use lambda_http::{http::StatusCode, Body, Error, Response};
use uuid::Uuid;

/// Store a contact-form message (POST /contact/{action}, action = "send")
pub async fn save_contact_message(
    client: &DynamoClient,
    table_name: &str,
    action: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    if action != "send" {
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({"error": "Invalid Request"}).to_string().into())
            .map_err(Box::new)?);
    }

    let request: ContactRequest = match serde_json::from_str(body_str(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse contact message: {}", e);
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": format!("Invalid request body: {}", e)})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?);
        }
    };

    let message_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let mut put_request = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(format!("CONTACT#{}", message_id)))
        .item("SK", AttributeValue::S("METADATA".to_string()))
        .item("email", AttributeValue::S(request.email.clone()))
        .item("website", AttributeValue::S(request.website.clone()))
        .item("message", AttributeValue::S(request.message.clone()))
        .item("entry_date", AttributeValue::S(now.to_rfc3339()));

    if let Some(name) = &request.name {
        put_request = put_request.item("name", AttributeValue::S(name.clone()));
    }

    if let Some(phone) = &request.phone {
        put_request = put_request.item("phone", AttributeValue::S(phone.clone()));
    }

    if let Some(address) = &request.address {
        put_request = put_request.item("address", AttributeValue::S(address.clone()));
    }

    match put_request.send().await {
        Ok(_) => {
            tracing::info!("Contact message stored: {}", message_id);
            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"message": "Message sent. Thank you."})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
        Err(e) => {
            tracing::error!("Failed to store contact message: {:?}", e);
            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Failed to send message"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
    }
}
