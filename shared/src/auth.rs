use crate::passwords;
use crate::tokens::{self, Claims};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub(crate) fn body_str(body: &Body) -> &str {
    match body {
        Body::Text(text) => text,
        Body::Binary(bytes) => std::str::from_utf8(bytes).unwrap_or(""),
        Body::Empty => "",
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").map(str::trim)
}

/// Handle user login: verify the password hash, issue a session token
/// carrying the role claim.
pub async fn login(
    client: &DynamoClient,
    table_name: &str,
    token_secret: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    tracing::info!("Login request received");

    let login_request: LoginRequest = match serde_json::from_str(body_str(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            let error = ErrorResponse {
                error: "InvalidRequest".to_string(),
                message: format!("Invalid request body: {}", e),
            };
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::to_string(&error)?.into())
                .map_err(Box::new)?);
        }
    };

    tracing::info!("Authenticating user: {}", login_request.user_id);

    let pk = format!("USER#{}", login_request.user_id);
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;

    let item = match result.item() {
        Some(item) => item,
        None => {
            tracing::warn!("Login for unknown user: {}", login_request.user_id);
            return unauthorized("Invalid user");
        }
    };

    let stored_hash = item
        .get("password_hash")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.as_str())
        .unwrap_or_default();

    if !passwords::verify_password(&login_request.password, stored_hash) {
        tracing::warn!("Invalid password for user: {}", login_request.user_id);
        return unauthorized("Invalid credentials");
    }

    let role = item
        .get("role")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "user".to_string());

    let response = LoginResponse {
        token: tokens::issue_token(&login_request.user_id, &role, token_secret),
        role,
    };

    tracing::info!("Authentication successful for user: {}", login_request.user_id);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&response)?.into())
        .map_err(Box::new)?)
}

/// Report the role claim carried by the caller's bearer token.
pub async fn check_role(
    token_secret: &str,
    auth_header: Option<&str>,
) -> Result<Response<Body>, Error> {
    if auth_header.is_none() {
        return Ok(Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Authorization header missing"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    let token = bearer_token(auth_header).unwrap_or_default();
    match tokens::verify_token(token, token_secret) {
        Ok(claims) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({"role": claims.role}).to_string().into())
            .map_err(Box::new)?),
        Err(e) => {
            tracing::error!("Error decoding token: {}", e);
            Ok(Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::json!({"error": "Invalid token"}).to_string().into())
                .map_err(Box::new)?)
        }
    }
}

/// Gate for role-restricted routes. Returns the verified claims, or the
/// 401/403 response the router should send back unchanged.
pub fn require_role(
    auth_header: Option<&str>,
    token_secret: &str,
    allowed: &[&str],
) -> Result<Claims, Response<Body>> {
    let token = match bearer_token(auth_header) {
        Some(token) => token,
        None => return Err(denied(StatusCode::UNAUTHORIZED, "Missing bearer token")),
    };

    let claims = match tokens::verify_token(token, token_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("Rejected token: {}", e);
            return Err(denied(StatusCode::UNAUTHORIZED, "Invalid token"));
        }
    };

    if !allowed.contains(&claims.role.as_str()) {
        tracing::warn!("Role {} not allowed for this operation", claims.role);
        return Err(denied(StatusCode::FORBIDDEN, "Insufficient role"));
    }

    Ok(claims)
}

fn denied(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .unwrap_or_default()
}

fn unauthorized(message: &str) -> Result<Response<Body>, Error> {
    let error = ErrorResponse {
        error: "AuthenticationFailed".to_string(),
        message: message.to_string(),
    };
    Ok(Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&error)?.into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::issue_token;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("abc.def.ghi")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_require_role_allows_listed_role() {
        let token = issue_token("u1", "admin", "s3cret");
        let header = format!("Bearer {}", token);
        let claims = require_role(Some(&header), "s3cret", &["admin"]).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn test_require_role_rejects_other_role() {
        let token = issue_token("u1", "user", "s3cret");
        let header = format!("Bearer {}", token);
        let resp = require_role(Some(&header), "s3cret", &["admin", "driver"]).unwrap_err();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_require_role_rejects_missing_header() {
        let resp = require_role(None, "s3cret", &["admin"]).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
