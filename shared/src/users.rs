use crate::passwords;
use crate::tokens;
use crate::types::{
    ChangeRoleRequest, CreateUserRequest, UpdateUserDetailsRequest, UpdateUserInlineRequest,
    UpdateUserRequest, UpdateUsernameRequest, User,
};
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

const ROLES: [&str; 3] = ["user", "driver", "admin"];

fn user_from_item(item: &HashMap<String, AttributeValue>) -> User {
    let user_id = item
        .get("PK")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| s.strip_prefix("USER#"))
        .unwrap_or_default()
        .to_string();

    User {
        user_id,
        name: item
            .get("name")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        email: item
            .get("email")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        phone: item
            .get("phone")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        address: item
            .get("address")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        role: item
            .get("role")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "user".to_string()),
        entry_date: item
            .get("entry_date")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

/// Full-table scan over USER# records, optionally restricted to a role.
async fn scan_users(
    client: &DynamoClient,
    table_name: &str,
    role: Option<&str>,
) -> Result<Vec<User>, Error> {
    let mut users = Vec::new();
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .expression_attribute_values(":prefix", AttributeValue::S("USER#".to_string()));

        if let Some(role) = role {
            req = req
                .filter_expression("begins_with(PK, :prefix) AND #role = :role")
                .expression_attribute_names("#role", "role")
                .expression_attribute_values(":role", AttributeValue::S(role.to_string()));
        } else {
            req = req.filter_expression("begins_with(PK, :prefix)");
        }

        if let Some(key) = start_key {
            req = req.set_exclusive_start_key(Some(key));
        }

        let resp = req.send().await?;
        users.extend(resp.items().iter().map(user_from_item));

        match resp.last_evaluated_key() {
            Some(key) => start_key = Some(key.clone()),
            None => break,
        }
    }

    Ok(users)
}

/// Count USER# records, optionally restricted to a role.
async fn count_users_where(
    client: &DynamoClient,
    table_name: &str,
    role: Option<&str>,
) -> Result<i64, Error> {
    let mut total: i64 = 0;
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .select(Select::Count)
            .expression_attribute_values(":prefix", AttributeValue::S("USER#".to_string()));

        if let Some(role) = role {
            req = req
                .filter_expression("begins_with(PK, :prefix) AND #role = :role")
                .expression_attribute_names("#role", "role")
                .expression_attribute_values(":role", AttributeValue::S(role.to_string()));
        } else {
            req = req.filter_expression("begins_with(PK, :prefix)");
        }

        if let Some(key) = start_key {
            req = req.set_exclusive_start_key(Some(key));
        }

        let resp = req.send().await?;
        total += resp.count() as i64;

        match resp.last_evaluated_key() {
            Some(key) => start_key = Some(key.clone()),
            None => break,
        }
    }

    Ok(total)
}

async fn get_user_item(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Option<HashMap<String, AttributeValue>>, Error> {
    let pk = format!("USER#{}", user_id);
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;
    Ok(result.item().cloned())
}

/// Register a new user. The email and user id must both be unused; the
/// password is hashed before the record is stored.
pub async fn create_user(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateUserRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("[REGISTER] Parse error: {}", e);
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

    if !ROLES.contains(&req.role.as_str()) {
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Role must be one of user, driver, admin"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    // Same user id already registered?
    let mut exists = get_user_item(client, table_name, &req.user_id)
        .await?
        .is_some();

    // Same email already registered?
    if !exists {
        exists = count_users_with_email(client, table_name, &req.email).await? > 0;
    }

    if exists {
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "User with the same email or userId already exists"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    let password_hash = passwords::hash_password(&req.password)?;
    let now = chrono::Utc::now().to_rfc3339();
    let pk = format!("USER#{}", req.user_id);

    let mut put_request = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk.clone()))
        .item("SK", AttributeValue::S(pk))
        .item("name", AttributeValue::S(req.name.clone()))
        .item("email", AttributeValue::S(req.email.clone()))
        .item("password_hash", AttributeValue::S(password_hash))
        .item("role", AttributeValue::S(req.role.clone()))
        .item("entry_date", AttributeValue::S(now.clone()));

    if let Some(phone) = &req.phone {
        put_request = put_request.item("phone", AttributeValue::S(phone.clone()));
    }

    if let Some(address) = &req.address {
        put_request = put_request.item("address", AttributeValue::S(address.clone()));
    }

    put_request.send().await?;

    tracing::info!("[REGISTER] Created user: {}", req.user_id);

    let user = User {
        user_id: req.user_id,
        name: req.name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        role: req.role,
        entry_date: now,
    };

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&user)?.into())
        .map_err(Box::new)?)
}

async fn count_users_with_email(
    client: &DynamoClient,
    table_name: &str,
    email: &str,
) -> Result<i64, Error> {
    let mut total: i64 = 0;
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .select(Select::Count)
            .filter_expression("begins_with(PK, :prefix) AND email = :email")
            .expression_attribute_values(":prefix", AttributeValue::S("USER#".to_string()))
            .expression_attribute_values(":email", AttributeValue::S(email.to_string()));

        if let Some(key) = start_key {
            req = req.set_exclusive_start_key(Some(key));
        }

        let resp = req.send().await?;
        total += resp.count() as i64;

        match resp.last_evaluated_key() {
            Some(key) => start_key = Some(key.clone()),
            None => break,
        }
    }

    Ok(total)
}

/// List all users (GET /users and GET /all-users)
pub async fn list_users(client: &DynamoClient, table_name: &str) -> Result<Response<Body>, Error> {
    let users = scan_users(client, table_name, None).await?;

    if users.is_empty() {
        return Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({"error": "Users not found"}).to_string().into())
            .map_err(Box::new)?);
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&users)?.into())
        .map_err(Box::new)?)
}

/// Count all users
pub async fn count_users(client: &DynamoClient, table_name: &str) -> Result<Response<Body>, Error> {
    let count = count_users_where(client, table_name, None).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"totalUsersCount": count})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// List driver-role users
pub async fn list_drivers(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let drivers = scan_users(client, table_name, Some("driver")).await?;

    if drivers.is_empty() {
        return Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "No driver users found"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&drivers)?.into())
        .map_err(Box::new)?)
}

/// Count driver-role users (response key kept from the legacy API)
pub async fn count_drivers(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let count = count_users_where(client, table_name, Some("driver")).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"totalUsersCount": count})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Apply a partial profile update via a dynamic update expression.
async fn apply_user_update(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    details: &UpdateUserRequest,
) -> Result<(), Error> {
    let pk = format!("USER#{}", user_id);

    let mut update_expr = vec![];
    let mut expr_names = HashMap::new();
    let mut expr_values = HashMap::new();

    if let Some(name) = &details.name {
        update_expr.push("#name = :name");
        expr_names.insert("#name".to_string(), "name".to_string());
        expr_values.insert(":name".to_string(), AttributeValue::S(name.clone()));
    }

    if let Some(email) = &details.email {
        update_expr.push("email = :email");
        expr_values.insert(":email".to_string(), AttributeValue::S(email.clone()));
    }

    if let Some(phone) = &details.phone {
        update_expr.push("phone = :phone");
        expr_values.insert(":phone".to_string(), AttributeValue::S(phone.clone()));
    }

    if let Some(address) = &details.address {
        update_expr.push("address = :address");
        expr_values.insert(":address".to_string(), AttributeValue::S(address.clone()));
    }

    if update_expr.is_empty() {
        return Ok(());
    }

    let mut builder = client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .update_expression(format!("SET {}", update_expr.join(", ")));

    for (k, v) in expr_names {
        builder = builder.expression_attribute_names(k, v);
    }

    for (k, v) in expr_values {
        builder = builder.expression_attribute_values(k, v);
    }

    builder.send().await?;
    Ok(())
}

/// Update user details and re-issue the session token (the claims may
/// have changed with the profile).
pub async fn update_user_details(
    client: &DynamoClient,
    table_name: &str,
    token_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateUserDetailsRequest = serde_json::from_slice(body)?;

    if get_user_item(client, table_name, &req.user_id).await?.is_none() {
        tracing::warn!("[UPDATE] Unknown user: {}", req.user_id);
        return Ok(Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({"error": "Invalid user"}).to_string().into())
            .map_err(Box::new)?);
    }

    apply_user_update(client, table_name, &req.user_id, &req.new_details).await?;

    let updated = get_user_item(client, table_name, &req.user_id)
        .await?
        .map(|item| user_from_item(&item))
        .ok_or("User disappeared during update")?;

    let token = tokens::issue_token(&updated.user_id, &updated.role, token_secret);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"token": token, "user": updated})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Change a user's role and re-issue the token embedding the new role.
pub async fn change_role(
    client: &DynamoClient,
    table_name: &str,
    token_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: ChangeRoleRequest = serde_json::from_slice(body)?;

    if !ROLES.contains(&req.new_role.as_str()) {
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Role must be one of user, driver, admin"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    if get_user_item(client, table_name, &req.user_id).await?.is_none() {
        return user_not_found();
    }

    let pk = format!("USER#{}", req.user_id);
    client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .update_expression("SET #role = :role")
        .expression_attribute_names("#role", "role")
        .expression_attribute_values(":role", AttributeValue::S(req.new_role.clone()))
        .send()
        .await?;

    tracing::info!("[ROLE] {} -> {}", req.user_id, req.new_role);

    let token = tokens::issue_token(&req.user_id, &req.new_role, token_secret);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"token": token, "role": req.new_role})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Partial profile update without token re-issue (POST /update-user)
pub async fn update_user(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateUserInlineRequest = serde_json::from_slice(body)?;

    if get_user_item(client, table_name, &req.user_id).await?.is_none() {
        return user_not_found();
    }

    apply_user_update(client, table_name, &req.user_id, &req.details).await?;

    let updated = get_user_item(client, table_name, &req.user_id)
        .await?
        .map(|item| user_from_item(&item))
        .ok_or("User disappeared during update")?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&updated)?.into())
        .map_err(Box::new)?)
}

/// Rename a user and re-issue the session token.
pub async fn update_username(
    client: &DynamoClient,
    table_name: &str,
    token_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateUsernameRequest = serde_json::from_slice(body)?;

    let existing = match get_user_item(client, table_name, &req.user_id).await? {
        Some(item) => user_from_item(&item),
        None => return user_not_found(),
    };

    let details = UpdateUserRequest {
        name: Some(req.new_username.clone()),
        ..Default::default()
    };
    apply_user_update(client, table_name, &req.user_id, &details).await?;

    let token = tokens::issue_token(&req.user_id, &existing.role, token_secret);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"token": token, "username": req.new_username})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Delete a user record
pub async fn delete_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    tracing::info!("[DELETE] User: {}", user_id);

    if get_user_item(client, table_name, user_id).await?.is_none() {
        return user_not_found();
    }

    let pk = format!("USER#{}", user_id);
    client
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"message": "User deleted successfully"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn user_not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "User not found"}).to_string().into())
        .map_err(Box::new)?)
}
