use binwise_shared::{auth, bin_regions, complaints, contact, users, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use std::env;
use std::sync::Arc;

/// Main Lambda handler - routes requests to the shared domain handlers
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header(
                "Access-Control-Allow-Methods",
                "GET,POST,PUT,PATCH,DELETE,OPTIONS",
            )
            .header(
                "Access-Control-Allow-Headers",
                "Content-Type,Authorization",
            )
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "binwise".to_string());
    let token_secret = env::var("TOKEN_SECRET").expect("TOKEN_SECRET must be set");

    let auth_header = event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    // Auth endpoints
    if path == "/login" {
        return match method {
            &Method::POST => {
                auth::login(&state.dynamo_client, &table_name, &token_secret, body).await
            }
            _ => method_not_allowed(),
        };
    }

    if path == "/check-role" {
        return match method {
            &Method::GET => auth::check_role(&token_secret, auth_header).await,
            _ => method_not_allowed(),
        };
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // --- CONTACT ---
        (&Method::POST, ["contact", action]) => {
            contact::save_contact_message(&state.dynamo_client, &table_name, action, body).await
        }

        // --- USERS ---
        (&Method::POST, ["users"]) => {
            users::create_user(&state.dynamo_client, &table_name, body).await
        }
        (&Method::GET, ["users"]) | (&Method::GET, ["all-users"]) => {
            users::list_users(&state.dynamo_client, &table_name).await
        }
        (&Method::GET, ["users", "count"]) => {
            users::count_users(&state.dynamo_client, &table_name).await
        }
        (&Method::GET, ["drivers"]) => {
            users::list_drivers(&state.dynamo_client, &table_name).await
        }
        (&Method::GET, ["drivers", "count"]) => {
            users::count_drivers(&state.dynamo_client, &table_name).await
        }
        (&Method::POST, ["update-user-details"]) => {
            users::update_user_details(&state.dynamo_client, &table_name, &token_secret, body)
                .await
        }
        (&Method::POST, ["change-role"]) => {
            if let Err(resp) = auth::require_role(auth_header, &token_secret, &["admin"]) {
                return Ok(resp);
            }
            users::change_role(&state.dynamo_client, &table_name, &token_secret, body).await
        }
        (&Method::POST, ["update-user"]) => {
            users::update_user(&state.dynamo_client, &table_name, body).await
        }
        (&Method::POST, ["update-username"]) => {
            users::update_username(&state.dynamo_client, &table_name, &token_secret, body).await
        }
        (&Method::DELETE, ["delete-user", user_id]) => {
            if let Err(resp) = auth::require_role(auth_header, &token_secret, &["admin"]) {
                return Ok(resp);
            }
            users::delete_user(&state.dynamo_client, &table_name, user_id).await
        }

        // --- COMPLAINTS ---
        (&Method::POST, ["complaints"]) => {
            complaints::add_complaint(&state.dynamo_client, &state.s3_client, &table_name, body)
                .await
        }
        (&Method::GET, ["complaints"]) => {
            complaints::list_complaints(&state.dynamo_client, &state.s3_client, &table_name).await
        }
        (&Method::GET, ["complaints", "assigned"]) => {
            complaints::list_assigned_complaints(
                &state.dynamo_client,
                &state.s3_client,
                &table_name,
            )
            .await
        }
        (&Method::GET, ["complaints", "count"]) => {
            complaints::count_complaints(&state.dynamo_client, &table_name).await
        }
        (&Method::GET, ["complaints", "resolved", "count"]) => {
            complaints::count_resolved_complaints(&state.dynamo_client, &table_name).await
        }
        (&Method::GET, ["complaints", "progress", "count"]) => {
            complaints::count_in_progress_complaints(&state.dynamo_client, &table_name).await
        }
        (&Method::POST, ["update-complaint-status", id]) => {
            if let Err(resp) =
                auth::require_role(auth_header, &token_secret, &["driver", "admin"])
            {
                return Ok(resp);
            }
            let complaint_id = match id.parse::<u64>() {
                Ok(id) => id,
                Err(_) => return invalid_complaint_id(),
            };
            complaints::update_complaint_status(
                &state.dynamo_client,
                &table_name,
                complaint_id,
                body,
            )
            .await
        }
        (&Method::POST, ["assign-driver"]) => {
            if let Err(resp) = auth::require_role(auth_header, &token_secret, &["admin"]) {
                return Ok(resp);
            }
            complaints::assign_driver(&state.dynamo_client, &table_name, body).await
        }

        // --- BIN REGIONS ---
        (&Method::POST, ["add-bin-region"]) => {
            if let Err(resp) = auth::require_role(auth_header, &token_secret, &["admin"]) {
                return Ok(resp);
            }
            bin_regions::add_bin_region(&state.dynamo_client, &table_name, body).await
        }
        (&Method::GET, ["bins"]) => {
            bin_regions::list_bin_regions(&state.dynamo_client, &table_name).await
        }
        (&Method::GET, ["bins", "count"]) => {
            bin_regions::count_bin_regions(&state.dynamo_client, &table_name).await
        }
        (&Method::PATCH, ["bins", region_code]) => {
            if let Err(resp) = auth::require_role(auth_header, &token_secret, &["admin"]) {
                return Ok(resp);
            }
            bin_regions::update_region_status(&state.dynamo_client, &table_name, region_code, body)
                .await
        }
        (&Method::DELETE, ["delete-bin-region", region_code]) => {
            if let Err(resp) = auth::require_role(auth_header, &token_secret, &["admin"]) {
                return Ok(resp);
            }
            bin_regions::delete_bin_region(&state.dynamo_client, &table_name, region_code).await
        }

        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    }
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn invalid_complaint_id() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Invalid complaint id"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}
