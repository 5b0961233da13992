use crate::photos;
use crate::types::{
    AssignDriverRequest, Complaint, CreateComplaintRequest, UpdateComplaintStatusRequest,
};
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

/// Complaint lifecycle states
pub(crate) fn is_valid_status(status: &str) -> bool {
    matches!(status, "New" | "In Progress" | "Resolved")
}

fn complaint_from_item(item: &HashMap<String, AttributeValue>) -> Complaint {
    Complaint {
        complaint_id: item
            .get("complaint_id")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or_default(),
        bin_photo: item
            .get("photo_key")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        location: item
            .get("location")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        user_name: item
            .get("user_name")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        user_phone: item
            .get("user_phone")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        bin_address: item
            .get("bin_address")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        status: item
            .get("status")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "New".to_string()),
        assigned_driver: item
            .get("assigned_driver")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
    }
}

/// Count COMPLAINT# records, optionally restricted to a status.
async fn count_complaints_where(
    client: &DynamoClient,
    table_name: &str,
    status: Option<&str>,
) -> Result<i64, Error> {
    let mut total: i64 = 0;
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .select(Select::Count)
            .expression_attribute_values(":prefix", AttributeValue::S("COMPLAINT#".to_string()));

        if let Some(status) = status {
            req = req
                .filter_expression("begins_with(PK, :prefix) AND #status = :status")
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(":status", AttributeValue::S(status.to_string()));
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

/// Scan COMPLAINT# records; `assigned_only` keeps just the ones with a driver.
async fn scan_complaints(
    client: &DynamoClient,
    table_name: &str,
    assigned_only: bool,
) -> Result<Vec<Complaint>, Error> {
    let mut complaints = Vec::new();
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    let filter = if assigned_only {
        "begins_with(PK, :prefix) AND attribute_exists(assigned_driver)"
    } else {
        "begins_with(PK, :prefix)"
    };

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .filter_expression(filter)
            .expression_attribute_values(":prefix", AttributeValue::S("COMPLAINT#".to_string()));

        if let Some(key) = start_key {
            req = req.set_exclusive_start_key(Some(key));
        }

        let resp = req.send().await?;
        complaints.extend(resp.items().iter().map(complaint_from_item));

        match resp.last_evaluated_key() {
            Some(key) => start_key = Some(key.clone()),
            None => break,
        }
    }

    complaints.sort_by_key(|c| c.complaint_id);
    Ok(complaints)
}

async fn get_complaint_item(
    client: &DynamoClient,
    table_name: &str,
    complaint_id: u64,
) -> Result<Option<HashMap<String, AttributeValue>>, Error> {
    let pk = format!("COMPLAINT#{}", complaint_id);
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;
    Ok(result.item().cloned())
}

/// Replace stored S3 keys with inline data URLs for the dashboard.
async fn inline_photos(s3_client: &S3Client, complaints: &mut [Complaint]) {
    for complaint in complaints.iter_mut() {
        match photos::fetch_bin_photo(s3_client, &complaint.bin_photo).await {
            Ok(bytes) => complaint.bin_photo = photos::data_url(&bytes),
            Err(e) => {
                tracing::error!(
                    "Failed to fetch photo for complaint {}: {}",
                    complaint.complaint_id,
                    e
                );
                complaint.bin_photo = String::new();
            }
        }
    }
}

/// Submit a new complaint: validate and store the bin photo, then write the
/// record under the next sequential complaint id.
pub async fn add_complaint(
    client: &DynamoClient,
    s3_client: &S3Client,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateComplaintRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("[COMPLAINT] Parse error: {}", e);
            return bad_request(&format!("Invalid request body: {}", e));
        }
    };

    if req.bin_photo.is_empty() {
        return bad_request("No bin photo uploaded");
    }

    if req.location.is_empty()
        || req.user_name.is_empty()
        || req.user_phone.is_empty()
        || req.bin_address.is_empty()
    {
        return bad_request("Missing required fields");
    }

    let jpeg_bytes = match photos::prepare_bin_photo(&req.bin_photo) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("[COMPLAINT] Photo rejected: {}", e);
            return bad_request(&e);
        }
    };

    // Sequential id derived from the current record count
    let complaint_id = (count_complaints_where(client, table_name, None).await? + 1) as u64;
    let photo_key = photos::photo_key(complaint_id);

    photos::store_bin_photo(s3_client, &photo_key, jpeg_bytes).await?;

    let pk = format!("COMPLAINT#{}", complaint_id);
    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk.clone()))
        .item("SK", AttributeValue::S(pk))
        .item("complaint_id", AttributeValue::N(complaint_id.to_string()))
        .item("photo_key", AttributeValue::S(photo_key))
        .item("location", AttributeValue::S(req.location))
        .item("user_name", AttributeValue::S(req.user_name))
        .item("user_phone", AttributeValue::S(req.user_phone))
        .item("bin_address", AttributeValue::S(req.bin_address))
        .item("status", AttributeValue::S("New".to_string()))
        .send()
        .await?;

    tracing::info!("[COMPLAINT] Created complaint {}", complaint_id);

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"message": "Complaint added successfully"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// List all complaints with photos inlined as data URLs
pub async fn list_complaints(
    client: &DynamoClient,
    s3_client: &S3Client,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let mut complaints = scan_complaints(client, table_name, false).await?;
    inline_photos(s3_client, &mut complaints).await;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&complaints)?.into())
        .map_err(Box::new)?)
}

/// List complaints that already have a driver assigned
pub async fn list_assigned_complaints(
    client: &DynamoClient,
    s3_client: &S3Client,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let mut complaints = scan_complaints(client, table_name, true).await?;
    inline_photos(s3_client, &mut complaints).await;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&complaints)?.into())
        .map_err(Box::new)?)
}

/// Count all complaints
pub async fn count_complaints(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let count = count_complaints_where(client, table_name, None).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"count": count}).to_string().into())
        .map_err(Box::new)?)
}

/// Count resolved complaints
pub async fn count_resolved_complaints(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let count = count_complaints_where(client, table_name, Some("Resolved")).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"resolvedCount": count}).to_string().into())
        .map_err(Box::new)?)
}

/// Count in-progress complaints (response key kept from the legacy API)
pub async fn count_in_progress_complaints(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let count = count_complaints_where(client, table_name, Some("In Progress")).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"resolvedCount": count}).to_string().into())
        .map_err(Box::new)?)
}

/// Move a complaint through its lifecycle (New -> In Progress -> Resolved)
pub async fn update_complaint_status(
    client: &DynamoClient,
    table_name: &str,
    complaint_id: u64,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateComplaintStatusRequest = serde_json::from_slice(body)?;

    if !is_valid_status(&req.status) {
        return bad_request("Status must be one of New, In Progress, Resolved");
    }

    if get_complaint_item(client, table_name, complaint_id)
        .await?
        .is_none()
    {
        return complaint_not_found();
    }

    let pk = format!("COMPLAINT#{}", complaint_id);
    client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .update_expression("SET #status = :status")
        .expression_attribute_names("#status", "status")
        .expression_attribute_values(":status", AttributeValue::S(req.status.clone()))
        .send()
        .await?;

    tracing::info!("[STATUS] Complaint {} -> {}", complaint_id, req.status);

    let updated = get_complaint_item(client, table_name, complaint_id)
        .await?
        .map(|item| complaint_from_item(&item))
        .ok_or("Complaint disappeared during update")?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&updated)?.into())
        .map_err(Box::new)?)
}

/// Assign a driver to a complaint
pub async fn assign_driver(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: AssignDriverRequest = serde_json::from_slice(body)?;

    if get_complaint_item(client, table_name, req.complaint_id)
        .await?
        .is_none()
    {
        return complaint_not_found();
    }

    let pk = format!("COMPLAINT#{}", req.complaint_id);
    client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .update_expression("SET assigned_driver = :driver")
        .expression_attribute_values(":driver", AttributeValue::S(req.driver.clone()))
        .send()
        .await?;

    tracing::info!("[ASSIGN] Complaint {} -> {}", req.complaint_id, req.driver);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"message": "Driver assigned successfully"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn complaint_not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Complaint not found"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lifecycle_values() {
        assert!(is_valid_status("New"));
        assert!(is_valid_status("In Progress"));
        assert!(is_valid_status("Resolved"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(!is_valid_status("Done"));
        assert!(!is_valid_status("in progress"));
        assert!(!is_valid_status(""));
    }
}
