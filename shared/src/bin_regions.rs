use crate::types::{BinRegion, CreateBinRegionRequest, UpdateRegionStatusRequest};
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

pub(crate) fn is_valid_region_status(status: &str) -> bool {
    matches!(status, "Active" | "Inactive")
}

fn region_from_item(item: &HashMap<String, AttributeValue>) -> BinRegion {
    BinRegion {
        region_code: item
            .get("PK")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.strip_prefix("REGION#"))
            .unwrap_or_default()
            .to_string(),
        region_name: item
            .get("region_name")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        region_driver: item
            .get("region_driver")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        driver_phone: item
            .get("driver_phone")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        region_status: item
            .get("region_status")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Active".to_string()),
    }
}

async fn get_region_item(
    client: &DynamoClient,
    table_name: &str,
    region_code: &str,
) -> Result<Option<HashMap<String, AttributeValue>>, Error> {
    let pk = format!("REGION#{}", region_code);
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;
    Ok(result.item().cloned())
}

/// Register a new bin-collection region
pub async fn add_bin_region(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateBinRegionRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("[REGION] Parse error: {}", e);
            return bad_request(&format!("Invalid request body: {}", e));
        }
    };

    if req.region_code.is_empty()
        || req.region_name.is_empty()
        || req.region_driver.is_empty()
        || req.driver_phone.is_empty()
    {
        return bad_request("Missing required fields");
    }

    // Region codes are unique
    if get_region_item(client, table_name, &req.region_code)
        .await?
        .is_some()
    {
        return bad_request("Bin region with the same regionCode already exists");
    }

    let pk = format!("REGION#{}", req.region_code);
    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk.clone()))
        .item("SK", AttributeValue::S(pk))
        .item("region_name", AttributeValue::S(req.region_name))
        .item("region_driver", AttributeValue::S(req.region_driver))
        .item("driver_phone", AttributeValue::S(req.driver_phone))
        .item("region_status", AttributeValue::S("Active".to_string()))
        .send()
        .await?;

    tracing::info!("[REGION] Created region {}", req.region_code);

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"message": "Bin region added successfully"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// List all bin regions
pub async fn list_bin_regions(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let mut regions = Vec::new();
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .filter_expression("begins_with(PK, :prefix)")
            .expression_attribute_values(":prefix", AttributeValue::S("REGION#".to_string()));

        if let Some(key) = start_key {
            req = req.set_exclusive_start_key(Some(key));
        }

        let resp = req.send().await?;
        regions.extend(resp.items().iter().map(region_from_item));

        match resp.last_evaluated_key() {
            Some(key) => start_key = Some(key.clone()),
            None => break,
        }
    }

    regions.sort_by(|a, b| a.region_code.cmp(&b.region_code));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&regions)?.into())
        .map_err(Box::new)?)
}

/// Count all bin regions
pub async fn count_bin_regions(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let mut total: i64 = 0;
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut req = client
            .scan()
            .table_name(table_name)
            .select(Select::Count)
            .filter_expression("begins_with(PK, :prefix)")
            .expression_attribute_values(":prefix", AttributeValue::S("REGION#".to_string()));

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

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"totalBinsCount": total})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Flip a region between Active and Inactive
pub async fn update_region_status(
    client: &DynamoClient,
    table_name: &str,
    region_code: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateRegionStatusRequest = serde_json::from_slice(body)?;

    if !is_valid_region_status(&req.region_status) {
        return bad_request("Region status must be Active or Inactive");
    }

    if get_region_item(client, table_name, region_code)
        .await?
        .is_none()
    {
        return region_not_found();
    }

    let pk = format!("REGION#{}", region_code);
    client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .update_expression("SET region_status = :status")
        .expression_attribute_values(":status", AttributeValue::S(req.region_status.clone()))
        .send()
        .await?;

    tracing::info!("[REGION] {} -> {}", region_code, req.region_status);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"message": "Region status updated successfully"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Delete a region by its code
pub async fn delete_bin_region(
    client: &DynamoClient,
    table_name: &str,
    region_code: &str,
) -> Result<Response<Body>, Error> {
    tracing::info!("[REGION] Deleting region {}", region_code);

    let pk = format!("REGION#{}", region_code);
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
            serde_json::json!({"message": "Region deleted successfully"})
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

fn region_not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Region not found"}).to_string().into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_status_values() {
        assert!(is_valid_region_status("Active"));
        assert!(is_valid_region_status("Inactive"));
        assert!(!is_valid_region_status("active"));
        assert!(!is_valid_region_status("Retired"));
    }
}
