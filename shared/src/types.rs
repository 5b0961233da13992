use serde::{Deserialize, Serialize};

// ========== USER ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: String, // user | driver | admin
    pub entry_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub user_id: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Body of POST /update-user-details: a partial profile update that also
/// re-issues the session token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDetailsRequest {
    pub user_id: String,
    pub new_details: UpdateUserRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub user_id: String,
    pub new_role: String, // user | driver | admin
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameRequest {
    pub user_id: String,
    pub new_username: String,
}

/// Partial update without token re-issue (POST /update-user carries the
/// target user id inline with the new field values).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInlineRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub details: UpdateUserRequest,
}

// ========== COMPLAINT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub complaint_id: u64,
    /// S3 key in storage; list endpoints replace this with a
    /// `data:image/jpeg;base64,...` URL before responding.
    pub bin_photo: String,
    pub location: String,
    pub user_name: String,
    pub user_phone: String,
    pub bin_address: String,
    pub status: String, // New | In Progress | Resolved
    pub assigned_driver: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    /// Base64-encoded photo payload (raw base64 or a data: URL).
    pub bin_photo: String,
    pub location: String,
    pub user_name: String,
    pub user_phone: String,
    pub bin_address: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateComplaintStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
    pub complaint_id: u64,
    pub driver: String,
}

// ========== BIN REGION ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BinRegion {
    pub region_code: String,
    pub region_name: String,
    pub region_driver: String,
    pub driver_phone: String,
    pub region_status: String, // Active | Inactive
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBinRegionRequest {
    pub region_code: String,
    pub region_name: String,
    pub region_driver: String,
    pub driver_phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegionStatusRequest {
    pub region_status: String,
}

// ========== CONTACT ==========
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: String,
    pub message: String,
}
