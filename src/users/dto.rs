use serde::Deserialize;

/// Patch body for the caller's own profile. Absent fields are left as-is.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Admin patch for an arbitrary user. The role name is validated against
/// the closed {User, Admin} set.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
}
