use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReqDto {
    pub role: Role,
    /// emp code, mobile number or email
    pub mobile_or_id: String,
    pub password: Option<String>,
    /// admin logins only
    pub otp: Option<String>,
}

#[derive(Deserialize)]
pub struct SendOtpReqDto {
    pub mobile: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// emp code
    pub sub: String,
    pub role: u8,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
