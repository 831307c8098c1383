use std::sync::Arc;

use serde::Serialize;

use crate::domain::models::PendingRequest;
use crate::domain::models::TokenPair;
use crate::domain::models::User;
use crate::infrastructure::http::ApiError;
use crate::infrastructure::http::Gateway;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    company_name: &'a str,
}

pub struct AuthApi {
    gateway: Arc<Gateway>,
}

impl AuthApi {
    pub fn new(gateway: Arc<Gateway>) -> AuthApi {
        return AuthApi { gateway };
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        return &self.gateway;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let req = PendingRequest::post("/auth/login").json(&LoginRequest { email, password })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        company_name: &str,
    ) -> Result<User, ApiError> {
        let req = PendingRequest::post("/auth/register").json(&RegisterRequest {
            email,
            password,
            name,
            company_name,
        })?;
        return self.gateway.send_json(req).await;
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        return self.gateway.send_json(PendingRequest::get("/auth/me")).await;
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        return self.gateway.send_empty(PendingRequest::post("/auth/logout")).await;
    }
}
