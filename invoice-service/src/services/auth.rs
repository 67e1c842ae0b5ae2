use chrono::Utc;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

use super::{metrics, JwtService, ServiceError, Store, UserStore};
use crate::{
    config::BootstrapAdminConfig,
    dtos::auth::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest},
    models::{normalize_email, Caller, User},
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: JwtService,
}

fn hash(password: &str) -> Result<PasswordHashString, ServiceError> {
    let password = Password::new(password);
    if !password.is_long_enough() {
        return Err(ServiceError::validation(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    hash_password(&password).map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    fn issue(&self, user: &User) -> Result<AuthResponse, ServiceError> {
        let token = self.jwt.generate_token(&user.id, &user.email)?;
        Ok(AuthResponse {
            token,
            user: user.sanitized(),
        })
    }

    #[instrument(skip(self, req))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "Name is required"));
        }
        let email = normalize_email(&req.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            metrics::record_auth_attempt("register", "conflict");
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let mut user = User::new(name, &email, hash(&req.password)?);
        user.company = req.company.unwrap_or_default();
        user.address = req.address.unwrap_or_default();
        user.phone = req.phone.unwrap_or_default();

        self.store.insert_user(&user).await?;
        metrics::record_auth_attempt("register", "success");
        tracing::info!(user_id = %user.id, "User registered");

        self.issue(&user)
    }

    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let email = normalize_email(&req.email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            metrics::record_auth_attempt("login", "failure");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        if verify_password(&Password::new(req.password), &user.password_hash).is_err() {
            metrics::record_auth_attempt("login", "failure");
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        metrics::record_auth_attempt("login", "success");
        tracing::info!(user_id = %user.id, "User logged in");
        self.issue(&user)
    }

    /// Resolve a bearer token to the stored user it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<Caller, ServiceError> {
        let claims = self.jwt.validate_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            ServiceError::Unauthenticated("Not authorized, token failed".to_string())
        })?;

        let user = self.store.find_user(&claims.sub).await?.ok_or_else(|| {
            ServiceError::Unauthenticated("Not authorized, user no longer exists".to_string())
        })?;
        Ok(Caller::from(&user))
    }

    pub async fn profile(&self, caller: &Caller) -> Result<User, ServiceError> {
        self.store
            .find_user(&caller.id)
            .await?
            .ok_or_else(ServiceError::user_not_found)
    }

    #[instrument(skip(self, caller, req), fields(user_id = %caller.id))]
    pub async fn update_profile(
        &self,
        caller: &Caller,
        req: UpdateProfileRequest,
    ) -> Result<User, ServiceError> {
        let mut user = self.profile(caller).await?;

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::validation("name", "Name cannot be empty"));
            }
            user.name = name;
        }
        if let Some(email) = req.email {
            let email = normalize_email(&email);
            if email != user.email {
                if let Some(other) = self.store.find_user_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(ServiceError::Conflict("Email already in use".to_string()));
                    }
                }
                user.email = email;
            }
        }
        if let Some(company) = req.company {
            user.company = company;
        }
        if let Some(address) = req.address {
            user.address = address;
        }
        if let Some(phone) = req.phone {
            user.phone = phone;
        }
        if let Some(password) = req.password {
            user.password_hash = hash(&password)?;
        }
        user.updated_at = Utc::now();

        if !self.store.replace_user(&user).await? {
            return Err(ServiceError::user_not_found());
        }
        tracing::info!("Profile updated");
        Ok(user)
    }

    /// Make sure the configured account exists and holds the admin role.
    /// An existing account keeps its password.
    pub async fn ensure_admin(&self, admin: &BootstrapAdminConfig) -> Result<User, ServiceError> {
        let email = normalize_email(&admin.email);
        match self.store.find_user_by_email(&email).await? {
            Some(mut user) if !user.is_admin => {
                user.is_admin = true;
                user.updated_at = Utc::now();
                self.store.replace_user(&user).await?;
                tracing::info!(user_id = %user.id, "Promoted bootstrap account to admin");
                Ok(user)
            }
            Some(user) => Ok(user),
            None => {
                let password_hash = hash(admin.password.expose_secret())?;
                let mut user = User::new(admin.name.clone(), &email, password_hash);
                user.is_admin = true;
                self.store.insert_user(&user).await?;
                tracing::info!(user_id = %user.id, "Created bootstrap admin account");
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::MemoryStore;
    use secrecy::Secret;

    fn service() -> AuthService {
        let jwt = JwtService::new(&JwtConfig {
            secret: Secret::new("unit-test-secret".into()),
            expiry_days: 1,
        })
        .unwrap();
        AuthService::new(Arc::new(MemoryStore::new()), jwt)
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".into(),
            email: email.into(),
            password: "secret123".into(),
            company: Some("Engines Ltd".into()),
            address: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_and_authenticate() {
        let auth = service();
        let registered = auth.register(register_req("Ada@Example.com")).await.unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert_eq!(registered.user.company, "Engines Ltd");

        let logged_in = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap();
        let caller = auth.authenticate(&logged_in.token).await.unwrap();
        assert_eq!(caller.id, registered.user.id);
        assert!(!caller.is_admin);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let auth = service();
        auth.register(register_req("ada@example.com")).await.unwrap();
        let err = auth
            .register(register_req("ADA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let auth = service();
        auth.register(register_req("ada@example.com")).await.unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        let unknown_user = auth
            .login(LoginRequest {
                email: "ghost@example.com".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_rejected() {
        let auth = service();
        let registered = auth.register(register_req("ada@example.com")).await.unwrap();
        auth.store.delete_user(&registered.user.id).await.unwrap();

        assert!(matches!(
            auth.authenticate(&registered.token).await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn profile_update_rehashes_password() {
        let auth = service();
        let registered = auth.register(register_req("ada@example.com")).await.unwrap();
        let caller = auth.authenticate(&registered.token).await.unwrap();

        let req = UpdateProfileRequest {
            phone: Some("555-0100".into()),
            password: Some("new-secret".into()),
            ..Default::default()
        };
        let updated = auth.update_profile(&caller, req).await.unwrap();
        assert_eq!(updated.phone, "555-0100");

        assert!(auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "new-secret".into(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn bootstrap_creates_then_promotes() {
        let auth = service();
        let admin = BootstrapAdminConfig {
            email: "root@example.com".into(),
            password: Secret::new("root-pass".into()),
            name: "Root".into(),
        };
        let created = auth.ensure_admin(&admin).await.unwrap();
        assert!(created.is_admin);

        let again = auth.ensure_admin(&admin).await.unwrap();
        assert_eq!(again.id, created.id);
    }
}
