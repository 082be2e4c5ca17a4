//! Authentication configuration.

/// Configuration for credential issuance and the login flow.
///
/// Constructed explicitly and passed in; keying material is never read
/// from ambient global state, so multiple key sets can coexist (e.g. in
/// tests).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded RSA private key for signing the outer credential
    /// layer (RS256).
    pub signing_private_key_pem: String,
    /// PEM-encoded RSA public key for verifying the outer layer.
    pub signing_public_key_pem: String,
    /// 256-bit AES-GCM key for encrypting the inner claims blob.
    pub claims_key: [u8; 32],
    /// Credential issuer (`iss` claim).
    pub issuer: String,
    /// Credential lifetime in seconds (default: 3600 = 1 hour).
    pub token_lifetime_secs: u64,
    /// Failed attempts at which logins are blocked (default: 6).
    pub max_login_attempts: u32,
    /// Sliding lockout window in seconds (default: 600 = 10 minutes).
    /// Once this much time has passed since the last failed attempt,
    /// the counter resets; there is no hard ban.
    pub lockout_window_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id
    /// hashing/verification.
    pub pepper: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_private_key_pem: String::new(),
            signing_public_key_pem: String::new(),
            claims_key: [0u8; 32],
            issuer: "vigil".into(),
            token_lifetime_secs: 3600,
            max_login_attempts: 6,
            lockout_window_secs: 600,
            pepper: None,
        }
    }
}
