pub mod service_token;

pub use service_token::{DEFAULT_TOKEN_TTL, ServiceClaims, ServiceTokenIssuer, mask_token};
