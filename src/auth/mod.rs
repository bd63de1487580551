/// Authentication module
///
/// Password hashing, credential checks, access-token issuance/validation
/// and refresh-token handling.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use credentials::verify_credentials;
pub use jwt::generate_access_token;
pub use jwt::validate_access_token;
pub use jwt::validate_access_token_at;
pub use jwt::{IssuedTokens, TokenIssuer, ACCESS_TOKEN_ALGORITHM, ACCESS_TOKEN_TTL_SECS};
pub use password::{PasswordVerifier, BCRYPT_COST};
pub use refresh_token::find_refresh_token_hash;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::revoke_refresh_token;
pub use refresh_token::rotate_refresh_token;
pub use refresh_token::save_refresh_token;
pub use refresh_token::validate_refresh_token;
pub use refresh_token::REFRESH_TOKEN_BYTES;
