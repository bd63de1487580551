/// Middleware module
///
/// Access-token authentication and request logging.

mod jwt_middleware;
mod request_logger;

pub use jwt_middleware::{AuthenticatedUser, JwtMiddleware, ACCESS_TOKEN_COOKIE};
pub use request_logger::LoggerMiddleware;
