pub mod authenticator;
pub mod claims;
pub mod password;
pub mod session;

pub use authenticator::AuthSession;
pub use session::SessionKeys;
