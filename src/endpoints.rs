//! The API endpoints URIs.

/// The route for access-grant events posted by the sales platform.
pub const WEBHOOK: &str = "/webhook";
