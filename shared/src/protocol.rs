/// API path prefix
pub const API_PREFIX: &str = "/api";

/// Route paths, relative to [`API_PREFIX`]
pub const PATH_HEALTH: &str = "/health";
pub const PATH_LOGIN: &str = "/auth/login";
pub const PATH_LOGOUT: &str = "/auth/logout";
pub const PATH_AUTH_STATUS: &str = "/auth/status";
pub const PATH_SERVICES: &str = "/services";
pub const PATH_SERVICE_STATUSES: &str = "/services/statuses";

/// Name of the cookie carrying the admin session token
pub const SESSION_COOKIE: &str = "servicedeck.sid";

/// Category assigned when a service is saved without one
pub const DEFAULT_CATEGORY: &str = "General";
