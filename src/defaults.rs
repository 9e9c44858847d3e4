//! Default values shared by configuration and execution.

pub mod http {
    use std::time::Duration;

    /// Default request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Content type declared by requests that don't set one.
    pub const CONTENT_TYPE: &str = "application/json";
    /// Content type forced for form-urlencoded bodies.
    pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
}

pub mod transfer {
    /// Upload chunk size used when reporting bytes sent.
    pub const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;
}

pub mod library {
    pub const NAME: &str = env!("CARGO_PKG_NAME");
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
