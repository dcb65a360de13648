//! API constants

/// Response header carrying the compressed document size in bytes
pub const COMPRESSED_SIZE_HEADER: &str = "x-compressed-size";

/// Filename suggested to the browser for the compressed download
pub const DOWNLOAD_FILENAME: &str = "compressed.pdf";

/// Multipart field names accepted by `/compress`
pub const FILE_FIELD: &str = "file";
pub const DPI_FIELD: &str = "dpi";
pub const QUALITY_FIELD: &str = "quality";

/// Body limit headroom on top of the upload ceiling for multipart framing and text fields
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Failed logins tolerated per client within the window
pub const LOGIN_MAX_FAILURES: u32 = 10;
pub const LOGIN_FAILURE_WINDOW_SECS: u64 = 15 * 60;

/// Message for requests rejected by the session gate
pub const NOT_AUTHENTICATED_MESSAGE: &str = "Nicht angemeldet";
