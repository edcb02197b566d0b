pub mod locale_headers;
pub mod request_id;
pub mod security_headers;

pub use locale_headers::locale_headers_middleware;
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
pub use security_headers::security_headers_middleware;
