// Re-exports
mod bytes;
pub mod headers;
pub use headers::content_type::ContentTypeInfo;
pub mod http1_1;
pub mod multipart;
pub mod params;
mod types;
pub use types::*;
