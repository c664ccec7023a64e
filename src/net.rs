pub mod cookie;
pub mod fs;
pub mod mime;
