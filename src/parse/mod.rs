pub mod braces;
pub mod cleanup;
pub mod frame;

pub use braces::brace_cleanup;
pub use cleanup::tokenize_cleanup;
