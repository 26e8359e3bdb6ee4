/// Server-side row cap rewriting.
pub mod limiter;
/// Post-execution redaction of blocked columns.
pub mod masker;

pub use limiter::ensure_limit;
pub use masker::{mask_rows, Row, RESTRICTED_NULL, RESTRICTED_SET};
