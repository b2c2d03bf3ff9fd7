pub mod context;
pub mod test_macros;

pub use context::{RequestContext, RequestCtxExtractor};
