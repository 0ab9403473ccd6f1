pub mod compiler;
pub mod path_template;
pub mod route;

pub use compiler::RouteCompiler;
pub use path_template::UpstreamPathTemplate;
pub use route::{DownstreamRoute, Route};
