pub mod navigator;
pub mod preview;
pub mod resolver;

pub use navigator::{HttpNavigator, Navigator};
pub use preview::{PreviewFetcher, PreviewSource};
pub use resolver::RedirectResolver;
