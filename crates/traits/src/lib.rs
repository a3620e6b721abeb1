pub mod engine;
pub mod fetch;
pub mod options;
pub mod routing;
pub mod staticfiles;

pub use engine::{HtmlDocument, PdfEngine, RenderError};
pub use fetch::{FetchError, FetchedResource, UrlFetcher};
pub use options::RenderOptions;
pub use routing::{RouteError, RouteResolver, synthetic_request};
pub use staticfiles::{
    InMemoryStaticStorage, NoFinder, StaticError, StaticFinder, StaticStorage,
};
