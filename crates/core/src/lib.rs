pub mod config;
pub mod facets;
pub mod highlight;
pub mod session;

pub use config::{AppConfig, ConfigError, ConfigOverrides, FacetField, LoadOptions, PictureField};
pub use facets::FacetSelection;
pub use highlight::{apply_highlights, HighlightSpan};
pub use session::{channel_referrer, is_direct_message, visitor_id, SessionContext, TenantOverrides};
