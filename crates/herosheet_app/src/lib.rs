//! herosheet Application Shell
//!
//! Everything around the overlay engine that a host page needs: TOML
//! configuration, REST providers for item content and metadata, trigger
//! detection, request-token bookkeeping and the fallback to plain
//! navigation when a fetch fails.
//!
//! # Example
//!
//! ```ignore
//! use herosheet_app::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     herosheet_app::logging::init(false);
//!     let config = SheetConfig::load("herosheet.toml".as_ref())?;
//!     let mut app = SheetApp::from_config(&config, page_tree, "https://example.com/", "Work")?;
//!
//!     match app.activate(&ClickInfo::primary(clicked)).await {
//!         ActivationOutcome::Opened { id } => println!("opened {id}"),
//!         other => println!("{other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

mod app;
pub mod config;
mod error;
pub mod logging;
pub mod provider;
pub mod token;
pub mod trigger;


pub use app::{ActivationOutcome, LoggingNavigator, PageNavigator, PendingActivation, SheetApp};
pub use config::SheetConfig;
pub use error::{Result, SheetError};

/// Prelude module - import everything commonly needed
pub mod prelude {
    pub use crate::app::{
        ActivationOutcome, LoggingNavigator, PageNavigator, PendingActivation, SheetApp,
    };
    pub use crate::config::SheetConfig;
    pub use crate::error::{Result, SheetError};
    pub use crate::provider::{
        ContentProvider, ContentRecord, FetchedItem, MetadataProvider, MetadataRecord,
        RestProvider,
    };
    pub use crate::trigger::{ClickInfo, ItemId, PortfolioTriggers, TriggerSurface};

    pub use herosheet_layout::prelude::*;
}
