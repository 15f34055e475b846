//! Activation flow
//!
//! A trigger click becomes a fetch of both records, and a settled fetch
//! either opens the overlay or falls back to plain navigation.

use std::future::Future;
use std::sync::Arc;

use herosheet_layout::{DocumentTree, OverlayController};

use crate::config::SheetConfig;
use crate::error::Result;
use crate::provider::{ContentProvider, FetchedItem, MetadataProvider, RestProvider};
use crate::token::{RequestToken, RequestTokens};
use crate::trigger::{ClickInfo, ItemId, PortfolioTriggers, TriggerSurface};

/// Performs a full page navigation on the host
pub trait PageNavigator {
    fn navigate(&self, url: &str);
}

/// Navigator for headless hosts: records the request in the log only
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNavigator;

impl PageNavigator for LoggingNavigator {
    fn navigate(&self, url: &str) {
        tracing::info!("Navigating to {}", url);
    }
}

/// A claimed click waiting for its fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingActivation {
    pub token: RequestToken,
    pub id: ItemId,
    /// The trigger's own link target
    pub fallback_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Not a trigger click; the host handles it natively
    Ignored,
    Opened { id: ItemId },
    /// Fetch failed and the host was sent to the trigger's target
    FellBack { url: Option<String> },
    /// A newer activation superseded this one
    Stale,
}

/// Overlay controller plus everything needed to feed it
pub struct SheetApp {
    controller: OverlayController,
    triggers: Box<dyn TriggerSurface>,
    content: Arc<dyn ContentProvider>,
    metadata: Arc<dyn MetadataProvider>,
    navigator: Box<dyn PageNavigator>,
    tokens: RequestTokens,
    enabled: bool,
}

impl std::fmt::Debug for SheetApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetApp")
            .field("controller", &self.controller)
            .field("tokens", &self.tokens)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl SheetApp {
    pub fn new(
        controller: OverlayController,
        triggers: impl TriggerSurface + 'static,
        content: Arc<dyn ContentProvider>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        let enabled = triggers.page_has_triggers(controller.tree());
        if !enabled {
            tracing::debug!("No trigger grid on page, overlay stays inactive");
        }
        Self {
            controller,
            triggers: Box::new(triggers),
            content,
            metadata,
            navigator: Box::new(LoggingNavigator),
            tokens: RequestTokens::new(),
            enabled,
        }
    }

    /// Wire the REST provider and portfolio triggers from configuration
    pub fn from_config(
        config: &SheetConfig,
        tree: DocumentTree,
        page_url: impl Into<String>,
        page_title: impl Into<String>,
    ) -> Result<Self> {
        let rest = Arc::new(RestProvider::new(config)?);
        let controller =
            OverlayController::new(tree, page_url, page_title, config.overlay_config());
        Ok(Self::new(
            controller,
            PortfolioTriggers::new(&config.trigger),
            rest.clone(),
            rest,
        ))
    }

    pub fn with_navigator(mut self, navigator: impl PageNavigator + 'static) -> Self {
        self.navigator = Box::new(navigator);
        self
    }

    /// False when the page had no trigger grid at construction
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn controller(&self) -> &OverlayController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut OverlayController {
        &mut self.controller
    }

    /// Claim a click if it targets a trigger
    ///
    /// `Some` means the host must prevent the click's default action.
    pub fn begin(&mut self, click: &ClickInfo) -> Option<PendingActivation> {
        if !self.enabled || !click.may_activate() {
            return None;
        }
        let tree = self.controller.tree();
        let anchor = self.triggers.trigger_for(tree, click.target)?;
        let id = self.triggers.id_from_trigger(tree, anchor)?;
        let fallback_url = tree.attr(anchor, "href").map(str::to_string);

        let token = self.tokens.issue();
        tracing::debug!("Activation {} for item {}", token.value(), id);
        Some(PendingActivation {
            token,
            id,
            fallback_url,
        })
    }

    /// Fetch content and metadata concurrently
    ///
    /// The returned future owns its providers, so the host may drive it on
    /// any executor while continuing to deliver events.
    pub fn fetch(&self, id: ItemId) -> impl Future<Output = Result<FetchedItem>> + Send + 'static {
        let content = Arc::clone(&self.content);
        let metadata = Arc::clone(&self.metadata);
        async move {
            let (content, metadata) =
                tokio::try_join!(content.fetch_content(id), metadata.fetch_metadata(id))?;
            Ok(FetchedItem { content, metadata })
        }
    }

    /// Apply a settled fetch
    pub fn complete(
        &mut self,
        pending: PendingActivation,
        result: Result<FetchedItem>,
    ) -> ActivationOutcome {
        if !self.tokens.is_current(pending.token) {
            tracing::debug!(
                "Dropping stale response {} for item {}",
                pending.token.value(),
                pending.id
            );
            return ActivationOutcome::Stale;
        }

        match result {
            Ok(item) => {
                self.controller.open(item.into_overlay_content());
                ActivationOutcome::Opened { id: pending.id }
            }
            Err(err) => {
                tracing::warn!("Failed to load item {}: {}", pending.id, err);
                if let Some(url) = &pending.fallback_url {
                    self.navigator.navigate(url);
                }
                ActivationOutcome::FellBack {
                    url: pending.fallback_url,
                }
            }
        }
    }

    /// Claim, fetch and apply in one step
    pub async fn activate(&mut self, click: &ClickInfo) -> ActivationOutcome {
        let Some(pending) = self.begin(click) else {
            return ActivationOutcome::Ignored;
        };
        let result = self.fetch(pending.id).await;
        self.complete(pending, result)
    }

    /// Close immediately and drop any in-flight activation
    pub fn force_close(&mut self) {
        self.tokens.invalidate();
        self.controller.force_close();
    }
}
