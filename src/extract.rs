//! Source board extraction

use action_flow::Item;
use action_primitives::{ActionError, PageSession};
use cdp_adapter::Viewport;
use tracing::{info, instrument};

use crate::config::SourceConfig;

/// Reads item labels off the source board.
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    source: SourceConfig,
    viewport: Viewport,
}

impl ItemExtractor {
    pub fn new(source: SourceConfig, viewport: Viewport) -> Self {
        Self { source, viewport }
    }

    /// Load the board, wait for it to render and collect every item label in
    /// document order. Labels are kept verbatim.
    #[instrument(skip_all, fields(url = %self.source.url))]
    pub async fn extract(&self, session: &PageSession) -> Result<Vec<Item>, ActionError> {
        session
            .navigate(&self.source.url, self.source.wait_until)
            .await?;
        session.set_viewport(self.viewport).await?;
        session.settle().await?;

        let items: Vec<Item> = session
            .query_all_text(&self.source.item_selector)
            .await?
            .into_iter()
            .map(Item::new)
            .collect();

        info!(count = items.len(), "items extracted");
        Ok(items)
    }
}
