use regex::Regex;
use std::sync::OnceLock;

use crate::error::UiError;
use crate::preview::DocumentPreview;
use crate::store::UiStateStore;

fn block_version(block_id: &str) -> Option<&str> {
    static RE_BLOCK: OnceLock<Regex> = OnceLock::new();
    let re = RE_BLOCK.get_or_init(|| Regex::new(r"^doc_([^_]+)_[a-z_]+_\d+$").unwrap());
    re.captures(block_id)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

pub struct SourceLinker<P: DocumentPreview> {
    store: UiStateStore,
    preview: P,
}

impl<P: DocumentPreview> SourceLinker<P> {
    pub fn new(store: UiStateStore, preview: P) -> Self {
        Self { store, preview }
    }

    #[cfg(test)]
    pub fn preview(&self) -> &P {
        &self.preview
    }

    // An unresolvable target only clears the old highlight.
    pub fn highlight_source(&self, block_id: &str) -> bool {
        let previous = self.store.highlighted_block_id();
        if let Some(prev) = previous.as_deref().filter(|prev| *prev != block_id) {
            self.unhighlight(prev);
        }

        match self.resolve(block_id) {
            Ok(block) => {
                self.preview.set_highlighted(&block, true);
                if previous.as_deref() != Some(block_id) {
                    self.store.set_highlighted_block(Some(block_id.to_string()));
                }
                self.preview.scroll_into_view(&block);
                true
            }
            Err(err) => {
                log::debug!("highlight skipped: {err}");
                if previous.is_some() {
                    self.store.set_highlighted_block(None);
                }
                false
            }
        }
    }

    pub fn clear(&self) {
        if let Some(prev) = self.store.highlighted_block_id() {
            self.unhighlight(&prev);
            self.store.set_highlighted_block(None);
        }
    }

    fn unhighlight(&self, block_id: &str) {
        if let Some(block) = self.preview.resolve_block(block_id) {
            self.preview.set_highlighted(&block, false);
        }
    }

    fn resolve(&self, block_id: &str) -> Result<P::Block, UiError> {
        let current = self.store.current_version_id();
        if let (Some(owner), Some(current)) = (block_version(block_id), current.as_deref()) {
            if owner != current {
                return Err(UiError::NotFoundOrStale(format!("block {block_id}")));
            }
        }
        self.preview
            .resolve_block(block_id)
            .ok_or_else(|| UiError::NotFoundOrStale(format!("block {block_id}")))
    }
}
