use web_sys::{Element, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

use crate::config::ScrollMode;

pub trait DocumentPreview {
    type Block;

    fn resolve_block(&self, block_id: &str) -> Option<Self::Block>;
    fn set_highlighted(&self, block: &Self::Block, highlighted: bool);
    fn scroll_into_view(&self, block: &Self::Block);
}

pub struct DomPreview {
    highlight_class: String,
    scroll_mode: ScrollMode,
}

impl DomPreview {
    pub fn new(highlight_class: impl Into<String>, scroll_mode: ScrollMode) -> Self {
        Self {
            highlight_class: highlight_class.into(),
            scroll_mode,
        }
    }
}

impl DocumentPreview for DomPreview {
    type Block = Element;

    fn resolve_block(&self, block_id: &str) -> Option<Element> {
        web_sys::window()?.document()?.get_element_by_id(block_id)
    }

    fn set_highlighted(&self, block: &Element, highlighted: bool) {
        let classes = block.class_list();
        let result = if highlighted {
            classes.add_1(&self.highlight_class)
        } else {
            classes.remove_1(&self.highlight_class)
        };
        if let Err(err) = result {
            log::warn!("could not toggle highlight on #{}: {err:?}", block.id());
        }
    }

    fn scroll_into_view(&self, block: &Element) {
        let options = ScrollIntoViewOptions::new();
        options.set_block(ScrollLogicalPosition::Center);
        options.set_behavior(match self.scroll_mode {
            ScrollMode::Smooth => ScrollBehavior::Smooth,
            ScrollMode::Instant => ScrollBehavior::Instant,
        });
        block.scroll_into_view_with_scroll_into_view_options(&options);
    }
}
