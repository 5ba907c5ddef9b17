use async_trait::async_trait;

use crate::error::Notice;

#[async_trait(?Send)]
pub trait Notifier {
    fn notice(&self, notice: Notice);
    async fn confirm(&self, prompt: &str) -> bool;
}

pub struct BrowserNotifier;

#[async_trait(?Send)]
impl Notifier for BrowserNotifier {
    fn notice(&self, notice: Notice) {
        let Some(window) = web_sys::window() else {
            log::error!("{}", notice.message);
            return;
        };
        if window.alert_with_message(&notice.message).is_err() {
            log::error!("{}", notice.message);
        }
    }

    async fn confirm(&self, prompt: &str) -> bool {
        web_sys::window()
            .and_then(|window| window.confirm_with_message(prompt).ok())
            .unwrap_or(false)
    }
}
