use std::rc::Rc;

use crate::error::UiError;
use crate::gateway::RemoteGateway;
use crate::notify::Notifier;
use crate::store::UiStateStore;

pub struct SettingsController {
    gateway: Rc<dyn RemoteGateway>,
    notifier: Rc<dyn Notifier>,
    store: UiStateStore,
}

impl SettingsController {
    pub fn new(
        gateway: Rc<dyn RemoteGateway>,
        notifier: Rc<dyn Notifier>,
        store: UiStateStore,
    ) -> Self {
        Self {
            gateway,
            notifier,
            store,
        }
    }

    pub async fn load_api_key(&self) -> Result<Option<String>, UiError> {
        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway.api_key().await
        };
        result.map_err(|e| {
            let err = UiError::network("Load API key", e);
            log::warn!("{err}");
            self.notifier.notice(err.notice());
            err
        })
    }

    // A failed check counts as stored so an unreachable backend does not prompt.
    pub async fn has_api_key(&self) -> bool {
        match self.gateway.api_key().await {
            Ok(key) => key.is_some(),
            Err(err) => {
                log::warn!("could not check API key: {err}");
                true
            }
        }
    }

    pub async fn save_api_key(&self, api_key: &str) -> Result<(), UiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            let err = UiError::validation("Enter an API key");
            self.notifier.notice(err.notice());
            return Err(err);
        }
        let result = {
            let _loading = self.store.acquire_loading();
            self.gateway.set_api_key(api_key).await
        };
        result.map_err(|e| {
            let err = UiError::network("Update API key", e);
            log::warn!("{err}");
            self.notifier.notice(err.notice());
            err
        })
    }
}
