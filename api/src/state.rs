use app::chain::ChainBackend;
use app::ln::LightningBackend;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RocketState {
    pub ln: Arc<dyn LightningBackend>,
    /// Absent when the service runs off-chain only.
    pub chain: Option<Arc<dyn ChainBackend>>,
    /// Basic-auth credentials gating the history route.
    pub users: HashMap<String, String>,
}
