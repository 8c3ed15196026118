use std::sync::Arc;

use crate::{config::aliases::AliasMap, daemon::storage::UsageLedger, utils::clock::Clock};

#[derive(Clone)]
pub struct GatewayState {
    pub ledger: Arc<dyn UsageLedger>,
    pub aliases: Arc<AliasMap>,
    pub clock: Arc<dyn Clock>,
}

impl GatewayState {
    pub fn new(ledger: Arc<dyn UsageLedger>, aliases: Arc<AliasMap>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            aliases,
            clock,
        }
    }
}
