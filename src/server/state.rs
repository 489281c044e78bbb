//! The dependency struct handlers are built against (§9 REDESIGN FLAG:
//! capability struct), shared by both the HTTP and RPC surfaces.

use std::sync::Arc;

use ipnet::IpNet;

use crate::crypto::PrivateKey;
use crate::storage::Storage;

pub struct ServerState {
    pub storage: Arc<dyn Storage>,
    pub hash_key: Option<Vec<u8>>,
    pub private_key: Option<PrivateKey>,
    pub trusted_subnet: Option<IpNet>,
}

impl ServerState {
    pub fn new(
        storage: Arc<dyn Storage>,
        hash_key: Option<Vec<u8>>,
        private_key: Option<PrivateKey>,
        trusted_subnet: Option<IpNet>,
    ) -> Self {
        Self {
            storage,
            hash_key,
            private_key,
            trusted_subnet,
        }
    }
}
