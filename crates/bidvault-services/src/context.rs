use bidvault_core::store::{
    AccessLogStore, RfpStore, RoleStore, SubmissionStore, UploadTokenStore, VendorSubmissionStore,
};
use bidvault_core::RoleSet;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller of a gate operation.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub roles: RoleSet,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Caller {
    pub fn new(user_id: Uuid, roles: RoleSet) -> Self {
        Self {
            user_id,
            roles,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Handles to every store the services read or write.
#[derive(Clone)]
pub struct Stores {
    pub rfps: Arc<dyn RfpStore>,
    pub roles: Arc<dyn RoleStore>,
    pub vendors: Arc<dyn VendorSubmissionStore>,
    pub tokens: Arc<dyn UploadTokenStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub access_log: Arc<dyn AccessLogStore>,
}
