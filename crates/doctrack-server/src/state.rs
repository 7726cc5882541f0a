//! Shared application state: one instance of each service, wired to
//! SurrealDB repositories.

use std::sync::Arc;

use doctrack_auth::{AuthConfig, AuthService, UserDirectory};
use doctrack_db::repository::{
    SurrealOutgoingRecordRepository, SurrealReceivingRecordRepository, SurrealSessionRepository,
    SurrealSmsLedgerRepository, SurrealUserRepository,
};
use doctrack_records::{LocalDiskStorage, OutgoingService, RecordService, StorageConfig};
use doctrack_sms::{GatewayError, SmsConfig, SmsService, TxtBoxGateway};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

type Users = SurrealUserRepository<Any>;
type Sessions = SurrealSessionRepository<Any>;

pub type Auth = AuthService<Users, Sessions>;
pub type Directory = UserDirectory<Users, Sessions>;
pub type Records = RecordService<SurrealReceivingRecordRepository<Any>, Users, LocalDiskStorage>;
pub type Outgoing = OutgoingService<SurrealOutgoingRecordRepository<Any>, Users, LocalDiskStorage>;
pub type Sms = SmsService<Users, SurrealSmsLedgerRepository<Any>, TxtBoxGateway>;

/// Resolved runtime settings for the services.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub auth: AuthConfig,
    pub sms: SmsConfig,
    pub storage: StorageConfig,
    pub cookie_secure: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth>,
    pub directory: Arc<Directory>,
    pub records: Arc<Records>,
    pub outgoing: Arc<Outgoing>,
    pub sms: Arc<Sms>,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(db: Surreal<Any>, settings: AppSettings) -> Result<Self, GatewayError> {
        let users = || match &settings.auth.pepper {
            Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper.clone()),
            None => SurrealUserRepository::new(db.clone()),
        };
        let sessions = || SurrealSessionRepository::new(db.clone());
        let storage = LocalDiskStorage::new(settings.storage.clone());

        let directory = UserDirectory::new(users(), sessions(), settings.auth.min_password_length);
        let records = RecordService::new(
            SurrealReceivingRecordRepository::new(db.clone()),
            users(),
            storage.clone(),
        );
        let outgoing =
            OutgoingService::new(SurrealOutgoingRecordRepository::new(db.clone()), users(), storage);
        let sms = SmsService::new(
            users(),
            SurrealSmsLedgerRepository::new(db.clone()),
            TxtBoxGateway::new(settings.sms)?,
        );
        let auth_users = users();
        let auth = AuthService::new(auth_users, sessions(), settings.auth);

        Ok(Self {
            auth: Arc::new(auth),
            directory: Arc::new(directory),
            records: Arc::new(records),
            outgoing: Arc::new(outgoing),
            sms: Arc::new(sms),
            cookie_secure: settings.cookie_secure,
        })
    }
}
