//! Fake SQL catalog for credential tests
//!
//! Understands just enough of `CREATE USER|ROLE`, `GRANT`, `ALTER USER|ROLE`
//! and `DROP USER|ROLE` to track which principals exist.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lessor_connection::{ConnectionPoolManager, ConnectionService};
use lessor_core::{
    Connection, ConnectionConfig, DatabaseDriver, LessorError, MemoryStorage, PoolLimits, Result,
    StatementResult, Storage,
};
use lessor_credentials::{CredentialEngine, RoleService};
use lessor_drivers::DriverRegistry;
use parking_lot::Mutex;

pub const DATABASE: &str = "main";
pub const CONNECTION_STRING: &str = "catalog://admin:secret@db/main";

pub const CREATE: &str = "CREATE USER \"{{name}}\" PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';\nGRANT SELECT ON ALL TABLES TO \"{{name}}\";";
pub const REVOKE: &str = "DROP USER \"{{name}}\";";
pub const RENEW: &str = "ALTER USER \"{{name}}\" VALID UNTIL '{{expiration}}';";

#[derive(Default)]
pub struct Catalog {
    /// Principal name to password
    pub principals: BTreeMap<String, String>,
    pub valid_until: BTreeMap<String, String>,
    pub executed: Vec<String>,
    pub prepared: Vec<String>,
}

fn unquote(word: &str) -> String {
    word.trim_matches(|c| c == '"' || c == '\'' || c == ';').to_string()
}

fn quoted_after<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = &sql[sql.find(keyword)? + keyword.len()..];
    let start = rest.find('\'')? + 1;
    let end = start + rest[start..].find('\'')?;
    Some(&rest[start..end])
}

impl Catalog {
    fn execute(&mut self, sql: &str) -> Result<StatementResult> {
        self.executed.push(sql.to_string());
        if sql.contains("<fail>") {
            return Err(LessorError::Query("permission denied".into()));
        }

        let words: Vec<&str> = sql.split_whitespace().collect();
        match words.as_slice() {
            ["CREATE", "USER" | "ROLE", name, ..] => {
                let name = unquote(name);
                if self.principals.contains_key(&name) {
                    return Err(LessorError::Query(format!("role \"{name}\" already exists")));
                }
                let password = quoted_after(sql, "PASSWORD").unwrap_or_default().to_string();
                if let Some(until) = quoted_after(sql, "UNTIL") {
                    self.valid_until.insert(name.clone(), until.to_string());
                }
                self.principals.insert(name, password);
            }
            ["GRANT", .., name] => {
                let name = unquote(name);
                if !self.principals.contains_key(&name) {
                    return Err(LessorError::Query(format!("role \"{name}\" does not exist")));
                }
            }
            ["ALTER", "USER" | "ROLE", name, ..] => {
                let name = unquote(name);
                if !self.principals.contains_key(&name) {
                    return Err(LessorError::ObjectMissing(format!("role \"{name}\" does not exist")));
                }
                if let Some(until) = quoted_after(sql, "UNTIL") {
                    self.valid_until.insert(name, until.to_string());
                }
            }
            ["DROP", "USER" | "ROLE", name, ..] => {
                let name = unquote(name);
                if self.principals.remove(&name).is_none() {
                    return Err(LessorError::ObjectMissing(format!("role \"{name}\" does not exist")));
                }
                self.valid_until.remove(&name);
            }
            _ => return Err(LessorError::Query(format!("syntax error in {sql:?}"))),
        }
        Ok(StatementResult::new(0))
    }

    fn prepare(&mut self, sql: &str) -> Result<()> {
        self.prepared.push(sql.to_string());
        match sql.split_whitespace().next() {
            Some("CREATE" | "GRANT" | "ALTER" | "DROP" | "REVOKE" | "SELECT") => Ok(()),
            _ => Err(LessorError::Query(format!("syntax error at or near {sql:?}"))),
        }
    }
}

pub struct CatalogConnection {
    catalog: Arc<Mutex<Catalog>>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for CatalogConnection {
    fn driver_name(&self) -> &str {
        "catalog"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn prepare(&self, sql: &str) -> Result<()> {
        self.catalog.lock().prepare(sql)
    }

    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        self.catalog.lock().execute(sql)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct CatalogDriver {
    catalog: Arc<Mutex<Catalog>>,
}

#[async_trait]
impl DatabaseDriver for CatalogDriver {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn open(&self, _connection_string: &str, _limits: PoolLimits) -> Result<Arc<dyn Connection>> {
        Ok(Arc::new(CatalogConnection {
            catalog: self.catalog.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub catalog: Arc<Mutex<Catalog>>,
    pub pools: Arc<ConnectionPoolManager>,
    pub roles: RoleService,
    pub engine: CredentialEngine,
}

impl Harness {
    pub fn principals(&self) -> Vec<String> {
        self.catalog.lock().principals.keys().cloned().collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.catalog.lock().executed.clone()
    }
}

/// Harness with the `main` database configured for `allowed_roles`
pub async fn harness(allowed_roles: &str) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let catalog = Arc::new(Mutex::new(Catalog::default()));

    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(CatalogDriver {
        catalog: catalog.clone(),
    }));
    let pools = Arc::new(ConnectionPoolManager::new(
        storage.clone() as Arc<dyn Storage>,
        Arc::new(registry),
    ));

    ConnectionService::new(pools.clone())
        .write_connection(
            ConnectionConfig::new(DATABASE, "catalog", CONNECTION_STRING).with_allowed_roles(allowed_roles),
        )
        .await
        .unwrap();

    Harness {
        storage,
        catalog,
        roles: RoleService::new(pools.clone()).unwrap(),
        engine: CredentialEngine::new(pools.clone()).unwrap(),
        pools,
    }
}
