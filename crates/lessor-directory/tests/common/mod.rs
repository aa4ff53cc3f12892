//! In-memory directory server for client and resolver tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use lessor_core::{LessorError, Result};
use lessor_directory::{
    DialTarget, DirectoryConfig, DirectoryConnection, DirectoryDialer, DirectorySettings,
    ModifyRequest, RawEntry, SearchRequest,
};
use parking_lot::Mutex;

pub const ADMIN: &str = "CN=Admin,CN=Users,DC=example,DC=com";
pub const ADMIN_PASSWORD: &str = "admin-password";

#[derive(Default)]
pub struct State {
    /// Search results keyed by filter string
    pub results: HashMap<String, Vec<RawEntry>>,
    /// Hosts that refuse connections
    pub unreachable: HashSet<String>,
    /// Hosts that reject the bind
    pub reject_bind: HashSet<String>,
    pub fail_search: bool,
    pub dials: Vec<DialTarget>,
    pub binds: usize,
    pub searches: Vec<SearchRequest>,
    pub modifies: Vec<ModifyRequest>,
    pub closes: usize,
}

#[derive(Clone, Default)]
pub struct FakeDirectory {
    pub state: Arc<Mutex<State>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, filter: &str, dn: &str) -> Self {
        self.state
            .lock()
            .results
            .entry(filter.to_string())
            .or_default()
            .push(RawEntry {
                dn: dn.to_string(),
                attributes: vec![("cn".into(), vec![dn.to_string()])],
            });
        self
    }

    pub fn unreachable(self, host: &str) -> Self {
        self.state.lock().unreachable.insert(host.to_string());
        self
    }

    pub fn reject_bind(self, host: &str) -> Self {
        self.state.lock().reject_bind.insert(host.to_string());
        self
    }

    pub fn dialed_hosts(&self) -> Vec<String> {
        self.state.lock().dials.iter().map(|t| t.host.clone()).collect()
    }

    pub fn dial_count(&self) -> usize {
        self.state.lock().dials.len()
    }

    pub fn modifies(&self) -> Vec<ModifyRequest> {
        self.state.lock().modifies.clone()
    }
}

struct FakeConnection {
    host: String,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl DirectoryDialer for FakeDirectory {
    async fn dial(&self, target: &DialTarget) -> Result<Box<dyn DirectoryConnection>> {
        let mut state = self.state.lock();
        state.dials.push(target.clone());
        if state.unreachable.contains(&target.host) {
            return Err(LessorError::ConnectionFailure("connection refused".into()));
        }
        Ok(Box::new(FakeConnection {
            host: target.host.clone(),
            state: self.state.clone(),
        }))
    }
}

#[async_trait]
impl DirectoryConnection for FakeConnection {
    async fn bind(&mut self, username: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.binds += 1;
        if state.reject_bind.contains(&self.host) || username != ADMIN || password != ADMIN_PASSWORD {
            return Err(LessorError::ConnectionFailure("invalid credentials".into()));
        }
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<RawEntry>> {
        let mut state = self.state.lock();
        state.searches.push(request.clone());
        if state.fail_search {
            return Err(LessorError::SearchFailed("no such object".into()));
        }
        Ok(state.results.get(&request.filter).cloned().unwrap_or_default())
    }

    async fn modify(&mut self, request: &ModifyRequest) -> Result<()> {
        self.state.lock().modifies.push(request.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().closes += 1;
        Ok(())
    }
}

/// Dialer that fails the test if anything is dialed
pub struct NoNetwork;

#[async_trait]
impl DirectoryDialer for NoNetwork {
    async fn dial(&self, target: &DialTarget) -> Result<Box<dyn DirectoryConnection>> {
        panic!("unexpected dial to {}", target.url);
    }
}

pub fn settings(url: &str) -> DirectorySettings {
    DirectorySettings::new(ADMIN, ADMIN_PASSWORD).with_url(url)
}

pub fn config(url: &str) -> DirectoryConfig {
    DirectoryConfig::from_settings(&settings(url)).unwrap()
}
