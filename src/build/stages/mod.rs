// ABOUTME: The stage library: remote work performed by each build stage.
// ABOUTME: Every stage talks to the host only through RemoteEnvironment.

pub mod checkout;
pub mod database;
pub mod django;
pub mod system;
pub mod web;

use std::time::Duration;

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::remote::{RemoteCommand, RemoteEnvironment};

/// What a stage gets to work with.
pub struct StageContext<'a> {
    pub config: &'a Config,
    pub env: &'a dyn RemoteEnvironment,
    pub settle_delay: Duration,
    pub diagnostics: &'a mut Diagnostics,
}

/// `service <name> <action>` as root.
pub fn service(name: &str, action: &str) -> RemoteCommand {
    RemoteCommand::new("service").args([name, action]).sudo()
}

/// Last path component of a local file name, used as the remote file name.
pub(crate) fn file_name(local: &str) -> &str {
    local.rsplit('/').next().unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(file_name("dumps/dbdump.txt"), "dbdump.txt");
        assert_eq!(file_name("dbdump.txt"), "dbdump.txt");
    }
}
