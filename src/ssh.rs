// src/ssh.rs
//! Remote command execution over SSH.
//!
//! Cluster nodes are reached as root with a password, which is how the
//! storage appliances we benchmark are provisioned.

use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::SSH_PORT;
use crate::error::{BenchError, Result};

/// Somewhere commands can be run. Implemented by [`RemoteShell`]; tests use
/// canned fakes.
pub trait RemoteExec {
    /// Run `cmd` and return its trimmed stdout. A non-zero exit status is an
    /// error carrying stderr.
    fn exec(&self, cmd: &str) -> Result<String>;

    fn host(&self) -> &str;
}

/// Authenticated SSH session to one host.
pub struct RemoteShell {
    session: Session,
    host: String,
}

impl RemoteShell {
    /// Connect to `host` (optionally `host:port`) and authenticate with a
    /// password.
    pub fn connect(host: &str, user: &str, password: &str, timeout: Duration) -> Result<Self> {
        let addr = if host.contains(':') {
            host.to_string()
        } else {
            format!("{}:{}", host, SSH_PORT)
        };

        info!("Connecting to {}@{}", user, addr);

        let sock = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| BenchError::Remote {
                host: addr.clone(),
                message: "address did not resolve".to_string(),
            })?;
        let tcp = TcpStream::connect_timeout(&sock, timeout)?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake()?;
        session.userauth_password(user, password)?;

        if !session.authenticated() {
            return Err(BenchError::Remote {
                host: addr,
                message: format!("authentication failed for {}", user),
            });
        }

        debug!("SSH connected to {}", addr);
        Ok(Self {
            session,
            host: addr,
        })
    }
}

impl RemoteExec for RemoteShell {
    fn exec(&self, cmd: &str) -> Result<String> {
        debug!("SSH exec on {}: {}", self.host, cmd);

        let mut channel = self.session.channel_session()?;
        channel.exec(cmd)?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        channel.wait_close()?;
        let exit_status = channel.exit_status()?;
        if exit_status != 0 {
            return Err(BenchError::Remote {
                host: self.host.clone(),
                message: format!("'{}' exited with {}: {}", cmd, exit_status, stderr.trim()),
            });
        }

        Ok(stdout.trim().to_string())
    }

    fn host(&self) -> &str {
        &self.host
    }
}
