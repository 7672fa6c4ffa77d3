//! NTRIP caster upload through an external `str2str` process.
//!
//! The publisher connects back to the local correction relay as its single
//! consumer and pushes the stream to a caster mountpoint:
//!
//! ```text
//! str2str -in tcpcli://127.0.0.1:2101#rtcm3 -out ntrips://:PASSWORD@rtk2go.com:2101/MOUNT#rtcm3 -r 1000
//! ```

use crate::config::NtripConfig;
use crate::error::{Error, Result};
use log::{info, warn};
use std::net::SocketAddr;
use std::process::{Child, Command, Stdio};

const PASSWORD_MASK: &str = "****";

/// Handle to the upload subprocess
pub struct NtripPublisher {
    program: String,
    args: Vec<String>,
    password: String,
    child: Option<Child>,
}

impl NtripPublisher {
    pub fn new(config: &NtripConfig, relay: SocketAddr) -> Self {
        Self {
            program: config.program.clone(),
            args: build_args(config, relay),
            password: config.password.clone(),
            child: None,
        }
    }

    /// Argument vector passed to the program
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Command line for logs, password masked
    pub fn display_command(&self) -> String {
        let line = format!("{} {}", self.program, self.args.join(" "));
        if self.password.is_empty() {
            line
        } else {
            line.replace(&format!(":{}@", self.password), &format!(":{}@", PASSWORD_MASK))
        }
    }

    /// Launch the subprocess
    pub fn spawn(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::InvalidState("NTRIP publisher already running".to_string()));
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: self.program.clone(),
                source,
            })?;

        info!(
            "NTRIP publisher started (pid {}): {}",
            child.id(),
            self.display_command()
        );
        self.child = Some(child);
        Ok(())
    }

    /// Whether the subprocess is still alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                warn!("NTRIP publisher exited: {}", status);
                false
            }
            Some(Err(e)) => {
                warn!("Failed to query NTRIP publisher: {}", e);
                false
            }
            None => false,
        }
    }

    /// Kill and reap the subprocess
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child.try_wait()?.is_none() {
            info!("Stopping NTRIP publisher (pid {})", child.id());
            if let Err(e) = child.kill() {
                // Raced with a natural exit
                warn!("Failed to kill NTRIP publisher: {}", e);
            }
        }
        let status = child.wait()?;
        info!("NTRIP publisher exited: {}", status);
        Ok(())
    }
}

impl Drop for NtripPublisher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn build_args(config: &NtripConfig, relay: SocketAddr) -> Vec<String> {
    vec![
        "-in".to_string(),
        format!("tcpcli://{}:{}#{}", relay.ip(), relay.port(), config.format),
        "-out".to_string(),
        format!(
            "ntrips://:{}@{}:{}/{}#{}",
            config.password, config.caster_address, config.caster_port, config.mountpoint, config.format
        ),
        "-r".to_string(),
        config.reconnect_ms.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NtripConfig {
        NtripConfig {
            enabled: true,
            mountpoint: "BASE01".to_string(),
            password: "s3cret".to_string(),
            ..NtripConfig::default()
        }
    }

    fn relay_addr() -> SocketAddr {
        "127.0.0.1:2101".parse().unwrap()
    }

    #[test]
    fn test_command_line() {
        let publisher = NtripPublisher::new(&config(), relay_addr());
        assert_eq!(
            publisher.args(),
            &[
                "-in",
                "tcpcli://127.0.0.1:2101#rtcm3",
                "-out",
                "ntrips://:s3cret@rtk2go.com:2101/BASE01#rtcm3",
                "-r",
                "1000",
            ]
        );
    }

    #[test]
    fn test_password_masked() {
        let publisher = NtripPublisher::new(&config(), relay_addr());
        let line = publisher.display_command();
        assert!(line.starts_with("str2str -in"));
        assert!(!line.contains("s3cret"));
        assert!(line.contains("ntrips://:****@rtk2go.com:2101/BASE01#rtcm3"));
    }

    #[test]
    fn test_missing_program() {
        let mut config = config();
        config.program = "/nonexistent/str2str".to_string();
        let mut publisher = NtripPublisher::new(&config, relay_addr());

        assert!(matches!(publisher.spawn(), Err(Error::Spawn { .. })));
        assert!(!publisher.is_running());
        publisher.stop().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_and_stop() {
        let mut config = config();
        // `sleep` rejects the arguments and exits; stop must still reap it
        config.program = "sleep".to_string();
        let mut publisher = NtripPublisher::new(&config, relay_addr());

        publisher.spawn().unwrap();
        assert!(matches!(publisher.spawn(), Err(Error::InvalidState(_))));
        publisher.stop().unwrap();
        assert!(!publisher.is_running());
        publisher.stop().unwrap();
    }
}
