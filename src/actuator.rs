//! Actuator command dispatch.
//!
//! The actuator is a remote servo controller driven by plain HTTP:
//! `GET <base-url>/<command>` with no body and no authentication. Success is
//! strictly a 2xx status inside the request timeout; any other status, a
//! timeout, or a transport error count uniformly as failure. There is no
//! retry; failures are logged and reported to the caller as `false`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

/// Commands understood by the servo controller. There are no others.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Raise,
    Lower,
}

impl Command {
    /// Path segment appended to the actuator base URL.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Command::Raise => "up",
            Command::Lower => "down",
        }
    }
}

/// Dispatch seam so the control loop and tests can substitute fakes.
pub trait ActuatorClient {
    /// Attempt to deliver one command. Never blocks past the client's
    /// timeout; never raises.
    fn send(&mut self, command: Command) -> bool;
}

/// HTTP client for the real actuator endpoint.
pub struct HttpActuator {
    base: Url,
    agent: ureq::Agent,
}

impl HttpActuator {
    /// Build a client for a base endpoint with a bounded request timeout.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported actuator scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        if base.cannot_be_a_base() {
            return Err(anyhow!("actuator url '{}' cannot take a command path", base));
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self { base, agent })
    }

    pub fn from_base_url(base: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base).context("parse actuator base url")?;
        Self::new(url, timeout)
    }

    /// Full request URL for a command.
    pub fn command_url(&self, command: Command) -> Url {
        let mut url = self.base.clone();
        // Validated as a base URL in the constructor.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(command.wire_name());
        }
        url
    }
}

impl ActuatorClient for HttpActuator {
    fn send(&mut self, command: Command) -> bool {
        let url = self.command_url(command);
        match self.agent.get(url.as_str()).call() {
            Ok(response) => {
                let status = response.status();
                if (200..300).contains(&status) {
                    log::info!("actuator accepted {} ({})", command.wire_name(), url);
                    true
                } else {
                    log::warn!(
                        "actuator returned status {} for {}",
                        status,
                        command.wire_name()
                    );
                    false
                }
            }
            Err(ureq::Error::Status(status, _)) => {
                log::warn!(
                    "actuator returned status {} for {}",
                    status,
                    command.wire_name()
                );
                false
            }
            Err(err) => {
                log::warn!("actuator request for {} failed: {}", command.wire_name(), err);
                false
            }
        }
    }
}
