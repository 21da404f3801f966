//! Connect-target locators.
//!
//! A locator has the form `<proto>/<address>[#<metadata>]`, for example
//! `tcp/192.168.1.27:7447` or `udp/224.0.0.225:7447#iface=en0`. Metadata
//! is a `;`-separated list of `key=value` pairs.

use crate::error::ConfigError;

/// Transport named by the locator prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// A parsed locator. Borrows from the source string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Locator<'a> {
    pub protocol: Protocol,
    /// Host part without IPv6 brackets.
    pub host: &'a str,
    pub port: u16,
    metadata: Option<&'a str>,
}

impl<'a> Locator<'a> {
    /// Parse a locator string.
    pub fn parse(s: &'a str) -> Result<Self, ConfigError> {
        let (body, metadata) = match s.split_once('#') {
            Some((body, meta)) => (body, Some(meta)),
            None => (s, None),
        };

        let (proto, address) = body.split_once('/').ok_or(ConfigError::MalformedLocator)?;
        let protocol = match proto {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            _ => return Err(ConfigError::UnknownProtocol),
        };

        let (host, port) = match address.strip_prefix('[') {
            Some(rest) => {
                let (host, tail) = rest.split_once(']').ok_or(ConfigError::MalformedLocator)?;
                let port = tail.strip_prefix(':').ok_or(ConfigError::MalformedLocator)?;
                (host, port)
            }
            None => address
                .rsplit_once(':')
                .ok_or(ConfigError::MalformedLocator)?,
        };

        if host.is_empty() || port.is_empty() {
            return Err(ConfigError::MalformedLocator);
        }
        let port = port.parse::<u16>().map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            protocol,
            host,
            port,
            metadata: metadata.filter(|m| !m.is_empty()),
        })
    }

    /// Look up a `key=value` metadata entry.
    pub fn metadata_value(&self, key: &str) -> Option<&'a str> {
        self.metadata?
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}
