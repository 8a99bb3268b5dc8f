//! `java.net.URL` field decomposition
//!
//! A serialized URL carries its parsed components rather than the spec
//! string, so they are computed here the way the URL constructor would.

use crate::error::{Error, Result};

/// Serialized fields of a `java.net.URL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    /// Scheme, lowercased
    pub protocol: String,
    /// Host, empty when absent
    pub host: String,
    /// Port, `-1` when absent
    pub port: i32,
    /// `userinfo@host:port`, `None` without `//`
    pub authority: Option<String>,
    /// Path plus query
    pub file: String,
    /// Fragment
    pub reference: Option<String>,
}

impl UrlParts {
    /// Decompose a URL spec
    pub fn parse(spec: &str) -> Result<Self> {
        let (scheme, rest) = spec
            .split_once(':')
            .ok_or_else(|| Error::Serialize(format!("no protocol: {spec}")))?;
        if scheme.is_empty() {
            return Err(Error::Serialize(format!("no protocol: {spec}")));
        }

        let (rest, reference) = match rest.split_once('#') {
            Some((before, fragment)) => (before, Some(fragment.to_string())),
            None => (rest, None),
        };

        let Some(after_slashes) = rest.strip_prefix("//") else {
            return Ok(Self {
                protocol: scheme.to_ascii_lowercase(),
                host: String::new(),
                port: -1,
                authority: None,
                file: rest.to_string(),
                reference,
            });
        };

        let split = after_slashes
            .find(['/', '?'])
            .unwrap_or(after_slashes.len());
        let (authority, file) = after_slashes.split_at(split);

        let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
        let (host, port) = split_port(host_port)?;

        Ok(Self {
            protocol: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
            authority: Some(authority.to_string()),
            file: file.to_string(),
            reference,
        })
    }
}

fn split_port(host_port: &str) -> Result<(&str, i32)> {
    // bracketed IPv6 literal
    let search_from = if host_port.starts_with('[') {
        host_port.find(']').map_or(0, |i| i + 1)
    } else {
        0
    };
    match host_port[search_from..].rfind(':') {
        Some(i) => {
            let idx = search_from + i;
            let digits = &host_port[idx + 1..];
            let port = if digits.is_empty() {
                -1
            } else {
                digits
                    .parse::<i32>()
                    .map_err(|_| Error::Serialize(format!("invalid port: {digits}")))?
            };
            Ok((&host_port[..idx], port))
        }
        None => Ok((host_port, -1)),
    }
}
