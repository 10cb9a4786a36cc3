//! Data flows - the edges of the architecture graph
//!
//! A data flow links two components, carries a protocol, and transfers a set
//! of assets. Protocol predicates drive most of the built-in threat rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::element::{AssetId, ComponentId, ElementInfo};

/// Wire protocol of a data flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// Unknown protocol
    #[default]
    #[serde(rename = "unknown-protocol")]
    Unknown,
    /// HTTP
    Http,
    /// HTTPS
    Https,
    /// WebSocket
    Ws,
    /// WebSocket over TLS
    Wss,
    /// MQTT
    Mqtt,
    /// JDBC
    Jdbc,
    /// JDBC over TLS
    JdbcEncrypted,
    /// ODBC
    Odbc,
    /// ODBC over TLS
    OdbcEncrypted,
    /// Plain SQL access protocol
    Sql,
    /// SQL access protocol over TLS
    SqlEncrypted,
    /// NoSQL access protocol
    Nosql,
    /// NoSQL access protocol over TLS
    NosqlEncrypted,
    /// Proprietary binary protocol
    Binary,
    /// Proprietary binary protocol, encrypted
    BinaryEncrypted,
    /// Plain text protocol
    Text,
    /// Plain text protocol, encrypted
    TextEncrypted,
    /// SSH
    Ssh,
    /// SSH tunnel
    SshTunnel,
    /// SMTP
    Smtp,
    /// SMTP over TLS
    SmtpEncrypted,
    /// POP3
    Pop3,
    /// POP3 over TLS
    Pop3Encrypted,
    /// IMAP
    Imap,
    /// IMAP over TLS
    ImapEncrypted,
    /// FTP
    Ftp,
    /// FTPS
    Ftps,
    /// SFTP
    Sftp,
    /// SCP
    Scp,
    /// LDAP
    Ldap,
    /// LDAP over TLS
    Ldaps,
    /// Java Message Service
    Jms,
    /// NFS
    Nfs,
    /// SMB
    Smb,
    /// SMB, encrypted
    SmbEncrypted,
    /// Local file access
    LocalFileAccess,
}

impl Protocol {
    /// Whether the protocol is a browser-facing web access protocol
    #[must_use]
    pub const fn is_web_access(self) -> bool {
        matches!(self, Self::Http | Self::Https | Self::Ws | Self::Wss)
    }

    /// Whether the protocol speaks to a relational database
    #[must_use]
    pub const fn is_relational_database(self) -> bool {
        matches!(
            self,
            Self::Jdbc
                | Self::JdbcEncrypted
                | Self::Odbc
                | Self::OdbcEncrypted
                | Self::Sql
                | Self::SqlEncrypted
        )
    }

    /// Whether the protocol speaks to a NoSQL database
    #[must_use]
    pub const fn is_nosql_database(self) -> bool {
        matches!(self, Self::Nosql | Self::NosqlEncrypted)
    }

    /// Whether the protocol itself provides transport encryption
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        matches!(
            self,
            Self::Https
                | Self::Wss
                | Self::JdbcEncrypted
                | Self::OdbcEncrypted
                | Self::NosqlEncrypted
                | Self::SqlEncrypted
                | Self::BinaryEncrypted
                | Self::TextEncrypted
                | Self::Ssh
                | Self::SshTunnel
                | Self::Ftps
                | Self::Sftp
                | Self::Scp
                | Self::Ldaps
                | Self::SmbEncrypted
                | Self::SmtpEncrypted
                | Self::Pop3Encrypted
                | Self::ImapEncrypted
        )
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json.trim_matches('"'))
    }
}

/// Authentication used on a data flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authentication {
    /// No authentication
    #[default]
    None,
    /// Username and password
    Credentials,
    /// Session identifier
    SessionId,
    /// Bearer or similar token
    Token,
    /// Client certificate
    ClientCertificate,
    /// Two-factor authentication
    TwoFactor,
    /// Authentication delegated to an external system
    Externalized,
}

impl std::fmt::Display for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json.trim_matches('"'))
    }
}

/// Authorization model used on a data flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authorization {
    /// No authorization
    #[default]
    None,
    /// A technical user authorizes the call
    TechnicalUser,
    /// The end-user identity is propagated
    EnduserIdentityPropagation,
}

impl std::fmt::Display for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json.trim_matches('"'))
    }
}

/// An asset transfer between two components
#[derive(Debug, Clone)]
pub struct DataFlow {
    /// Shared element state (name, description, tags)
    pub info: ElementInfo,
    /// Sending component
    pub source: ComponentId,
    /// Receiving component
    pub destination: ComponentId,
    /// Wire protocol
    pub protocol: Protocol,
    /// Authentication on the flow
    pub authentication: Authentication,
    /// Authorization on the flow
    pub authorization: Authorization,
    /// Whether the flow is tunneled through a VPN
    pub vpn: bool,
    /// Whether the destination only reads
    pub readonly: bool,
    /// Whether data travels both ways
    pub bidirectional: bool,
    pub(crate) assets: BTreeSet<AssetId>,
}

impl DataFlow {
    /// Create a flow from `source` to `destination`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: ComponentId,
        destination: ComponentId,
        protocol: Protocol,
    ) -> Self {
        Self {
            info: ElementInfo::new(name),
            source,
            destination,
            protocol,
            authentication: Authentication::None,
            authorization: Authorization::None,
            vpn: false,
            readonly: false,
            bidirectional: false,
            assets: BTreeSet::new(),
        }
    }

    /// Set the authentication attribute
    #[must_use]
    pub const fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    /// Set the authorization attribute
    #[must_use]
    pub const fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Mark the flow as VPN-tunneled
    #[must_use]
    pub const fn over_vpn(mut self) -> Self {
        self.vpn = true;
        self
    }

    /// Mark the flow as bidirectional
    #[must_use]
    pub const fn two_way(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    /// Assets transferred over this flow
    #[must_use]
    pub fn assets(&self) -> &BTreeSet<AssetId> {
        &self.assets
    }

    /// Whether the flow is encrypted in transit (protocol or VPN)
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.vpn || self.protocol.is_encrypted()
    }
}
