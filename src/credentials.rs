//! Credential descriptor for SASL/PLAIN authentication.
//!
//! The descriptor is a JAAS-style login-module block that carries the Kafka
//! username and password. It is written to disk before any network
//! connection is attempted and read back by the consumer bootstrapper, so
//! the file is the single place the connection layer takes credentials from.
//!
//! ```text
//! KafkaClient {
//! 	org.apache.kafka.common.security.plain.PlainLoginModule required
//! 	serviceName="kafka"
//! 	username="USERNAME"
//! 	password="PASSWORD";
//! };
//! ```
//!
//! Values are embedded verbatim: a `"` or newline inside the username or
//! password is not escaped and produces a descriptor other JAAS readers
//! will reject. [`CredentialDescriptor::parse`] tolerates embedded quotes.
//!
//! The file holds plaintext credentials. On Unix it is created with mode
//! `0600` and an existing file is reset to `0600`; on other platforms access
//! control is left to the temp directory's permissions.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name of the descriptor inside the temp directory.
pub const DESCRIPTOR_FILE_NAME: &str = "jaas.conf";

/// Environment variable that advertises the descriptor location.
pub const DESCRIPTOR_PATH_ENV: &str = "CACHETRIGGER_JAAS_CONFIG";

const LOGIN_MODULE: &str = "org.apache.kafka.common.security.plain.PlainLoginModule";

/// Errors raised while writing or reading the credential descriptor.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The descriptor could not be written.
    #[error("Failed to write credential descriptor {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor could not be read.
    #[error("Failed to read credential descriptor {path}: {source}")]
    Read {
        /// Source path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor text lacks a required field.
    #[error("Credential descriptor is missing the {0} field")]
    MissingField(&'static str),
}

/// Username and password for the PLAIN login module.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
}

impl std::fmt::Debug for CredentialDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDescriptor")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CredentialDescriptor {
    /// Creates a descriptor for the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Renders the login-module block.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cachetrigger::credentials::CredentialDescriptor;
    ///
    /// let text = CredentialDescriptor::new("user", "pass").render();
    /// assert!(text.starts_with("KafkaClient {\n"));
    /// assert!(text.contains("\tusername=\"user\"\n"));
    /// assert!(text.ends_with("};"));
    /// ```
    pub fn render(&self) -> String {
        let mut text = String::new();
        text.push_str("KafkaClient {\n");
        text.push_str(&format!("\t{} required\n", LOGIN_MODULE));
        text.push_str("\tserviceName=\"kafka\"\n");
        text.push_str(&format!("\tusername=\"{}\"\n", self.username));
        text.push_str(&format!("\tpassword=\"{}\";\n", self.password));
        text.push_str("};");
        text
    }

    /// Parses a rendered descriptor back into its credentials.
    ///
    /// A value spans from the first `="` to the last `"` on its line, so
    /// quotes inside a value survive the round trip.
    pub fn parse(text: &str) -> Result<Self, CredentialError> {
        let username = field_value(text, "username").ok_or(CredentialError::MissingField("username"))?;
        let password = field_value(text, "password").ok_or(CredentialError::MissingField("password"))?;
        Ok(Self::new(username, password))
    }

    /// Reads and parses the descriptor at `path`.
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let text = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

fn field_value(text: &str, key: &str) -> Option<String> {
    let prefix = format!("{}=\"", key);
    text.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(&prefix)?;
        let end = rest.rfind('"')?;
        Some(rest[..end].to_string())
    })
}

/// Default descriptor location: `<platform temp dir>/jaas.conf`.
pub fn default_descriptor_path() -> PathBuf {
    std::env::temp_dir().join(DESCRIPTOR_FILE_NAME)
}

/// Writes the descriptor to `path`, replacing any previous content.
///
/// The file handle lives only inside this function and is closed on every
/// return path. Data is flushed to disk before returning.
///
/// # Errors
///
/// Returns `CredentialError::Write` on any I/O failure; callers must not
/// start the consumer after such a failure.
pub fn write_descriptor(
    descriptor: &CredentialDescriptor,
    path: &Path,
) -> Result<PathBuf, CredentialError> {
    let to_write_error = |source: std::io::Error| CredentialError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = open_restricted(path).map_err(to_write_error)?;
    file.write_all(descriptor.render().as_bytes())
        .map_err(to_write_error)?;
    file.sync_all().map_err(to_write_error)?;

    info!(path = %path.display(), "Wrote credential descriptor");
    Ok(path.to_path_buf())
}

/// Writes the descriptor and advertises its location through
/// [`DESCRIPTOR_PATH_ENV`].
///
/// Setting the variable is only sound while no other thread reads the
/// environment; the binary calls this before starting its runtime.
pub fn install_descriptor(
    descriptor: &CredentialDescriptor,
    path: &Path,
) -> Result<PathBuf, CredentialError> {
    let written = write_descriptor(descriptor, path)?;
    std::env::set_var(DESCRIPTOR_PATH_ENV, &written);
    debug!(env = DESCRIPTOR_PATH_ENV, path = %written.display(), "Registered descriptor location");
    Ok(written)
}

#[cfg(unix)]
fn open_restricted(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_restricted(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
