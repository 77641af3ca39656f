//! Error handling for the sysmon crate.

use crate::metrics::data::Domain;

/// A specialized `Result` type for sysmon operations.
pub type Result<T> = std::result::Result<T, SysmonError>;

/// The main error type for sysmon operations.
#[derive(Debug, thiserror::Error)]
pub enum SysmonError {
    /// A configuration value was unparseable or out of range
    #[error("invalid {field}: {reason}")]
    Config { field: &'static str, reason: String },

    /// The OS could not provide a whole-domain reading
    #[error("{domain} sampler unavailable: {reason}")]
    SamplerUnavailable { domain: Domain, reason: String },

    /// One disk partition could not be sampled
    #[error("partition {device} (mounted at {mount_point}) unavailable: {reason}")]
    PartitionUnavailable {
        device: String,
        mount_point: String,
        reason: String,
    },

    /// The snapshot log destination rejected a write
    #[error("failed to write snapshot record: {0}")]
    RecorderWrite(#[source] std::io::Error),

    /// A snapshot could not be encoded
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SysmonError {
    /// Create a new configuration error naming the offending field
    pub fn config_error(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            field,
            reason: reason.into(),
        }
    }

    /// Create a new whole-domain sampling error
    pub fn sampler_unavailable(domain: Domain, reason: impl Into<String>) -> Self {
        Self::SamplerUnavailable {
            domain,
            reason: reason.into(),
        }
    }

    /// Create a new per-partition sampling error
    pub fn partition_unavailable(
        device: impl Into<String>,
        mount_point: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PartitionUnavailable {
            device: device.into(),
            mount_point: mount_point.into(),
            reason: reason.into(),
        }
    }

    /// Whether the process must stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RecorderWrite(_) | Self::Serialize(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_field() {
        let err = SysmonError::config_error("cpu_threshold", "must be within 1..=99");
        let msg = err.to_string();
        assert!(msg.contains("cpu_threshold"));
        assert!(msg.contains("1..=99"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatality() {
        let write = SysmonError::RecorderWrite(std::io::Error::other("disk full"));
        assert!(write.is_fatal());
        assert!(write.to_string().contains("disk full"));

        let sampler = SysmonError::sampler_unavailable(Domain::Memory, "no meminfo");
        assert!(!sampler.is_fatal());
        assert_eq!(sampler.to_string(), "memory sampler unavailable: no meminfo");

        let partition = SysmonError::partition_unavailable("/dev/sr0", "/media/cdrom", "no medium");
        assert!(!partition.is_fatal());
        assert!(partition.to_string().contains("/dev/sr0"));
    }
}
