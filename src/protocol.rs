// src/protocol.rs
//! Storage protocols under test.
//!
//! Each variant says what is read and written and where the endpoints are.
//! Backends translate these into their own terms (Cosbench maps everything to
//! its S3-like container/object model, sibench takes protocol flags).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ProtocolAdapter {
    /// S3 object storage through one or more gateways
    S3 {
        access_key: String,
        #[serde(skip_serializing)]
        secret_key: String,
        port: u16,
        bucket: String,
        /// Gateways
        targets: Vec<String>,
    },
    /// Raw rados objects in a pool
    Rados {
        user: String,
        #[serde(skip_serializing)]
        key: String,
        pool: String,
        /// Monitors
        targets: Vec<String>,
    },
    /// RBD images, optionally with a separate (erasure coded) data pool
    Rbd {
        user: String,
        #[serde(skip_serializing)]
        key: String,
        pool: String,
        datapool: Option<String>,
        targets: Vec<String>,
    },
    /// A directory inside CephFS
    #[serde(rename = "cephfs")]
    CephFs {
        user: String,
        #[serde(skip_serializing)]
        key: String,
        subdir: String,
        targets: Vec<String>,
    },
    /// A local block device on each load server
    Block { device: String },
    /// A locally mounted filesystem directory on each load server
    File { directory: String },
}

impl ProtocolAdapter {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolAdapter::S3 { .. } => "s3",
            ProtocolAdapter::Rados { .. } => "rados",
            ProtocolAdapter::Rbd { .. } => "rbd",
            ProtocolAdapter::CephFs { .. } => "cephfs",
            ProtocolAdapter::Block { .. } => "block",
            ProtocolAdapter::File { .. } => "file",
        }
    }

    /// Addressable endpoints, in the order given on the command line.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            ProtocolAdapter::S3 { targets, .. }
            | ProtocolAdapter::Rados { targets, .. }
            | ProtocolAdapter::Rbd { targets, .. }
            | ProtocolAdapter::CephFs { targets, .. } => {
                targets.iter().map(String::as_str).collect()
            }
            ProtocolAdapter::Block { device } => vec![device.as_str()],
            ProtocolAdapter::File { directory } => vec![directory.as_str()],
        }
    }

    /// Sweep expansion. No protocol has sweepable sub-fields yet, so each
    /// variant expands to itself.
    pub fn flatten(&self) -> Vec<ProtocolAdapter> {
        vec![self.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rados() -> ProtocolAdapter {
        ProtocolAdapter::Rados {
            user: "admin".into(),
            key: "AQD==".into(),
            pool: "bench1".into(),
            targets: vec!["mon1".into(), "mon2".into()],
        }
    }

    #[test]
    fn test_names_and_targets() {
        let p = rados();
        assert_eq!(p.name(), "rados");
        assert_eq!(p.targets(), vec!["mon1", "mon2"]);

        let block = ProtocolAdapter::Block {
            device: "/dev/sdb".into(),
        };
        assert_eq!(block.name(), "block");
        assert_eq!(block.targets(), vec!["/dev/sdb"]);

        let file = ProtocolAdapter::File {
            directory: "/mnt/bench".into(),
        };
        assert_eq!(file.targets(), vec!["/mnt/bench"]);
    }

    #[test]
    fn test_flatten_is_identity() {
        assert_eq!(rados().flatten(), vec![rados()]);
    }

    #[test]
    fn test_secrets_not_serialized() {
        let json = serde_json::to_string(&rados()).unwrap();
        assert!(json.contains("\"protocol\":\"rados\""));
        assert!(!json.contains("AQD=="));
    }
}
