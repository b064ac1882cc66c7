use axum::http::{Method, StatusCode};
use bytes::Bytes;

/// Timestamp of an answer that carries none. Sorts below every real write time.
pub const NO_TIMESTAMP: i64 = -1;

/// The replicated operations a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Put,
    Delete,
}

impl Operation {
    /// `None` for methods that have no replicated meaning.
    pub fn from_method(method: &Method) -> Option<Self> {
        if *method == Method::GET {
            Some(Self::Get)
        } else if *method == Method::PUT {
            Some(Self::Put)
        } else if *method == Method::DELETE {
            Some(Self::Delete)
        } else {
            None
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// What the coordinator asks of every replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaRequest {
    pub operation: Operation,
    pub key: Bytes,
    /// Value for `Put`; empty otherwise.
    pub body: Bytes,
    /// Write time stamped by the coordinator; `NO_TIMESTAMP` for reads.
    pub timestamp: i64,
}

/// One replica's answer to one operation.
///
/// An answer that never arrived is not a `ReplicaResponse`; it is an absent (`None`) slot in
/// the response set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaResponse {
    pub status: StatusCode,
    pub body: Bytes,
    /// Write time of the entry that produced this answer, `NO_TIMESTAMP` if unknown.
    pub timestamp: i64,
}

impl ReplicaResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: Bytes::new(),
            timestamp: NO_TIMESTAMP,
        }
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// A conclusive read: the key exists or it does not.
    pub fn is_read_success(&self) -> bool {
        self.status == StatusCode::OK || self.status == StatusCode::NOT_FOUND
    }

    pub fn is_write_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("invalid {name} parameter: {value:?}")]
    Malformed { name: &'static str, value: String },

    #[error("expected 1 <= ack ({ack}) <= from ({from}) <= cluster size ({cluster_size})")]
    OutOfBounds {
        ack: usize,
        from: usize,
        cluster_size: usize,
    },
}

/// How many replicas to contact (`from`) and how many must succeed (`ack`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationParams {
    pub ack: usize,
    pub from: usize,
}

impl ReplicationParams {
    /// Every node, majority quorum.
    pub fn default_for(cluster_size: usize) -> Self {
        Self {
            ack: cluster_size / 2 + 1,
            from: cluster_size,
        }
    }

    /// Builds parameters from the optional `ack`/`from` query values. A missing `from`
    /// defaults to the cluster size and a missing `ack` to a majority of `from`.
    pub fn parse(
        ack: Option<&str>,
        from: Option<&str>,
        cluster_size: usize,
    ) -> Result<Self, ParamsError> {
        let from = match from {
            Some(value) => parse_count("from", value)?,
            None => cluster_size,
        };
        let ack = match ack {
            Some(value) => parse_count("ack", value)?,
            None => from / 2 + 1,
        };

        if ack == 0 || ack > from || from > cluster_size {
            return Err(ParamsError::OutOfBounds {
                ack,
                from,
                cluster_size,
            });
        }
        Ok(Self { ack, from })
    }
}

fn parse_count(name: &'static str, value: &str) -> Result<usize, ParamsError> {
    value.trim().parse().map_err(|_| ParamsError::Malformed {
        name,
        value: value.to_string(),
    })
}

/// Current wall-clock time in milliseconds, used to stamp writes.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
