//! Batch job handle and state.

use serde::Deserialize;

/// Lifecycle state of a remote batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    /// Queued, not yet started.
    Pending,
    /// Currently running.
    Active,
    /// Finished; results are available.
    Succeeded,
    /// Terminally failed.
    Failed,
    /// A state string this client does not recognize.
    Other(String),
}

impl BatchState {
    /// Maps the vendor's `JOB_STATE_*` strings onto the lifecycle.
    pub fn from_state_str(state: &str) -> Self {
        match state {
            "JOB_STATE_PENDING" | "JOB_STATE_QUEUED" => Self::Pending,
            "JOB_STATE_ACTIVE" | "JOB_STATE_RUNNING" => Self::Active,
            "JOB_STATE_SUCCEEDED" | "JOB_STATE_COMPLETED" => Self::Succeeded,
            "JOB_STATE_FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// True when the job is still pending or running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// An opaque handle to a remote batch job.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Vendor-assigned job name (`batches/...`).
    pub name: String,
    /// Current lifecycle state.
    pub state: BatchState,
    /// Result manifest resource, present once the job has succeeded.
    pub output_file: Option<String>,
    /// Error message for failed jobs.
    pub error: Option<String>,
}

impl BatchJob {
    /// Returns the result manifest resource for a succeeded job.
    ///
    /// Any other state is a job error; there is no retry or partial-result
    /// recovery.
    pub fn result_file(&self) -> crate::error::Result<&str> {
        use crate::error::RetouchError;
        match &self.state {
            BatchState::Succeeded => self.output_file.as_deref().ok_or_else(|| {
                RetouchError::Job(format!(
                    "job {} succeeded but reported no output file",
                    self.name
                ))
            }),
            BatchState::Failed => Err(RetouchError::Job(format!(
                "job {} failed: {}",
                self.name,
                self.error.as_deref().unwrap_or("no detail reported")
            ))),
            other => Err(RetouchError::Job(format!(
                "job {} is not finished (state: {other})",
                self.name
            ))),
        }
    }

    pub(crate) fn from_operation(op: BatchOperation) -> Self {
        let state = match op.metadata.as_ref().and_then(|m| m.state.as_deref()) {
            Some(s) => BatchState::from_state_str(s),
            None if op.error.is_some() => BatchState::Failed,
            None => BatchState::Pending,
        };

        let output_file = op
            .response
            .as_ref()
            .and_then(|r| r.responses_file.clone())
            .or_else(|| op.metadata.as_ref().and_then(|m| m.output_file.clone()));

        Self {
            name: op.name,
            state,
            output_file,
            error: op.error.and_then(|e| e.message),
        }
    }
}

// Long-running-operation wire shape; unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchOperation {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub(crate) response: Option<OperationResponse>,
    #[serde(default)]
    pub(crate) error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationMetadata {
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default, alias = "outputFile")]
    pub(crate) output_file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationResponse {
    #[serde(default, alias = "responsesFile")]
    pub(crate) responses_file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationError {
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_PENDING"),
            BatchState::Pending
        );
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_ACTIVE"),
            BatchState::Active
        );
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_RUNNING"),
            BatchState::Active
        );
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_SUCCEEDED"),
            BatchState::Succeeded
        );
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_COMPLETED"),
            BatchState::Succeeded
        );
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_FAILED"),
            BatchState::Failed
        );
        assert_eq!(
            BatchState::from_state_str("JOB_STATE_CANCELLED"),
            BatchState::Other("JOB_STATE_CANCELLED".into())
        );
    }

    #[test]
    fn test_is_running() {
        assert!(BatchState::Pending.is_running());
        assert!(BatchState::Active.is_running());
        assert!(!BatchState::Succeeded.is_running());
        assert!(!BatchState::Failed.is_running());
    }

    #[test]
    fn test_job_from_succeeded_operation() {
        let json = r#"{
            "name": "batches/worgu6z6dqyqjktv1znie2bv8mo38yjvsqo8",
            "metadata": {"state": "JOB_STATE_SUCCEEDED"},
            "response": {"responsesFile": "files/results-1"}
        }"#;
        let op: BatchOperation = serde_json::from_str(json).unwrap();
        let job = BatchJob::from_operation(op);

        assert_eq!(job.name, "batches/worgu6z6dqyqjktv1znie2bv8mo38yjvsqo8");
        assert_eq!(job.state, BatchState::Succeeded);
        assert_eq!(job.output_file.as_deref(), Some("files/results-1"));
        assert!(job.error.is_none());
    }

    #[test]
    fn test_job_from_failed_operation() {
        let json = r#"{
            "name": "batches/xyz",
            "metadata": {"state": "JOB_STATE_FAILED"},
            "error": {"message": "quota exceeded"}
        }"#;
        let op: BatchOperation = serde_json::from_str(json).unwrap();
        let job = BatchJob::from_operation(op);

        assert_eq!(job.state, BatchState::Failed);
        assert_eq!(job.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_job_without_metadata_defaults_to_pending() {
        let json = r#"{"name": "batches/fresh"}"#;
        let op: BatchOperation = serde_json::from_str(json).unwrap();
        let job = BatchJob::from_operation(op);

        assert_eq!(job.state, BatchState::Pending);
        assert!(job.output_file.is_none());
    }

    #[test]
    fn test_result_file_for_each_state() {
        let succeeded = BatchJob {
            name: "batches/a".into(),
            state: BatchState::Succeeded,
            output_file: Some("files/out".into()),
            error: None,
        };
        assert_eq!(succeeded.result_file().unwrap(), "files/out");

        let failed = BatchJob {
            name: "batches/b".into(),
            state: BatchState::Failed,
            output_file: None,
            error: Some("quota exceeded".into()),
        };
        let err = failed.result_file().unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let running = BatchJob {
            name: "batches/c".into(),
            state: BatchState::Active,
            output_file: None,
            error: None,
        };
        assert!(running.result_file().is_err());

        let succeeded_without_output = BatchJob {
            name: "batches/d".into(),
            state: BatchState::Succeeded,
            output_file: None,
            error: None,
        };
        assert!(succeeded_without_output.result_file().is_err());
    }

    #[test]
    fn test_output_file_from_snake_case_response() {
        let json = r#"{
            "name": "batches/xyz",
            "metadata": {"state": "JOB_STATE_SUCCEEDED"},
            "response": {"responses_file": "files/results-2"}
        }"#;
        let op: BatchOperation = serde_json::from_str(json).unwrap();
        let job = BatchJob::from_operation(op);
        assert_eq!(job.output_file.as_deref(), Some("files/results-2"));
    }
}
