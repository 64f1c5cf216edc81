//! Schemas of the migrated source tables.

use super::{FieldKind, FieldSpec, Schema};

pub const ASYNC_OPERATION_TYPES: &[&str] = &[
    "Bulk Granules",
    "Bulk Granule Delete",
    "Bulk Granule Reingest",
    "Data Migration",
    "Dead-Letter Processing",
    "ES Index",
    "Kinesis Replay",
    "Migration Count Report",
    "Reconciliation Report",
    "SQS Replay",
];

pub const ASYNC_OPERATION_STATUSES: &[&str] =
    &["RUNNING", "SUCCEEDED", "RUNNER_FAILED", "TASK_FAILED"];

pub const PROVIDER_PROTOCOLS: &[&str] = &["http", "https", "ftp", "sftp", "s3"];

pub static ASYNC_OPERATION: Schema = Schema {
    title: "asyncOperation",
    fields: &[
        FieldSpec::required("id", FieldKind::String),
        FieldSpec::required("description", FieldKind::String),
        FieldSpec::required("operationType", FieldKind::String).one_of(ASYNC_OPERATION_TYPES),
        FieldSpec::required("status", FieldKind::String).one_of(ASYNC_OPERATION_STATUSES),
        FieldSpec::optional("output", FieldKind::String),
        FieldSpec::optional("taskArn", FieldKind::String),
        FieldSpec::required("createdAt", FieldKind::Integer),
        FieldSpec::required("updatedAt", FieldKind::Integer),
    ],
};

pub static PROVIDER: Schema = Schema {
    title: "provider",
    fields: &[
        FieldSpec::required("id", FieldKind::String),
        FieldSpec::required("protocol", FieldKind::String).one_of(PROVIDER_PROTOCOLS),
        FieldSpec::required("host", FieldKind::String),
        FieldSpec::optional("port", FieldKind::Integer),
        FieldSpec::optional("username", FieldKind::String),
        FieldSpec::optional("password", FieldKind::String),
        FieldSpec::optional("encrypted", FieldKind::Boolean),
        FieldSpec::optional("globalConnectionLimit", FieldKind::Integer),
        FieldSpec::optional("privateKey", FieldKind::String),
        FieldSpec::optional("cmKeyId", FieldKind::String),
        FieldSpec::optional("certificateUri", FieldKind::String),
        FieldSpec::optional("allowedRedirects", FieldKind::Array),
        FieldSpec::required("createdAt", FieldKind::Integer),
        FieldSpec::optional("updatedAt", FieldKind::Integer),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{async_op, provider, record};
    use crate::validate::validate;
    use serde_json::json;

    #[test]
    fn test_async_operation_fixture_is_valid() {
        assert!(validate(&async_op("a1", 100, "RUNNING"), &ASYNC_OPERATION).is_ok());
    }

    #[test]
    fn test_async_operation_rejects_unknown_status() {
        let err = validate(&async_op("a1", 100, "PAUSED"), &ASYNC_OPERATION).unwrap_err();
        assert_eq!(err.fields(), vec!["status"]);
    }

    #[test]
    fn test_async_operation_requires_timestamps() {
        let r = record(json!({
            "id": "a1",
            "description": "d",
            "operationType": "ES Index",
            "status": "RUNNING",
        }));
        let err = validate(&r, &ASYNC_OPERATION).unwrap_err();
        assert_eq!(err.fields(), vec!["createdAt", "updatedAt"]);
    }

    #[test]
    fn test_provider_fixture_is_valid() {
        assert!(validate(&provider("p1", Some(5678)), &PROVIDER).is_ok());
        assert!(validate(&provider("p1", None), &PROVIDER).is_ok());
    }

    #[test]
    fn test_provider_rejects_bad_protocol_and_port() {
        let r = record(json!({
            "id": "p1",
            "protocol": "gopher",
            "host": "h",
            "port": "21",
            "createdAt": 1,
        }));
        let err = validate(&r, &PROVIDER).unwrap_err();
        assert_eq!(err.fields(), vec!["protocol", "port"]);
    }
}
