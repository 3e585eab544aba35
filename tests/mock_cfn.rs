//! Integration tests using wiremock to simulate a CFN metadata server.

use std::io::Write;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cfn_collect::{CfnConfig, CfnError, CollectedOutput, Collector, QueryParams, Signer};

const ACCESS_KEY_ID: &str = "0123456789ABCDEF";
const SECRET_ACCESS_KEY: &str = "FEDCBA9876543210";

fn meta_data() -> Value {
    json!({
        "int1": 1,
        "strfoo": "foo",
        "map_ab": {
            "a": "apple",
            "b": "banana",
        },
    })
}

/// Build a `DescribeStackResource` response with one field holding `text`.
fn describe_response(field: &str, text: &str) -> String {
    format!(
        "<DescribeStackResourceResponse>\
           <DescribeStackResourceResult>\
             <StackResourceDetail>\
               <{field}>{text}</{field}>\
             </StackResourceDetail>\
           </DescribeStackResourceResult>\
         </DescribeStackResourceResponse>"
    )
}

async fn mount_resource(server: &MockServer, resource: &str, metadata: &Value) {
    Mock::given(method("GET"))
        .and(path("/v1/"))
        .and(query_param("LogicalResourceId", resource))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(describe_response("Metadata", &metadata.to_string())),
        )
        .mount(server)
        .await;
}

/// Fail the test if the server receives any request.
async fn expect_no_requests(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> CfnConfig {
    CfnConfig::default()
        .with_metadata_hint(None::<&str>)
        .with_metadata_url(format!("{}/v1/", server.uri()))
        .with_stack_name("mystack")
        .with_credentials(ACCESS_KEY_ID, SECRET_ACCESS_KEY)
}

async fn collect(config: CfnConfig) -> Result<Vec<CollectedOutput>, CfnError> {
    Collector::new(config).unwrap().collect().await
}

mod collection {
    use super::*;

    #[tokio::test]
    async fn test_collect_cfn() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let outputs = collect(config_for(&server).with_path("foo.Metadata"))
            .await
            .unwrap();

        assert_eq!(outputs, vec![CollectedOutput::new("cfn", meta_data())]);
    }

    #[tokio::test]
    async fn test_sub_second_timeout() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let config = config_for(&server)
            .with_path("foo.Metadata")
            .with_timeout(Duration::from_millis(500));
        let outputs = collect(config).await.unwrap();

        assert_eq!(outputs, vec![CollectedOutput::new("cfn", meta_data())]);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/"))
            .and(header("Content-Type", "application/json"))
            .and(query_param("Action", "DescribeStackResource"))
            .and(query_param("StackName", "mystack"))
            .and(query_param("LogicalResourceId", "foo"))
            .and(query_param("AWSAccessKeyId", ACCESS_KEY_ID))
            .and(query_param("SignatureVersion", "2"))
            .and(query_param("SignatureMethod", "HmacSHA256"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(describe_response("Metadata", r#"{"a": 1}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        collect(config_for(&server).with_path("foo.Metadata"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_signature() {
        let server = MockServer::start().await;
        let host = server.address().to_string();

        let params: QueryParams = [
            ("AWSAccessKeyId", ACCESS_KEY_ID),
            ("Action", "DescribeStackResource"),
            ("LogicalResourceId", "foo"),
            ("SignatureMethod", "HmacSHA256"),
            ("SignatureVersion", "2"),
            ("StackName", "mystack"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let expected = Signer::new(SECRET_ACCESS_KEY).signature("GET", &host, "/v1/", &params);

        Mock::given(method("GET"))
            .and(path("/v1/"))
            .and(query_param("Signature", expected.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(describe_response("Metadata", r#"{"a": 1}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        collect(config_for(&server).with_path("foo.Metadata"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_metadata_url_from_hint() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let mut hint = tempfile::NamedTempFile::new().unwrap();
        writeln!(hint, "{}", server.uri()).unwrap();
        hint.flush().unwrap();

        let config = CfnConfig::default()
            .with_metadata_hint(Some(hint.path()))
            .with_path("foo.Metadata")
            .with_credentials(ACCESS_KEY_ID, SECRET_ACCESS_KEY);
        let outputs = collect(config).await.unwrap();

        assert_eq!(outputs[0].content, meta_data());
    }

    #[tokio::test]
    async fn test_sub_path() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let outputs = collect(config_for(&server).with_path("foo.Metadata.map_ab"))
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![CollectedOutput::new(
                "cfn",
                json!({"a": "apple", "b": "banana"})
            )]
        );
    }

    #[tokio::test]
    async fn test_later_path_wins() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &json!({"shared": "foo", "only_foo": 1})).await;
        mount_resource(&server, "bar", &json!({"shared": "bar", "only_bar": 2})).await;

        let config = config_for(&server)
            .with_path("foo.Metadata")
            .with_path("bar.Metadata");
        let outputs = collect(config).await.unwrap();

        assert_eq!(
            outputs[0].content,
            json!({"shared": "bar", "only_foo": 1, "only_bar": 2})
        );
    }

    #[tokio::test]
    async fn test_deployments_split() {
        let server = MockServer::start().await;
        let metadata = json!({
            "os-collect-config": {"polling_interval": 30},
            "deployments": [
                {"name": "dep-a", "group": "script", "config": "#!/bin/sh\necho a"},
                {"group": "script", "config": "unnamed"},
                {"name": "dep-b", "config": {"x": 1}},
            ],
        });
        mount_resource(&server, "foo", &metadata).await;

        let outputs = collect(config_for(&server).with_path("foo.Metadata"))
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![
                CollectedOutput::new("cfn", json!({"os-collect-config": {"polling_interval": 30}})),
                CollectedOutput::new("dep-a", json!("#!/bin/sh\necho a")),
                CollectedOutput::new("dep-b", json!({"x": 1})),
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_deployment_key() {
        let server = MockServer::start().await;
        let metadata = json!({
            "deployments": [{"name": "kept", "config": {}}],
            "software": [{"name": "split", "config": {"y": 2}}],
        });
        mount_resource(&server, "foo", &metadata).await;

        let config = config_for(&server)
            .with_path("foo.Metadata")
            .with_deployment_keys(["software"]);
        let outputs = collect(config).await.unwrap();

        assert_eq!(
            outputs,
            vec![
                CollectedOutput::new(
                    "cfn",
                    json!({"deployments": [{"name": "kept", "config": {}}]})
                ),
                CollectedOutput::new("split", json!({"y": 2})),
            ]
        );
    }
}

mod not_available {
    use super::*;

    #[tokio::test]
    async fn test_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("LogicalResourceId", "foo"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("LogicalResourceId", "bar"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(describe_response("Metadata", "{}")),
            )
            .expect(0)
            .mount(&server)
            .await;

        let config = config_for(&server)
            .with_path("foo.Metadata")
            .with_path("bar.Metadata");
        let result = collect(config).await;

        assert!(matches!(result, Err(CfnError::MetadataNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let config = CfnConfig::default()
            .with_metadata_hint(None::<&str>)
            .with_metadata_url("http://127.0.0.1:1/v1/")
            .with_path("foo.Metadata")
            .with_credentials(ACCESS_KEY_ID, SECRET_ACCESS_KEY);
        let result = collect(config).await;

        assert!(matches!(result, Err(CfnError::MetadataNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_missing_field() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let result = collect(config_for(&server).with_path("foo.Missing")).await;

        assert!(matches!(result, Err(CfnError::MetadataNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_missing_sub_path() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let err = collect(config_for(&server).with_path("foo.Metadata.not_there"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("sub-key not_there does not exist"));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(describe_response("Metadata", "{not json")),
            )
            .mount(&server)
            .await;

        let result = collect(config_for(&server).with_path("foo.Metadata")).await;

        assert!(matches!(result, Err(CfnError::MetadataNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_invalid_xml() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<unclosed>"))
            .mount(&server)
            .await;

        let result = collect(config_for(&server).with_path("foo.Metadata")).await;

        assert!(matches!(result, Err(CfnError::MetadataNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_value_not_a_mapping() {
        let server = MockServer::start().await;
        mount_resource(&server, "foo", &meta_data()).await;

        let result = collect(config_for(&server).with_path("foo.Metadata.strfoo")).await;

        assert!(matches!(result, Err(CfnError::MetadataNotAvailable(_))));
    }
}

mod not_configured {
    use super::*;

    #[tokio::test]
    async fn test_no_metadata_url() {
        let server = MockServer::start().await;
        expect_no_requests(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let config = CfnConfig::default()
            .with_metadata_hint(Some(dir.path().join("cfn-metadata-server")))
            .with_path("foo.Metadata")
            .with_credentials(ACCESS_KEY_ID, SECRET_ACCESS_KEY);
        let err = collect(config).await.unwrap_err();

        assert!(matches!(err, CfnError::MetadataNotConfigured(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_path() {
        let server = MockServer::start().await;
        expect_no_requests(&server).await;

        let err = collect(config_for(&server)).await.unwrap_err();

        assert!(matches!(err, CfnError::MetadataNotConfigured(_)));
        assert!(err.to_string().contains("no path configured"));
    }

    #[tokio::test]
    async fn test_bad_path() {
        let server = MockServer::start().await;
        expect_no_requests(&server).await;

        let config = config_for(&server)
            .with_path("foo.Metadata")
            .with_path("foo");
        let err = collect(config).await.unwrap_err();

        assert!(matches!(err, CfnError::MetadataNotConfigured(_)));
        assert!(err.to_string().contains("path not in format"));
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let server = MockServer::start().await;
        expect_no_requests(&server).await;

        let mut config = config_for(&server).with_path("foo.Metadata");
        config.secret_access_key = None;
        let result = collect(config).await;

        assert!(matches!(result, Err(CfnError::MetadataNotConfigured(_))));
    }
}
