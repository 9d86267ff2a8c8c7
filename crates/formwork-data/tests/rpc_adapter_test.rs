//! RpcDataSource talking to `serve` over an in-memory duplex stream

use formwork_core::data_source::{DataSource, DataSourceError, Query, Record};
use formwork_data::{serve, RpcDataSource, StaticDataSource};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

fn backend() -> Arc<dyn DataSource> {
    Arc::new(
        StaticDataSource::from_value(json!({
            "contacts": [
                {"id": "c1", "name": "Ada", "city": "London"},
                {"id": "c2", "name": "Grace", "city": "Arlington"}
            ]
        }))
        .unwrap(),
    )
}

fn client() -> RpcDataSource {
    let (client, server) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve(server, backend()));
    RpcDataSource::new(client)
}

#[tokio::test]
async fn test_crud_round_trip() {
    let ds = client();

    let rows = ds
        .find("contacts", &Query::new().filter_eq("city", "London"))
        .await
        .unwrap();
    assert_eq!(rows, vec![record(json!({"id": "c1", "name": "Ada", "city": "London"}))]);

    let created = ds
        .create("contacts", record(json!({"name": "Linus"})))
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let updated = ds
        .update("contacts", &id, record(json!({"city": "Portland"})))
        .await
        .unwrap();
    assert_eq!(updated["name"], json!("Linus"));
    assert_eq!(updated["city"], json!("Portland"));

    assert_eq!(
        ds.find_one("contacts", &id).await.unwrap().map(|r| r["city"].clone()),
        Some(json!("Portland"))
    );
    assert!(ds.delete("contacts", &id).await.unwrap());
    assert!(!ds.delete("contacts", &id).await.unwrap());
    assert_eq!(ds.find_one("contacts", &id).await.unwrap(), None);
}

#[tokio::test]
async fn test_error_codes_map_to_data_errors() {
    let ds = client();

    let err = ds.find("invoices", &Query::new()).await.unwrap_err();
    assert_eq!(err, DataSourceError::NotFound("invoices".into()));

    let err = ds
        .update("contacts", "c404", record(json!({"name": "x"})))
        .await
        .unwrap_err();
    assert_eq!(err, DataSourceError::record_not_found("contacts", "c404"));
}

#[tokio::test]
async fn test_client_skips_notifications_and_stale_replies() {
    let (client, server) = tokio::io::duplex(4096);
    let ds = RpcDataSource::new(client);

    let fake = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        let request: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let id = request["id"].clone();
        assert_eq!(request["method"], json!("data.delete"));

        let replies = [
            json!({"jsonrpc": "2.0", "method": "data.changed", "params": {}}),
            json!({"jsonrpc": "2.0", "id": 999, "result": false}),
            json!({"jsonrpc": "2.0", "id": id, "result": true}),
        ];
        for reply in replies {
            write
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .unwrap();
        }
    });

    assert!(ds.delete("contacts", "c1").await.unwrap());
    fake.await.unwrap();
}

#[tokio::test]
async fn test_reply_split_across_a_timeout_is_skipped() {
    let (client, server) = tokio::io::duplex(4096);
    let ds = RpcDataSource::new(client).with_timeout(Duration::from_millis(100));

    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();

        let first: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let late = format!(
            "{}\n",
            json!({"jsonrpc": "2.0", "id": first["id"], "result": {"id": "c1", "name": "Ada"}})
        );
        let (head, tail) = late.split_at(late.len() / 2);
        // Half a reply, then silence until the client has given up
        write.write_all(head.as_bytes()).await.unwrap();

        let second: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let reply = json!({
            "jsonrpc": "2.0",
            "id": second["id"],
            "result": {"id": "c2", "name": "Grace"}
        });
        write
            .write_all(format!("{}{}\n", tail, reply).as_bytes())
            .await
            .unwrap();
    });

    let err = ds.find_one("contacts", "c1").await.unwrap_err();
    assert!(matches!(err, DataSourceError::Timeout { .. }), "{:?}", err);

    let record = ds.find_one("contacts", "c2").await.unwrap().unwrap();
    assert_eq!(record["name"], json!("Grace"));
}

#[tokio::test]
async fn test_backend_error_object() {
    let (client, server) = tokio::io::duplex(4096);
    let ds = RpcDataSource::new(client);

    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        if let Ok(Some(line)) = lines.next_line().await {
            let request: Value = serde_json::from_str(&line).unwrap();
            let reply = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32603, "message": "disk full"}
            });
            let _ = write.write_all(format!("{}\n", reply).as_bytes()).await;
        }
    });

    let err = ds
        .create("contacts", record(json!({"name": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataSourceError::Backend { status: None, ref message } if message.contains("disk full")
    ));
}
