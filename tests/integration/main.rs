//! End-to-end tests against a hand-written fake OrientDB server (§10.4):
//! handshake failure, a successful DB_OPEN with schema bootstrap, a
//! RECORD_LOAD that needs a schema refetch to resolve, a CUD transaction,
//! a live-query subscribe/unsubscribe cycle, and a stuck request timing out.

mod fake_server;

use std::time::Duration;

use fake_server::{encode_schema_document, encode_unresolved_property_string, FakeServer};
use orientdb_client::{ClientError, ConnectionConfig, LiveQueryEvent, Params, RecordOp, Session, TxOp};
use orientdb_core::{DecodedRecord, Document, OrderedMap, Rid, Value};

fn config_for_port(port: u16) -> ConnectionConfig {
    ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(2),
        ..ConnectionConfig::default()
    }
}

fn sample_document_bytes() -> Vec<u8> {
    let mut fields = OrderedMap::new();
    fields.insert("x", Value::Int32(1));
    let doc = Document { class: Some("V".to_string()), version: None, rid: None, fields };
    orientdb_core::record::encode_document(&doc)
}

#[tokio::test]
async fn handshake_fails_on_low_protocol_version() {
    let server = FakeServer::bind().await;
    let port = server.port;

    tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.send_protocol_version(20).await; // below the floor of 28
    });

    let config = config_for_port(port);
    let result = Session::connect_server(&config).await;
    match result {
        Err(ClientError::UnsupportedServerProtocol(v)) => assert_eq!(v, 20),
        other => panic!("expected UnsupportedServerProtocol, got {other:?}"),
    }
}

#[tokio::test]
async fn connect_db_succeeds_and_bootstraps_schema() {
    let server = FakeServer::bind().await;
    let port = server.port;

    tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.send_protocol_version(33).await;

        let (_opcode, _session_id) = conn.read_request_prefix().await; // DB_OPEN
        conn.drain_handshake_args(true).await;
        conn.write_handshake_success(7).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // schema bootstrap RECORD_LOAD
        conn.drain_record_load_args().await;
        let schema_bytes = encode_schema_document(&[(0, "name", "STRING")]);
        conn.write_record_load_present(session_id, 1, &schema_bytes).await;
    });

    let config = config_for_port(port);
    let session = Session::connect_db(&config, "mydb").await.expect("connect_db should succeed");
    assert_eq!(session.protocol_version(), 33);
    assert_eq!(session.connection_kind(), orientdb_client::ConnectionKind::Db);
}

#[tokio::test]
async fn load_record_redecodes_after_schema_refetch() {
    let server = FakeServer::bind().await;
    let port = server.port;

    tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.send_protocol_version(33).await;

        let (_opcode, _session_id) = conn.read_request_prefix().await; // DB_OPEN
        conn.drain_handshake_args(true).await;
        conn.write_handshake_success(1).await;

        // Initial schema bootstrap: property id 5 isn't registered yet.
        let (_opcode, session_id) = conn.read_request_prefix().await;
        conn.drain_record_load_args().await;
        let schema_v1 = encode_schema_document(&[(0, "name", "STRING")]);
        conn.write_record_load_present(session_id, 1, &schema_v1).await;

        // The data record's header references the still-unknown property id 5.
        let (_opcode, session_id) = conn.read_request_prefix().await;
        conn.drain_record_load_args().await;
        let raw = encode_unresolved_property_string(5, "Alice");
        conn.write_record_load_present(session_id, 1, &raw).await;

        // `load_record` refetches the schema; this time property id 5 is registered.
        let (_opcode, session_id) = conn.read_request_prefix().await;
        conn.drain_record_load_args().await;
        let schema_v2 = encode_schema_document(&[(0, "name", "STRING"), (5, "nickname", "STRING")]);
        conn.write_record_load_present(session_id, 2, &schema_v2).await;
    });

    let config = config_for_port(port);
    let session = Session::connect_db(&config, "mydb").await.expect("connect_db should succeed");

    let record = session
        .load_record(Rid::new(10, 7), "*:0", false, false)
        .await
        .expect("load_record should succeed")
        .expect("record should be present");

    match record {
        DecodedRecord::Document(doc) => {
            assert_eq!(doc.fields.get("nickname"), Some(&Value::String("Alice".to_string())));
        }
        other => panic!("expected a resolved document, got {other:?}"),
    }
}

#[tokio::test]
async fn transaction_commits_creates_and_updates() {
    let server = FakeServer::bind().await;
    let port = server.port;

    tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.send_protocol_version(33).await;

        let (_opcode, _session_id) = conn.read_request_prefix().await;
        conn.drain_handshake_args(true).await;
        conn.write_handshake_success(3).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // schema bootstrap
        conn.drain_record_load_args().await;
        conn.write_record_load_present(session_id, 1, &encode_schema_document(&[])).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // TX_COMMIT
        conn.drain_tx_commit_args().await;
        conn.write_tx_commit_result(session_id, &[(-2, 12, 99, 0)], &[(5, 2, 4)]).await;
    });

    let config = config_for_port(port);
    let session = Session::connect_db(&config, "mydb").await.expect("connect_db should succeed");

    let mut created_fields = OrderedMap::new();
    created_fields.insert("name", Value::String("new".to_string()));
    let create = TxOp::Create {
        class_hint_record_type: b'd',
        doc: Document { class: Some("V".to_string()), version: None, rid: None, fields: created_fields },
    };
    let update =
        TxOp::Update { rid: Rid::new(5, 2), version: Some(3), record_type: b'd', doc: Document::new("V".to_string()) };

    let (created, updated) = session.transaction(vec![create, update]).await.expect("transaction should commit");
    assert_eq!(created, vec![(Rid::new(12, 99), 0)]);
    assert_eq!(updated, vec![(Rid::new(5, 2), 4)]);
}

#[tokio::test]
async fn live_query_unsubscribe_silently_drops_late_pushes() {
    let server = FakeServer::bind().await;
    let port = server.port;

    tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.send_protocol_version(33).await;

        let (_opcode, _session_id) = conn.read_request_prefix().await;
        conn.drain_handshake_args(true).await;
        conn.write_handshake_success(9).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // schema bootstrap
        conn.drain_record_load_args().await;
        conn.write_record_load_present(session_id, 1, &encode_schema_document(&[])).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // COMMAND (live subscribe)
        let (mode, query) = conn.drain_command_query_args().await;
        assert_eq!(mode, b'l');
        assert_eq!(query, "live select from V");
        conn.write_i64_result(session_id, 42).await;

        let record = sample_document_bytes();
        conn.write_push_live_query_changed(42, 1, &record).await;

        // A stray push for a token the client has already unsubscribed from
        // must not disturb the response queue: the DB_SIZE call right after
        // it still gets its own answer.
        conn.write_push_live_query_changed(42, 2, &record).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // DB_SIZE
        conn.write_i64_result(session_id, 7).await;
    });

    let config = config_for_port(port);
    let session = Session::connect_db(&config, "mydb").await.expect("connect_db should succeed");

    let (token, mut events) =
        session.live_query("live select from V", Params::None).await.expect("live_query should subscribe");
    assert_eq!(token, 42);

    match events.recv().await {
        Some(LiveQueryEvent::Changed { op, .. }) => assert_eq!(op, RecordOp::Create),
        other => panic!("expected a Changed event, got {other:?}"),
    }

    session.live_query_unsubscribe(token);
    assert_eq!(events.recv().await, Some(LiveQueryEvent::Unsubscribed));

    let size = session.db_size().await.expect("db_size should still succeed after the stray push");
    assert_eq!(size, 7);
}

#[tokio::test]
async fn request_timeout_promotes_session_to_failed() {
    let server = FakeServer::bind().await;
    let port = server.port;

    tokio::spawn(async move {
        let mut conn = server.accept().await;
        conn.send_protocol_version(33).await;

        let (_opcode, _session_id) = conn.read_request_prefix().await;
        conn.drain_handshake_args(true).await;
        conn.write_handshake_success(5).await;

        let (_opcode, session_id) = conn.read_request_prefix().await; // schema bootstrap
        conn.drain_record_load_args().await;
        conn.write_record_load_present(session_id, 1, &encode_schema_document(&[])).await;

        // Accept the next request but never answer it.
        let _ = conn.read_request_prefix().await;
        std::future::pending::<()>().await
    });

    let mut config = config_for_port(port);
    config.request_timeout = Duration::from_millis(100);
    let session = Session::connect_db(&config, "mydb").await.expect("connect_db should succeed");

    let result = session.db_size().await;
    assert!(matches!(result, Err(ClientError::Timeout)), "expected Timeout, got {result:?}");

    // The stuck request's timeout promotes the whole session to Failed
    // (§4.5): every call made afterward must see the session closed rather
    // than queueing up behind the still-unanswered first request.
    let result = session.db_size().await;
    assert!(matches!(result, Err(ClientError::ConnectionClosed)), "expected ConnectionClosed, got {result:?}");
}
