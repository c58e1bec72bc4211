//! Transaction batch encoding for TX_COMMIT (§4.5 Transactions).

use std::sync::atomic::{AtomicI64, Ordering};

use bytes::BytesMut;
use orientdb_core::primitives::{put_i32, put_raw};
use orientdb_core::record::encode_document;
use orientdb_core::{Document, Rid};

use crate::error::ClientError;

/// Per-session strictly-increasing transaction id counter (§3 invariant:
/// "Transaction ids are strictly monotonically increasing per session.").
#[derive(Debug, Default)]
pub struct TxIdCounter(AtomicI64);

impl TxIdCounter {
    pub fn new() -> Self {
        Self(AtomicI64::new(1))
    }

    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// One operation inside a transaction batch.
pub enum TxOp {
    Create { class_hint_record_type: u8, doc: Document },
    Update { rid: Rid, version: Option<i32>, record_type: u8, doc: Document },
    Delete { rid: Rid, version: Option<i32>, record_type: u8 },
}

/// Encodes the TX_COMMIT argument list: `[tx_id, use_tx_log, (entry)*, 0,
/// empty-bytes]`. `tx_id` itself is written by the caller (the session
/// substitutes the counter value before this function runs); this function
/// only encodes the entries.
pub fn encode_entries(out: &mut BytesMut, ops: &[TxOp]) -> Result<(), ClientError> {
    out.extend_from_slice(&[1]); // use-tx-log
    let mut provisional_position: i64 = -2;

    for op in ops {
        out.extend_from_slice(&[1]); // continuation marker
        match op {
            TxOp::Create { class_hint_record_type, doc } => {
                out.extend_from_slice(&[3]); // create
                put_raw(out, &(-1i16).to_be_bytes()); // cluster_id = -1 (let server pick)
                put_raw(out, &provisional_position.to_be_bytes());
                provisional_position -= 1;
                out.extend_from_slice(&[*class_hint_record_type]);
                let content = encode_document(doc);
                out.extend_from_slice(&(content.len() as i32).to_be_bytes());
                out.extend_from_slice(&content);
            }
            TxOp::Update { rid, version, record_type, doc } => {
                let version = version.ok_or_else(|| ClientError::MissingVersion(*rid))?;
                out.extend_from_slice(&[1]); // update
                put_raw(out, &rid.cluster_id.to_be_bytes());
                put_raw(out, &rid.position.to_be_bytes());
                out.extend_from_slice(&[*record_type]);
                put_i32(out, version);
                let content = encode_document(doc);
                out.extend_from_slice(&(content.len() as i32).to_be_bytes());
                out.extend_from_slice(&content);
                out.extend_from_slice(&[1]); // update-content = true
            }
            TxOp::Delete { rid, version, record_type } => {
                let version = version.ok_or_else(|| ClientError::MissingVersion(*rid))?;
                out.extend_from_slice(&[2]); // delete
                put_raw(out, &rid.cluster_id.to_be_bytes());
                put_raw(out, &rid.position.to_be_bytes());
                out.extend_from_slice(&[*record_type]);
                put_i32(out, version);
            }
        }
    }

    out.extend_from_slice(&[0]); // terminator
    out.extend_from_slice(&(0i32).to_be_bytes()); // empty indexes-changed bytes
    Ok(())
}

#[cfg(test)]
mod tests {
    use orientdb_core::OrderedMap;

    use super::*;

    #[test]
    fn tx_ids_increase_strictly_and_start_at_one() {
        let counter = TxIdCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.next(), 3);
    }

    #[test]
    fn create_then_delete_entry_uses_decrementing_provisional_positions() {
        let mut fields = OrderedMap::new();
        fields.insert("x", orientdb_core::Value::Int32(1));
        let create = TxOp::Create {
            class_hint_record_type: b'd',
            doc: Document { class: Some("A".into()), version: None, rid: None, fields },
        };
        let delete = TxOp::Delete { rid: Rid::new(5, 2), version: Some(3), record_type: b'd' };

        let mut out = BytesMut::new();
        encode_entries(&mut out, &[create, delete]).unwrap();

        // use-tx-log byte, then continuation(1) + create(3) + cluster_id(-1)
        assert_eq!(out[0], 1);
        assert_eq!(out[1], 1); // continuation
        assert_eq!(out[2], 3); // create
        let provisional = i16::from_be_bytes([out[3], out[4]]);
        assert_eq!(provisional, -1); // cluster_id placeholder, not the position
        let position = i64::from_be_bytes(out[5..13].try_into().unwrap());
        assert_eq!(position, -2);
    }

    #[test]
    fn delete_without_version_is_rejected() {
        let delete = TxOp::Delete { rid: Rid::new(5, 2), version: None, record_type: b'd' };
        let mut out = BytesMut::new();
        assert!(encode_entries(&mut out, &[delete]).is_err());
    }
}
