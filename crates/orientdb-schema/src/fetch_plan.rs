//! Fetch-plan resolver (§4.7): substitutes RIDs for the records a server
//! response returned alongside the main result (its "linked records").

use std::collections::HashMap;

use orientdb_core::{Document, Rid};

use crate::error::Missing;

/// A value shaped the resolver knows how to walk: a bare RID, a list of
/// RIDs, or a name-keyed map of RIDs. Nested resolution is manual — callers
/// chain `resolve` themselves for deeper link graphs (§4.7).
pub enum Linked {
    One(Rid),
    Many(Vec<Rid>),
    Map(Vec<(String, Rid)>),
}

#[derive(Debug)]
pub enum Resolved {
    One(Document),
    Many(Vec<Document>),
    Map(Vec<(String, Document)>),
}

/// Resolves `value` against `linked_records`, failing on the first RID with
/// no corresponding entry.
pub fn resolve(value: Linked, linked_records: &HashMap<Rid, Document>) -> Result<Resolved, Missing> {
    match value {
        Linked::One(rid) => linked_records.get(&rid).cloned().map(Resolved::One).ok_or(Missing(rid)),
        Linked::Many(rids) => {
            let mut docs = Vec::with_capacity(rids.len());
            for rid in rids {
                docs.push(linked_records.get(&rid).cloned().ok_or(Missing(rid))?);
            }
            Ok(Resolved::Many(docs))
        }
        Linked::Map(entries) => {
            let mut docs = Vec::with_capacity(entries.len());
            for (key, rid) in entries {
                let doc = linked_records.get(&rid).cloned().ok_or(Missing(rid))?;
                docs.push((key, doc));
            }
            Ok(Resolved::Map(docs))
        }
    }
}

#[cfg(test)]
mod tests {
    use orientdb_core::OrderedMap;

    use super::*;

    fn doc_named(name: &str) -> Document {
        Document { class: Some(name.to_string()), version: None, rid: None, fields: OrderedMap::new() }
    }

    #[test]
    fn resolves_every_rid_in_a_list() {
        let mut linked = HashMap::new();
        linked.insert(Rid::new(1, 2), doc_named("Doc1"));
        linked.insert(Rid::new(3, 4), doc_named("Doc2"));

        let result = resolve(Linked::Many(vec![Rid::new(1, 2), Rid::new(3, 4)]), &linked).unwrap();
        match result {
            Resolved::Many(docs) => {
                assert_eq!(docs[0].class.as_deref(), Some("Doc1"));
                assert_eq!(docs[1].class.as_deref(), Some("Doc2"));
            }
            _ => panic!("expected Many"),
        }
    }

    #[test]
    fn missing_rid_fails_with_its_identity() {
        let mut linked = HashMap::new();
        linked.insert(Rid::new(1, 2), doc_named("Doc1"));

        let err = resolve(Linked::Many(vec![Rid::new(1, 2), Rid::new(9, 9)]), &linked).unwrap_err();
        assert_eq!(err, Missing(Rid::new(9, 9)));
    }
}
