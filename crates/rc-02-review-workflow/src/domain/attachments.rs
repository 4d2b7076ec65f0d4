//! Insertion-ordered document list, unique by document id.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Document, Role, WorkflowError, WorkflowResult};
use std::collections::HashSet;

/// Fails unless `owner` owns `doc`.
pub(crate) fn ensure_owned(doc: &Document, owner: &Address) -> WorkflowResult<()> {
    if doc.owner == *owner {
        Ok(())
    } else {
        Err(WorkflowError::unauthorized(*owner, Role::DocumentOwner))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct AttachmentList(Vec<Document>);

impl AttachmentList {
    /// Wraps documents already known to be unique.
    pub(crate) fn from_validated(docs: Vec<Document>) -> Self {
        Self(docs)
    }

    /// Checks batch uniqueness and, when `owner` is given, ownership.
    pub(crate) fn validated(docs: Vec<Document>, owner: Option<&Address>) -> WorkflowResult<Self> {
        check_batch(&docs)?;
        if let Some(owner) = owner {
            for doc in &docs {
                ensure_owned(doc, owner)?;
            }
        }
        Ok(Self(docs))
    }

    pub(crate) fn as_slice(&self) -> &[Document] {
        &self.0
    }

    pub(crate) fn into_vec(self) -> Vec<Document> {
        self.0
    }

    fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|d| d.id == id)
    }

    /// Appends all documents or none. Returns the appended ids.
    pub(crate) fn append(&mut self, docs: Vec<Document>) -> WorkflowResult<Vec<String>> {
        check_batch(&docs)?;
        if let Some(dup) = docs.iter().find(|d| self.contains(&d.id)) {
            return Err(WorkflowError::already_exists("attachment", &dup.id));
        }
        let ids = docs.iter().map(|d| d.id.clone()).collect();
        self.0.extend(docs);
        Ok(ids)
    }

    /// Removes matching ids; unknown ids are ignored. Returns the removed ids.
    pub(crate) fn remove(&mut self, ids: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut removed = Vec::new();
        self.0.retain(|doc| {
            if wanted.contains(doc.id.as_str()) {
                removed.push(doc.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

fn check_batch(docs: &[Document]) -> WorkflowResult<()> {
    let mut seen = HashSet::new();
    for doc in docs {
        if !seen.insert(doc.id.as_str()) {
            return Err(WorkflowError::invalid_argument(format!(
                "attachment {} appears twice in the batch",
                doc.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::labelled(id, Address::from_label("owner"))
    }

    #[test]
    fn test_batch_duplicates_rejected() {
        let err = AttachmentList::validated(vec![doc("a"), doc("a")], None).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument(_)));
    }

    #[test]
    fn test_append_is_all_or_nothing() {
        let mut list = AttachmentList::from_validated(vec![doc("a")]);
        let err = list.append(vec![doc("b"), doc("a")]).unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyExists { .. }));
        assert_eq!(list.as_slice().len(), 1);

        let ids = list.append(vec![doc("b"), doc("c")]).unwrap();
        assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut list = AttachmentList::from_validated(vec![doc("a"), doc("b"), doc("c")]);
        let removed = list.remove(&["b".into(), "zzz".into()]);
        assert_eq!(removed, vec!["b".to_string()]);
        let ids: Vec<_> = list.as_slice().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_ownership_check() {
        let stranger = Address::from_label("stranger");
        let err = AttachmentList::validated(vec![doc("a")], Some(&stranger)).unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    }
}
