//! Read results and their combinators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::FetchRequest;

/// Freshness of a read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Missing or stale; a refresh has been (or must be) requested.
    Loading,
    /// Present and within its TTL.
    Ready,
}

impl Status {
    pub fn is_ready(self) -> bool {
        self == Status::Ready
    }

    /// `Ready` only if both are ready.
    pub fn and(self, other: Status) -> Status {
        if self.is_ready() && other.is_ready() {
            Status::Ready
        } else {
            Status::Loading
        }
    }
}

/// Snapshot answer from a cache read.
///
/// `value` holds whatever is known right now, stale or partial values
/// included, so callers never regress to a blank state during a refresh.
/// `requests` lists the fetches needed to make the answer complete; it is
/// empty whenever `status` is [`Status::Ready`].
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    pub status: Status,
    pub value: T,
    pub requests: Vec<FetchRequest>,
}

impl<T> Lookup<T> {
    /// A fresh, complete result.
    pub fn ready(value: T) -> Self {
        Self {
            status: Status::Ready,
            value,
            requests: Vec::new(),
        }
    }

    /// An incomplete result along with the fetches that would complete it.
    pub fn loading(value: T, requests: Vec<FetchRequest>) -> Self {
        Self {
            status: Status::Loading,
            value,
            requests,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    /// Transform the value, keeping status and requests.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        Lookup {
            status: self.status,
            value: f(self.value),
            requests: self.requests,
        }
    }

    /// Merge lookups into one: ready iff every input is ready, values in
    /// input order, requests concatenated.
    pub fn all(lookups: impl IntoIterator<Item = Lookup<T>>) -> Lookup<Vec<T>> {
        let mut status = Status::Ready;
        let mut values = Vec::new();
        let mut requests = Vec::new();
        for lookup in lookups {
            status = status.and(lookup.status);
            values.push(lookup.value);
            requests.extend(lookup.requests);
        }
        Lookup {
            status,
            value: values,
            requests,
        }
    }

    /// Keyed variant of [`Lookup::all`]: map in, map out.
    pub fn all_keyed<K: Ord>(lookups: BTreeMap<K, Lookup<T>>) -> Lookup<BTreeMap<K, T>> {
        let mut status = Status::Ready;
        let mut values = BTreeMap::new();
        let mut requests = Vec::new();
        for (key, lookup) in lookups {
            status = status.and(lookup.status);
            values.insert(key, lookup.value);
            requests.extend(lookup.requests);
        }
        Lookup {
            status,
            value: values,
            requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_ready_only_when_every_input_is() {
        let merged = Lookup::all(vec![Lookup::ready(1), Lookup::ready(2)]);
        assert_eq!(merged.status, Status::Ready);
        assert_eq!(merged.value, vec![1, 2]);

        let merged = Lookup::all(vec![
            Lookup::ready(1),
            Lookup::loading(0, vec![FetchRequest::entity("user", 9)]),
        ]);
        assert_eq!(merged.status, Status::Loading);
        assert_eq!(merged.value, vec![1, 0]);
        assert_eq!(merged.requests, vec![FetchRequest::entity("user", 9)]);
    }

    #[test]
    fn all_of_nothing_is_ready() {
        let merged: Lookup<Vec<u8>> = Lookup::all(Vec::new());
        assert!(merged.is_ready());
        assert!(merged.value.is_empty());
    }

    #[test]
    fn all_keyed_keeps_keys() {
        let mut input = BTreeMap::new();
        input.insert("owner", Lookup::ready("alice"));
        input.insert(
            "team",
            Lookup::loading("", vec![FetchRequest::entity("team", 3)]),
        );
        let merged = Lookup::all_keyed(input);
        assert_eq!(merged.status, Status::Loading);
        assert_eq!(merged.value["owner"], "alice");
        assert_eq!(merged.requests.len(), 1);
    }

    #[test]
    fn map_keeps_status_and_requests() {
        let lookup = Lookup::loading(2, vec![FetchRequest::entity("user", 1)]).map(|n| n * 10);
        assert_eq!(lookup.value, 20);
        assert_eq!(lookup.status, Status::Loading);
        assert_eq!(lookup.requests.len(), 1);
    }
}
