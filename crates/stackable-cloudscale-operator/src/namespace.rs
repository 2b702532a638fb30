//! This module provides helpers to restrict the operator to a namespace.
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Resource};

use crate::client::Client;

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum WatchNamespace {
    All,
    One(String),
}

impl From<&str> for WatchNamespace {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            WatchNamespace::All
        } else {
            WatchNamespace::One(s.to_string())
        }
    }
}

impl WatchNamespace {
    /// Gets an API object for the namespace in question or for all namespaces,
    /// depending on which variant we are.
    pub fn get_api<T>(&self, client: &Client) -> Api<T>
    where
        T: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match self {
            WatchNamespace::All => client.get_all_api(),
            WatchNamespace::One(namespace) => client.get_namespaced_api(namespace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_watches_all_namespaces() {
        assert_eq!(WatchNamespace::from(""), WatchNamespace::All);
        assert_eq!(
            WatchNamespace::from("storage"),
            WatchNamespace::One("storage".to_owned())
        );
    }
}
