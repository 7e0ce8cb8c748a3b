//! Search action families
//!
//! Each search-like action has a matching scroll action (or none) on the
//! same controller. The pair is what a scroll continuation needs.

use crate::protocol::RequestDescriptor;

/// A search action and its scroll counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchActions {
    /// Controller both actions live on
    pub controller: &'static str,
    /// Action issuing the initial search
    pub search: &'static str,
    /// Action continuing a scroll cursor, if the family has one
    pub scroll: Option<&'static str>,
}

impl SearchActions {
    /// `document:search` / `document:scroll`
    pub const DOCUMENTS: SearchActions = SearchActions {
        controller: "document",
        search: "search",
        scroll: Some("scroll"),
    };

    /// `security:searchUsers` / `security:scrollUsers`
    pub const USERS: SearchActions = SearchActions {
        controller: "security",
        search: "searchUsers",
        scroll: Some("scrollUsers"),
    };

    /// `security:searchProfiles` / `security:scrollProfiles`
    pub const PROFILES: SearchActions = SearchActions {
        controller: "security",
        search: "searchProfiles",
        scroll: Some("scrollProfiles"),
    };

    /// `security:searchRoles`, no scroll
    pub const ROLES: SearchActions = SearchActions {
        controller: "security",
        search: "searchRoles",
        scroll: None,
    };

    /// `collection:searchSpecifications` / `collection:scrollSpecifications`
    pub const SPECIFICATIONS: SearchActions = SearchActions {
        controller: "collection",
        search: "searchSpecifications",
        scroll: Some("scrollSpecifications"),
    };

    const ALL: [SearchActions; 5] = [
        Self::DOCUMENTS,
        Self::USERS,
        Self::PROFILES,
        Self::ROLES,
        Self::SPECIFICATIONS,
    ];

    /// Family whose search action is `controller:action`
    pub fn lookup(controller: &str, action: &str) -> Option<SearchActions> {
        Self::ALL
            .iter()
            .find(|family| family.controller == controller && family.search == action)
            .copied()
    }

    /// Family of an outgoing search request
    pub fn for_request(request: &RequestDescriptor) -> Option<SearchActions> {
        Self::lookup(&request.controller, &request.action)
    }

    /// Whether `request` is the search or the scroll action of any family
    pub fn is_search_like(request: &RequestDescriptor) -> bool {
        Self::ALL.iter().any(|family| {
            family.controller == request.controller
                && (family.search == request.action || family.scroll == Some(request.action.as_str()))
        })
    }

    /// A fresh search request for this family
    pub fn search_request(&self) -> RequestDescriptor {
        RequestDescriptor::new(self.controller, self.search)
    }

    /// `controller:search`, for logging
    pub fn name(&self) -> String {
        format!("{}:{}", self.controller, self.search)
    }
}
