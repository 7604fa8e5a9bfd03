//! Memoized name to id lookups against the remote tracker.
//!
//! Each entity kind is listed from the tracker at most once per run, on
//! first use. Concurrent first callers share the same in-flight listing.
//! The tables live as long as the [`MappingResolver`], which is owned by
//! the run context and dropped with it.

mod bootstrap;
mod error;

pub use bootstrap::{bootstrap, version_body};
pub use error::{BootstrapError, ResolverError};

use crate::config::MappedField;
use crate::tracker::{with_timeout, IssueTracker, NamedEntity, Project, TrackerError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Issue type used for every ticket when no type table is configured.
pub const DEFAULT_ISSUE_TYPE: &str = "Bug";

/// Kinds of remote entities addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Component,
    Version,
    Priority,
    Status,
    IssueType,
    Field,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Version => "version",
            Self::Priority => "priority",
            Self::Status => "status",
            Self::IssueType => "issue type",
            Self::Field => "field",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name to id table for one entity kind, with the reverse direction for
/// display purposes.
#[derive(Debug, Default)]
struct EntityTable {
    ids: HashMap<String, String>,
    names: HashMap<String, String>,
}

impl EntityTable {
    fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut table = Self::default();
        for (name, id) in entries {
            table.insert(name, id);
        }
        table
    }

    fn insert(&mut self, name: String, id: String) {
        self.names.entry(id.clone()).or_insert_with(|| name.clone());
        self.ids.entry(name).or_insert(id);
    }
}

/// Resolves legacy names into remote ids for the duration of one run.
pub struct MappingResolver {
    tracker: Arc<dyn IssueTracker>,
    project_key: String,
    field_names: BTreeMap<MappedField, String>,
    timeout: Duration,
    project: OnceCell<Project>,
    components: OnceCell<RwLock<EntityTable>>,
    versions: OnceCell<RwLock<EntityTable>>,
    priorities: OnceCell<RwLock<EntityTable>>,
    statuses: OnceCell<RwLock<EntityTable>>,
    issue_types: OnceCell<RwLock<EntityTable>>,
    fields: OnceCell<RwLock<EntityTable>>,
}

impl MappingResolver {
    #[must_use]
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        project_key: impl Into<String>,
        field_names: BTreeMap<MappedField, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            tracker,
            project_key: project_key.into(),
            field_names,
            timeout,
            project: OnceCell::new(),
            components: OnceCell::new(),
            versions: OnceCell::new(),
            priorities: OnceCell::new(),
            statuses: OnceCell::new(),
            issue_types: OnceCell::new(),
            fields: OnceCell::new(),
        }
    }

    /// The remote project, fetched once.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Project`] if the lookup fails.
    pub async fn project(&self) -> Result<&Project, ResolverError> {
        self.project
            .get_or_try_init(|| async {
                with_timeout(self.timeout, self.tracker.project(&self.project_key))
                    .await
                    .map_err(|source| ResolverError::Project {
                        key: self.project_key.clone(),
                        source,
                    })
            })
            .await
    }

    /// Looks up the id of a named entity.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Listing`] if the table has to be loaded and
    /// the listing fails.
    pub async fn resolve(&self, kind: EntityKind, name: &str) -> Result<Option<String>, ResolverError> {
        let table = self.table(kind).await?;
        let table = table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.ids.get(name).cloned())
    }

    /// Like [`MappingResolver::resolve`], treating blank names as unresolved.
    ///
    /// # Errors
    ///
    /// See [`MappingResolver::resolve`].
    pub async fn resolve_opt(
        &self,
        kind: EntityKind,
        name: Option<&str>,
    ) -> Result<Option<String>, ResolverError> {
        match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => self.resolve(kind, name).await,
            None => Ok(None),
        }
    }

    /// Records an entity created during this run.
    ///
    /// # Errors
    ///
    /// See [`MappingResolver::resolve`].
    pub async fn insert(&self, kind: EntityKind, name: &str, id: &str) -> Result<(), ResolverError> {
        let table = self.table(kind).await?;
        table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), id.to_string());
        Ok(())
    }

    /// Display name for a field id, falling back to the id itself.
    pub async fn field_display_name(&self, field_id: &str) -> String {
        let Ok(table) = self.table(EntityKind::Field).await else {
            return field_id.to_string();
        };
        let table = table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .names
            .get(field_id)
            .cloned()
            .unwrap_or_else(|| field_id.to_string())
    }

    /// Remote field id for a configured mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::UnmappedField`] if the mapping is not
    /// configured, or [`ResolverError::MissingRemoteField`] if the remote
    /// schema has no field with the configured name.
    pub async fn field_id(&self, field: MappedField) -> Result<String, ResolverError> {
        let name = self
            .field_names
            .get(&field)
            .ok_or(ResolverError::UnmappedField(field))?;
        self.resolve(EntityKind::Field, name)
            .await?
            .ok_or_else(|| ResolverError::MissingRemoteField {
                field,
                name: name.clone(),
            })
    }

    /// Remote field id for an optional mapping; `None` when not configured.
    ///
    /// # Errors
    ///
    /// See [`MappingResolver::field_id`].
    pub async fn mapped_field_id(&self, field: MappedField) -> Result<Option<String>, ResolverError> {
        if self.field_names.contains_key(&field) {
            self.field_id(field).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Checks every configured mapping, and the required ones, against the
    /// remote schema.
    ///
    /// # Errors
    ///
    /// Returns the first mapping that cannot be resolved.
    pub async fn validate_field_mappings(&self) -> Result<(), ResolverError> {
        for field in MappedField::REQUIRED {
            self.field_id(field).await?;
        }
        for field in self.field_names.keys() {
            self.field_id(*field).await?;
        }
        Ok(())
    }

    /// Remote issue type id for a legacy ticket type.
    ///
    /// With no type table every ticket maps to [`DEFAULT_ISSUE_TYPE`].
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::UnknownLegacyType`] or
    /// [`ResolverError::UnknownIssueType`]; both abort the run.
    pub async fn issue_type_for(
        &self,
        legacy_type: Option<&str>,
        map_types: Option<&BTreeMap<String, String>>,
    ) -> Result<String, ResolverError> {
        let legacy = legacy_type.unwrap_or("");
        let remote = match map_types {
            None => DEFAULT_ISSUE_TYPE,
            Some(map) => map
                .get(legacy)
                .map(String::as_str)
                .ok_or_else(|| ResolverError::UnknownLegacyType(legacy.to_string()))?,
        };

        self.resolve(EntityKind::IssueType, remote)
            .await?
            .ok_or_else(|| ResolverError::UnknownIssueType {
                legacy: legacy.to_string(),
                remote: remote.to_string(),
            })
    }

    /// Loads every table up front so listing failures surface before the
    /// first ticket.
    ///
    /// # Errors
    ///
    /// Returns the first listing failure.
    pub async fn warm_up(&self) -> Result<(), ResolverError> {
        futures::try_join!(
            self.table(EntityKind::Component),
            self.table(EntityKind::Version),
            self.table(EntityKind::Priority),
            self.table(EntityKind::Status),
            self.table(EntityKind::IssueType),
            self.table(EntityKind::Field),
        )?;
        Ok(())
    }

    fn cell(&self, kind: EntityKind) -> &OnceCell<RwLock<EntityTable>> {
        match kind {
            EntityKind::Component => &self.components,
            EntityKind::Version => &self.versions,
            EntityKind::Priority => &self.priorities,
            EntityKind::Status => &self.statuses,
            EntityKind::IssueType => &self.issue_types,
            EntityKind::Field => &self.fields,
        }
    }

    async fn table(&self, kind: EntityKind) -> Result<&RwLock<EntityTable>, ResolverError> {
        self.cell(kind)
            .get_or_try_init(|| async {
                let entries = with_timeout(self.timeout, self.fetch(kind))
                    .await
                    .map_err(|source| ResolverError::Listing { kind, source })?;
                debug!(%kind, count = entries.len(), "Loaded remote listing");
                Ok::<_, ResolverError>(RwLock::new(EntityTable::from_entries(entries)))
            })
            .await
    }

    async fn fetch(&self, kind: EntityKind) -> Result<Vec<(String, String)>, TrackerError> {
        let tracker = self.tracker.as_ref();
        let named = |entities: Vec<NamedEntity>| {
            entities
                .into_iter()
                .map(|e| (e.name, e.id))
                .collect::<Vec<_>>()
        };

        Ok(match kind {
            EntityKind::Component => named(tracker.list_components(&self.project_key).await?),
            EntityKind::Version => named(tracker.list_versions(&self.project_key).await?),
            EntityKind::Priority => named(tracker.list_priorities().await?),
            EntityKind::Status => named(tracker.list_statuses().await?),
            EntityKind::IssueType => named(tracker.list_issue_types().await?),
            EntityKind::Field => tracker
                .list_fields()
                .await?
                .into_iter()
                .map(|f| {
                    let id = f.update_id().to_string();
                    (f.name, id)
                })
                .collect(),
        })
    }
}

impl fmt::Debug for MappingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingResolver")
            .field("project_key", &self.project_key)
            .field("field_names", &self.field_names)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{
        FieldDef, NewComponent, NewIssueLink, NewVersion, RemoteAttachment, RemoteComment,
        RemoteIssue, UserRef,
    };
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tracker that only answers listings and counts them.
    #[derive(Default)]
    struct ListingTracker {
        listings: AtomicUsize,
        failing: bool,
    }

    fn entity(id: &str, name: &str) -> NamedEntity {
        NamedEntity {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn unsupported<T>() -> Result<T, TrackerError> {
        Err(TrackerError::Status {
            status: 501,
            message: "not available in this test".to_string(),
        })
    }

    impl ListingTracker {
        async fn listing(
            &self,
            entries: Vec<NamedEntity>,
        ) -> Result<Vec<NamedEntity>, TrackerError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.failing {
                return unsupported();
            }
            Ok(entries)
        }
    }

    #[async_trait]
    impl IssueTracker for ListingTracker {
        async fn project(&self, key: &str) -> Result<Project, TrackerError> {
            Ok(Project {
                id: "10000".to_string(),
                key: key.to_string(),
            })
        }

        async fn find_issue(&self, _key: &str) -> Result<RemoteIssue, TrackerError> {
            unsupported()
        }

        async fn update_issue(
            &self,
            _key: &str,
            _fields: &Map<String, Value>,
            _notify_users: bool,
        ) -> Result<(), TrackerError> {
            unsupported()
        }

        async fn list_issue_types(&self) -> Result<Vec<NamedEntity>, TrackerError> {
            self.listing(vec![entity("1", "Bug"), entity("3", "Task")]).await
        }

        async fn list_fields(&self) -> Result<Vec<FieldDef>, TrackerError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                FieldDef {
                    id: "priority".to_string(),
                    key: Some("priority".to_string()),
                    name: "Priority".to_string(),
                },
                FieldDef {
                    id: "customfield_10100".to_string(),
                    key: None,
                    name: "Trac Status".to_string(),
                },
            ])
        }

        async fn list_components(&self, _project: &str) -> Result<Vec<NamedEntity>, TrackerError> {
            self.listing(vec![entity("20", "formatting")]).await
        }

        async fn list_priorities(&self) -> Result<Vec<NamedEntity>, TrackerError> {
            self.listing(vec![entity("2", "minor"), entity("3", "major")]).await
        }

        async fn list_versions(&self, _project: &str) -> Result<Vec<NamedEntity>, TrackerError> {
            self.listing(Vec::new()).await
        }

        async fn list_statuses(&self) -> Result<Vec<NamedEntity>, TrackerError> {
            self.listing(Vec::new()).await
        }

        async fn create_component(&self, _body: &NewComponent) -> Result<NamedEntity, TrackerError> {
            unsupported()
        }

        async fn create_version(&self, _body: &NewVersion) -> Result<NamedEntity, TrackerError> {
            unsupported()
        }

        async fn create_link(&self, _body: &NewIssueLink) -> Result<(), TrackerError> {
            unsupported()
        }

        async fn add_comment(&self, _key: &str, _body: &str) -> Result<RemoteComment, TrackerError> {
            unsupported()
        }

        async fn update_comment(
            &self,
            _key: &str,
            _comment_id: &str,
            _body: &str,
        ) -> Result<(), TrackerError> {
            unsupported()
        }

        async fn add_attachment(
            &self,
            _key: &str,
            _filename: &str,
            _content: Vec<u8>,
        ) -> Result<Vec<RemoteAttachment>, TrackerError> {
            unsupported()
        }

        async fn delete_attachment(&self, _attachment_id: &str) -> Result<(), TrackerError> {
            unsupported()
        }

        async fn user_by_account_id(&self, _account_id: &str) -> Result<UserRef, TrackerError> {
            unsupported()
        }
    }

    fn resolver(
        tracker: &Arc<ListingTracker>,
        field_names: &[(MappedField, &str)],
    ) -> MappingResolver {
        let field_names = field_names
            .iter()
            .map(|(field, name)| (*field, (*name).to_string()))
            .collect();
        MappingResolver::new(
            Arc::clone(tracker) as Arc<dyn IssueTracker>,
            "ICU",
            field_names,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_listing() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(&tracker, &[]);

        let (major, minor) = tokio::join!(
            resolver.resolve(EntityKind::Priority, "major"),
            resolver.resolve(EntityKind::Priority, "minor"),
        );

        assert_eq!(major.unwrap().as_deref(), Some("3"));
        assert_eq!(minor.unwrap().as_deref(), Some("2"));
        assert_eq!(tracker.listings.load(Ordering::SeqCst), 1);

        resolver.resolve(EntityKind::Priority, "blocker").await.unwrap();
        assert_eq!(tracker.listings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inserted_entities_resolve_without_relisting() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(&tracker, &[]);

        assert_eq!(resolver.resolve(EntityKind::Version, "63").await.unwrap(), None);
        resolver.insert(EntityKind::Version, "63", "30").await.unwrap();

        assert_eq!(
            resolver.resolve(EntityKind::Version, "63").await.unwrap().as_deref(),
            Some("30")
        );
        assert_eq!(resolver.resolve_opt(EntityKind::Version, Some("  ")).await.unwrap(), None);
        assert_eq!(tracker.listings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_listing_reports_the_kind() {
        let tracker = Arc::new(ListingTracker {
            failing: true,
            ..ListingTracker::default()
        });
        let resolver = resolver(&tracker, &[]);

        let result = resolver.resolve(EntityKind::Component, "formatting").await;

        assert!(matches!(
            result,
            Err(ResolverError::Listing {
                kind: EntityKind::Component,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn required_field_without_mapping_is_fatal() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(&tracker, &[]);

        assert!(matches!(
            resolver.field_id(MappedField::Status).await,
            Err(ResolverError::UnmappedField(MappedField::Status))
        ));
        assert!(matches!(
            resolver.validate_field_mappings().await,
            Err(ResolverError::UnmappedField(MappedField::Status))
        ));
        assert_eq!(resolver.mapped_field_id(MappedField::Weeks).await.unwrap(), None);
    }

    #[tokio::test]
    async fn mapping_to_unknown_remote_field_is_fatal() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(
            &tracker,
            &[
                (MappedField::Status, "Trac Status"),
                (MappedField::Resolution, "Trac Resolution"),
            ],
        );

        assert_eq!(
            resolver.field_id(MappedField::Status).await.unwrap(),
            "customfield_10100"
        );
        match resolver.field_id(MappedField::Resolution).await {
            Err(ResolverError::MissingRemoteField { field, name }) => {
                assert_eq!(field, MappedField::Resolution);
                assert_eq!(name, "Trac Resolution");
            }
            other => panic!("expected MissingRemoteField, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn display_names_fall_back_to_the_id() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(&tracker, &[]);

        assert_eq!(resolver.field_display_name("priority").await, "Priority");
        assert_eq!(resolver.field_display_name("labels").await, "labels");
    }

    #[tokio::test]
    async fn issue_types_default_to_bug_without_a_table() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(&tracker, &[]);

        assert_eq!(resolver.issue_type_for(Some("defect"), None).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn unmapped_or_unknown_issue_types_are_fatal() {
        let tracker = Arc::new(ListingTracker::default());
        let resolver = resolver(&tracker, &[]);
        let types: BTreeMap<String, String> = [
            ("task".to_string(), "Task".to_string()),
            ("enhancement".to_string(), "Improvement".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            resolver.issue_type_for(Some("task"), Some(&types)).await.unwrap(),
            "3"
        );
        assert!(matches!(
            resolver.issue_type_for(Some("defect"), Some(&types)).await,
            Err(ResolverError::UnknownLegacyType(legacy)) if legacy == "defect"
        ));
        assert!(matches!(
            resolver.issue_type_for(Some("enhancement"), Some(&types)).await,
            Err(ResolverError::UnknownIssueType { legacy, remote })
                if legacy == "enhancement" && remote == "Improvement"
        ));
    }
}
