#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod attachments;
pub mod comments;
pub mod config;
pub mod diff;
pub mod files;
pub mod identity;
pub mod legacy;
pub mod overflow;
pub mod render;
pub mod resolver;
pub mod runner;
pub mod summary;
pub mod templates;
pub mod tracker;
pub mod xref;

pub use config::{Config, ConfigError, MappedField};
pub use diff::{compute_diff, Desired, DesiredState, FieldDiff};
pub use files::{AttachmentFiles, LocalAttachmentFiles};
pub use identity::{EmailObfuscator, IdentityDirectory, Obfuscator};
pub use legacy::{SourceTicket, SqliteTicketStore, StoreError, TicketStore};
pub use render::{MarkupRenderer, RenderContext, WikiRenderer};
pub use resolver::{bootstrap, BootstrapError, EntityKind, MappingResolver, ResolverError};
pub use runner::{process_ticket, RunContext, Runner, RunnerConfig, RunnerError};
pub use summary::{ActionCounts, ErrorRecord, RunSummary, TicketOutcome, TicketStage};
pub use templates::{TemplateError, TextTemplates};
pub use tracker::{IssueTracker, JiraClient, TrackerError};
