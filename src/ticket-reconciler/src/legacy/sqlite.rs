//! SQLite-backed legacy store using the Trac schema.

use super::{
    LegacyAttachment, LegacyComment, LegacyComponent, Milestone, SourceTicket, StoreError,
    TicketStore,
};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Legacy store reading a Trac SQLite database.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Opens the database read-only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!(path = %path.display(), "Opening legacy database");
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |e| StoreError::Open {
                path: path.display().to_string(),
                source: e,
            },
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn custom_fields(
        conn: &Connection,
        ticket_id: u64,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let mut stmt = conn.prepare_cached(
            "SELECT name, value FROM ticket_custom WHERE ticket = ?1 AND value IS NOT NULL",
        )?;
        let rows = stmt
            .query_map([ticket_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;
        Ok(rows)
    }
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<SourceTicket> {
    Ok(SourceTicket {
        id: row.get("id")?,
        ticket_type: row.get("type")?,
        time: row.get::<_, Option<i64>>("time")?.unwrap_or_default(),
        component: row.get("component")?,
        priority: row.get("priority")?,
        owner: row.get("owner")?,
        reporter: row.get("reporter")?,
        cc: row.get("cc")?,
        milestone: row.get("milestone")?,
        status: row.get("status")?,
        resolution: row.get("resolution")?,
        summary: row.get("summary")?,
        description: row.get("description")?,
        keywords: row.get("keywords")?,
        custom: BTreeMap::new(),
    })
}

impl TicketStore for SqliteTicketStore {
    fn tickets(&self, filter: &str) -> Result<Vec<SourceTicket>, StoreError> {
        let conn = self.conn();
        let sql = format!("SELECT * FROM ticket {filter}");
        debug!(sql = %sql, "Querying tickets");

        let mut stmt = conn.prepare(&sql)?;
        let mut tickets = stmt
            .query_map([], ticket_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for ticket in &mut tickets {
            ticket.custom = Self::custom_fields(&conn, ticket.id)?;
        }
        Ok(tickets)
    }

    fn ticket_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn();
        Ok(conn.query_row("SELECT COUNT(*) FROM ticket", [], |row| row.get(0))?)
    }

    fn max_ticket_id(&self) -> Result<Option<u64>, StoreError> {
        let conn = self.conn();
        Ok(conn.query_row("SELECT MAX(id) FROM ticket", [], |row| row.get(0))?)
    }

    fn components(&self) -> Result<Vec<LegacyComponent>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name, description FROM component ORDER BY name")?;
        let components = stmt
            .query_map([], |row| {
                Ok(LegacyComponent {
                    name: row.get(0)?,
                    description: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(components)
    }

    fn priorities(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT DISTINCT priority FROM ticket")?;
        let priorities = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty() && p != "(null)")
            .collect();
        Ok(priorities)
    }

    fn milestones(&self, skip: &[String]) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT DISTINCT milestone FROM ticket")?;
        let milestones = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .filter(|m| !m.trim().is_empty() && !skip.contains(m))
            .collect();
        Ok(milestones)
    }

    fn milestone(&self, name: &str) -> Result<Option<Milestone>, StoreError> {
        let conn = self.conn();
        let milestone = conn
            .query_row(
                "SELECT name, due, completed, description FROM milestone WHERE name = ?1",
                [name],
                |row| {
                    Ok(Milestone {
                        name: row.get(0)?,
                        due: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                        completed: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
                        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(milestone)
    }

    fn comments(&self, ticket_id: u64) -> Result<Vec<LegacyComment>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT ticket, time, author, oldvalue, newvalue FROM ticket_change \
             WHERE ticket = ?1 AND field = 'comment' AND newvalue <> '' ORDER BY time",
        )?;
        let comments = stmt
            .query_map([ticket_id], |row| {
                Ok(LegacyComment {
                    ticket: row.get(0)?,
                    time: row.get(1)?,
                    author: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    number: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    text: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn attachments(&self, ticket_id: u64) -> Result<Vec<LegacyAttachment>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT filename FROM attachment \
             WHERE type = 'ticket' AND id = ?1 ORDER BY time, filename",
        )?;
        let attachments = stmt
            .query_map([ticket_id.to_string()], |row| {
                row.get::<_, String>(0).map(LegacyAttachment::new)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attachments)
    }

    fn revision_tickets(&self) -> Result<HashMap<String, u64>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT CAST(rev AS TEXT), ticket FROM rev2ticket")?;
        let table = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, u64>, _>>()?;
        Ok(table)
    }

    fn wiki_page(&self, name: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let text = conn
            .query_row(
                "SELECT text FROM wiki WHERE name = ?1 ORDER BY version DESC LIMIT 1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(text)
    }
}
