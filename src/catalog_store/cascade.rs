//! Cascading deletes across the catalog hierarchy.
//!
//! Which rows depend on which is described once, in [`CASCADE_POLICY`]. A
//! delete walks that table depth first from the requested entity, collects
//! every dependent row (each one once, even when it is reachable through more
//! than one parent) and removes them children first inside a single
//! `BEGIN IMMEDIATE` transaction. Any failed step rolls the whole thing back.

use super::error::{CatalogError, CatalogResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Album,
    Track,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Artist => "artists",
            EntityKind::Album => "albums",
            EntityKind::Track => "tracks",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Artist => "artist",
            EntityKind::Album => "album",
            EntityKind::Track => "track",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Artist => write!(f, "Artist"),
            EntityKind::Album => write!(f, "Album"),
            EntityKind::Track => write!(f, "Track"),
        }
    }
}

/// Rows of `kind` whose `foreign_key` column points at the parent.
#[derive(Debug)]
pub struct Dependent {
    pub kind: EntityKind,
    pub foreign_key: &'static str,
}

pub const CASCADE_POLICY: &[(EntityKind, &[Dependent])] = &[
    (
        EntityKind::Artist,
        &[
            Dependent {
                kind: EntityKind::Album,
                foreign_key: "artist_id",
            },
            Dependent {
                kind: EntityKind::Track,
                foreign_key: "artist_id",
            },
        ],
    ),
    (
        EntityKind::Album,
        &[Dependent {
            kind: EntityKind::Track,
            foreign_key: "album_id",
        }],
    ),
    (EntityKind::Track, &[]),
];

pub fn dependents_of(kind: EntityKind) -> &'static [Dependent] {
    CASCADE_POLICY
        .iter()
        .find(|(parent, _)| *parent == kind)
        .map(|(_, dependents)| *dependents)
        .unwrap_or(&[])
}

/// Outcome of a successful cascading delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeReport {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
    /// Dependent rows removed along with the root, by kind.
    pub removed: BTreeMap<EntityKind, usize>,
}

impl CascadeReport {
    pub fn removed(&self, kind: EntityKind) -> usize {
        self.removed.get(&kind).copied().unwrap_or(0)
    }
}

/// Returns every row to delete for `(kind, id)`, ordered so that each row
/// comes before all of its parents. The root is always last.
pub fn plan_deletion(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
) -> rusqlite::Result<Vec<(EntityKind, String)>> {
    fn visit(
        conn: &Connection,
        kind: EntityKind,
        id: String,
        seen: &mut HashSet<(EntityKind, String)>,
        plan: &mut Vec<(EntityKind, String)>,
    ) -> rusqlite::Result<()> {
        if !seen.insert((kind, id.clone())) {
            return Ok(());
        }
        for dependent in dependents_of(kind) {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT id FROM {} WHERE {} = ?1 ORDER BY id",
                dependent.kind.table(),
                dependent.foreign_key
            ))?;
            let child_ids = stmt
                .query_map(params![&id], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for child_id in child_ids {
                visit(conn, dependent.kind, child_id, seen, plan)?;
            }
        }
        plan.push((kind, id));
        Ok(())
    }

    let mut seen = HashSet::new();
    let mut plan = Vec::new();
    visit(conn, kind, id.to_string(), &mut seen, &mut plan)?;
    Ok(plan)
}

/// Deletes `(kind, id)` and everything that depends on it, atomically.
///
/// A missing root reports `NotFound` without touching anything. A store
/// failure at any step rolls back and reports `Integrity`.
pub fn cascade_delete(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
) -> CatalogResult<CascadeReport> {
    let integrity = |reason: String| CatalogError::Integrity { kind, reason };

    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| integrity(e.to_string()))?;

    let result = (|| -> CatalogResult<CascadeReport> {
        let name: Option<String> = conn
            .query_row(
                &format!("SELECT name FROM {} WHERE id = ?1", kind.table()),
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Err(CatalogError::NotFound(kind));
        };

        let plan = plan_deletion(conn, kind, id).map_err(|e| integrity(e.to_string()))?;
        debug!("Deleting {} {} removes {} rows", kind, id, plan.len());

        let mut removed = BTreeMap::new();
        for (step_kind, step_id) in &plan {
            let deleted = conn
                .execute(
                    &format!("DELETE FROM {} WHERE id = ?1", step_kind.table()),
                    params![step_id],
                )
                .map_err(|e| integrity(e.to_string()))?;
            if deleted != 1 {
                return Err(integrity(format!(
                    "{} '{}' disappeared during delete",
                    step_kind, step_id
                )));
            }
            if !(*step_kind == kind && step_id == id) {
                *removed.entry(*step_kind).or_insert(0) += 1;
            }
        }

        Ok(CascadeReport {
            kind,
            id: id.to_string(),
            name,
            removed,
        })
    })();

    match result {
        Ok(report) => match conn.execute("COMMIT", []) {
            Ok(_) => Ok(report),
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(integrity(e.to_string()))
            }
        },
        Err(e) => {
            let _ = conn.execute("ROLLBACK", []);
            if let CatalogError::Integrity { reason, .. } = &e {
                warn!("Rolled back delete of {} {}: {}", kind, id, reason);
            }
            Err(e)
        }
    }
}
