//! Append-only audit log with a tamper-evident hash chain.
//!
//! Writes are best-effort: a failed append is logged and swallowed so
//! it can never block or roll back the business transition it records.
use super::error::{Result, codec_err};
use super::types::{Actor, Role, TimeStamp};
use chrono::Utc;
use uuid7::uuid7;

const AUDIT_TREE: &str = "audit_log";
const AUDIT_META_TREE: &str = "audit_meta";
const HEAD_KEY: &str = "head";
const CHAIN_GENESIS: &str = "genesis";

/// One audit record. `entry_hash` is the sha256 of the entry's CBOR
/// encoding with the hash field blanked, so each entry also covers the
/// `prev_hash` link to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct AuditEntry {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub actor_id: String,
    #[n(2)]
    pub actor_role: Role,
    #[n(3)]
    pub action: String,
    #[n(4)]
    pub entity_type: String,
    #[n(5)]
    pub entity_id: String,
    #[n(6)]
    pub details: Option<String>,
    #[n(7)]
    pub timestamp: TimeStamp<Utc>,
    #[n(8)]
    pub prev_hash: String,
    #[n(9)]
    pub entry_hash: String,
}

impl AuditEntry {
    fn compute_hash(&self) -> Result<String> {
        let mut unhashed = self.clone();
        unhashed.entry_hash = String::new();
        let bytes = minicbor::to_vec(&unhashed).map_err(codec_err)?;
        Ok(sha256::digest(&bytes))
    }
}

/// Query filter for the admin-facing read path.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<TimeStamp<Utc>>,
    pub to: Option<TimeStamp<Utc>>,
}

impl AuditFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(action) = &self.action
            && &entry.action != action
        {
            return false;
        }
        if let Some(entity_type) = &self.entity_type
            && &entry.entity_type != entity_type
        {
            return false;
        }
        if let Some(from) = &self.from
            && entry.timestamp < *from
        {
            return false;
        }
        if let Some(to) = &self.to
            && entry.timestamp > *to
        {
            return false;
        }
        true
    }
}

pub struct AuditLog {
    tree: sled::Tree,
    meta: sled::Tree,
}

impl AuditLog {
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(AUDIT_TREE)?,
            meta: db.open_tree(AUDIT_META_TREE)?,
        })
    }

    /// Best-effort append. Failures are logged, never surfaced; the
    /// transition this entry describes has already committed.
    pub fn append(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: Option<String>,
    ) {
        if let Err(err) = self.try_append(actor, action, entity_type, entity_id, details) {
            tracing::warn!(%action, %entity_id, error = %err, "audit append failed");
        }
    }

    fn try_append(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: Option<String>,
    ) -> Result<()> {
        let prev_hash = match self.meta.get(HEAD_KEY)? {
            Some(head) => String::from_utf8_lossy(&head).into_owned(),
            None => CHAIN_GENESIS.to_string(),
        };

        let mut entry = AuditEntry {
            // uuid7 keys are time-ordered, so tree iteration order is
            // append order.
            id: uuid7().to_string(),
            actor_id: actor.user_id.clone(),
            actor_role: actor.role,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details,
            timestamp: TimeStamp::new(),
            prev_hash,
            entry_hash: String::new(),
        };
        entry.entry_hash = entry.compute_hash()?;

        let encoded = minicbor::to_vec(&entry).map_err(codec_err)?;
        self.tree.insert(entry.id.as_bytes(), encoded)?;
        self.meta.insert(HEAD_KEY, entry.entry_hash.as_bytes())?;

        Ok(())
    }

    /// Entries matching the filter, in append order.
    pub fn entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let mut out = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            let entry: AuditEntry = minicbor::decode(&value).map_err(codec_err)?;
            if filter.matches(&entry) {
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Walks the hash chain and returns the id of the first entry whose
    /// link or hash does not hold, or `None` when the chain is intact.
    pub fn verify_chain(&self) -> Result<Option<String>> {
        let mut prev = CHAIN_GENESIS.to_string();
        for item in self.tree.iter() {
            let (_, value) = item?;
            let entry: AuditEntry = minicbor::decode(&value).map_err(codec_err)?;
            if entry.prev_hash != prev || entry.compute_hash()? != entry.entry_hash {
                return Ok(Some(entry.id));
            }
            prev = entry.entry_hash;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use tempfile::tempdir;

    fn open_log() -> (tempfile::TempDir, AuditLog) {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path().join("audit.db")).unwrap();
        let log = AuditLog::open(&db).unwrap();
        (dir, log)
    }

    #[test]
    fn appended_entries_chain_and_verify() {
        let (_dir, log) = open_log();
        let actor = Actor::new("user_admin", Role::Admin);

        log.append(&actor, "shipment.created", "shipment", "shp1a", None);
        log.append(&actor, "shipment.approved", "shipment", "shp1a", None);
        log.append(&actor, "shipment.deleted", "shipment", "shp1a", None);

        let entries = log.entries(&AuditFilter::default()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].prev_hash, "genesis");
        assert_eq!(entries[1].prev_hash, entries[0].entry_hash);
        assert_eq!(entries[2].prev_hash, entries[1].entry_hash);

        assert_eq!(log.verify_chain().unwrap(), None);
    }

    #[test]
    fn filter_by_action() {
        let (_dir, log) = open_log();
        let actor = Actor::new("user_accounts", Role::Accounts);

        log.append(&actor, "shipment.approved", "shipment", "shp1a", None);
        log.append(&actor, "shipment.rejected", "shipment", "shp1b", None);

        let filter = AuditFilter {
            action: Some("shipment.rejected".into()),
            ..Default::default()
        };
        let entries = log.entries(&filter).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_id, "shp1b");
    }

    #[test]
    fn tampering_is_detected() {
        let (_dir, log) = open_log();
        let actor = Actor::new("user_admin", Role::Admin);

        log.append(&actor, "shipment.created", "shipment", "shp1a", None);
        log.append(&actor, "shipment.approved", "shipment", "shp1a", None);

        // Rewrite the first entry's action in place.
        let entries = log.entries(&AuditFilter::default()).unwrap();
        let mut forged = entries[0].clone();
        forged.action = "shipment.deleted".into();
        let encoded = minicbor::to_vec(&forged).unwrap();
        log.tree.insert(forged.id.as_bytes(), encoded).unwrap();

        assert_eq!(log.verify_chain().unwrap(), Some(forged.id));
    }
}
