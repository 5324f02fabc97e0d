//! Portals — private bidirectional channels between two agents.

use masc_backend::keys;
use masc_domain::types::{
    portal_pair_key, Portal, PortalMessage, PortalStatus, PORTAL_INBOX_CAPACITY,
};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

impl RoomStore {
    /// Open a portal between two agents.  Idempotent: an existing open
    /// portal for the same pair is returned as-is.
    pub async fn portal_open(&self, agent_a: &str, agent_b: &str) -> Result<Portal> {
        if agent_a == agent_b {
            return Err(Error::InvalidArgument(
                "a portal needs two distinct agents".into(),
            ));
        }
        self.require_agent(agent_a).await?;
        self.require_agent(agent_b).await?;

        let pair = portal_pair_key(agent_a, agent_b);
        let _scope = self.backend.lock(&format!("portal:{pair}")).await?;

        let key = keys::portal(&self.room, &pair);
        if let Some(existing) = self.read_json::<Portal>(&key).await? {
            if existing.status == PortalStatus::Open {
                return Ok(existing);
            }
        }

        let portal = Portal {
            id: pair.clone(),
            agent_a: agent_a.min(agent_b).to_owned(),
            agent_b: agent_a.max(agent_b).to_owned(),
            opened_at: self.now(),
            status: PortalStatus::Open,
            inbox_a: Default::default(),
            inbox_b: Default::default(),
        };
        self.write_json(&key, &portal).await?;
        self.notify(
            "portal_opened",
            serde_json::json!({ "portal_id": pair, "agents": [agent_a, agent_b] }),
        );
        Ok(portal)
    }

    /// Send into the peer's inbox.  Overflow drops the oldest entry and
    /// raises an `overflow` notification.
    pub async fn portal_send(
        &self,
        portal_id: &str,
        from: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let _scope = self.backend.lock(&format!("portal:{portal_id}")).await?;
        let key = keys::portal(&self.room, portal_id);
        let mut portal: Portal = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("portal {portal_id}")))?;
        if portal.status == PortalStatus::Closed {
            return Err(Error::Conflict(format!("portal {portal_id} is closed")));
        }
        let receiver = portal
            .peer_of(from)
            .ok_or_else(|| Error::Forbidden(format!("{from} is not a member of {portal_id}")))?
            .to_owned();

        let overflowed = portal.push_to(
            &receiver,
            PortalMessage {
                from: from.to_owned(),
                payload,
                sent_at: self.now(),
            },
            PORTAL_INBOX_CAPACITY,
        );
        self.write_json(&key, &portal).await?;

        if overflowed {
            self.notify(
                "overflow",
                serde_json::json!({ "portal_id": portal_id, "receiver": receiver }),
            );
        }
        self.notify(
            "portal_message",
            serde_json::json!({ "portal_id": portal_id, "from": from, "to": receiver }),
        );
        Ok(())
    }

    /// Drain the caller's inbox.
    pub async fn portal_recv(&self, portal_id: &str, agent_id: &str) -> Result<Vec<PortalMessage>> {
        let _scope = self.backend.lock(&format!("portal:{portal_id}")).await?;
        let key = keys::portal(&self.room, portal_id);
        let mut portal: Portal = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("portal {portal_id}")))?;
        if !portal.has_member(agent_id) {
            return Err(Error::Forbidden(format!(
                "{agent_id} is not a member of {portal_id}"
            )));
        }
        let messages = portal.drain_inbox(agent_id);
        if !messages.is_empty() {
            self.write_json(&key, &portal).await?;
        }
        Ok(messages)
    }

    /// Close the portal.  Further sends conflict; drains still work.
    pub async fn portal_close(&self, portal_id: &str, agent_id: &str) -> Result<Portal> {
        let _scope = self.backend.lock(&format!("portal:{portal_id}")).await?;
        let key = keys::portal(&self.room, portal_id);
        let mut portal: Portal = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("portal {portal_id}")))?;
        if !portal.has_member(agent_id) {
            return Err(Error::Forbidden(format!(
                "{agent_id} is not a member of {portal_id}"
            )));
        }
        if portal.status == PortalStatus::Open {
            portal.status = PortalStatus::Closed;
            self.write_json(&key, &portal).await?;
            self.notify(
                "portal_closed",
                serde_json::json!({ "portal_id": portal_id, "by": agent_id }),
            );
        }
        Ok(portal)
    }
}
