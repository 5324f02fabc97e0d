//! Votes: create, cast, tally, close.

use masc_backend::keys;
use masc_domain::types::{Vote, VoteStatus, VoteTally};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

impl RoomStore {
    pub async fn vote_create(
        &self,
        topic: String,
        options: Vec<String>,
        created_by: &str,
        closes_in_secs: Option<f64>,
    ) -> Result<Vote> {
        if topic.is_empty() {
            return Err(Error::InvalidArgument("topic must not be empty".into()));
        }
        if options.len() < 2 {
            return Err(Error::InvalidArgument(
                "a vote needs at least two options".into(),
            ));
        }
        self.require_agent(created_by).await?;

        let now = self.now();
        let vote = Vote {
            id: uuid::Uuid::new_v4().to_string(),
            topic,
            options,
            created_by: created_by.to_owned(),
            opened_at: now,
            closes_at: closes_in_secs.map(|s| now + s.max(0.0)),
            status: VoteStatus::Open,
            ballots: Default::default(),
        };
        self.write_json(&keys::vote(&self.room, &vote.id), &vote)
            .await?;
        self.notify(
            "vote_created",
            serde_json::json!({ "vote_id": vote.id, "topic": vote.topic }),
        );
        Ok(vote)
    }

    /// Cast (or change) a ballot.  One ballot per voter.
    pub async fn vote_cast(&self, vote_id: &str, voter: &str, option: &str) -> Result<Vote> {
        self.require_agent(voter).await?;
        let _scope = self.backend.lock(&format!("vote:{vote_id}")).await?;

        let key = keys::vote(&self.room, vote_id);
        let mut vote: Vote = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vote {vote_id}")))?;
        if vote.status == VoteStatus::Closed {
            return Err(Error::Conflict(format!("vote {vote_id} is closed")));
        }
        if !vote.options.iter().any(|o| o == option) {
            return Err(Error::InvalidArgument(format!(
                "option {option:?} is not on the ballot"
            )));
        }
        vote.ballots.insert(voter.to_owned(), option.to_owned());
        self.write_json(&key, &vote).await?;
        self.notify(
            "vote_cast",
            serde_json::json!({ "vote_id": vote_id, "voter": voter }),
        );
        Ok(vote)
    }

    /// Current state and tally.  Lazily closes a vote whose deadline has
    /// passed.
    pub async fn vote_status(&self, vote_id: &str) -> Result<(Vote, VoteTally)> {
        let key = keys::vote(&self.room, vote_id);
        let mut vote: Vote = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vote {vote_id}")))?;
        if vote.status == VoteStatus::Open {
            if let Some(closes_at) = vote.closes_at {
                if self.now() >= closes_at {
                    return self.vote_close(vote_id).await;
                }
            }
        }
        let tally = vote.tally();
        Ok((vote, tally))
    }

    /// Close the vote and freeze the ballots.  Idempotent.
    pub async fn vote_close(&self, vote_id: &str) -> Result<(Vote, VoteTally)> {
        let _scope = self.backend.lock(&format!("vote:{vote_id}")).await?;
        let key = keys::vote(&self.room, vote_id);
        let mut vote: Vote = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vote {vote_id}")))?;
        if vote.status == VoteStatus::Open {
            vote.status = VoteStatus::Closed;
            self.write_json(&key, &vote).await?;
            let tally = vote.tally();
            self.notify(
                "vote_closed",
                serde_json::json!({
                    "vote_id": vote_id,
                    "winner": tally.winner,
                    "total_ballots": tally.total_ballots,
                }),
            );
            return Ok((vote, tally));
        }
        let tally = vote.tally();
        Ok((vote, tally))
    }

    /// All open votes.
    pub async fn open_votes(&self) -> Result<Vec<Vote>> {
        let mut votes = Vec::new();
        for key in self.list_keys(&keys::votes_prefix(&self.room)).await? {
            if let Some(vote) = self.read_json::<Vote>(&key).await? {
                if vote.status == VoteStatus::Open {
                    votes.push(vote);
                }
            }
        }
        Ok(votes)
    }
}
