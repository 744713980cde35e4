//! Challonge v1 API integration for tournaments mirrored on challonge.com.

#[cfg(feature = "challonge")]
mod client;
pub mod error;
pub mod models;

use futures::future::BoxFuture;

pub use self::error::{ChallongeError, ChallongeResult};
#[cfg(feature = "challonge")]
pub use client::HttpChallonge;
use models::{ParticipantBody, RemoteTournament, TournamentBody};

/// Write forwarded to Challonge for a linked tournament.
#[derive(Debug, Clone)]
pub enum RemoteOp {
    UpdateTournament(TournamentBody),
    Start,
    Reset,
    Finalize,
    Delete,
    AddParticipant(ParticipantBody),
    UpdateParticipant {
        participant_id: u64,
        body: ParticipantBody,
    },
    RemoveParticipant {
        participant_id: u64,
    },
    UpdateMatch {
        match_id: u64,
        scores_csv: String,
        winner_id: Option<u64>,
    },
    ReopenMatch {
        match_id: u64,
    },
    MarkUnderway {
        match_id: u64,
    },
    UnmarkUnderway {
        match_id: u64,
    },
}

impl RemoteOp {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOp::UpdateTournament(_) => "update_tournament",
            RemoteOp::Start => "start",
            RemoteOp::Reset => "reset",
            RemoteOp::Finalize => "finalize",
            RemoteOp::Delete => "delete",
            RemoteOp::AddParticipant(_) => "add_participant",
            RemoteOp::UpdateParticipant { .. } => "update_participant",
            RemoteOp::RemoveParticipant { .. } => "remove_participant",
            RemoteOp::UpdateMatch { .. } => "update_match",
            RemoteOp::ReopenMatch { .. } => "reopen_match",
            RemoteOp::MarkUnderway { .. } => "mark_underway",
            RemoteOp::UnmarkUnderway { .. } => "unmark_underway",
        }
    }
}

/// Result of a forwarded write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteAck {
    /// Id assigned by Challonge to a created record.
    pub id: Option<u64>,
}

/// Client for the parts of the Challonge API this service mirrors.
pub trait Challonge: Send + Sync {
    /// Fetch a tournament with its participants and matches, by url slug or id.
    fn fetch_tournament(
        &self,
        url: String,
    ) -> BoxFuture<'static, ChallongeResult<RemoteTournament>>;

    /// Forward a write to the tournament with Challonge id `tournament_id`.
    fn push(&self, tournament_id: u64, op: RemoteOp)
    -> BoxFuture<'static, ChallongeResult<RemoteAck>>;
}
