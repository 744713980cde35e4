use std::time::SystemTime;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::{MongoDaoError, MongoResult};
use crate::{
    dao::models::{
        MatchEntity, ParticipantEntity, Prerequisite, StationEntity, TournamentEntity,
        TournamentType,
    },
    state::{lifecycle::TournamentState, match_state::MatchState},
};

// BSON has no unsigned 64-bit integer, ids are stored as Int64.
pub fn bson_id(id: u64) -> i64 {
    id as i64
}

fn unsigned(value: i64, record: &str) -> MongoResult<u64> {
    u64::try_from(value).map_err(|_| MongoDaoError::Decode {
        record: record.to_owned(),
        message: format!("negative id {value}"),
    })
}

fn bson_time(value: Option<SystemTime>) -> Option<DateTime> {
    value.map(DateTime::from_system_time)
}

fn system_time(value: Option<DateTime>) -> Option<SystemTime> {
    value.map(DateTime::to_system_time)
}

pub fn doc_id(id: u64) -> Document {
    doc! { "_id": bson_id(id) }
}

pub fn owned_by(tournament_id: u64) -> Document {
    doc! { "tournament_id": bson_id(tournament_id) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTournamentDocument {
    #[serde(rename = "_id")]
    id: i64,
    url: String,
    name: String,
    description: Option<String>,
    game_name: Option<String>,
    tournament_type: TournamentType,
    state: TournamentState,
    #[serde(default)]
    hold_third_place_match: bool,
    signup_cap: Option<u32>,
    start_at: Option<DateTime>,
    check_in_duration: Option<u32>,
    started_at: Option<DateTime>,
    completed_at: Option<DateTime>,
    created_at: DateTime,
    updated_at: DateTime,
    pub version: i64,
    remote_id: Option<i64>,
    synced_at: Option<DateTime>,
}

impl From<TournamentEntity> for MongoTournamentDocument {
    fn from(value: TournamentEntity) -> Self {
        Self {
            id: bson_id(value.id),
            url: value.url,
            name: value.name,
            description: value.description,
            game_name: value.game_name,
            tournament_type: value.tournament_type,
            state: value.state,
            hold_third_place_match: value.hold_third_place_match,
            signup_cap: value.signup_cap,
            start_at: bson_time(value.start_at),
            check_in_duration: value.check_in_duration,
            started_at: bson_time(value.started_at),
            completed_at: bson_time(value.completed_at),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            version: value.version as i64,
            remote_id: value.remote_id.map(bson_id),
            synced_at: bson_time(value.synced_at),
        }
    }
}

impl TryFrom<MongoTournamentDocument> for TournamentEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoTournamentDocument) -> MongoResult<Self> {
        let record = format!("tournaments/{}", value.id);
        Ok(Self {
            id: unsigned(value.id, &record)?,
            url: value.url,
            name: value.name,
            description: value.description,
            game_name: value.game_name,
            tournament_type: value.tournament_type,
            state: value.state,
            hold_third_place_match: value.hold_third_place_match,
            signup_cap: value.signup_cap,
            start_at: system_time(value.start_at),
            check_in_duration: value.check_in_duration,
            started_at: system_time(value.started_at),
            completed_at: system_time(value.completed_at),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            version: unsigned(value.version, &record)?,
            remote_id: value
                .remote_id
                .map(|id| unsigned(id, &record))
                .transpose()?,
            synced_at: system_time(value.synced_at),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: i64,
    tournament_id: i64,
    name: String,
    seed: u32,
    email: Option<String>,
    misc: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: bson_id(value.id),
            tournament_id: bson_id(value.tournament_id),
            name: value.name,
            seed: value.seed,
            email: value.email,
            misc: value.misc,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoParticipantDocument> for ParticipantEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoParticipantDocument) -> MongoResult<Self> {
        let record = format!("participants/{}", value.id);
        Ok(Self {
            id: unsigned(value.id, &record)?,
            tournament_id: unsigned(value.tournament_id, &record)?,
            name: value.name,
            seed: value.seed,
            email: value.email,
            misc: value.misc,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MongoPrerequisite {
    match_id: i64,
    loser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: i64,
    tournament_id: i64,
    identifier: String,
    round: i32,
    suggested_play_order: u32,
    state: MatchState,
    player1_id: Option<i64>,
    player2_id: Option<i64>,
    player1_prereq: Option<MongoPrerequisite>,
    player2_prereq: Option<MongoPrerequisite>,
    winner_id: Option<i64>,
    loser_id: Option<i64>,
    #[serde(default)]
    scores_csv: String,
    #[serde(default)]
    forfeited: bool,
    underway_at: Option<DateTime>,
    station_id: Option<i64>,
    completed_at: Option<DateTime>,
    updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        let prereq = |p: Prerequisite| MongoPrerequisite {
            match_id: bson_id(p.match_id),
            loser: p.loser,
        };
        Self {
            id: bson_id(value.id),
            tournament_id: bson_id(value.tournament_id),
            identifier: value.identifier,
            round: value.round,
            suggested_play_order: value.suggested_play_order,
            state: value.state,
            player1_id: value.player1_id.map(bson_id),
            player2_id: value.player2_id.map(bson_id),
            player1_prereq: value.player1_prereq.map(prereq),
            player2_prereq: value.player2_prereq.map(prereq),
            winner_id: value.winner_id.map(bson_id),
            loser_id: value.loser_id.map(bson_id),
            scores_csv: value.scores_csv,
            forfeited: value.forfeited,
            underway_at: bson_time(value.underway_at),
            station_id: value.station_id.map(bson_id),
            completed_at: bson_time(value.completed_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> MongoResult<Self> {
        let record = format!("matches/{}", value.id);
        let id = |raw: Option<i64>| raw.map(|v| unsigned(v, &record)).transpose();
        let prereq = |raw: Option<MongoPrerequisite>| {
            raw.map(|p| {
                Ok::<_, MongoDaoError>(Prerequisite {
                    match_id: unsigned(p.match_id, &record)?,
                    loser: p.loser,
                })
            })
            .transpose()
        };
        Ok(Self {
            id: unsigned(value.id, &record)?,
            tournament_id: unsigned(value.tournament_id, &record)?,
            identifier: value.identifier,
            round: value.round,
            suggested_play_order: value.suggested_play_order,
            state: value.state,
            player1_id: id(value.player1_id)?,
            player2_id: id(value.player2_id)?,
            player1_prereq: prereq(value.player1_prereq)?,
            player2_prereq: prereq(value.player2_prereq)?,
            winner_id: id(value.winner_id)?,
            loser_id: id(value.loser_id)?,
            scores_csv: value.scores_csv,
            forfeited: value.forfeited,
            underway_at: system_time(value.underway_at),
            station_id: id(value.station_id)?,
            completed_at: system_time(value.completed_at),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStationDocument {
    #[serde(rename = "_id")]
    id: i64,
    tournament_id: i64,
    name: String,
    created_at: DateTime,
}

impl From<StationEntity> for MongoStationDocument {
    fn from(value: StationEntity) -> Self {
        Self {
            id: bson_id(value.id),
            tournament_id: bson_id(value.tournament_id),
            name: value.name,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoStationDocument> for StationEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoStationDocument) -> MongoResult<Self> {
        let record = format!("stations/{}", value.id);
        Ok(Self {
            id: unsigned(value.id, &record)?,
            tournament_id: unsigned(value.tournament_id, &record)?,
            name: value.name,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Counter document backing an id sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSequenceDocument {
    #[serde(rename = "_id")]
    pub name: String,
    pub value: i64,
}
