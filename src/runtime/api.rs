//! Framework-agnostic request/response models and error mapping.
//!
//! Transport layers deserialize into these types, call the functions below
//! and serialize the result; [`ApiError::status`] is the HTTP status to send.

use serde::{Deserialize, Serialize};

use crate::draft::{
    AccumulatedPicks, Allocation, Draft, DraftEngine, DraftError, DraftStatus, ErrorKind,
    PickRequest, RequestedPick,
};
use crate::infra::mailbox::{InMemoryMailbox, Notice};
use crate::util::{LeagueId, MailboxKey, PickNumber, PlayerId, UserId};

/// Start-draft payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartDraftRequest {
    /// League to draft.
    pub league_id: LeagueId,
    /// Minutes per turn; omitted or zero uses the configured default.
    #[serde(default)]
    pub turn_time_limit_minutes: Option<u32>,
}

/// Pick submission payload. An empty `picks` list skips the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakePickRequest {
    /// Authenticated caller.
    pub user_id: UserId,
    /// League drafting.
    pub league_id: LeagueId,
    /// Entries and the pick numbers to spend on them.
    #[serde(default)]
    pub picks: Vec<RequestedPick>,
}

/// Draft state as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftView {
    /// League.
    pub league_id: LeagueId,
    /// Lifecycle state.
    pub status: DraftStatus,
    /// Round on the clock.
    pub current_round: u32,
    /// Position in round.
    pub current_pick_in_round: u32,
    /// Global pick counter.
    pub current_pick_on_clock: PickNumber,
    /// Player on the clock.
    pub current_turn_player_id: Option<PlayerId>,
    /// Deadline of the running turn; absent unless ongoing.
    pub turn_deadline_ms: Option<u128>,
    /// Banked picks per player.
    pub players_with_accumulated_picks: AccumulatedPicks,
}

impl From<&Draft> for DraftView {
    fn from(draft: &Draft) -> Self {
        Self {
            league_id: draft.league_id,
            status: draft.status,
            current_round: draft.current_round,
            current_pick_in_round: draft.current_pick_in_round,
            current_pick_on_clock: draft.current_pick_on_clock,
            current_turn_player_id: draft.current_turn_player_id,
            turn_deadline_ms: (draft.status == DraftStatus::Ongoing)
                .then(|| draft.turn_deadline_ms()),
            players_with_accumulated_picks: draft.players_with_accumulated_picks.clone(),
        }
    }
}

/// Result of a pick submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickResponse {
    /// Draft after the turn.
    pub draft: DraftView,
    /// Committed allocations.
    pub allocations: Vec<Allocation>,
    /// Slot banked by this turn.
    pub banked_pick: Option<PickNumber>,
}

/// Mailbox poll result entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeView {
    /// Cursor to pass back as `after` on the next poll.
    pub seq: u64,
    /// Notice content.
    pub notice: Notice,
    /// Delivery time.
    pub delivered_at_ms: u128,
}

/// Error body plus HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        Self {
            status: http_status(err.kind()),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Tasks waiting in the scheduler.
    pub pending_tasks: usize,
}

/// HTTP status for an error kind.
pub const fn http_status(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::NotFound => 404,
        ErrorKind::Unauthorized => 403,
        ErrorKind::InvalidState | ErrorKind::Conflict => 409,
        ErrorKind::InvalidInput => 400,
        ErrorKind::InsufficientBudget | ErrorKind::CannotSkipBelowMinimum => 422,
        ErrorKind::Internal => 500,
    }
}

/// Start a league's draft.
pub async fn start_draft(
    engine: &DraftEngine,
    req: StartDraftRequest,
) -> Result<DraftView, ApiError> {
    let draft = engine
        .start_draft(req.league_id, req.turn_time_limit_minutes.unwrap_or(0))
        .await?;
    Ok(DraftView::from(&draft))
}

/// Submit picks for the caller's turn.
pub async fn make_pick(engine: &DraftEngine, req: MakePickRequest) -> Result<PickResponse, ApiError> {
    let outcome = engine
        .make_pick(req.user_id, req.league_id, PickRequest { picks: req.picks })
        .await?;
    Ok(PickResponse {
        draft: DraftView::from(&outcome.draft),
        allocations: outcome.allocations,
        banked_pick: outcome.banked_pick,
    })
}

/// Current draft of a league.
pub async fn draft_view(engine: &DraftEngine, league_id: LeagueId) -> Result<DraftView, ApiError> {
    Ok(DraftView::from(&engine.draft(league_id).await?))
}

/// One slot of the turn order preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSlot {
    /// Global pick number.
    pub pick_number: PickNumber,
    /// Player who will be on the clock.
    pub player_id: PlayerId,
}

/// The next `count` turns of a league's draft.
pub async fn upcoming_turns(
    engine: &DraftEngine,
    league_id: LeagueId,
    count: usize,
) -> Result<Vec<TurnSlot>, ApiError> {
    Ok(engine
        .upcoming_turns(league_id, count)
        .await?
        .into_iter()
        .map(|(pick_number, player_id)| TurnSlot {
            pick_number,
            player_id,
        })
        .collect())
}

/// Pause a league's draft.
pub async fn pause_draft(engine: &DraftEngine, league_id: LeagueId) -> Result<DraftView, ApiError> {
    Ok(DraftView::from(&engine.pause_draft(league_id).await?))
}

/// Resume a league's draft.
pub async fn resume_draft(engine: &DraftEngine, league_id: LeagueId) -> Result<DraftView, ApiError> {
    Ok(DraftView::from(&engine.resume_draft(league_id).await?))
}

/// Poll a player's notices delivered after cursor `after`.
pub fn poll_notices(
    mailbox: &InMemoryMailbox,
    key: &MailboxKey,
    after: Option<u64>,
    limit: usize,
) -> Vec<NoticeView> {
    mailbox
        .fetch(key, after, limit)
        .into_iter()
        .map(|m| NoticeView {
            seq: m.seq,
            notice: m.notice,
            delivered_at_ms: m.delivered_at_ms,
        })
        .collect()
}

/// Return a health payload.
pub fn health(engine: &DraftEngine) -> Health {
    Health {
        ok: true,
        pending_tasks: engine.scheduler().len(),
    }
}
