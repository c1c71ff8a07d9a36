//! Tests for the draft error taxonomy and its HTTP mapping

use pokedraft_core::draft::{DraftError, ErrorKind};
use pokedraft_core::runtime::{http_status, ApiError};

#[test]
fn test_status_per_kind() {
    let cases = [
        (DraftError::DraftNotFound(1), 404),
        (DraftError::PoolEntryNotFound(3), 404),
        (DraftError::Unauthorized("not your turn".into()), 403),
        (DraftError::NoPlayersForDraft(1), 409),
        (DraftError::InvalidState("paused".into()), 409),
        (
            DraftError::TooManyRequestedPicks {
                requested: 3,
                allowed: 1,
            },
            400,
        ),
        (DraftError::Conflict("taken".into()), 409),
        (DraftError::InsufficientBudget { cost: 30, budget: 10 }, 422),
        (
            DraftError::CannotSkipBelowMinimum {
                reachable: 2,
                minimum: 3,
            },
            422,
        ),
        (DraftError::Internal("boom".into()), 500),
    ];
    for (err, status) in cases {
        assert_eq!(http_status(err.kind()), status, "{err}");
    }
}

#[test]
fn test_api_error_carries_code() {
    let api: ApiError = DraftError::InsufficientBudget { cost: 30, budget: 10 }.into();
    assert_eq!(api.status, 422);
    assert_eq!(api.code, "INSUFFICIENT_BUDGET");
    assert!(api.message.contains("30"));
}

#[test]
fn test_not_found_family() {
    for err in [
        DraftError::LeagueNotFound(1),
        DraftError::PlayerNotFound("user 5".into()),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
