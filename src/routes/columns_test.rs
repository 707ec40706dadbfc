use super::*;
use crate::state::test_helpers::{self, card, column};
use frames::Actor;

#[test]
fn board_error_to_status_maps_not_found_kinds() {
    assert_eq!(board_error_to_status(BoardError::ColumnNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(board_error_to_status(BoardError::CardNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(
        board_error_to_status(BoardError::IndexOutOfRange { index: 4, len: 2 }),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn board_error_to_status_maps_conflict_and_invalid() {
    assert_eq!(board_error_to_status(BoardError::Conflict("gone".into())), StatusCode::CONFLICT);
    assert_eq!(board_error_to_status(BoardError::Invalid("bad".into())), StatusCode::BAD_REQUEST);
}

#[test]
fn board_error_to_status_maps_storage_to_500() {
    let err = BoardError::Storage(crate::store::StorageError::Corrupt("tasks".into()));
    assert_eq!(board_error_to_status(err), StatusCode::INTERNAL_SERVER_ERROR);
}

async fn seeded() -> (AppState, Actor, Uuid, Vec<Uuid>) {
    let (state, storage) = test_helpers::test_app_state();
    let actor = test_helpers::actor("ada");
    let project_id = Uuid::new_v4();
    storage.grant(project_id, actor.id);
    let a = column(project_id, "A", vec![card("x"), card("y"), card("z")]);
    let b = column(project_id, "B", vec![card("p"), card("q")]);
    let ids = vec![a.id, b.id];
    test_helpers::seed_project(&state, project_id, vec![a, b]).await;
    (state, actor, project_id, ids)
}

#[tokio::test]
async fn reorder_handler_returns_updated_column() {
    let (state, actor, _, ids) = seeded().await;
    let Json(col) = reorder_cards(
        State(state),
        AuthUser { actor },
        Path(ids[0]),
        Json(ReorderBody { from_index: 0, to_index: 2 }),
    )
    .await
    .unwrap();
    assert_eq!(col.cards.iter().map(|c| c.member.as_str()).collect::<Vec<_>>(), ["y", "z", "x"]);
}

#[tokio::test]
async fn reorder_handler_out_of_range_is_404() {
    let (state, actor, _, ids) = seeded().await;
    let status = reorder_cards(
        State(state),
        AuthUser { actor },
        Path(ids[1]),
        Json(ReorderBody { from_index: 7, to_index: 0 }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_handler_returns_both_columns() {
    let (state, actor, project_id, ids) = seeded().await;
    let Json(before) = list_columns(State(state.clone()), AuthUser { actor: actor.clone() }, Query(ColumnsQuery { project_id }))
        .await
        .unwrap();
    let x = before[0].cards[0].id;

    let Json(cols) = move_card(
        State(state),
        AuthUser { actor },
        Path(x),
        Json(MoveBody { from_column_id: ids[0], to_column_id: ids[1], to_card_index: 1 }),
    )
    .await
    .unwrap();
    assert_eq!(cols.len(), 2);
    assert_eq!(cols[1].cards[1].id, x);
}

#[tokio::test]
async fn list_handler_hides_foreign_project() {
    let (state, _, project_id, _) = seeded().await;
    let stranger = test_helpers::actor("mallory");
    let status = list_columns(State(state), AuthUser { actor: stranger }, Query(ColumnsQuery { project_id }))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_column_handler_returns_201() {
    let (state, actor, project_id, _) = seeded().await;
    let (status, Json(col)) = create_column(
        State(state),
        AuthUser { actor },
        Json(CreateColumnBody { project_id, title: "Review".into() }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(col.title, "Review");
    assert!(col.cards.is_empty());
}
