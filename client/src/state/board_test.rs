use super::*;
use crate::state::mock_api::{MockApi, card, column, members};

struct Fixture {
    api: Arc<MockApi>,
    board: BoardClient<MockApi>,
}

/// Column A `[x,y,z]`, column B `[p,q]`, loaded into the mirror.
async fn fixture() -> Fixture {
    let project_id = Uuid::new_v4();
    let a = column(project_id, "A", vec![card("x"), card("y"), card("z")]);
    let b = column(project_id, "B", vec![card("p"), card("q")]);
    let api = Arc::new(MockApi::with_columns(vec![a, b]));
    let mut board = BoardClient::new(api.clone(), project_id);
    board.load().await.unwrap();
    Fixture { api, board }
}

// =============================================================
// apply_local_move
// =============================================================

#[tokio::test]
async fn local_reorder_splices_synchronously() {
    let mut f = fixture().await;
    assert!(f.board.apply_local_move(0, 0, 0, 2));
    assert_eq!(members(&f.board.columns()[0]), ["y", "z", "x"]);
    assert_eq!(f.api.calls(), ["fetch"]);
}

#[tokio::test]
async fn local_move_across_columns_clamps_to_append() {
    let mut f = fixture().await;
    assert!(f.board.apply_local_move(0, 0, 1, 99));
    assert_eq!(members(&f.board.columns()[0]), ["y", "z"]);
    assert_eq!(members(&f.board.columns()[1]), ["p", "q", "x"]);
}

#[tokio::test]
async fn repeated_hover_is_applied_once() {
    let mut f = fixture().await;
    f.board.begin_drag(0, 0).unwrap();
    assert!(f.board.hover(1, 1));
    assert!(!f.board.hover(1, 1));
    assert_eq!(members(&f.board.columns()[1]), ["p", "x", "q"]);
}

#[tokio::test]
async fn out_of_range_indices_are_ignored() {
    let mut f = fixture().await;
    assert!(!f.board.apply_local_move(0, 3, 1, 0));
    assert!(!f.board.apply_local_move(2, 0, 1, 0));
    assert!(!f.board.apply_local_move(0, 0, 5, 0));
    assert_eq!(members(&f.board.columns()[0]), ["x", "y", "z"]);
}

// =============================================================
// drop / commit
// =============================================================

#[tokio::test]
async fn drop_on_origin_sends_nothing() {
    let mut f = fixture().await;
    f.board.begin_drag(0, 1).unwrap();
    f.board.hover(1, 0);
    f.board.hover(0, 1);
    assert!(matches!(f.board.drop_card().await, DropOutcome::NoOp));
    assert_eq!(f.api.calls(), ["fetch"]);
}

#[tokio::test]
async fn drop_in_same_column_commits_reorder_then_refetches() {
    let mut f = fixture().await;
    f.board.begin_drag(0, 0).unwrap();
    f.board.hover(0, 2);
    assert!(matches!(f.board.drop_card().await, DropOutcome::Committed));
    assert_eq!(f.api.calls(), ["fetch", "reorder 0->2", "fetch"]);
    assert!(!f.board.is_dragging());
}

#[tokio::test]
async fn drop_across_columns_commits_move_and_adopts_server_truth() {
    let mut f = fixture().await;
    let truth = {
        let script = f.api.script.lock().unwrap();
        let mut cols = script.columns.clone();
        // A concurrent remote move landed first: the server disagrees.
        let q = cols[1].cards.pop().unwrap();
        cols[0].cards.push(q);
        cols
    };
    f.api.set_columns(truth.clone());

    f.board.begin_drag(0, 0).unwrap();
    f.board.hover(1, 1);
    assert!(matches!(f.board.drop_card().await, DropOutcome::Committed));
    assert_eq!(f.api.calls(), ["fetch", "move @1", "fetch"]);
    assert_eq!(f.board.columns(), truth.as_slice());
}

#[tokio::test]
async fn rejected_commit_resyncs_instead_of_surfacing() {
    let mut f = fixture().await;
    let original = f.board.columns().to_vec();
    f.api.script.lock().unwrap().reject_commit = Some(409);

    f.board.begin_drag(0, 0).unwrap();
    f.board.hover(1, 0);
    let outcome = f.board.drop_card().await;
    assert!(matches!(outcome, DropOutcome::Rejected(ClientError::Status(409))));
    assert_eq!(f.board.columns(), original.as_slice());
}

#[tokio::test]
async fn rejected_commit_with_failed_refetch_rolls_back() {
    let mut f = fixture().await;
    let original = f.board.columns().to_vec();
    {
        let mut script = f.api.script.lock().unwrap();
        script.reject_commit = Some(404);
        script.fail_fetch = true;
    }
    f.board.begin_drag(0, 2).unwrap();
    f.board.hover(1, 0);
    assert!(matches!(f.board.drop_card().await, DropOutcome::Rejected(_)));
    assert_eq!(f.board.columns(), original.as_slice());
}

#[tokio::test]
async fn commit_move_noop_intent_sends_nothing() {
    let mut f = fixture().await;
    let column_id = f.board.columns()[0].id;
    let intent = MoveIntent {
        card_id: f.board.columns()[0].cards[0].id,
        from_column_id: column_id,
        to_column_id: column_id,
        from_index: 0,
        to_index: 0,
    };
    assert!(matches!(f.board.commit_move(intent).await, DropOutcome::NoOp));
    assert_eq!(f.api.calls(), ["fetch"]);
}

// =============================================================
// cancel / remote
// =============================================================

#[tokio::test]
async fn cancel_restores_snapshot_without_network() {
    let mut f = fixture().await;
    let original = f.board.columns().to_vec();
    f.board.begin_drag(0, 0).unwrap();
    f.board.hover(1, 2);
    assert!(f.board.cancel_drag());
    assert_eq!(f.board.columns(), original.as_slice());
    assert_eq!(f.api.calls(), ["fetch"]);
    assert!(!f.board.cancel_drag());
}

#[tokio::test]
async fn remote_columns_replace_matching_columns() {
    let mut f = fixture().await;
    let mut updated = f.board.columns()[1].clone();
    updated.cards.reverse();
    assert!(f.board.apply_remote_columns(vec![updated.clone()]));
    assert_eq!(f.board.columns()[1], updated);
    assert!(!f.board.apply_remote_columns(vec![updated]));
}

#[tokio::test]
async fn remote_columns_ignored_while_dragging_and_for_other_projects() {
    let mut f = fixture().await;
    let foreign = column(Uuid::new_v4(), "elsewhere", vec![]);
    assert!(!f.board.apply_remote_columns(vec![foreign]));

    let mut updated = f.board.columns()[0].clone();
    updated.cards.clear();
    f.board.begin_drag(1, 0).unwrap();
    assert!(!f.board.apply_remote_columns(vec![updated]));
    assert_eq!(f.board.columns()[0].cards.len(), 3);
}

#[tokio::test]
async fn deleted_column_leaves_the_mirror() {
    let mut f = fixture().await;
    let (a_id, b_id) = (f.board.columns()[0].id, f.board.columns()[1].id);
    assert!(f.board.apply_column_deleted(a_id));
    assert_eq!(f.board.columns().iter().map(|c| c.id).collect::<Vec<_>>(), vec![b_id]);
    assert!(!f.board.apply_column_deleted(a_id));
}

#[tokio::test]
async fn deleting_an_unrelated_column_keeps_the_drag() {
    let mut f = fixture().await;
    let a_id = f.board.columns()[0].id;
    f.board.begin_drag(1, 0).unwrap();
    assert!(f.board.apply_column_deleted(a_id));
    assert!(f.board.is_dragging());
    assert_eq!(members(&f.board.columns()[0]), ["p", "q"]);

    assert!(f.board.hover(0, 1));
    assert_eq!(members(&f.board.columns()[0]), ["q", "p"]);
    // Cancelling must not resurrect the deleted column.
    assert!(f.board.cancel_drag());
    assert_eq!(f.board.columns().len(), 1);
}

#[tokio::test]
async fn deleting_the_dragged_cards_column_abandons_the_drag() {
    let mut f = fixture().await;
    let a_id = f.board.columns()[0].id;
    f.board.begin_drag(0, 0).unwrap();
    f.board.hover(1, 0);
    assert!(f.board.apply_column_deleted(a_id));
    assert!(!f.board.is_dragging());
    assert_eq!(f.board.columns().len(), 1);
    assert_eq!(members(&f.board.columns()[0]), ["p", "q"]);
    assert!(matches!(f.board.drop_card().await, DropOutcome::NoOp));
    assert_eq!(f.api.calls(), ["fetch"]);
}
