//! List controller integration tests

use reinhardt_crud_controllers::{ControllerContext, ListController, ListParams};
use reinhardt_crud_core::notifications::keys;
use reinhardt_crud_test::{CrudHarness, POSTS, ProviderMethod, crud_harness};
use reinhardt_crud_types::{
	ErrorKind, MutationMode, ProviderError, Record, RecordId, SortOrder,
};
use rstest::*;
use serde_json::{Map, json};
use std::sync::Arc;
use std::time::Duration;

fn list_for(h: &CrudHarness) -> Arc<ListController> {
	ListController::new(ControllerContext::from_coordinator(h.coordinator.clone()), POSTS)
}

fn ids(list: &ListController) -> Vec<String> {
	list.items
		.lock_ref()
		.iter()
		.filter_map(Record::id)
		.map(|id| id.as_str().to_string())
		.collect()
}

/// Let spawned settlement handlers run
async fn settle_tasks() {
	tokio::time::sleep(Duration::from_millis(1)).await;
}

// ==================== 1. LOADING ====================

/// Test loading the first page
///
/// **Test Category**: Happy path
/// **Test Classification**: Normal flow
#[rstest]
#[tokio::test]
async fn test_load_first_page(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);

	list.load().await.unwrap();

	assert_eq!(ids(&list), vec!["1", "2", "3", "4", "5"]);
	assert_eq!(list.total.get(), 5);
	assert!(!list.is_loading.get());
	assert!(list.error.get_cloned().is_none());
	assert_eq!(crud_harness.provider.call_count(ProviderMethod::GetList), 1);
}

/// Test a failed load reports the provider error
///
/// **Test Category**: Error path
/// **Test Classification**: Provider failure
#[rstest]
#[tokio::test]
async fn test_load_failure_sets_error(crud_harness: CrudHarness) {
	crud_harness.provider.fail_next(
		ProviderMethod::GetList,
		ProviderError::new("Service unavailable").with_status(503),
	);
	let list = list_for(&crud_harness);

	let err = list.load().await.unwrap_err();

	assert_eq!(err.kind(), ErrorKind::ProviderFailure);
	assert!(list.error.get_cloned().unwrap().contains("Service unavailable"));
	assert!(!list.is_loading.get());
	assert_eq!(crud_harness.notification_count(keys::HTTP_ERROR), 1);
}

// ==================== 2. QUERY STATE ====================

/// Test sorting the same field twice toggles the order
///
/// **Test Category**: Query state
/// **Test Classification**: Sort
#[rstest]
#[tokio::test]
async fn test_set_sort_toggles_order(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.set_page(2).await.unwrap();

	list.set_sort("views").await.unwrap();
	assert_eq!(list.params.lock_ref().sort.as_ref().unwrap().order, SortOrder::Asc);
	assert_eq!(list.params.lock_ref().page, 1);

	list.set_sort("views").await.unwrap();
	assert_eq!(list.params.lock_ref().sort.as_ref().unwrap().order, SortOrder::Desc);
	assert_eq!(ids(&list), vec!["5", "4", "3", "2", "1"]);

	list.set_sort("title").await.unwrap();
	assert_eq!(list.params.lock_ref().sort.as_ref().unwrap().order, SortOrder::Asc);
}

/// Test filters reset the page and narrow the rows
///
/// **Test Category**: Query state
/// **Test Classification**: Filter
#[rstest]
#[tokio::test]
async fn test_set_filters_resets_page(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.set_per_page(2).await.unwrap();
	list.set_page(2).await.unwrap();

	let mut filter = Map::new();
	filter.insert("status".to_string(), json!("draft"));
	list.set_filters(filter).await.unwrap();

	assert_eq!(list.params.lock_ref().page, 1);
	assert_eq!(ids(&list), vec!["2", "4"]);
	assert_eq!(list.total.get(), 2);
}

/// Test showing and hiding a filter
///
/// **Test Category**: Query state
/// **Test Classification**: Displayed filters
#[rstest]
#[tokio::test]
async fn test_show_and_hide_filter(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.load().await.unwrap();

	list.show_filter("status", Some(json!("published")))
		.await
		.unwrap();
	assert!(list.params.lock_ref().displayed_filters.contains("status"));
	assert_eq!(ids(&list), vec!["1", "3", "5"]);

	list.show_filter("title", None).await.unwrap();
	assert_eq!(list.params.lock_ref().displayed_filters.len(), 2);

	list.hide_filter("status").await.unwrap();
	assert!(!list.params.lock_ref().displayed_filters.contains("status"));
	assert_eq!(list.total.get(), 5);
}

/// Test page navigation helpers
///
/// **Test Category**: Query state
/// **Test Classification**: Pagination
#[rstest]
#[case(1, false, true, 2)]
#[case(2, true, true, 2)]
#[case(3, true, false, 1)]
#[tokio::test]
async fn test_pagination_helpers(
	crud_harness: CrudHarness,
	#[case] page: u64,
	#[case] has_previous: bool,
	#[case] has_next: bool,
	#[case] rows: usize,
) {
	let list = list_for(&crud_harness);
	list.set_per_page(2).await.unwrap();

	list.set_page(page).await.unwrap();

	assert_eq!(list.total_pages(), 3);
	assert_eq!(list.has_previous_page(), has_previous);
	assert_eq!(list.has_next_page(), has_next);
	assert_eq!(list.items.lock_ref().len(), rows);
}

/// Test the page size is clamped to the configured maximum
///
/// **Test Category**: Query state
/// **Test Classification**: Edge case
#[rstest]
#[tokio::test]
async fn test_per_page_is_clamped(crud_harness: CrudHarness) {
	let context = ControllerContext::from_coordinator(crud_harness.coordinator.clone());
	let mut params = ListParams::new(0);
	params.page = 0;
	let list = ListController::with_params(context, POSTS, params);
	assert_eq!(list.params.lock_ref().page, 1);
	assert!(list.params.lock_ref().per_page >= 1);

	list.set_per_page(100_000).await.unwrap();

	assert_eq!(
		list.params.lock_ref().per_page,
		crud_harness.settings.list.max_per_page
	);
}

// ==================== 3. SELECTION ====================

/// Test selecting, toggling and clearing rows
///
/// **Test Category**: Selection
/// **Test Classification**: Normal flow
#[rstest]
#[tokio::test]
async fn test_selection(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.load().await.unwrap();

	list.select(vec![RecordId::from(2), RecordId::from(2), RecordId::from(4)]);
	assert_eq!(list.selected_ids.get_cloned(), vec![RecordId::from(2), RecordId::from(4)]);

	list.toggle(RecordId::from(2));
	list.toggle(RecordId::from(5));
	assert_eq!(list.selected_ids.get_cloned(), vec![RecordId::from(4), RecordId::from(5)]);

	list.select_all();
	assert_eq!(list.selected_ids.lock_ref().len(), 5);
	assert!(list.is_selected(&RecordId::from(1)));

	list.clear_selection();
	assert!(list.selected_ids.lock_ref().is_empty());
}

// ==================== 4. BULK DELETE ====================

/// Test an undoable bulk delete hides rows and brings them back on undo
///
/// **Test Category**: Bulk delete
/// **Test Classification**: Undo
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_delete_selected_then_undo(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.load().await.unwrap();
	list.select(vec![RecordId::from(1), RecordId::from(2)]);

	let ticket = list.delete_selected(MutationMode::Undoable).await.unwrap();

	assert_eq!(ids(&list), vec!["3", "4", "5"]);
	assert_eq!(list.total.get(), 3);
	assert!(list.selected_ids.lock_ref().is_empty());

	assert!(crud_harness.coordinator.undo(ticket.handle().unwrap()));
	settle_tasks().await;

	assert_eq!(ids(&list), vec!["1", "2", "3", "4", "5"]);
	assert_eq!(list.total.get(), 5);
	assert_eq!(crud_harness.provider.call_count(ProviderMethod::DeleteMany), 0);
}

/// Test an undoable bulk delete reaches the provider after the grace period
///
/// **Test Category**: Bulk delete
/// **Test Classification**: Expiry
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_delete_selected_executes_after_grace_period(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.load().await.unwrap();
	list.select(vec![RecordId::from(3)]);
	list.toggle(RecordId::from(4));

	let ticket = list.delete_selected(MutationMode::Undoable).await.unwrap();
	assert!(ticket.settled().await.unwrap().is_success());
	settle_tasks().await;

	let deletes = crud_harness.provider.calls_to(ProviderMethod::DeleteMany);
	assert_eq!(deletes.len(), 1);
	assert_eq!(deletes[0].ids, vec![RecordId::from(3), RecordId::from(4)]);
	assert_eq!(ids(&list), vec!["1", "2", "5"]);
	assert_eq!(list.total.get(), 3);
}

/// Test a failed optimistic bulk delete restores the rows
///
/// **Test Category**: Bulk delete
/// **Test Classification**: Provider failure
#[rstest]
#[tokio::test(start_paused = true)]
async fn test_failed_bulk_delete_restores_rows(crud_harness: CrudHarness) {
	crud_harness.provider.fail_next(
		ProviderMethod::DeleteMany,
		ProviderError::new("Forbidden").with_status(403),
	);
	let list = list_for(&crud_harness);
	list.load().await.unwrap();
	list.select_all();

	let ticket = list.delete_selected(MutationMode::Optimistic).await.unwrap();
	assert!(!ticket.settled().await.unwrap().is_success());
	settle_tasks().await;

	assert_eq!(list.items.lock_ref().len(), 5);
	assert_eq!(list.total.get(), 5);
	assert!(list.selected_ids.lock_ref().is_empty());
}

/// Test deleting an empty selection is rejected
///
/// **Test Category**: Bulk delete
/// **Test Classification**: Invalid request
#[rstest]
#[tokio::test]
async fn test_delete_empty_selection_is_invalid(crud_harness: CrudHarness) {
	let list = list_for(&crud_harness);
	list.load().await.unwrap();

	let err = list
		.delete_selected(MutationMode::Undoable)
		.await
		.unwrap_err();

	assert_eq!(err.kind(), ErrorKind::InvalidMutationRequest);
	assert_eq!(list.items.lock_ref().len(), 5);
}
