//! List controller
//!
//! Fetches one page of a resource, keeps the query parameters and the row
//! selection, and re-derives its rows from the record cache so speculative
//! writes (including undoable deletes) show up before the provider answers.

use crate::context::ControllerContext;
use futures_signals::signal::Mutable;
use futures_signals::signal_vec::MutableVec;
use reinhardt_crud_core::MutationTicket;
use reinhardt_crud_types::{
	ControllerResult, GetListParams, MutationMode, Pagination, Record, RecordId, Sort, SortOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

/// Query state of a list view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListParams {
	/// Current page (1-indexed)
	pub page: u64,
	pub per_page: u64,
	pub sort: Option<Sort>,
	pub filter: Map<String, Value>,
	/// Filters shown in the filter form, even when empty
	pub displayed_filters: BTreeSet<String>,
}

impl ListParams {
	pub fn new(per_page: u64) -> Self {
		Self {
			page: 1,
			per_page,
			sort: None,
			filter: Map::new(),
			displayed_filters: BTreeSet::new(),
		}
	}

	/// Parameters of the matching `get_list` call
	pub fn to_get_list_params(&self) -> GetListParams {
		GetListParams {
			pagination: Pagination::new(self.page, self.per_page),
			sort: self.sort.clone(),
			filter: self.filter.clone(),
			meta: None,
		}
	}
}

/// Controller of a paginated, sortable, filterable list
pub struct ListController {
	pub resource: String,
	pub params: Mutable<ListParams>,
	/// Rows of the current page
	pub items: MutableVec<Record>,
	pub total: Mutable<u64>,
	pub is_loading: Mutable<bool>,
	pub error: Mutable<Option<String>>,
	/// Selected row ids, in selection order
	pub selected_ids: Mutable<Vec<RecordId>>,
	context: ControllerContext,
}

impl ListController {
	pub fn new(context: ControllerContext, resource: impl Into<String>) -> Arc<Self> {
		let per_page = context.settings.list.default_per_page;
		Self::with_params(context, resource, ListParams::new(per_page))
	}

	pub fn with_params(
		context: ControllerContext,
		resource: impl Into<String>,
		mut params: ListParams,
	) -> Arc<Self> {
		params.per_page = context.settings.clamp_per_page(params.per_page);
		params.page = params.page.max(1);
		Arc::new(Self {
			resource: resource.into(),
			params: Mutable::new(params),
			items: MutableVec::new(),
			total: Mutable::new(0),
			is_loading: Mutable::new(false),
			error: Mutable::new(None),
			selected_ids: Mutable::new(Vec::new()),
			context,
		})
	}

	fn query_key(&self) -> String {
		self.params.lock_ref().to_get_list_params().cache_key()
	}

	/// Fetch the current page from the provider
	pub async fn load(&self) -> ControllerResult<()> {
		self.is_loading.set(true);
		self.error.set(None);
		let params = self.params.get_cloned().to_get_list_params();
		let key = params.cache_key();

		let result = self.context.provider.get_list(&self.resource, params).await;
		let outcome = match result {
			Ok(list) => {
				self.context
					.cache
					.put_list(&self.resource, &key, list.data, list.total);
				self.refresh_from_cache();
				Ok(())
			}
			Err(e) => {
				tracing::warn!(resource = %self.resource, error = %e, "Failed to load list");
				self.error
					.set(Some(format!("Failed to load data: {}", e.message)));
				self.context.coordinator.notify_error(&self.resource, &e, 0);
				Err(e.into())
			}
		};
		self.is_loading.set(false);
		outcome
	}

	/// Re-derive rows and total from the cache
	///
	/// Returns `false` if the current query is not cached.
	pub fn refresh_from_cache(&self) -> bool {
		let Some((records, total)) = self.context.cache.get_list(&self.resource, &self.query_key())
		else {
			return false;
		};
		self.items.lock_mut().replace_cloned(records);
		self.total.set(total);
		true
	}

	pub async fn set_page(&self, page: u64) -> ControllerResult<()> {
		self.params.lock_mut().page = page.max(1);
		self.load().await
	}

	pub async fn set_per_page(&self, per_page: u64) -> ControllerResult<()> {
		{
			let mut params = self.params.lock_mut();
			params.per_page = self.context.settings.clamp_per_page(per_page);
			params.page = 1;
		}
		self.load().await
	}

	/// Sort by `field`, toggling the order when it is already the sort field
	pub async fn set_sort(&self, field: &str) -> ControllerResult<()> {
		{
			let mut params = self.params.lock_mut();
			let order = match &params.sort {
				Some(current) if current.field == field => current.order.toggled(),
				_ => SortOrder::Asc,
			};
			params.sort = Some(Sort::new(field, order));
			params.page = 1;
		}
		self.load().await
	}

	/// Replace the filter values and go back to the first page
	pub async fn set_filters(&self, filter: Map<String, Value>) -> ControllerResult<()> {
		{
			let mut params = self.params.lock_mut();
			params.filter = filter;
			params.page = 1;
		}
		self.load().await
	}

	/// Add a filter to the filter form, optionally with an initial value
	pub async fn show_filter(&self, name: &str, default_value: Option<Value>) -> ControllerResult<()> {
		let reload = {
			let mut params = self.params.lock_mut();
			params.displayed_filters.insert(name.to_string());
			match default_value {
				Some(value) => {
					params.filter.insert(name.to_string(), value);
					params.page = 1;
					true
				}
				None => false,
			}
		};
		if reload {
			self.load().await?;
		}
		Ok(())
	}

	/// Remove a filter from the form and drop its value
	pub async fn hide_filter(&self, name: &str) -> ControllerResult<()> {
		let reload = {
			let mut params = self.params.lock_mut();
			params.displayed_filters.remove(name);
			let had_value = params.filter.remove(name).is_some();
			if had_value {
				params.page = 1;
			}
			had_value
		};
		if reload {
			self.load().await?;
		}
		Ok(())
	}

	pub fn select(&self, ids: Vec<RecordId>) {
		let mut unique = Vec::with_capacity(ids.len());
		for id in ids {
			if !unique.contains(&id) {
				unique.push(id);
			}
		}
		self.selected_ids.set(unique);
	}

	/// Add `id` to the selection, or remove it if already selected
	pub fn toggle(&self, id: RecordId) {
		let mut selected = self.selected_ids.lock_mut();
		match selected.iter().position(|s| *s == id) {
			Some(index) => {
				selected.remove(index);
			}
			None => selected.push(id),
		}
	}

	/// Select every row of the current page
	pub fn select_all(&self) {
		let ids: Vec<RecordId> = self
			.items
			.lock_ref()
			.iter()
			.filter_map(Record::id)
			.collect();
		let mut selected = self.selected_ids.lock_mut();
		for id in ids {
			if !selected.contains(&id) {
				selected.push(id);
			}
		}
	}

	pub fn clear_selection(&self) {
		self.selected_ids.set(Vec::new());
	}

	pub fn is_selected(&self, id: &RecordId) -> bool {
		self.selected_ids.lock_ref().contains(id)
	}

	/// Delete every selected row
	///
	/// The deleted ids leave the selection and the rows disappear right away
	/// in speculative modes. Once the mutation settles the rows are derived
	/// from the cache again, so an undone or failed delete brings them back.
	pub async fn delete_selected(self: &Arc<Self>, mode: MutationMode) -> ControllerResult<MutationTicket> {
		let ids = self.selected_ids.get_cloned();
		let ticket = self
			.context
			.coordinator
			.delete_many(&self.resource, ids.clone(), mode)
			.await?;

		self.selected_ids
			.lock_mut()
			.retain(|selected| !ids.contains(selected));
		self.refresh_from_cache();

		if ticket.is_pending() {
			let weak: Weak<Self> = Arc::downgrade(self);
			let watched = ticket.clone();
			tokio::spawn(async move {
				watched.settled().await;
				if let Some(list) = weak.upgrade() {
					list.refresh_from_cache();
				}
			});
		}
		Ok(ticket)
	}

	/// Number of pages for the current total
	pub fn total_pages(&self) -> u64 {
		let per_page = self.params.lock_ref().per_page.max(1);
		self.total.get().div_ceil(per_page)
	}

	pub fn has_previous_page(&self) -> bool {
		self.params.lock_ref().page > 1
	}

	pub fn has_next_page(&self) -> bool {
		self.params.lock_ref().page < self.total_pages()
	}
}

impl std::fmt::Debug for ListController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ListController")
			.field("resource", &self.resource)
			.field("params", &*self.params.lock_ref())
			.field("total", &self.total.get())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(1, 25, 0)]
	#[case(3, 10, 20)]
	fn test_list_params_to_get_list_params(
		#[case] page: u64,
		#[case] per_page: u64,
		#[case] offset: u64,
	) {
		let mut params = ListParams::new(per_page);
		params.page = page;
		params.filter.insert("status".to_string(), json!("draft"));

		let query = params.to_get_list_params();

		assert_eq!(query.pagination.offset(), offset);
		assert_eq!(query.filter.get("status"), Some(&json!("draft")));
		assert!(query.meta.is_none());
	}

	#[rstest]
	fn test_displayed_filters_do_not_change_cache_key() {
		let mut shown = ListParams::new(25);
		shown.displayed_filters.insert("status".to_string());

		assert_eq!(
			shown.to_get_list_params().cache_key(),
			ListParams::new(25).to_get_list_params().cache_key()
		);
	}
}
