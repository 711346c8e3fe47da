use std::sync::Arc;

use futures::Stream;

use super::{QuerySpec, Store};
use crate::catalog::Row;
use crate::cnf::{BULK_BATCH_SIZE, CREATION_ORDER};
use crate::err::Error;

const TARGET: &str = "parsegql::core::remote::iter";

/// Scans every row of a class in creation order.
///
/// Each batch skips the rows already seen, so rows inserted concurrently
/// before the current window can shift it and cause rows to be visited
/// twice or not at all.
pub struct QueryIter {
	store: Arc<dyn Store>,
	class: String,
	filter: Row,
	batch_size: usize,
	processed: usize,
	done: bool,
}

impl QueryIter {
	pub fn new(store: Arc<dyn Store>, class: impl Into<String>) -> Self {
		Self {
			store,
			class: class.into(),
			filter: Row::new(),
			batch_size: *BULK_BATCH_SIZE,
			processed: 0,
			done: false,
		}
	}

	pub fn with_filter(mut self, filter: Row) -> Self {
		self.filter = filter;
		self
	}

	pub fn with_batch_size(mut self, batch_size: usize) -> Self {
		self.batch_size = batch_size.max(1);
		self
	}

	/// The number of rows returned so far.
	pub fn processed(&self) -> usize {
		self.processed
	}

	/// Fetches the next batch, or `None` once a batch comes back empty.
	pub async fn next_batch(&mut self) -> Result<Option<Vec<Row>>, Error> {
		if self.done {
			return Ok(None);
		}
		let spec = QuerySpec {
			filter: self.filter.clone(),
			limit: self.batch_size,
			order: CREATION_ORDER.to_string(),
			skip: self.processed,
			..Default::default()
		};
		let rows = self.store.query_rows(&self.class, &spec).await?;
		if rows.is_empty() {
			debug!(target: TARGET, class = %self.class, processed = self.processed, "Scan complete");
			self.done = true;
			return Ok(None);
		}
		self.processed += rows.len();
		trace!(target: TARGET, class = %self.class, processed = self.processed, "Fetched batch");
		Ok(Some(rows))
	}

	/// Turns the iterator into a stream of batches. The stream ends after the
	/// first error.
	pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Row>, Error>> + Send {
		futures::stream::try_unfold(self, |mut iter| async move {
			Ok(iter.next_batch().await?.map(|rows| (rows, iter)))
		})
	}
}
